//! HTTP front for the echo function.

use axum::{extract::Query, Json};

use crate::dto::EchoQuery;

/// Answers with a JSON string naming the `keyword` query parameter.
pub async fn echo(Query(query): Query<EchoQuery>) -> Json<String> {
    Json(roster_echo::say(query.keyword.as_deref()))
}
