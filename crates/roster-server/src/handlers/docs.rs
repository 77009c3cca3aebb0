//! Serves the OpenAPI document.

use axum::Json;
use serde_json::Value;

use crate::api_docs;

pub async fn openapi() -> Json<Value> {
    Json(api_docs::openapi())
}
