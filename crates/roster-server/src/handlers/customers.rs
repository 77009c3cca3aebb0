//! Read-only customer lookup by agent.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use roster_core::Customer;

use crate::error::AppError;
use crate::ServerState;

/// Lists the customers assigned to an agent.
pub async fn by_agent(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = state
        .store
        .customers_of(&code)
        .await
        .map_err(|e| AppError::storage("Error getting agent customer data", e))?;
    Ok(Json(customers))
}
