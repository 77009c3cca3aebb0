//! Agent CRUD HTTP handlers.
//!
//! Requests are validated completely before the store is touched; storage
//! failures are logged and answered with a fixed message per operation.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use roster_core::{parse_create, parse_patch, parse_path_code, parse_update, Agent};
use serde_json::Value;
use tracing::info;

use crate::dto::{CreatedResponse, MessageResponse};
use crate::error::AppError;
use crate::ServerState;

/// Lists all agents.
pub async fn list(State(state): State<Arc<ServerState>>) -> Result<Json<Vec<Agent>>, AppError> {
    let agents = state
        .store
        .list_agents()
        .await
        .map_err(|e| AppError::storage("Error getting agents data", e))?;
    Ok(Json(agents))
}

/// Looks agents up by code. No match is an empty list, not a 404.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Agent>>, AppError> {
    let agents = state
        .store
        .agents_by_code(&code)
        .await
        .map_err(|e| AppError::storage("Error getting agent data", e))?;
    Ok(Json(agents))
}

/// Creates an agent from a fully populated body.
pub async fn create(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let Json(body) = payload?;
    let agent = parse_create(&body)?;

    let agent_id = state
        .store
        .insert_agent(&agent)
        .await
        .map_err(|e| AppError::storage("Error creating agent", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Agent created",
            agent_id,
        }),
    ))
}

/// Replaces every mutable field of an agent.
pub async fn update(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(body) = payload.map_err(|r| AppError::unreadable_body(&code, state.code_rule, r))?;
    let update = parse_update(&code, state.code_rule, &body)?;

    let rows = state
        .store
        .update_agent(&update)
        .await
        .map_err(|e| AppError::storage("Error updating agent", e))?;

    info!("Agent {} updated ({} rows)", update.code, rows);
    Ok(Json(MessageResponse {
        message: "Agent updated",
    }))
}

/// Updates only the fields present in the body.
pub async fn patch(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(body) = payload.map_err(|r| AppError::unreadable_body(&code, state.code_rule, r))?;
    let patch = parse_patch(&code, state.code_rule, &body)?;

    let rows = state
        .store
        .patch_agent(&patch)
        .await
        .map_err(|e| AppError::storage("Error partially updating agent", e))?;

    info!("Agent {} partially updated ({} rows)", patch.code, rows);
    Ok(Json(MessageResponse {
        message: "Agent partially updated",
    }))
}

/// Deletes an agent. Succeeds whether or not the code existed.
pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let code = parse_path_code(&code, state.code_rule)?;

    state
        .store
        .delete_agent(&code)
        .await
        .map_err(|e| AppError::storage("Error deleting agent", e))?;

    Ok(Json(MessageResponse {
        message: "Agent deleted",
    }))
}
