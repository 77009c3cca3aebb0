//! HTTP route handlers for the roster server.

pub mod agents;
pub mod customers;
pub mod docs;
pub mod echo;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
