//! Data transfer objects for HTTP message serialization.

use serde::{Deserialize, Serialize};

/// Acknowledgement for update and delete requests.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Response from creating an agent.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    #[serde(rename = "agentId")]
    pub agent_id: i64,
}

/// Query string for the echo endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct EchoQuery {
    pub keyword: Option<String>,
}
