//! Stateless echo function.
//!
//! Accepts a serverless-style HTTP event and answers with a JSON string
//! naming the caller's keyword. The same message is served by the roster
//! server at `GET /echo`.
//!
//! ```rust
//! use roster_echo::{handler, EchoEvent};
//!
//! let event: EchoEvent =
//!     serde_json::from_str(r#"{ "queryStringParameters": { "keyword": "hello" } }"#).unwrap();
//! let response = handler(event);
//! assert_eq!(response.status_code, 200);
//! assert_eq!(response.body, r#""Taylor Palmer says hello""#);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming invocation. Only the query string is read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoEvent {
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl EchoEvent {
    pub fn keyword(&self) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|q| q.get("keyword"))
            .map(String::as_str)
    }
}

/// Outgoing response with a JSON-encoded body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    pub status_code: u16,
    pub body: String,
}

/// Formats the echo message. A missing keyword is rendered empty.
pub fn say(keyword: Option<&str>) -> String {
    format!("Taylor Palmer says {}", keyword.unwrap_or_default())
}

pub fn handler(event: EchoEvent) -> EchoResponse {
    EchoResponse {
        status_code: 200,
        body: Value::String(say(event.keyword())).to_string(),
    }
}
