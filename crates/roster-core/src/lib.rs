//! Core domain types and request validation for roster.
//!
//! This crate provides the types shared between the storage layer and the
//! HTTP handlers:
//!
//! - [`Agent`] and [`Customer`] — rows of the `agents` and `customer` tables
//! - [`AgentField`] — the allow-list of mutable agent columns
//! - [`NewAgent`], [`AgentUpdate`], [`AgentPatch`] — validated write requests
//! - [`Violation`] and [`ValidationError`] — collected validation failures
//!
//! Validation never touches storage and never stops at the first failure:
//! every problem in a request is reported together.
//!
//! # Example
//!
//! ```rust
//! use roster_core::{parse_patch, AgentField, CodeRule};
//! use serde_json::json;
//!
//! let patch = parse_patch("A001", CodeRule::Text, &json!({ "COUNTRY": "India" })).unwrap();
//! assert_eq!(patch.changes[0].0, AgentField::Country);
//!
//! let err = parse_patch("A001", CodeRule::Text, &json!({ "foo": "bar" })).unwrap_err();
//! assert_eq!(err.violations[0].msg, "Invalid field: foo");
//! ```

mod validation;

use serde::{Deserialize, Serialize};

pub use validation::{
    parse_create, parse_patch, parse_path_code, parse_update, CodeRule, Location, ValidationError,
    Violation,
};

/// A row of the `agents` table, serialized with its column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "AGENT_CODE")]
    pub code: String,
    #[serde(rename = "AGENT_NAME")]
    pub name: Option<String>,
    #[serde(rename = "WORKING_AREA")]
    pub working_area: Option<String>,
    #[serde(rename = "COMMISSION")]
    pub commission: Option<f64>,
    #[serde(rename = "PHONE_NO")]
    pub phone: Option<String>,
    #[serde(rename = "COUNTRY")]
    pub country: Option<String>,
}

/// A row of the read-only `customer` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Customer {
    pub cust_code: String,
    pub cust_name: Option<String>,
    pub cust_city: Option<String>,
    pub working_area: Option<String>,
    pub cust_country: Option<String>,
    pub grade: Option<i64>,
    pub opening_amt: Option<f64>,
    pub receive_amt: Option<f64>,
    pub payment_amt: Option<f64>,
    pub outstanding_amt: Option<f64>,
    pub phone_no: Option<String>,
    pub agent_code: Option<String>,
}

/// Mutable agent columns. The agent code is the key and is never updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentField {
    Name,
    WorkingArea,
    Commission,
    Phone,
    Country,
}

impl AgentField {
    pub const ALL: [AgentField; 5] = [
        AgentField::Name,
        AgentField::WorkingArea,
        AgentField::Commission,
        AgentField::Phone,
        AgentField::Country,
    ];

    /// Column name in the `agents` table. Also the canonical request key.
    pub fn column(self) -> &'static str {
        match self {
            AgentField::Name => "AGENT_NAME",
            AgentField::WorkingArea => "WORKING_AREA",
            AgentField::Commission => "COMMISSION",
            AgentField::Phone => "PHONE_NO",
            AgentField::Country => "COUNTRY",
        }
    }

    /// Short request key accepted alongside the column name.
    pub fn alias(self) -> &'static str {
        match self {
            AgentField::Name => "name",
            AgentField::WorkingArea => "working_area",
            AgentField::Commission => "commission",
            AgentField::Phone => "phone",
            AgentField::Country => "country",
        }
    }

    /// Resolves a request key (column name or alias) to a field.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.column() == key || f.alias() == key)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, AgentField::Commission)
    }
}

/// A validated value for one [`AgentField`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Decimal(f64),
}

/// Validated payload for creating an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAgent {
    pub code: String,
    pub name: String,
    pub working_area: String,
    pub commission: f64,
    pub phone: String,
    pub country: String,
}

/// Validated payload for replacing every mutable field of an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentUpdate {
    pub code: String,
    pub name: String,
    pub working_area: String,
    pub commission: f64,
    pub phone: String,
    pub country: String,
}

/// Validated partial update. `changes` is never empty and holds each field at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPatch {
    pub code: String,
    pub changes: Vec<(AgentField, FieldValue)>,
}
