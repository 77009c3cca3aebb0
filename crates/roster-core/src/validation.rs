//! Request validation for agent writes.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{AgentField, AgentPatch, AgentUpdate, FieldValue, NewAgent};

const CODE_COLUMN: &str = "AGENT_CODE";
const CODE_ALIAS: &str = "code";

/// How the `{code}` path segment of PUT/PATCH/DELETE is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeRule {
    /// Any non-blank text.
    #[default]
    Text,
    /// Integer-formatted token, for clients written against the legacy API.
    Integer,
}

/// Where in the request a violation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Params,
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub location: Location,
    pub path: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Violation {
    fn body(path: impl Into<String>, msg: impl Into<String>, value: Option<&Value>) -> Self {
        Self {
            location: Location::Body,
            path: path.into(),
            msg: msg.into(),
            value: value.cloned(),
        }
    }

    /// A request body that could not be read as JSON.
    pub fn unreadable_body(msg: impl Into<String>) -> Self {
        Self::body("", msg, None)
    }

    fn param(path: &str, msg: impl Into<String>, value: &str) -> Self {
        Self {
            location: Location::Params,
            path: path.into(),
            msg: msg.into(),
            value: Some(Value::String(value.to_string())),
        }
    }
}

/// Every violation found in a request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("request failed validation with {} violation(s)", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

#[derive(Default)]
struct Collector {
    violations: Vec<Violation>,
}

impl Collector {
    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            violations: self.violations,
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationError> {
        if self.violations.is_empty() {
            Ok(value())
        } else {
            Err(self.into_error())
        }
    }

    fn object<'a>(&mut self, body: &'a Value) -> Option<&'a Map<String, Value>> {
        let obj = body.as_object();
        if obj.is_none() {
            self.push(Violation::body("", "Request body must be a JSON object", Some(body)));
        }
        obj
    }

    fn code(&mut self, raw: &str, rule: CodeRule) -> String {
        match rule {
            CodeRule::Text => {
                let code = raw.trim();
                if code.is_empty() {
                    self.push(Violation::param("code", "Agent code must not be empty", raw));
                }
                code.to_string()
            }
            CodeRule::Integer => {
                if !is_integer_token(raw) {
                    self.push(Violation::param("id", "ID must be an integer", raw));
                }
                raw.to_string()
            }
        }
    }

    fn text(&mut self, column: &str, value: Option<&Value>) -> String {
        match value.and_then(Value::as_str).map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                self.push(Violation::body(column, format!("{column} is required"), value));
                String::new()
            }
        }
    }

    fn decimal(&mut self, column: &str, value: Option<&Value>) -> f64 {
        match value.and_then(as_float) {
            Some(n) => n,
            None => {
                self.push(Violation::body(column, format!("{column} must be a number"), value));
                0.0
            }
        }
    }

    /// Looks a key up by column name, falling back to its short alias.
    /// Supplying both is a violation.
    fn lookup<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        column: &str,
        alias: &str,
    ) -> Option<&'a Value> {
        match (obj.get(column), obj.get(alias)) {
            (Some(value), Some(dup)) => {
                self.push(Violation::body(alias, format!("Duplicate field: {column}"), Some(dup)));
                Some(value)
            }
            (value, alias_value) => value.or(alias_value),
        }
    }

    fn required_text(&mut self, obj: &Map<String, Value>, field: AgentField) -> String {
        let value = self.lookup(obj, field.column(), field.alias());
        self.text(field.column(), value)
    }

    fn required_decimal(&mut self, obj: &Map<String, Value>, field: AgentField) -> f64 {
        let value = self.lookup(obj, field.column(), field.alias());
        self.decimal(field.column(), value)
    }

    fn field(&mut self, field: AgentField, value: Option<&Value>) -> FieldValue {
        if field.is_numeric() {
            FieldValue::Decimal(self.decimal(field.column(), value))
        } else {
            FieldValue::Text(self.text(field.column(), value))
        }
    }
}

/// Accepts JSON numbers and strings that parse as a finite float.
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_integer_token(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Validates a create request. All six fields are required.
pub fn parse_create(body: &Value) -> Result<NewAgent, ValidationError> {
    let mut c = Collector::default();
    let Some(obj) = c.object(body) else {
        return Err(c.into_error());
    };

    let code_value = c.lookup(obj, CODE_COLUMN, CODE_ALIAS);
    let code = c.text(CODE_COLUMN, code_value);
    let name = c.required_text(obj, AgentField::Name);
    let working_area = c.required_text(obj, AgentField::WorkingArea);
    let commission = c.required_decimal(obj, AgentField::Commission);
    let phone = c.required_text(obj, AgentField::Phone);
    let country = c.required_text(obj, AgentField::Country);

    c.finish(|| NewAgent {
        code,
        name,
        working_area,
        commission,
        phone,
        country,
    })
}

/// Validates a full update: the path code plus all five mutable fields.
pub fn parse_update(code: &str, rule: CodeRule, body: &Value) -> Result<AgentUpdate, ValidationError> {
    let mut c = Collector::default();
    let code = c.code(code, rule);
    let Some(obj) = c.object(body) else {
        return Err(c.into_error());
    };

    let name = c.required_text(obj, AgentField::Name);
    let working_area = c.required_text(obj, AgentField::WorkingArea);
    let commission = c.required_decimal(obj, AgentField::Commission);
    let phone = c.required_text(obj, AgentField::Phone);
    let country = c.required_text(obj, AgentField::Country);

    c.finish(|| AgentUpdate {
        code,
        name,
        working_area,
        commission,
        phone,
        country,
    })
}

/// Validates a partial update. Keys are restricted to [`AgentField`]; an
/// empty object is rejected rather than producing an empty `SET` clause.
pub fn parse_patch(code: &str, rule: CodeRule, body: &Value) -> Result<AgentPatch, ValidationError> {
    let mut c = Collector::default();
    let code = c.code(code, rule);
    let Some(obj) = c.object(body) else {
        return Err(c.into_error());
    };

    if obj.is_empty() {
        c.push(Violation::body("", "No fields supplied", None));
    }

    let mut changes: Vec<(AgentField, FieldValue)> = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        let Some(field) = AgentField::from_key(key) else {
            c.push(Violation::body(key.as_str(), format!("Invalid field: {key}"), Some(value)));
            continue;
        };
        if changes.iter().any(|(f, _)| *f == field) {
            c.push(Violation::body(
                key.as_str(),
                format!("Duplicate field: {}", field.column()),
                Some(value),
            ));
            continue;
        }
        let parsed = c.field(field, Some(value));
        changes.push((field, parsed));
    }

    c.finish(|| AgentPatch { code, changes })
}

/// Validates the path code of a delete.
pub fn parse_path_code(code: &str, rule: CodeRule) -> Result<String, ValidationError> {
    let mut c = Collector::default();
    let code = c.code(code, rule);
    c.finish(|| code)
}
