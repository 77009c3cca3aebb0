//! OpenAPI description of the HTTP surface, served at `/api-docs`.
//!
//! [`ROUTES`] is the single table the document is generated from; the router
//! tests walk the same table, so a route missing from either side fails them.

use serde_json::{json, Map, Value};

pub const DOCS_PATH: &str = "/api-docs";

/// Request body schema attached to a documented operation.
#[derive(Debug, Clone, Copy)]
pub enum BodySchema {
    NewAgent,
    AgentFields,
}

/// One documented operation.
#[derive(Debug, Clone, Copy)]
pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub status: u16,
    pub response: &'static str,
    pub body: Option<BodySchema>,
}

pub const ROUTES: &[RouteDoc] = &[
    RouteDoc {
        method: "get",
        path: "/agents",
        summary: "Retrieve a list of agents",
        status: 200,
        response: "A list of agents",
        body: None,
    },
    RouteDoc {
        method: "post",
        path: "/agents",
        summary: "Create a new agent",
        status: 201,
        response: "Agent created",
        body: Some(BodySchema::NewAgent),
    },
    RouteDoc {
        method: "get",
        path: "/agents/{code}",
        summary: "Retrieve agents by code",
        status: 200,
        response: "Matching agents, empty when none exist",
        body: None,
    },
    RouteDoc {
        method: "put",
        path: "/agents/{code}",
        summary: "Update an existing agent by code",
        status: 200,
        response: "Agent updated",
        body: Some(BodySchema::AgentFields),
    },
    RouteDoc {
        method: "patch",
        path: "/agents/{code}",
        summary: "Partially update an existing agent by code",
        status: 200,
        response: "Agent partially updated",
        body: Some(BodySchema::AgentFields),
    },
    RouteDoc {
        method: "delete",
        path: "/agents/{code}",
        summary: "Delete an agent by code",
        status: 200,
        response: "Agent deleted",
        body: None,
    },
    RouteDoc {
        method: "get",
        path: "/agent_cust/{code}",
        summary: "Get a list of an agent's customers by agent code",
        status: 200,
        response: "A list of customers for the specified agent",
        body: None,
    },
    RouteDoc {
        method: "get",
        path: "/echo",
        summary: "Echo a keyword",
        status: 200,
        response: "A JSON string naming the keyword",
        body: None,
    },
];

fn agent_properties(with_code: bool) -> Value {
    let mut props = Map::new();
    if with_code {
        props.insert("AGENT_CODE".into(), json!({ "type": "string" }));
    }
    for field in roster_core::AgentField::ALL {
        let ty = if field.is_numeric() { "number" } else { "string" };
        props.insert(field.column().into(), json!({ "type": ty }));
    }
    Value::Object(props)
}

fn request_body(schema: BodySchema) -> Value {
    let schema = match schema {
        BodySchema::NewAgent => json!({
            "type": "object",
            "properties": agent_properties(true),
            "required": ["AGENT_CODE", "AGENT_NAME", "WORKING_AREA", "COMMISSION", "PHONE_NO", "COUNTRY"],
        }),
        BodySchema::AgentFields => json!({
            "type": "object",
            "properties": agent_properties(false),
            "additionalProperties": false,
        }),
    };
    json!({
        "required": true,
        "content": { "application/json": { "schema": schema } }
    })
}

fn parameters(route: &RouteDoc) -> Value {
    let mut params = Vec::new();
    if route.path.contains("{code}") {
        params.push(json!({
            "in": "path",
            "name": "code",
            "required": true,
            "schema": { "type": "string" },
            "description": "The agent code",
        }));
    }
    if route.path == "/echo" {
        params.push(json!({
            "in": "query",
            "name": "keyword",
            "required": false,
            "schema": { "type": "string" },
        }));
    }
    Value::Array(params)
}

fn operation(route: &RouteDoc) -> Value {
    let mut responses = Map::new();
    responses.insert(route.status.to_string(), json!({ "description": route.response }));
    if route.body.is_some() || route.method != "get" {
        responses.insert("400".into(), json!({ "description": "Validation failed" }));
    }
    if route.path != "/echo" {
        responses.insert("500".into(), json!({ "description": "Database error" }));
    }

    let mut op = Map::new();
    op.insert("summary".into(), json!(route.summary));
    let params = parameters(route);
    if params.as_array().is_some_and(|p| !p.is_empty()) {
        op.insert("parameters".into(), params);
    }
    if let Some(body) = route.body {
        op.insert("requestBody".into(), request_body(body));
    }
    op.insert("responses".into(), Value::Object(responses));
    Value::Object(op)
}

/// Builds the OpenAPI 3.0 document for every route in [`ROUTES`].
pub fn openapi() -> Value {
    let mut paths = Map::new();
    for route in ROUTES {
        let entry = paths
            .entry(route.path)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(route.method.into(), operation(route));
        }
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Roster agents API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "CRUD gateway over the sample agents database",
        },
        "paths": paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = openapi();
        for route in ROUTES {
            let op = &doc["paths"][route.path][route.method];
            assert_eq!(op["summary"], route.summary, "{} {}", route.method, route.path);
            assert!(op["responses"][route.status.to_string()].is_object());
        }
    }

    #[test]
    fn create_body_requires_every_column() {
        let doc = openapi();
        let schema = &doc["paths"]["/agents"]["post"]["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["required"].as_array().unwrap().len(), 6);
        assert_eq!(schema["properties"]["COMMISSION"]["type"], "number");
    }

    #[test]
    fn patch_body_rejects_other_keys() {
        let doc = openapi();
        let schema = &doc["paths"]["/agents/{code}"]["patch"]["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["additionalProperties"], false);
        assert!(schema["properties"].get("AGENT_CODE").is_none());
    }
}
