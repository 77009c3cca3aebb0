//! HTTP server entry point and Axum router setup.
//!
//! Loads configuration, opens the database pool, and serves the agents CRUD
//! API, the echo endpoint and the OpenAPI document.

mod api_docs;
mod db;
mod dto;
mod error;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use axum::Router;
use roster_config::ServerConfig;
use roster_core::CodeRule;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::AgentStore;

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub store: AgentStore,
    pub code_rule: CodeRule,
}

impl ServerState {
    pub fn new(store: AgentStore, config: &ServerConfig) -> Self {
        let code_rule = if config.integer_path_codes {
            CodeRule::Integer
        } else {
            CodeRule::Text
        };
        Self { store, code_rule }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = ServerConfig::load()?;
    let store = AgentStore::connect(&config).await?;
    store.init_schema().await?;
    if config.integer_path_codes {
        info!("Path codes for PUT/PATCH/DELETE must be integers");
    }

    let state = Arc::new(ServerState::new(store.clone(), &config));
    let app = app(state);

    info!("Starting server on {}", config.bind_addr);
    info!("API description at {}", api_docs::DOCS_PATH);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}

/// Builds the router. Agent, customer and echo routes are traced per request.
pub fn app(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route(
            "/agents",
            get(handlers::agents::list).post(handlers::agents::create),
        )
        .route(
            "/agents/{code}",
            get(handlers::agents::get)
                .put(handlers::agents::update)
                .patch(handlers::agents::patch)
                .delete(handlers::agents::delete),
        )
        .route("/agent_cust/{code}", get(handlers::customers::by_agent))
        .route("/echo", get(handlers::echo::echo))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route(api_docs::DOCS_PATH, get(handlers::docs::openapi))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{Method, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::db::testing::{memory_store, seed_customer};

    async fn test_app() -> (Router, AgentStore) {
        let store = memory_store().await;
        let state = ServerState::new(store.clone(), &ServerConfig::default());
        (app(Arc::new(state)), store)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn documented_routes_are_all_mounted() {
        let (app, _) = test_app().await;
        for route in api_docs::ROUTES {
            let method = Method::from_bytes(route.method.to_uppercase().as_bytes()).unwrap();
            let uri = route.path.replace("{code}", "1");
            let request = Request::builder()
                .method(method)
                .uri(&uri)
                .body(Body::empty())
                .unwrap();
            let status = app.clone().oneshot(request).await.unwrap().status();
            assert_ne!(status, StatusCode::NOT_FOUND, "{} {}", route.method, uri);
            assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", route.method, uri);
        }
    }

    #[tokio::test]
    async fn docs_endpoint_serves_openapi() {
        let (app, _) = test_app().await;
        let (status, doc) = get_json(&app, api_docs::DOCS_PATH).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["openapi"], "3.0.0");
        assert!(doc["paths"]["/agent_cust/{code}"]["get"].is_object());
    }

    #[tokio::test]
    async fn echo_returns_json_string() {
        let (app, _) = test_app().await;
        let (status, body) = get_json(&app, "/echo?keyword=hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("Taylor Palmer says hello".into()));

        let (_, body) = get_json(&app, "/echo").await;
        assert_eq!(body, Value::String("Taylor Palmer says ".into()));
    }

    #[tokio::test]
    async fn customers_listed_by_agent_code() {
        let (app, store) = test_app().await;
        seed_customer(&store, "C00007", "Ramanathan", "A010").await;
        seed_customer(&store, "C00009", "Ramesh", "A002").await;

        let (status, body) = get_json(&app, "/agent_cust/A010").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["CUST_NAME"], "Ramanathan");
        assert_eq!(rows[0]["AGENT_CODE"], "A010");

        let (status, body) = get_json(&app, "/agent_cust/A999").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(vec![]));
    }

    #[tokio::test]
    async fn storage_failure_is_a_generic_500() {
        let (app, store) = test_app().await;
        store.close().await;

        let (status, body) = get_json(&app, "/agents").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Error getting agents data");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = test_app().await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
