//! HTTP transport: REST API, MCP endpoint, health and metrics

use axum::{
    Json, Router,
    extract::State,
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use core_config::server::ServerConfig;
use domain_pricing::{PriceListFetcher, PricingService, handlers};
use pricing_mcp::McpHandler;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

struct AppState<F: PriceListFetcher> {
    service: PricingService<F>,
    mcp: McpHandler,
}

/// Assemble the full application router
pub fn router<F: PriceListFetcher + 'static>(
    service: PricingService<F>,
    server_config: &ServerConfig,
) -> Router {
    let state = Arc::new(AppState {
        mcp: McpHandler::new(service.clone()),
        service: service.clone(),
    });

    let ops = Router::new()
        .route("/health", get(health::<F>))
        .route("/mcp", post(mcp::<F>))
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", handlers::ApiDoc::openapi()))
        .nest("/api", handlers::router(service))
        .merge(ops)
        .route("/metrics", get(observability::metrics_handler))
        .layer(middleware::from_fn(observability::metrics_middleware))
        .layer(TimeoutLayer::new(server_config.request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Liveness plus cache occupancy
async fn health<F: PriceListFetcher + 'static>(
    State(state): State<Arc<AppState<F>>>,
) -> impl IntoResponse {
    let cache = state.service.cache_stats().await;
    Json(json!({
        "status": "ok",
        "cache": cache,
    }))
}

/// One JSON-RPC message per request body
async fn mcp<F: PriceListFetcher + 'static>(
    State(state): State<Arc<AppState<F>>>,
    body: String,
) -> impl IntoResponse {
    let response = state.mcp.handle_json(&body).await;
    ([(header::CONTENT_TYPE, "application/json")], response)
}

/// Bind and serve until SIGINT/SIGTERM
pub async fn serve(router: Router, server_config: &ServerConfig) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;

    info!("Server starting on {}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e))?;

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixtureFetcher;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use domain_pricing::PricingConfig;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let service = PricingService::new(FixtureFetcher, PricingConfig::default());
        router(service, &ServerConfig::default())
    }

    async fn json_body(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_cache() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache"]["entries"], 0);
        assert_eq!(body["cache"]["max_entries"], 16);
    }

    #[tokio::test]
    async fn test_mcp_endpoint_lists_tools() {
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_rest_api_is_nested() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/services/AmazonEC2/urls?region=eu-west-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["region"], "eu-west-1");
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert!(body["paths"]["/query"].is_object());
    }
}
