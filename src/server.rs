//! Scrape server.
//!
//! Serves the registered gauges in the Prometheus text format, plus the
//! build version and a liveness probe.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::metrics::MetricRegistry;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub metrics: Arc<MetricRegistry>,
    /// Reported verbatim by `/version`.
    pub version: String,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Create the Axum router serving gauges at `endpoint`.
///
/// `endpoint` must not be `/version` or `/healthz`.
pub fn create_router(state: AppState, endpoint: &str) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route(endpoint, get(metrics_handler))
        .route("/version", get(version_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}

/// Prometheus scrape endpoint.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode_text() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
    }
}

/// Build version as plain text.
async fn version_handler(State(state): State<Arc<AppState>>) -> String {
    state.version.clone()
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        AppState {
            metrics: Arc::new(MetricRegistry::new()),
            version: "1.2.3".to_string(),
        }
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = create_test_state();
        state
            .metrics
            .bind(&MetricConfig::new("attic_temperature_celsius").with_label("room", "attic"))
            .unwrap()
            .set(21.5)
            .unwrap();
        let app = create_router(state, "/metrics");

        let (status, content_type, body) = get_body(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
        assert!(body.contains(r#"attic_temperature_celsius{room="attic"} 21.5"#));
    }

    #[tokio::test]
    async fn test_custom_endpoint() {
        let app = create_router(create_test_state(), "/probe");

        let (status, _, _) = get_body(app.clone(), "/probe").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = get_body(app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = create_router(create_test_state(), "/metrics");

        let (status, _, body) = get_body(app, "/version").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1.2.3");
    }

    #[tokio::test]
    async fn test_healthz_endpoint() {
        let app = create_router(create_test_state(), "/metrics");

        let (status, _, body) = get_body(app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
