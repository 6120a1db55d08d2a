//! HTTP surface of the exporter.
//!
//! `GET <telemetry-path>` runs one full scrape cycle and returns the text
//! exposition; `/healthz` is a static liveness answer; `/` is a landing page
//! linking to the telemetry path. The surface itself carries no
//! authentication.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use prometheus::{Encoder, TextEncoder};
use tracing::error;

use qrator_collector::Collector;

/// Shared state for the exporter routes.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub telemetry_path: String,
}

/// Build the exporter router.
pub fn build_router(state: AppState) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    Router::new()
        .route(&telemetry_path, get(metrics_handler))
        .route("/healthz", get(healthz))
        .route("/", get(landing))
        .with_state(state)
}

/// One scrape per request: collect and snapshot under the scrape lock,
/// then encode the full registry.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let families = state.collector.scrape_and_gather().await;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buffer) {
        error!(error = %err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "metrics exposition is not valid utf8");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn landing(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Qrator Exporter</title></head>\n\
         <body>\n\
         <h2>Qrator Exporter</h2>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>",
        state.telemetry_path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use mockito::Matcher;
    use qrator_api::ApiClient;
    use tower::ServiceExt;

    fn test_router(base_url: &str) -> Router {
        let api = ApiClient::new(base_url, "1", "test-token").unwrap();
        let collector = Arc::new(Collector::new(api).unwrap());
        build_router(AppState {
            collector,
            telemetry_path: "/metrics".to_string(),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let router = test_router("http://127.0.0.1:1");
        let response = router
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn landing_links_to_telemetry_path() {
        let router = test_router("http://127.0.0.1:1");
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("Qrator Exporter"));
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn metrics_endpoint_triggers_a_scrape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/client/1")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"method": "domains_get"}),
            ))
            .with_status(200)
            .with_body(r#"{"id": 1, "result": [], "error": null}"#)
            .create_async()
            .await;

        let router = test_router(&server.url());
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = body_string(response).await;
        assert!(body.contains("qrator_up 1"));
        assert!(body.contains("qrator_exporter_total_scrapes 1"));
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_down_on_upstream_failure() {
        // Upstream unreachable: exposition still succeeds, marked down.
        let router = test_router("http://127.0.0.1:1");
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("qrator_up 0"));
        assert!(body.contains("qrator_exporter_failed_domain_scrapes 1"));
    }
}
