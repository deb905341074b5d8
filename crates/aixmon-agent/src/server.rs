use aixmon_collector::HostMetrics;
use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Registries served by the agent's HTTP endpoints.
pub struct Exposition {
    /// Host statistics plus the up gauge, served at `/metrics`.
    pub stats: Registry,
    /// Agent self-metrics, served at `/agent/metrics`.
    pub agent: Registry,
    /// Set to 1 once the agent is serving.
    pub up: IntGauge,
}

impl Exposition {
    pub fn new(host: HostMetrics) -> Result<Self> {
        let up = IntGauge::new("aix_agent_up", "Defines if aix is up and running")?;

        let agent = Registry::new();
        agent.register(Box::new(up.clone()))?;

        let stats = Registry::new();
        stats.register(Box::new(host))?;
        stats.register(Box::new(up.clone()))?;

        Ok(Self { stats, agent, up })
    }
}

pub fn router(exposition: Arc<Exposition>) -> Router {
    Router::new()
        .route("/metrics", get(stats_metrics))
        .route("/agent/metrics", get(agent_metrics))
        .with_state(exposition)
}

async fn stats_metrics(State(exposition): State<Arc<Exposition>>) -> Response {
    render(&exposition.stats)
}

async fn agent_metrics(State(exposition): State<Arc<Exposition>>) -> Response {
    render(&exposition.agent)
}

fn render(registry: &Registry) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }
    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aixmon_collector::noop::NoopCollector;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn exposition() -> Arc<Exposition> {
        let host = HostMetrics::new(vec![Box::new(NoopCollector)]);
        Arc::new(Exposition::new(host).expect("exposition"))
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, content_type, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn metrics_endpoints_expose_up_gauge() {
        let exposition = exposition();
        exposition.up.set(1);

        let (status, content_type, body) = get_text(router(exposition.clone()), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("# TYPE aix_agent_up gauge"));
        assert!(body.contains("aix_agent_up 1"));

        let (status, _, body) = get_text(router(exposition), "/agent/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("aix_agent_up 1"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (status, _, _) = get_text(router(exposition()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
