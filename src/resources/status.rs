//! # Estado y Métricas
//! src/resources/status.rs

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::http::{Request, Response};
use crate::metrics::MetricsCollector;
use crate::router::{HandlerResult, Resource, Route};

/// Expone el store de métricas del servidor como JSON
pub struct StatusResource {
    metrics: Arc<MetricsCollector>,
    started: Instant,
}

impl StatusResource {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self {
            metrics,
            started: Instant::now(),
        }
    }

    /// Handler para /status
    ///
    /// ```json
    /// {"status": "running", "version": "0.1.0", "uptime_seconds": 12, ...}
    /// ```
    fn status(&self, _req: &Request) -> HandlerResult {
        let body = json!({
            "status": "running",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": self.started.elapsed().as_secs(),
            "success": self.metrics.success_count(),
            "failure": self.metrics.failure_count(),
        });
        Ok(Response::json(&body.to_string()))
    }

    /// Handler para /metrics: snapshot completo del store
    fn metrics(&self, _req: &Request) -> HandlerResult {
        Ok(Response::json(&self.metrics.snapshot().to_json()))
    }
}

impl Resource for StatusResource {
    fn routes(&self) -> Vec<Route<Self>> {
        vec![
            Route::get("/status", StatusResource::status),
            Route::get("/metrics", StatusResource::metrics),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;

    #[test]
    fn test_status_reports_counters() {
        let metrics = Arc::new(MetricsCollector::new());
        metrics.record_success();
        metrics.record_failure();
        metrics.record_failure();

        let resource = StatusResource::new(Arc::clone(&metrics));
        let request = Request::parse(b"GET /status HTTP/1.0\r\n\r\n").unwrap();
        let response = resource.status(&request).unwrap();

        assert_eq!(response.status(), StatusCode::Ok);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "running");
        assert_eq!(body["success"], 1);
        assert_eq!(body["failure"], 2);
    }

    #[test]
    fn test_metrics_snapshot_json() {
        let metrics = Arc::new(MetricsCollector::new());
        metrics.record_post(Some(10));
        metrics.record_post(Some(30));

        let resource = StatusResource::new(Arc::clone(&metrics));
        let request = Request::parse(b"GET /metrics HTTP/1.0\r\n\r\n").unwrap();
        let response = resource.metrics(&request).unwrap();

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["post_requests"], 2);
        assert_eq!(body["full_average_post_size"], 20.0);
        assert_eq!(body["post_size_samples"], 2);
    }
}
