use crate::infra::AppState;
use assessment_scoring::rubric::{scoring_router, ReportStore, ScoringService, TemplateStore};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_scoring_routes<T, R>(service: Arc<ScoringService<T, R>>) -> axum::Router
where
    T: TemplateStore + 'static,
    R: ReportStore + 'static,
{
    scoring_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::builtin_templates;
    use crate::infra::{template_store, InMemoryReportStore, InMemoryTemplateStore};
    use assessment_scoring::rubric::EvaluationPolicy;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> (axum::Router, InMemoryReportStore) {
        let reports = InMemoryReportStore::default();
        let service = ScoringService::new(
            Arc::new(template_store(builtin_templates()).expect("store seeds")),
            Arc::new(reports.clone()),
            EvaluationPolicy::default(),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_scoring_routes::<InMemoryTemplateStore, InMemoryReportStore>(
            Arc::new(service),
        )
        .layer(Extension(state));
        (router, reports)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_reflects_startup_state() {
        let (router, _) = app(false);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "initializing");

        let (router, _) = app(true);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_metrics_respond() {
        let (router, _) = app(true);
        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(json_body(response).await["status"], "ok");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn evaluations_are_served_alongside_health_checks() {
        let (router, reports) = app(true);
        let body = json!({
            "responseSet": {
                "id": "team-ops-q2",
                "templateId": "culture-pulse",
                "axisScores": {
                    "psychological_safety": {"raw": 72.5},
                    "collaboration": {"raw": 81.0},
                    "recognition": {"raw": 55.0},
                    "autonomy": {"raw": 90.0}
                },
                "assertedFlags": ["retaliation_reported"]
            }
        });
        let response = router
            .oneshot(
                Request::post("/api/v1/evaluations")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).expect("encode")))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["report"]["compositeScore"], 75.5);
        assert_eq!(payload["report"]["band"], "healthy");
        assert_eq!(payload["report"]["hasCritical"], true);
        assert_eq!(reports.len(), 1);
    }
}
