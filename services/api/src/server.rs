use crate::cli::ServeArgs;
use crate::infra::{load_templates, template_store, AppState, InMemoryReportStore};
use crate::routes::with_scoring_routes;
use assessment_scoring::config::AppConfig;
use assessment_scoring::error::AppError;
use assessment_scoring::rubric::ScoringService;
use assessment_scoring::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let templates = template_store(load_templates(args.templates.as_deref(), &config.engine)?)?;
    let policy = config.engine.policy();
    info!(
        templates = templates.ids().len(),
        incomplete = policy.incomplete.label(),
        unknown_codes = policy.unknown_codes.label(),
        "template store seeded"
    );

    let scoring_service = Arc::new(ScoringService::new(
        Arc::new(templates),
        Arc::new(InMemoryReportStore::default()),
        policy,
    ));

    let app = with_scoring_routes(scoring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "assessment scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
