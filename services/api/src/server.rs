use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingOutbox};
use crate::routes::with_form_routes;
use applicant_forms::config::AppConfig;
use applicant_forms::error::AppError;
use applicant_forms::forms::{FormIntakeService, PreviewRegistry, PreviewResources};
use applicant_forms::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let previews: Arc<dyn PreviewResources> = Arc::new(PreviewRegistry::new());
    let outbox = Arc::new(LoggingOutbox::default());
    let intake_service = Arc::new(FormIntakeService::new(
        config.intake.clone(),
        previews,
        outbox,
    ));

    let app = with_form_routes(intake_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        validation_mode = ?config.intake.validation_mode,
        "applicant form service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
