use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_exposure_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use sst_exposure::config::AppConfig;
use sst_exposure::error::AppError;
use sst_exposure::telemetry;
use sst_exposure::workflows::exposure::{ExposureService, HttpFunctionSource};
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
    if let Some(base_url) = args.backend_url.take() {
        config.backend.base_url = base_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let source = HttpFunctionSource::new(&config.backend)?;
    let backend = source.base_url().to_string();
    let service = Arc::new(ExposureService::new(
        Arc::new(source),
        config.backend.resolver_settings(),
    ));

    let app = with_exposure_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %backend, "exposure aggregation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
