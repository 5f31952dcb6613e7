use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCreditStore, InMemoryLedger, SimulatedGateway};
use crate::routes::with_credit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use coop_credit::config::AppConfig;
use coop_credit::error::AppError;
use coop_credit::telemetry;
use coop_credit::workflows::pay_later::PayLaterService;
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

    let ledger = Arc::new(InMemoryLedger::default());
    let store = Arc::new(InMemoryCreditStore::default());
    let gateway = Arc::new(SimulatedGateway::default());
    let credit_service = Arc::new(PayLaterService::new(ledger, store, gateway));

    let app = with_credit_routes(credit_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "cooperative credit service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
