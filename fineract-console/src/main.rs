use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use fineract_console::config::get_configuration;
use fineract_console::services::metrics::{init_metrics, FineractCallMetrics};
use fineract_console::startup::build_router;
use fineract_console::AppState;
use service_core::fineract::FineractClient;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("fineract-console", &configuration.telemetry);

    init_metrics().map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    let fineract = FineractClient::new(configuration.fineract.clone())
        .map_err(|e| anyhow::anyhow!("Failed to build Fineract client: {}", e))?
        .with_observer(Arc::new(FineractCallMetrics));
    let state = AppState::new(fineract, create_ip_rate_limiter(configuration.login_rate_limit));

    let app = build_router(state, &configuration.server);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting fineract-console on {}", address);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
