use address_risk_monitor::{
    config::Settings,
    models::{default_alert_rules, ModelRegistry},
    services::{AlertDispatcher, BlockchainService, MonitoringService, NeutralFeatureProvider, RiskScorer},
    utils::logging::init_tracing,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;
    info!("Starting Address Risk Monitor");

    let chain = Arc::new(BlockchainService::new(&settings.blockchain)?);
    let scorer = Arc::new(RiskScorer::new(
        settings.scoring.clone(),
        ModelRegistry::default_models(),
        Arc::new(NeutralFeatureProvider),
    ));
    let dispatcher = AlertDispatcher::from_settings(&settings.alerts)?;

    let monitor = Arc::new(MonitoringService::new(
        settings.monitor.clone(),
        chain,
        scorer,
        dispatcher,
        default_alert_rules(),
    )?);
    monitor.start()?;
    info!(
        sweep_interval_seconds = settings.monitor.sweep_interval_seconds,
        "Address Risk Monitor started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    if let Err(e) = monitor.stop() {
        error!("Failed to stop monitor: {}", e);
    }

    let stats = monitor.stats().await;
    info!(
        sweeps = stats.sweeps_completed,
        addresses_checked = stats.addresses_checked,
        alerts_fired = stats.alerts_fired,
        "Shutting down Address Risk Monitor"
    );
    Ok(())
}
