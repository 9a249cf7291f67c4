use anyhow::Context;
use igloo_connector::{Connector, ConnectorSession};
use igloo_coordinator::{Coordinator, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let settings = Settings::new().context("failed to load coordinator settings")?;
    let coordinator = Coordinator::bootstrap(&settings).context("failed to start coordinator")?;

    for id in coordinator.connectors().connector_ids() {
        let connector = coordinator.connectors().get(&id)?;
        info!(catalog = %id, kind = ?connector.kind(), "catalog");
    }

    let session = ConnectorSession::new("bootstrap", "igloo");
    for table in coordinator.system_tables() {
        let records = table.records(&session)?;
        info!(
            table = %table.name(),
            distribution = ?table.distribution(),
            rows = records.num_rows(),
            "system table"
        );
    }

    Ok(())
}
