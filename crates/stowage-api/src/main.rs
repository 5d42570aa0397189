use stowage_api::{setup, telemetry};
use stowage_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    telemetry::init_tracing()?;

    tracing::info!(environment = %config.environment, "Configuration loaded and validated successfully");

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
