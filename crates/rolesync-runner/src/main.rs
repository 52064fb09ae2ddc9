//! rolesync - reconciles SAML-trusted IAM roles across the organization
//! into the identity provider's application-role catalogue.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod handler;

use aws_config::BehaviorVersion;
use config::Settings;
use rolesync_aws::Collector;
use rolesync_connector::{AzureAdConnector, ConnectorRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting rolesync v{}", env!("CARGO_PKG_VERSION"));

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let ssm = aws_sdk_ssm::Client::new(&aws_config);

    let settings = Settings::load(&ssm)
        .await
        .context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let collector = Collector::new(
        &aws_config,
        settings.expected.clone(),
        settings.reader_role_name.clone(),
    );

    let mut registry = ConnectorRegistry::new();
    registry.register(Arc::new(AzureAdConnector::new(settings.azure.clone())?));

    // Invoked on a schedule; the event carries no data the run depends on.
    let event = serde_json::json!({ "source": "schedule" });
    let response = handler::handle(event, &settings, &collector, &registry).await;

    info!(
        status = response.status_code,
        "run finished: {}", response.body.message
    );

    if response.status_code != 200 {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rolesync=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}
