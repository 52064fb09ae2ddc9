//! Run-to-completion reconciliation handler and response envelope

use serde::Serialize;
use tracing::{error, info, instrument};

use rolesync_aws::Collector;
use rolesync_connector::ConnectorRegistry;
use rolesync_core::Result;

use crate::config::Settings;

/// Structured result returned to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseBody {
    pub message: String,
}

pub fn make_response(status_code: u16, message: impl Into<String>) -> Response {
    Response {
        status_code,
        body: ResponseBody {
            message: message.into(),
        },
    }
}

/// Entry point for one reconciliation run. The event payload is opaque; it
/// is logged and otherwise ignored.
#[instrument(skip_all)]
pub async fn handle(
    event: serde_json::Value,
    settings: &Settings,
    collector: &Collector,
    registry: &ConnectorRegistry,
) -> Response {
    info!(event = %event, "starting role reconciliation run");

    match run(settings, collector, registry).await {
        Ok(()) => make_response(200, "OK"),
        Err(e) => {
            error!("reconciliation run failed: {e}");
            make_response(500, e.to_string())
        }
    }
}

async fn run(
    settings: &Settings,
    collector: &Collector,
    registry: &ConnectorRegistry,
) -> Result<()> {
    // Resolve the connector up front so a misconfigured name fails before
    // any account is scanned.
    let connector = registry.get(&settings.connector)?;

    let (trust, discovery) = collector.collect().await?;
    info!(
        accounts_scanned = discovery.accounts_scanned,
        accounts_skipped = discovery.accounts_skipped,
        providers_matched = discovery.providers_matched,
        roles_discovered = discovery.roles_discovered,
        "discovery complete"
    );

    let summary = connector.sync_roles(&trust).await?;
    info!(
        created = summary.created,
        preserved = summary.preserved,
        disabled = summary.disabled,
        "catalogue converged"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_envelope_shape() {
        let response = make_response(200, "OK");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"]["message"], "OK");
    }

    #[test]
    fn test_error_response_carries_message() {
        let response = make_response(500, "Configuration error: parameter missing");
        assert_eq!(response.status_code, 500);
        assert!(response.body.message.contains("parameter missing"));
    }
}
