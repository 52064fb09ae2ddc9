//! Azure AD / Entra ID connector
//!
//! Converges the SSO application's `appRoles` collection through the
//! Microsoft Graph beta applications endpoint. Authentication uses the
//! resource-owner password grant with the well-known first-party client id,
//! acquired once per run.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

use rolesync_core::{AppRole, Result, RoleSyncError, TrustMap};

use crate::reconcile;
use crate::{RoleConnector, SyncSummary};

const GRAPH_URL: &str = "https://graph.microsoft.com";

/// First-party client id accepted by the password grant.
const CLIENT_ID: &str = "1950a258-227b-4e31-a9cf-717495945fc2";

#[derive(Debug, Clone)]
pub struct AzureAdSettings {
    pub tenant: String,
    pub app_object_id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct AzureAdConnector {
    settings: AzureAdSettings,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationResponse {
    #[serde(default)]
    app_roles: Vec<AppRole>,
}

impl AzureAdConnector {
    pub fn new(settings: AzureAdSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RoleSyncError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { settings, http })
    }

    fn app_url(&self) -> String {
        format!(
            "{GRAPH_URL}/beta/{}/applications/{}",
            self.settings.tenant, self.settings.app_object_id
        )
    }

    /// Obtain a Graph bearer token through the password grant.
    async fn authenticate(&self) -> Result<String> {
        let token_url = format!(
            "https://login.microsoftonline.com/{}/oauth2/token",
            self.settings.tenant
        );
        let params = [
            ("resource", GRAPH_URL),
            ("client_id", CLIENT_ID),
            ("grant_type", "password"),
            ("username", self.settings.username.as_str()),
            ("password", self.settings.password.as_str()),
            ("scope", "openid"),
        ];

        let response = self
            .http
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| RoleSyncError::remote_auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (code, description) = parse_graph_error(&body)
                .unwrap_or_else(|| (status.to_string(), body.clone()));
            return Err(RoleSyncError::remote_auth(format!("{code}: {description}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RoleSyncError::remote_auth(format!("invalid token response: {e}")))?;

        Ok(token.access_token)
    }

    /// Read the application's current app-role catalogue.
    async fn fetch_app_roles(&self, token: &str) -> Result<Vec<AppRole>> {
        let response = self
            .http
            .get(self.app_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RoleSyncError::remote_apply("request_failed", e.to_string()))?;

        if !response.status().is_success() {
            return Err(apply_error(response).await);
        }

        let application: ApplicationResponse = response.json().await.map_err(|e| {
            RoleSyncError::internal(format!("failed to parse application response: {e}"))
        })?;

        Ok(application.app_roles)
    }

    /// Full-catalogue replacement. The applications resource has no partial
    /// update semantics for `appRoles`.
    async fn replace_app_roles(&self, token: &str, roles: &[AppRole]) -> Result<()> {
        let payload = serde_json::json!({ "appRoles": roles });
        debug!(roles = roles.len(), "patching application role catalogue");

        let response = self
            .http
            .patch(self.app_url())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RoleSyncError::remote_apply("request_failed", e.to_string()))?;

        if !response.status().is_success() {
            return Err(apply_error(response).await);
        }

        Ok(())
    }
}

#[async_trait]
impl RoleConnector for AzureAdConnector {
    fn name(&self) -> &'static str {
        "azure_ad"
    }

    #[instrument(skip(self, trust))]
    async fn sync_roles(&self, trust: &TrustMap) -> Result<SyncSummary> {
        let token = self.authenticate().await?;
        let existing = self.fetch_app_roles(&token).await?;
        info!(existing = existing.len(), "fetched current application role catalogue");

        let desired = reconcile::build_desired(trust, &existing)?;
        let plan = reconcile::plan(desired, &existing);

        // The two writes are strictly sequential; the prune depends on the
        // disable having committed.
        self.replace_app_roles(&token, &plan.converge).await?;
        match &plan.prune {
            Some(prune) => {
                info!(disabled = plan.disabled, "excluding disabled roles from catalogue");
                self.replace_app_roles(&token, prune).await?;
            }
            None => info!("there are no roles to disable"),
        }

        Ok(SyncSummary {
            created: plan.created,
            preserved: plan.preserved,
            disabled: plan.disabled,
        })
    }
}

/// Extract a Graph error code/description pair. Token endpoint errors are
/// flat `{error, error_description}` strings; Graph resource errors nest an
/// object under `error`.
fn parse_graph_error(body: &str) -> Option<(String, String)> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        serde_json::Value::String(code) => {
            let description = value
                .get("error_description")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Some((code.clone(), description.to_string()))
        }
        serde_json::Value::Object(inner) => {
            let code = inner.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
            let message = inner.get("message").and_then(|v| v.as_str()).unwrap_or_default();
            Some((code.to_string(), message.to_string()))
        }
        _ => None,
    }
}

async fn apply_error(response: reqwest::Response) -> RoleSyncError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (code, description) =
        parse_graph_error(&body).unwrap_or_else(|| (status.to_string(), body.clone()));
    RoleSyncError::remote_apply(code, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_token_error() {
        let body = r#"{"error":"invalid_grant","error_description":"AADSTS50126: Invalid username or password."}"#;
        let (code, description) = parse_graph_error(body).unwrap();
        assert_eq!(code, "invalid_grant");
        assert!(description.starts_with("AADSTS50126"));
    }

    #[test]
    fn test_parse_nested_graph_error() {
        let body = r#"{"error":{"code":"Request_BadRequest","message":"Property appRoles is invalid."}}"#;
        let (code, description) = parse_graph_error(body).unwrap();
        assert_eq!(code, "Request_BadRequest");
        assert_eq!(description, "Property appRoles is invalid.");
    }

    #[test]
    fn test_parse_error_falls_through_on_non_json() {
        assert!(parse_graph_error("<html>throttled</html>").is_none());
    }

    #[test]
    fn test_app_url_targets_beta_applications_endpoint() {
        let connector = AzureAdConnector::new(AzureAdSettings {
            tenant: "contoso.onmicrosoft.com".to_string(),
            app_object_id: "0000-1111".to_string(),
            username: "svc@contoso.com".to_string(),
            password: "secret".to_string(),
        })
        .unwrap();

        assert_eq!(
            connector.app_url(),
            "https://graph.microsoft.com/beta/contoso.onmicrosoft.com/applications/0000-1111"
        );
    }
}
