//! Runner configuration
//!
//! All remote state lives in SSM Parameter Store under the `iam-saml`
//! prefix; the connector and reader-role names come from the environment.
//! Settings are read once at process start and passed by reference into
//! each component - there is no hidden process-wide state.

use aws_sdk_ssm::Client as SsmClient;
use rolesync_connector::connectors::azure::AzureAdSettings;
use rolesync_core::{IdentityDescriptor, Result, RoleSyncError};
use serde::Deserialize;

pub const PARAMETER_PREFIX: &str = "iam-saml";

const DEFAULT_CONNECTOR: &str = "azure_ad";
const DEFAULT_READER_ROLE: &str = "AWS_IAM_AAD_UpdateTask_CrossAccountRole";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Fingerprint the account-local SAML providers must carry to count.
    pub expected: IdentityDescriptor,
    /// Name of the cross-account reader role assumed in every member account.
    pub reader_role_name: String,
    /// Registry name of the connector that receives the trust map.
    pub connector: String,
    pub azure: AzureAdSettings,
}

#[derive(Debug, Deserialize)]
struct ConnectorSecret {
    #[serde(rename = "AzureUser")]
    azure_user: String,
    #[serde(rename = "AzurePassword")]
    azure_password: String,
}

impl Settings {
    pub async fn load(ssm: &SsmClient) -> Result<Self> {
        let saml_id = get_parameter(ssm, "saml_id", true).await?;
        let saml_entity_id = get_parameter(ssm, "saml_entity_id", true).await?;
        let tenant = get_parameter(ssm, "tenant_name", false).await?;
        let app_object_id = get_parameter(ssm, "app_object_id", false).await?;

        let secret_json = get_parameter(ssm, "secret", true).await?;
        let secret: ConnectorSecret = serde_json::from_str(&secret_json).map_err(|e| {
            RoleSyncError::configuration(format!("connector secret is not valid JSON: {e}"))
        })?;

        Ok(Self {
            expected: IdentityDescriptor::new(saml_id, saml_entity_id),
            reader_role_name: env_or("IAM_READER_ROLE", DEFAULT_READER_ROLE),
            connector: env_or("SAML_CONNECTOR", DEFAULT_CONNECTOR),
            azure: AzureAdSettings {
                tenant,
                app_object_id,
                username: secret.azure_user,
                password: secret.azure_password,
            },
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

async fn get_parameter(ssm: &SsmClient, name: &str, decrypt: bool) -> Result<String> {
    let full_name = format!("{PARAMETER_PREFIX}.{name}");

    let out = ssm
        .get_parameter()
        .name(&full_name)
        .with_decryption(decrypt)
        .send()
        .await
        .map_err(|e| {
            RoleSyncError::configuration(format!(
                "parameter '{full_name}' could not be retrieved: {e}"
            ))
        })?;

    out.parameter()
        .and_then(|p| p.value())
        .map(ToString::to_string)
        .ok_or_else(|| {
            RoleSyncError::configuration(format!("parameter '{full_name}' has no value"))
        })
}
