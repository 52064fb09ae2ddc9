//! STS helpers: caller identity and cross-account reader credentials

use aws_sdk_sts::Client as StsClient;
use rolesync_core::{Result, RoleSyncError};
use tracing::debug;

/// Session name recorded in CloudTrail for every assumed reader role.
pub const SESSION_NAME: &str = "sso_role_sync";

/// Temporary credentials vested for one member account.
#[derive(Debug, Clone)]
pub struct AssumedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

/// Return the management account id via STS GetCallerIdentity. The
/// management account is never scanned.
pub async fn caller_account_id(client: &StsClient) -> Result<String> {
    let out = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| RoleSyncError::aws_api(format!("STS GetCallerIdentity failed: {e}")))?;

    out.account()
        .map(ToString::to_string)
        .ok_or_else(|| RoleSyncError::aws_api("STS GetCallerIdentity returned no account"))
}

/// Assume the configured reader role in a member account.
///
/// Failure is reported as `AccountUnavailable` so the collector can skip
/// the account and keep the run going.
pub async fn assume_reader_role(
    client: &StsClient,
    account_id: &str,
    role_name: &str,
) -> Result<AssumedCredentials> {
    let role_arn = format!("arn:aws:iam::{account_id}:role/{role_name}");
    debug!(role_arn = %role_arn, "assuming reader role");

    let resp = client
        .assume_role()
        .role_arn(&role_arn)
        .role_session_name(SESSION_NAME)
        .send()
        .await
        .map_err(|e| {
            RoleSyncError::account_unavailable(
                account_id,
                format!("AssumeRole failed for {role_arn}: {e}"),
            )
        })?;

    let creds = resp.credentials().ok_or_else(|| {
        RoleSyncError::account_unavailable(account_id, "STS AssumeRole returned no credentials")
    })?;

    Ok(AssumedCredentials {
        access_key_id: creds.access_key_id().to_string(),
        secret_access_key: creds.secret_access_key().to_string(),
        session_token: creds.session_token().to_string(),
    })
}
