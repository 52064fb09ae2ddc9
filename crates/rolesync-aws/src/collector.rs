//! Cross-account collection of SAML-trusted roles

use aws_config::SdkConfig;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_organizations::Client as OrganizationsClient;
use aws_sdk_sts::Client as StsClient;
use rolesync_core::{IdentityDescriptor, Result, RoleSyncError, TrustMap};
use tracing::{info, instrument, warn};

use crate::sts::AssumedCredentials;
use crate::{orgs, providers, sts, trust};

/// Discovers SAML-trusted roles across every member account and aggregates
/// them into one trust map.
pub struct Collector {
    sts: StsClient,
    orgs: OrganizationsClient,
    base_config: SdkConfig,
    expected: IdentityDescriptor,
    reader_role_name: String,
}

/// Counts reported at the end of the discovery phase.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySummary {
    pub accounts_scanned: usize,
    pub accounts_skipped: usize,
    pub providers_matched: usize,
    pub roles_discovered: usize,
}

impl Collector {
    pub fn new(
        base_config: &SdkConfig,
        expected: IdentityDescriptor,
        reader_role_name: impl Into<String>,
    ) -> Self {
        Self {
            sts: StsClient::new(base_config),
            orgs: OrganizationsClient::new(base_config),
            base_config: base_config.clone(),
            expected,
            reader_role_name: reader_role_name.into(),
        }
    }

    /// Scan every member account and aggregate the discovered trust
    /// mappings. An unreachable account is logged and skipped; partial
    /// coverage is preferable to a failed run.
    #[instrument(skip(self))]
    pub async fn collect(&self) -> Result<(TrustMap, DiscoverySummary)> {
        let management_account = sts::caller_account_id(&self.sts).await?;
        let accounts = orgs::list_member_accounts(&self.orgs, &management_account).await?;
        info!(accounts = accounts.len(), "enumerated member accounts");

        let mut aggregate = TrustMap::new();
        let mut summary = DiscoverySummary::default();

        for account_id in &accounts {
            match self.scan_account(account_id).await {
                Ok((map, matched)) => {
                    summary.accounts_scanned += 1;
                    summary.providers_matched += matched;
                    summary.roles_discovered += map.role_count();
                    aggregate.merge(map);
                }
                Err(e @ RoleSyncError::AccountUnavailable { .. }) => {
                    warn!(account = %account_id, "skipping account: {e}");
                    summary.accounts_skipped += 1;
                }
                Err(other) => return Err(other),
            }
        }

        Ok((aggregate, summary))
    }

    /// Discover trusted roles in one account. Returns the account's trust
    /// map and the number of providers that matched the descriptor.
    async fn scan_account(&self, account_id: &str) -> Result<(TrustMap, usize)> {
        let creds = sts::assume_reader_role(&self.sts, account_id, &self.reader_role_name).await?;
        let iam = self.iam_client_for(&creds);

        let saml_providers = providers::list_saml_providers(&iam).await?;
        let matched = providers::filter_providers(&saml_providers, &self.expected)?;
        if matched.is_empty() {
            return Ok((TrustMap::new(), 0));
        }

        let roles = trust::list_roles(&iam).await?;
        let map = trust::scan_trusted_roles(&roles, &matched);
        info!(
            account = %account_id,
            providers = matched.len(),
            roles = map.role_count(),
            "scanned account"
        );

        Ok((map, matched.len()))
    }

    fn iam_client_for(&self, creds: &AssumedCredentials) -> IamClient {
        let credentials = aws_sdk_iam::config::Credentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            Some(creds.session_token.clone()),
            None,
            "rolesync-reader",
        );
        let config = aws_sdk_iam::config::Builder::from(&self.base_config)
            .credentials_provider(credentials)
            .build();
        IamClient::from_conf(config)
    }
}
