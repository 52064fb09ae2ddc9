//! Organization membership enumeration

use aws_sdk_organizations::Client as OrganizationsClient;
use rolesync_core::{Result, RoleSyncError};

/// List all member account ids, excluding the management account. The list
/// is fetched once per run and treated as immutable for its duration.
pub async fn list_member_accounts(
    client: &OrganizationsClient,
    management_account_id: &str,
) -> Result<Vec<String>> {
    let mut accounts = Vec::new();
    let mut pages = client.list_accounts().into_paginator().send();

    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| {
            RoleSyncError::aws_api(format!("Organizations ListAccounts failed: {e}"))
        })?;

        for account in page.accounts() {
            if let Some(id) = account.id() {
                if id != management_account_id {
                    accounts.push(id.to_string());
                }
            }
        }
    }

    Ok(accounts)
}
