//! Domain model for SAML trust discovery and app-role reconciliation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, RoleSyncError};

/// Reserved sentinel app role required for SSO bootstrap. It is carried
/// through every catalogue unchanged and never created, diffed, or removed.
pub const MSIAM_ACCESS: &str = "msiam_access";

/// Fingerprint of a SAML metadata document's root element.
///
/// Two descriptors are equal iff both the `ID` and `entityID` attributes
/// match exactly, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDescriptor {
    pub id: String,
    pub entity_id: String,
}

impl IdentityDescriptor {
    pub fn new(id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
        }
    }
}

/// A SAML provider registered in one member account, with its metadata
/// document fetched on demand. Never cached across runs.
#[derive(Debug, Clone)]
pub struct FederationProvider {
    pub arn: String,
    pub metadata_xml: String,
}

/// A role whose trust policy federates through exactly one matched provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRole {
    pub role_arn: String,
    pub provider_arn: String,
}

/// Mapping from provider ARN to the role ARNs trusting it, aggregated across
/// all member accounts. Insertion order is discovery order and is preserved
/// so that repeated runs with unchanged input build identical catalogues.
#[derive(Debug, Clone, Default)]
pub struct TrustMap {
    entries: Vec<(String, Vec<String>)>,
}

impl TrustMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a role under a provider, creating the provider entry on first
    /// sight.
    pub fn insert(&mut self, provider_arn: &str, role_arn: impl Into<String>) {
        match self.entries.iter_mut().find(|(p, _)| p == provider_arn) {
            Some((_, roles)) => roles.push(role_arn.into()),
            None => self
                .entries
                .push((provider_arn.to_string(), vec![role_arn.into()])),
        }
    }

    /// Merge another map into this one: key union, per-key concatenation,
    /// per-account discovery order preserved.
    pub fn merge(&mut self, other: TrustMap) {
        for (provider_arn, role_arns) in other.entries {
            for role_arn in role_arns {
                self.insert(&provider_arn, role_arn);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(p, roles)| (p.as_str(), roles.as_slice()))
    }

    pub fn provider_count(&self) -> usize {
        self.entries.len()
    }

    pub fn role_count(&self) -> usize {
        self.entries.iter().map(|(_, roles)| roles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An assignable app role in the identity provider's application manifest,
/// in Microsoft Graph wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRole {
    pub allowed_member_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub display_name: String,
    pub id: Uuid,
    pub is_enabled: bool,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl AppRole {
    pub fn is_sentinel(&self) -> bool {
        self.display_name == MSIAM_ACCESS
    }
}

/// Split a role ARN like `arn:aws:iam::111111111111:role/Admin` into its
/// account id and role name. The name keeps everything after the first `/`,
/// so role paths stay part of the name.
pub fn parse_role_arn(role_arn: &str) -> Result<(&str, &str)> {
    let malformed = || RoleSyncError::internal(format!("malformed role ARN: {role_arn}"));

    let rest = role_arn.strip_prefix("arn:aws:iam::").ok_or_else(malformed)?;
    let (account_id, resource) = rest.split_once(':').ok_or_else(malformed)?;
    let (_, role_name) = resource.split_once('/').ok_or_else(malformed)?;
    if account_id.is_empty() || role_name.is_empty() {
        return Err(malformed());
    }
    Ok((account_id, role_name))
}
