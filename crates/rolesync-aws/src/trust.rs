//! Trust policy scanning for singular SAML federation statements

use aws_sdk_iam::Client as IamClient;
use rolesync_core::{Result, RoleSyncError, TrustMap};
use serde::Deserialize;
use tracing::{debug, warn};

pub const ASSUME_ROLE_WITH_SAML: &str = "sts:AssumeRoleWithSAML";

/// A role listing with its trust policy document, already URL-decoded.
#[derive(Debug, Clone)]
pub struct RoleListing {
    pub arn: String,
    pub trust_policy: String,
}

#[derive(Debug, Deserialize)]
struct TrustPolicy {
    #[serde(rename = "Statement")]
    statement: Option<Statements>,
}

// IAM serializes a single statement either as an object or a one-element
// array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Statements {
    Many(Vec<Statement>),
    One(Statement),
}

#[derive(Debug, Deserialize)]
struct Statement {
    #[serde(rename = "Action")]
    action: Option<serde_json::Value>,
    #[serde(rename = "Principal")]
    principal: Option<Principal>,
}

#[derive(Debug, Deserialize)]
struct Principal {
    #[serde(rename = "Federated")]
    federated: Option<String>,
}

impl TrustPolicy {
    fn statements(&self) -> &[Statement] {
        match &self.statement {
            Some(Statements::Many(list)) => list,
            Some(Statements::One(single)) => std::slice::from_ref(single),
            None => &[],
        }
    }
}

impl Statement {
    fn is_saml_federation(&self) -> bool {
        self.action
            .as_ref()
            .and_then(|a| a.as_str())
            .map(|a| a == ASSUME_ROLE_WITH_SAML)
            .unwrap_or(false)
    }
}

/// List the account's IAM roles that carry a trust policy document.
pub async fn list_roles(iam: &IamClient) -> Result<Vec<RoleListing>> {
    let mut listings = Vec::new();
    let mut pages = iam.list_roles().into_paginator().send();

    while let Some(page) = pages.next().await {
        let page =
            page.map_err(|e| RoleSyncError::aws_api(format!("IAM ListRoles failed: {e}")))?;

        for role in page.roles() {
            let Some(document) = role.assume_role_policy_document() else {
                continue;
            };
            // IAM returns the policy document URL-encoded.
            let decoded = urlencoding::decode(document).map_err(|e| {
                RoleSyncError::aws_api(format!(
                    "could not decode trust policy for {}: {e}",
                    role.arn()
                ))
            })?;

            listings.push(RoleListing {
                arn: role.arn().to_string(),
                trust_policy: decoded.into_owned(),
            });
        }
    }

    Ok(listings)
}

/// Group roles by the provider they trust for SAML federation.
///
/// A role qualifies iff its trust policy has exactly one statement whose
/// action is `sts:AssumeRoleWithSAML` and that statement's federated
/// principal is one of the matched providers. Zero qualifying statements is
/// the normal case; two or more is ambiguous trust and the role is excluded
/// without error.
pub fn scan_trusted_roles(roles: &[RoleListing], provider_arns: &[String]) -> TrustMap {
    let mut map = TrustMap::new();

    for role in roles {
        let policy: TrustPolicy = match serde_json::from_str(&role.trust_policy) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(role = %role.arn, "could not parse trust policy, excluding role: {e}");
                continue;
            }
        };

        let saml_statements: Vec<&Statement> = policy
            .statements()
            .iter()
            .filter(|s| s.is_saml_federation())
            .collect();

        if saml_statements.len() != 1 {
            if saml_statements.len() > 1 {
                debug!(role = %role.arn, "ambiguous SAML trust, excluding role");
            }
            continue;
        }

        let Some(federated) = saml_statements[0]
            .principal
            .as_ref()
            .and_then(|p| p.federated.as_deref())
        else {
            continue;
        };

        if provider_arns.iter().any(|arn| arn == federated) {
            map.insert(federated, role.arn.clone());
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(arn: &str, policy: serde_json::Value) -> RoleListing {
        RoleListing {
            arn: arn.to_string(),
            trust_policy: policy.to_string(),
        }
    }

    fn saml_statement(provider_arn: &str) -> serde_json::Value {
        serde_json::json!({
            "Effect": "Allow",
            "Action": "sts:AssumeRoleWithSAML",
            "Principal": { "Federated": provider_arn },
            "Condition": { "StringEquals": { "SAML:aud": "https://signin.aws.amazon.com/saml" } }
        })
    }

    const P1: &str = "arn:aws:iam::111111111111:saml-provider/aad";

    #[test]
    fn test_singular_saml_trust_qualifies() {
        let roles = vec![listing(
            "arn:aws:iam::111111111111:role/Admin",
            serde_json::json!({ "Version": "2012-10-17", "Statement": [saml_statement(P1)] }),
        )];

        let map = scan_trusted_roles(&roles, &[P1.to_string()]);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, P1);
        assert_eq!(entries[0].1, &["arn:aws:iam::111111111111:role/Admin".to_string()]);
    }

    #[test]
    fn test_single_statement_object_form_qualifies() {
        let roles = vec![listing(
            "arn:aws:iam::111111111111:role/Admin",
            serde_json::json!({ "Version": "2012-10-17", "Statement": saml_statement(P1) }),
        )];

        assert_eq!(scan_trusted_roles(&roles, &[P1.to_string()]).role_count(), 1);
    }

    #[test]
    fn test_role_without_saml_statement_is_excluded() {
        let roles = vec![listing(
            "arn:aws:iam::111111111111:role/Service",
            serde_json::json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "sts:AssumeRole",
                    "Principal": { "Service": "ec2.amazonaws.com" }
                }]
            }),
        )];

        assert!(scan_trusted_roles(&roles, &[P1.to_string()]).is_empty());
    }

    #[test]
    fn test_multiple_saml_statements_are_ambiguous_and_excluded() {
        let roles = vec![listing(
            "arn:aws:iam::111111111111:role/Ambiguous",
            serde_json::json!({ "Statement": [saml_statement(P1), saml_statement(P1)] }),
        )];

        assert!(scan_trusted_roles(&roles, &[P1.to_string()]).is_empty());
    }

    #[test]
    fn test_unmatched_provider_is_excluded() {
        let other = "arn:aws:iam::111111111111:saml-provider/okta";
        let roles = vec![listing(
            "arn:aws:iam::111111111111:role/Admin",
            serde_json::json!({ "Statement": [saml_statement(other)] }),
        )];

        assert!(scan_trusted_roles(&roles, &[P1.to_string()]).is_empty());
    }

    #[test]
    fn test_unparseable_policy_is_excluded() {
        let roles = vec![RoleListing {
            arn: "arn:aws:iam::111111111111:role/Broken".to_string(),
            trust_policy: "{not json".to_string(),
        }];

        assert!(scan_trusted_roles(&roles, &[P1.to_string()]).is_empty());
    }

    #[test]
    fn test_grouping_preserves_discovery_order() {
        let p2 = "arn:aws:iam::111111111111:saml-provider/aad2";
        let roles = vec![
            listing(
                "arn:aws:iam::111111111111:role/B",
                serde_json::json!({ "Statement": [saml_statement(p2)] }),
            ),
            listing(
                "arn:aws:iam::111111111111:role/A",
                serde_json::json!({ "Statement": [saml_statement(P1)] }),
            ),
            listing(
                "arn:aws:iam::111111111111:role/C",
                serde_json::json!({ "Statement": [saml_statement(p2)] }),
            ),
        ];

        let map = scan_trusted_roles(&roles, &[P1.to_string(), p2.to_string()]);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries[0].0, p2);
        assert_eq!(entries[0].1.len(), 2);
        assert_eq!(entries[1].0, P1);
    }
}
