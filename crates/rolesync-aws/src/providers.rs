//! SAML provider discovery and metadata matching

use aws_sdk_iam::Client as IamClient;
use rolesync_core::{FederationProvider, IdentityDescriptor, Result, RoleSyncError};
use tracing::{debug, warn};

/// List the account's SAML providers along with their metadata documents.
pub async fn list_saml_providers(iam: &IamClient) -> Result<Vec<FederationProvider>> {
    let listed = iam
        .list_saml_providers()
        .send()
        .await
        .map_err(|e| RoleSyncError::aws_api(format!("IAM ListSAMLProviders failed: {e}")))?;

    let mut providers = Vec::new();
    for entry in listed.saml_provider_list() {
        let Some(arn) = entry.arn() else { continue };

        let detail = iam
            .get_saml_provider()
            .saml_provider_arn(arn)
            .send()
            .await
            .map_err(|e| {
                RoleSyncError::aws_api(format!("IAM GetSAMLProvider failed for {arn}: {e}"))
            })?;

        let metadata = detail.saml_metadata_document().ok_or_else(|| {
            RoleSyncError::metadata_parse(arn, "provider has no metadata document")
        })?;

        providers.push(FederationProvider {
            arn: arn.to_string(),
            metadata_xml: metadata.to_string(),
        });
    }

    Ok(providers)
}

/// Return the ARNs of providers whose metadata root element carries exactly
/// the expected `ID` and `entityID` attributes.
///
/// A metadata document that fails to parse is a hard error for the account's
/// run: a malformed document indicates a broken provider, not an absent one.
pub fn filter_providers(
    providers: &[FederationProvider],
    expected: &IdentityDescriptor,
) -> Result<Vec<String>> {
    let mut matched = Vec::new();

    for provider in providers {
        let doc = roxmltree::Document::parse(&provider.metadata_xml)
            .map_err(|e| RoleSyncError::metadata_parse(&provider.arn, e.to_string()))?;
        let root = doc.root_element();

        let actual = IdentityDescriptor::new(
            root.attribute("ID").unwrap_or_default(),
            root.attribute("entityID").unwrap_or_default(),
        );

        if actual == *expected {
            debug!(provider = %provider.arn, "provider matches expected descriptor");
            matched.push(provider.arn.clone());
        }
    }

    if matched.is_empty() {
        warn!("no SAML provider matched the expected descriptor; no role synchronization will take place for this account");
    }

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str, entity_id: &str) -> String {
        format!(
            r#"<EntityDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata" ID="{id}" entityID="{entity_id}"><IDPSSODescriptor/></EntityDescriptor>"#
        )
    }

    fn provider(arn: &str, xml: String) -> FederationProvider {
        FederationProvider {
            arn: arn.to_string(),
            metadata_xml: xml,
        }
    }

    #[test]
    fn test_matching_provider_is_kept() {
        let expected = IdentityDescriptor::new("_id1", "https://sts.windows.net/t1/");
        let providers = vec![provider(
            "arn:aws:iam::111111111111:saml-provider/aad",
            metadata("_id1", "https://sts.windows.net/t1/"),
        )];

        let matched = filter_providers(&providers, &expected).unwrap();
        assert_eq!(matched, vec!["arn:aws:iam::111111111111:saml-provider/aad"]);
    }

    #[test]
    fn test_partial_descriptor_match_is_excluded() {
        let expected = IdentityDescriptor::new("_id1", "https://sts.windows.net/t1/");

        // ID matches but entityID differs.
        let providers = vec![provider(
            "arn:aws:iam::111111111111:saml-provider/other",
            metadata("_id1", "https://sts.windows.net/t2/"),
        )];
        assert!(filter_providers(&providers, &expected).unwrap().is_empty());

        // entityID matches but ID differs.
        let providers = vec![provider(
            "arn:aws:iam::111111111111:saml-provider/other",
            metadata("_id2", "https://sts.windows.net/t1/"),
        )];
        assert!(filter_providers(&providers, &expected).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_metadata_is_a_hard_error() {
        let expected = IdentityDescriptor::new("_id1", "https://sts.windows.net/t1/");
        let providers = vec![provider(
            "arn:aws:iam::111111111111:saml-provider/broken",
            "<EntityDescriptor".to_string(),
        )];

        let err = filter_providers(&providers, &expected).unwrap_err();
        assert!(matches!(err, RoleSyncError::MetadataParse { .. }));
    }

    #[test]
    fn test_missing_attributes_do_not_match() {
        let expected = IdentityDescriptor::new("_id1", "https://sts.windows.net/t1/");
        let providers = vec![provider(
            "arn:aws:iam::111111111111:saml-provider/bare",
            "<EntityDescriptor/>".to_string(),
        )];

        assert!(filter_providers(&providers, &expected).unwrap().is_empty());
    }
}
