//! Error types for the rolesync platform

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoleSyncError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Account {account_id} unavailable: {message}")]
    AccountUnavailable { account_id: String, message: String },

    #[error("Invalid SAML metadata for provider {provider_arn}: {message}")]
    MetadataParse {
        provider_arn: String,
        message: String,
    },

    #[error("Identity provider authentication failed: {message}")]
    RemoteAuth { message: String },

    #[error("Catalogue write rejected: {code}: {description}")]
    RemoteApply { code: String, description: String },

    #[error("AWS API error: {message}")]
    AwsApi { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RoleSyncError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn account_unavailable(
        account_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AccountUnavailable {
            account_id: account_id.into(),
            message: message.into(),
        }
    }

    pub fn metadata_parse(provider_arn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetadataParse {
            provider_arn: provider_arn.into(),
            message: message.into(),
        }
    }

    pub fn remote_auth(message: impl Into<String>) -> Self {
        Self::RemoteAuth {
            message: message.into(),
        }
    }

    pub fn remote_apply(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::RemoteApply {
            code: code.into(),
            description: description.into(),
        }
    }

    pub fn aws_api(message: impl Into<String>) -> Self {
        Self::AwsApi {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Recoverable errors are absorbed at the collector boundary; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AccountUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, RoleSyncError>;
