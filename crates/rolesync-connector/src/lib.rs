//! Rolesync Connector - Identity-provider connectors for trusted-role sync
//!
//! A connector has one capability: converge the identity provider's
//! application-role catalogue to a freshly discovered trust map. Concrete
//! connectors are selected by name through the `ConnectorRegistry`.

pub mod connectors;
pub mod reconcile;
pub mod registry;


use async_trait::async_trait;
use rolesync_core::{Result, TrustMap};

pub use connectors::azure::AzureAdConnector;
pub use registry::ConnectorRegistry;

/// Pushes a discovered trust map into one identity provider's
/// application-role catalogue.
#[async_trait]
pub trait RoleConnector: Send + Sync + std::fmt::Debug {
    /// Stable name used for registry selection.
    fn name(&self) -> &'static str;

    /// Converge the provider's catalogue to the trust map. Runs to
    /// completion; performs no internal retries.
    async fn sync_roles(&self, trust: &TrustMap) -> Result<SyncSummary>;
}

/// Mutation counts from one converged catalogue write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub preserved: usize,
    pub disabled: usize,
}
