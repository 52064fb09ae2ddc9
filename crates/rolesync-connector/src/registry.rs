//! Connector registry - selects a concrete connector by configured name

use std::collections::HashMap;
use std::sync::Arc;

use rolesync_core::{Result, RoleSyncError};
use tracing::info;

use crate::RoleConnector;

/// Registry of available connectors, keyed by their stable names.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<&'static str, Arc<dyn RoleConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: Arc<dyn RoleConnector>) {
        info!(connector = connector.name(), "registering SAML connector");
        self.connectors.insert(connector.name(), connector);
    }

    /// Look up a connector by name. An unknown name is a configuration
    /// error, not a fallback.
    pub fn get(&self, name: &str) -> Result<Arc<dyn RoleConnector>> {
        self.connectors.get(name).cloned().ok_or_else(|| {
            RoleSyncError::configuration(format!("unknown SAML connector: {name}"))
        })
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }
}
