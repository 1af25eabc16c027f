use super::config::ConnectionConfig;
use crate::core::{FabricError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Maps a resolved address to backend parameters.
pub trait ConfigLookup: Send + Sync {
    fn lookup(&self, address: &str) -> Option<ConnectionConfig>;

    /// Every configured name, used to make `UnknownBackend` diagnosable.
    fn known_names(&self) -> Vec<String>;
}

/// In-memory catalog of named backends
///
/// Names follow the address contract, e.g.
///
/// ```json
/// {
///   "acme_city_dallas_production_master": { "adapter": "postgres", "database": "dallas" },
///   "acme_city_dallas_production_slave":  { "adapter": "postgres", "host": "replica-1", "database": "dallas" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendCatalog {
    entries: BTreeMap<String, ConnectionConfig>,
}

impl BackendCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry (builder style)
    pub fn with(mut self, name: &str, config: ConnectionConfig) -> Self {
        self.insert(name, config);
        self
    }

    pub fn insert(&mut self, name: &str, config: ConnectionConfig) -> Option<ConnectionConfig> {
        self.entries.insert(name.to_string(), config)
    }

    pub fn remove(&mut self, name: &str) -> Option<ConnectionConfig> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionConfig> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object of `name -> parameters` and validate every entry
    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            FabricError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, config) in &self.entries {
            config
                .validate()
                .map_err(|e| FabricError::ConfigError(format!("{}: {}", name, e)))?;
        }
        Ok(())
    }
}

impl ConfigLookup for BackendCatalog {
    fn lookup(&self, address: &str) -> Option<ConnectionConfig> {
        self.entries.get(address).cloned()
    }

    fn known_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
