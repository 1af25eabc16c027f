use crate::core::{FabricError, Result};

/// Static shard/replication/prefix declaration of one entity type
///
/// Fixed at registration. A topology with none of the three set routes
/// every operation to the backend named after the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    replicated: bool,
    shard_group: Option<String>,
    prefix: Option<String>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use master/slave replication
    pub fn replicated(mut self, replicated: bool) -> Self {
        self.replicated = replicated;
        self
    }

    /// Partition by the shard group `group`, e.g. `city`
    pub fn shard_by(mut self, group: &str) -> Self {
        self.shard_group = Some(group.to_string());
        self
    }

    /// Prepend `prefix` to every address
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    pub fn shard_group(&self) -> Option<&str> {
        self.shard_group.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Neither sharded nor replicated
    pub fn is_plain(&self) -> bool {
        !self.replicated && self.shard_group.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.shard_group.as_deref().is_some_and(str::is_empty) {
            return Err(FabricError::ConfigError("shard group cannot be empty".into()));
        }
        if self.prefix.as_deref().is_some_and(str::is_empty) {
            return Err(FabricError::ConfigError("prefix cannot be empty".into()));
        }
        Ok(())
    }
}
