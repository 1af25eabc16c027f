use crate::core::{FabricError, Result};
use std::collections::HashMap;

type Shards = HashMap<String, String>;

/// Mapping from shard group to the active shard value
///
/// Starts uninitialized; the first activation (or deactivation) initializes
/// it. Reading from an uninitialized context fails with `NoActiveShard`,
/// reading a group that is not set fails with `ShardNotActive`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardContext {
    shards: Option<Shards>,
}

impl ShardContext {
    /// Uninitialized context
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialized context holding `assignments`
    pub fn with_shards<I, K, V>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let mut context = Self::new();
        context.activate(assignments);
        context
    }

    pub fn is_initialized(&self) -> bool {
        self.shards.is_some()
    }

    fn ensure_setup(&mut self) -> &mut Shards {
        self.shards.get_or_insert_with(HashMap::new)
    }

    /// Merge `assignments` into the live mapping
    ///
    /// Groups not listed keep their value. Nothing is restored afterwards;
    /// pair with `deactivate` or prefer `scoped`.
    pub fn activate<I, K, V>(&mut self, assignments: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let shards = self.ensure_setup();
        for (group, value) in assignments {
            shards.insert(group.to_string(), value.to_string());
        }
    }

    /// Run `scope` with `assignments` overlaid, then restore the whole prior
    /// mapping
    ///
    /// Restoration happens on every exit path, unwinding included. Changes
    /// made inside the scope (nested `activate`, `deactivate`) are discarded
    /// with it.
    pub fn scoped<I, K, V, F, R>(&mut self, assignments: I, scope: F) -> R
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
        F: FnOnce(&mut ShardContext) -> R,
    {
        self.ensure_setup();
        let mut guard = RestoreGuard {
            snapshot: self.shards.clone(),
            context: self,
        };
        guard.context.activate(assignments);
        scope(&mut *guard.context)
    }

    /// Copy of this context with `assignments` overlaid
    ///
    /// The async counterpart of `scoped`: hand the child to the work and the
    /// parent is left exactly as it was.
    pub fn overlay<I, K, V>(&self, assignments: I) -> ShardContext
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let mut child = self.clone();
        child.activate(assignments);
        child
    }

    /// Remove `groups` from the live mapping
    ///
    /// Unconditional: no earlier value comes back. Calling this inside a
    /// `scoped` block only affects that block.
    pub fn deactivate<I, K>(&mut self, groups: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let shards = self.ensure_setup();
        for group in groups {
            shards.remove(group.as_ref());
        }
    }

    /// Active shard value for `group`
    pub fn get(&self, group: &str) -> Result<&str> {
        let shards = self
            .shards
            .as_ref()
            .ok_or_else(|| FabricError::NoActiveShard(group.to_string()))?;
        shards
            .get(group)
            .map(String::as_str)
            .ok_or_else(|| FabricError::ShardNotActive(group.to_string()))
    }

    /// Active `(group, value)` pairs sorted by group
    pub fn active(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .shards
            .iter()
            .flat_map(|shards| shards.iter())
            .map(|(group, value)| (group.as_str(), value.as_str()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Forget everything, back to uninitialized
    pub fn reset(&mut self) {
        self.shards = None;
    }
}

struct RestoreGuard<'a> {
    context: &'a mut ShardContext,
    snapshot: Option<Shards>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.context.shards = self.snapshot.take();
    }
}
