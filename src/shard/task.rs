//! Task-local shard context for call sites that cannot pass a
//! [`ShardContext`] explicitly.
//!
//! The context lives for the duration of [`scope`] / [`activate_shard`] and
//! is invisible to other tasks. Work handed to `tokio::spawn` starts without
//! one; carry it over with `scope(current(), fut)`.
//!
//! ```ignore
//! shard::task::activate_shard([("city", user.city())], async {
//!     let shards = shard::task::current();
//!     router.select(&shards, "SELECT * FROM orders").await
//! })
//! .await
//! ```

use super::context::ShardContext;
use crate::core::{FabricError, Result};
use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static ACTIVE_SHARDS: RefCell<ShardContext>;
}

/// Run `future` with `context` as the task's shard context
///
/// Whatever the future does to the context is dropped when it completes.
pub async fn scope<F: Future>(context: ShardContext, future: F) -> F::Output {
    ACTIVE_SHARDS.scope(RefCell::new(context), future).await
}

/// Run `future` with `assignments` overlaid on the current context
///
/// Nested calls see the merged mapping; on exit the outer mapping is back
/// exactly as it was.
pub async fn activate_shard<I, K, V, F>(assignments: I, future: F) -> F::Output
where
    I: IntoIterator<Item = (K, V)>,
    K: ToString,
    V: ToString,
    F: Future,
{
    let child = current().overlay(assignments);
    scope(child, future).await
}

/// Snapshot of the task's context; uninitialized outside any scope
pub fn current() -> ShardContext {
    ACTIVE_SHARDS
        .try_with(|context| context.borrow().clone())
        .unwrap_or_default()
}

/// Merge `assignments` into the task's context without a scope
///
/// Must run inside `scope`/`activate_shard`; the change is undone when that
/// scope ends or by `deactivate`.
pub fn activate<I, K, V>(assignments: I) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: ToString,
    V: ToString,
{
    let assignments: Vec<(String, String)> = assignments
        .into_iter()
        .map(|(group, value)| (group.to_string(), value.to_string()))
        .collect();
    let groups = group_list(assignments.iter().map(|(group, _)| group));

    ACTIVE_SHARDS
        .try_with(|context| context.borrow_mut().activate(assignments))
        .map_err(|_| FabricError::NoActiveShard(groups))
}

/// Remove `groups` from the task's context
pub fn deactivate<I, K>(groups: I) -> Result<()>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let groups: Vec<K> = groups.into_iter().collect();
    let requested = group_list(groups.iter());

    ACTIVE_SHARDS
        .try_with(|context| context.borrow_mut().deactivate(groups))
        .map_err(|_| FabricError::NoActiveShard(requested))
}

/// Active shard value for `group` in the task's context
pub fn active_shard(group: &str) -> Result<String> {
    ACTIVE_SHARDS
        .try_with(|context| context.borrow().get(group).map(str::to_string))
        .map_err(|_| FabricError::NoActiveShard(group.to_string()))?
}

fn group_list<I, K>(groups: I) -> String
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    groups
        .into_iter()
        .map(|group| group.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
