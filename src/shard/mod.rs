// ============================================================================
// Shard Context
// ============================================================================
//
// Which shard each shard group currently points at. The context is a plain
// value passed to routers; `task` layers a tokio task-local on top of it for
// code that cannot thread the value through every call.
//
// ============================================================================

pub mod context;
pub mod task;

pub use context::ShardContext;
