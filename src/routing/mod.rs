// ============================================================================
// Connection Routing
// ============================================================================
//
// Topology + shard context + role -> address -> pooled handle.
//
// - address:     address template and the `[prefix_][group_shard_]env[_role]` contract
// - router:      per-entity role state, handle caching, operation classification
// - transaction: master-pinned transaction guard
// - replication: forced-master reloads
//
// ============================================================================

pub mod address;
pub mod replication;
pub mod role;
pub mod router;
pub mod topology;
pub mod transaction;

pub use address::{Address, AddressTemplate, resolve};
pub use replication::Reload;
pub use role::Role;
pub use router::{ConnectionRouter, ConnectionSwitch, MasterScope, SwitchHook};
pub use topology::Topology;
pub use transaction::RoutedTransaction;
