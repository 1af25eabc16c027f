// ============================================================================
// DataFabric Library
// ============================================================================
//
// Routes each entity type's database operations to the right physical backend
// for the active shard and replication role, sharing one handle per backend
// across the whole process.
//
// - core:       error type, values
// - result:     rows returned by forwarded reads
// - interface:  `Connection` / `ConnectionFactory` traits drivers implement
// - connection: connection config, backend catalog, process-wide pool
// - shard:      shard context and its task-local adapter
// - routing:    topology, address template, router, transactions, reloads
// - facade:     `DataFabric` registry and environment-driven config
//
// ============================================================================

pub mod connection;
pub mod core;
pub mod facade;
pub mod interface;
pub mod result;
pub mod routing;
pub mod shard;

pub use crate::core::{FabricError, Result, Row, Value};
pub use result::QueryResult;

pub use connection::{
    ConnectionSource,
    catalog::{BackendCatalog, ConfigLookup},
    config::ConnectionConfig,
    pool::{Checkout, ConnectionPool, PoolStats},
};
pub use facade::{ConcurrencyMode, DataFabric, FabricConfig};
pub use interface::{Connection, ConnectionFactory, SharedConnection};
pub use routing::{
    Address, AddressTemplate, ConnectionRouter, ConnectionSwitch, MasterScope, Reload, Role,
    RoutedTransaction, SwitchHook, Topology,
};
pub use shard::ShardContext;

/// Process-wide connection pool shared by every router built without an
/// explicit pool
///
/// # Examples
///
/// ```ignore
/// let dropped = datafabric::global_pool().clear().await;
/// ```
pub fn global_pool() -> &'static std::sync::Arc<ConnectionPool> {
    ConnectionPool::global()
}
