use async_trait::async_trait;
use std::sync::Arc;
use crate::connection::config::ConnectionConfig;
use crate::core::Result;
use crate::result::QueryResult;

/// Live handle to one physical backend.
///
/// Every operation a router forwards is listed here. The router decides the
/// replication role before calling into the handle: writes, DDL and
/// transaction control always reach a master-role handle, reads run on
/// whichever role is active.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a read query.
    async fn select(&self, sql: &str) -> Result<QueryResult>;

    /// Insert rows, returning the number of affected rows.
    async fn insert(&self, sql: &str) -> Result<u64>;

    /// Update rows, returning the number of affected rows.
    async fn update(&self, sql: &str) -> Result<u64>;

    /// Delete rows, returning the number of affected rows.
    async fn delete(&self, sql: &str) -> Result<u64>;

    /// Raw statement, including DDL.
    async fn execute(&self, sql: &str) -> Result<QueryResult>;

    async fn begin(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// Column names of `table`.
    async fn columns(&self, table: &str) -> Result<Vec<String>>;

    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Check the handle is still usable.
    async fn verify(&self) -> Result<()>;

    /// Short human-readable identity used in debug output.
    fn describe(&self) -> String;
}

pub type SharedConnection = Arc<dyn Connection>;

/// Establishes handles from backend parameters.
///
/// Implementations wrap a real driver; the pool enforces
/// `ConnectionConfig::connect_timeout` around `connect`.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<SharedConnection>;
}
