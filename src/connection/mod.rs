pub mod catalog;
pub mod config;
pub mod pool;

use crate::core::Result;
use crate::interface::ConnectionFactory;
use crate::routing::Address;
use catalog::ConfigLookup;
use pool::{Checkout, ConnectionPool};
use std::sync::Arc;

/// Everything a router needs to turn an address into a live handle
///
/// Cheap to clone; all routers built from one source share its pool.
#[derive(Clone)]
pub struct ConnectionSource {
    pool: Arc<ConnectionPool>,
    configs: Arc<dyn ConfigLookup>,
    factory: Arc<dyn ConnectionFactory>,
}

impl ConnectionSource {
    /// Source backed by the process-wide pool
    pub fn new(configs: Arc<dyn ConfigLookup>, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self::with_pool(Arc::clone(ConnectionPool::global()), configs, factory)
    }

    /// Source backed by a specific pool
    pub fn with_pool(
        pool: Arc<ConnectionPool>,
        configs: Arc<dyn ConfigLookup>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Self {
        Self {
            pool,
            configs,
            factory,
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn configs(&self) -> &Arc<dyn ConfigLookup> {
        &self.configs
    }

    /// Fetch or establish the handle for `address`
    pub async fn checkout(&self, address: &Address) -> Result<Checkout> {
        self.pool
            .get_or_create(address, self.configs.as_ref(), self.factory.as_ref())
            .await
    }
}
