use super::catalog::ConfigLookup;
use crate::core::{FabricError, Result};
use crate::interface::{ConnectionFactory, SharedConnection};
use crate::routing::Address;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, OnceCell};

// Global singleton instance of ConnectionPool
lazy_static! {
    static ref GLOBAL_POOL: Arc<ConnectionPool> = Arc::new(ConnectionPool::new());
}

type Slot = Arc<OnceCell<SharedConnection>>;

/// Process-wide cache of live handles keyed by resolved address
///
/// Each address owns a slot that is filled at most once, so concurrent
/// resolvers of one address share a single establishment while different
/// addresses connect independently.
pub struct ConnectionPool {
    /// Address -> handle slot
    slots: Mutex<HashMap<Address, Slot>>,
    /// Bumped on every clear
    generation: AtomicU64,
    /// Total number of handles ever established
    established: AtomicUsize,
}

/// Result of a pool lookup
pub struct Checkout {
    pub connection: SharedConnection,
    /// True when this call established the handle
    pub created: bool,
    /// Pool generation the handle belongs to
    pub generation: u64,
}

impl ConnectionPool {
    /// Create an empty, isolated pool
    ///
    /// Useful for testing to ensure tests don't interfere with each other.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            established: AtomicUsize::new(0),
        }
    }

    /// Get the global ConnectionPool instance
    ///
    /// Shared by every router in the process.
    pub fn global() -> &'static Arc<ConnectionPool> {
        &GLOBAL_POOL
    }

    /// Return the live handle for `address`, establishing it on first use
    pub async fn get_or_create(
        &self,
        address: &Address,
        configs: &dyn ConfigLookup,
        factory: &dyn ConnectionFactory,
    ) -> Result<Checkout> {
        let (slot, generation) = {
            let mut slots = self.slots.lock().await;
            let slot = slots
                .entry(address.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            (Arc::clone(slot), self.generation.load(Ordering::SeqCst))
        };

        let created = AtomicBool::new(false);
        let created_flag = &created;
        let established = &self.established;

        let initialized = slot
            .get_or_try_init(move || async move {
                let config = configs.lookup(address.as_str()).ok_or_else(|| {
                    FabricError::UnknownBackend {
                        address: address.to_string(),
                        known: configs.known_names(),
                    }
                })?;

                let timeout = config.connect_timeout;
                let connection = tokio::time::timeout(timeout, factory.connect(&config))
                    .await
                    .map_err(|_| FabricError::ConnectTimeout {
                        address: address.to_string(),
                        timeout,
                    })??;

                created_flag.store(true, Ordering::SeqCst);
                established.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FabricError>(connection)
            })
            .await;

        let connection = match initialized {
            Ok(connection) => connection,
            Err(err) => {
                self.discard_empty(address, &slot).await;
                return Err(err);
            }
        };

        let created = created.load(Ordering::SeqCst);
        if created {
            self.reattach(address, &slot, generation).await;
        }

        Ok(Checkout {
            connection: Arc::clone(connection),
            created,
            generation,
        })
    }

    /// Forget `slot` if establishing it failed and nobody has filled it since
    async fn discard_empty(&self, address: &Address, slot: &Slot) {
        let mut slots = self.slots.lock().await;
        let stale = slots
            .get(address)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(address);
        }
    }

    /// Put `slot` back if an earlier failure on the same address removed it
    /// while this establishment was still running
    async fn reattach(&self, address: &Address, slot: &Slot, generation: u64) {
        let mut slots = self.slots.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        slots
            .entry(address.clone())
            .or_insert_with(|| Arc::clone(slot));
    }

    /// Number of addresses holding a slot, filled or not
    pub async fn slot_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Whether a live handle is cached for `address`
    pub async fn contains(&self, address: &Address) -> bool {
        let slots = self.slots.lock().await;
        slots.get(address).is_some_and(|slot| slot.initialized())
    }

    /// Drop every cached handle
    ///
    /// No disconnect hook runs: handles still referenced elsewhere stay
    /// alive until their last owner lets go. Returns the number of handles
    /// dropped from the cache.
    pub async fn clear(&self) -> usize {
        let mut slots = self.slots.lock().await;
        let dropped = slots.values().filter(|slot| slot.initialized()).count();
        slots.clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        log::info!(
            "Cleared connection pool: {} handle(s) dropped, generation {}",
            dropped,
            generation
        );
        dropped
    }

    /// Current generation; changes whenever the pool is cleared
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Get pool statistics
    ///
    /// # Examples
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// let pool = datafabric::ConnectionPool::new();
    /// let stats = pool.stats().await;
    /// assert_eq!(stats.cached_connections, 0);
    /// assert_eq!(stats.generation, 0);
    /// # });
    /// ```
    pub async fn stats(&self) -> PoolStats {
        let slots = self.slots.lock().await;

        PoolStats {
            cached_connections: slots.values().filter(|slot| slot.initialized()).count(),
            established_total: self.established.load(Ordering::SeqCst),
            generation: self.generation.load(Ordering::SeqCst),
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection pool statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub cached_connections: usize,
    pub established_total: usize,
    pub generation: u64,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {} cached, {} established, generation {}",
            self.cached_connections, self.established_total, self.generation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::catalog::BackendCatalog;
    use crate::connection::config::ConnectionConfig;
    use crate::interface::Connection;
    use crate::result::QueryResult;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubConnection {
        name: String,
    }

    #[async_trait]
    impl Connection for StubConnection {
        async fn select(&self, _sql: &str) -> Result<QueryResult> {
            Ok(QueryResult::empty())
        }
        async fn insert(&self, _sql: &str) -> Result<u64> {
            Ok(1)
        }
        async fn update(&self, _sql: &str) -> Result<u64> {
            Ok(1)
        }
        async fn delete(&self, _sql: &str) -> Result<u64> {
            Ok(1)
        }
        async fn execute(&self, _sql: &str) -> Result<QueryResult> {
            Ok(QueryResult::empty())
        }
        async fn begin(&self) -> Result<()> {
            Ok(())
        }
        async fn commit(&self) -> Result<()> {
            Ok(())
        }
        async fn rollback(&self) -> Result<()> {
            Ok(())
        }
        async fn columns(&self, _table: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn table_exists(&self, _table: &str) -> Result<bool> {
            Ok(false)
        }
        async fn verify(&self) -> Result<()> {
            Ok(())
        }
        fn describe(&self) -> String {
            self.name.clone()
        }
    }

    struct StubFactory {
        delay: Duration,
        connects: AtomicUsize,
    }

    impl StubFactory {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                connects: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConnectionFactory for StubFactory {
        async fn connect(&self, config: &ConnectionConfig) -> Result<SharedConnection> {
            tokio::time::sleep(self.delay).await;
            let n = self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubConnection {
                name: format!("{}#{}", config.database, n),
            }))
        }
    }

    fn catalog() -> BackendCatalog {
        BackendCatalog::new()
            .with("test", ConnectionConfig::new("stub", "test"))
            .with(
                "slow_test",
                ConnectionConfig::new("stub", "slow").connect_timeout(Duration::from_millis(20)),
            )
    }

    fn address(name: &str) -> Address {
        Address::from(name)
    }

    #[tokio::test]
    async fn test_reuses_live_handle() {
        let pool = ConnectionPool::new();
        let factory = StubFactory::new(Duration::ZERO);
        let catalog = catalog();

        let first = pool.get_or_create(&address("test"), &catalog, &factory).await.unwrap();
        let second = pool.get_or_create(&address("test"), &catalog, &factory).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.connection, &second.connection));
        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let pool = ConnectionPool::new();
        let factory = StubFactory::new(Duration::ZERO);

        let err = pool
            .get_or_create(&address("city_austin_test"), &catalog(), &factory)
            .await
            .err()
            .unwrap();

        match err {
            FabricError::UnknownBackend { address, known } => {
                assert_eq!(address, "city_austin_test");
                assert_eq!(known, vec!["slow_test", "test"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!pool.contains(&Address::from("city_austin_test")).await);
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_no_slots() {
        let pool = ConnectionPool::new();
        let factory = StubFactory::new(Duration::ZERO);
        let catalog = catalog();

        for city in ["austin", "houston", "el_paso", "austin"] {
            let result = pool
                .get_or_create(&address(&format!("city_{}_test", city)), &catalog, &factory)
                .await;
            assert!(matches!(result, Err(FabricError::UnknownBackend { .. })));
        }
        assert_eq!(pool.slot_count().await, 0);

        pool.get_or_create(&address("test"), &catalog, &factory).await.unwrap();
        assert_eq!(pool.slot_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let pool = ConnectionPool::new();
        let factory = StubFactory::new(Duration::from_millis(500));

        let err = pool
            .get_or_create(&address("slow_test"), &catalog(), &factory)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, FabricError::ConnectTimeout { .. }));
        assert_eq!(pool.stats().await.cached_connections, 0);
        assert_eq!(pool.slot_count().await, 0);
    }

    #[tokio::test]
    async fn test_clear_forces_new_handle() {
        let pool = ConnectionPool::new();
        let factory = StubFactory::new(Duration::ZERO);
        let catalog = catalog();

        let before = pool.get_or_create(&address("test"), &catalog, &factory).await.unwrap();
        assert_eq!(pool.clear().await, 1);
        let after = pool.get_or_create(&address("test"), &catalog, &factory).await.unwrap();

        assert!(after.created);
        assert!(!Arc::ptr_eq(&before.connection, &after.connection));
        assert_eq!(after.generation, before.generation + 1);
        assert_eq!(pool.stats().await.established_total, 2);
    }
}
