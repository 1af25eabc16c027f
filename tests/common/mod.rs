#![allow(dead_code)]

use async_trait::async_trait;
use datafabric::{
    BackendCatalog, Connection, ConnectionConfig, ConnectionFactory, ConnectionPool, DataFabric,
    FabricConfig, FabricError, QueryResult, Result, SharedConnection,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Statement log shared by every handle a `MockFactory` hands out
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Handle that answers every read with the name of its backend
pub struct MockConnection {
    pub backend: String,
    journal: Journal,
}

impl MockConnection {
    fn record(&self, statement: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}: {}", self.backend, statement));
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn select(&self, sql: &str) -> Result<QueryResult> {
        self.record(sql);
        Ok(QueryResult::new(
            vec!["backend".into()],
            vec![vec![self.backend.as_str().into()]],
        ))
    }

    async fn insert(&self, sql: &str) -> Result<u64> {
        self.record(sql);
        Ok(1)
    }

    async fn update(&self, sql: &str) -> Result<u64> {
        self.record(sql);
        Ok(2)
    }

    async fn delete(&self, sql: &str) -> Result<u64> {
        self.record(sql);
        Ok(3)
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.record(sql);
        if sql.starts_with("FAIL") {
            return Err(FabricError::backend(std::io::Error::other("statement rejected")));
        }
        Ok(QueryResult::affected(0))
    }

    async fn begin(&self) -> Result<()> {
        self.record("BEGIN");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.record("COMMIT");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.record("ROLLBACK");
        Ok(())
    }

    async fn columns(&self, _table: &str) -> Result<Vec<String>> {
        Ok(vec!["id".into(), "backend".into()])
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(table == "orders")
    }

    async fn verify(&self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        self.backend.clone()
    }
}

/// Driver stand-in counting establishments per backend
#[derive(Default)]
pub struct MockFactory {
    pub delay: Duration,
    connects: AtomicUsize,
    per_backend: Mutex<HashMap<String, usize>>,
    pub journal: Journal,
}

impl MockFactory {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn connects_to(&self, backend: &str) -> usize {
        self.per_backend
            .lock()
            .unwrap()
            .get(backend)
            .copied()
            .unwrap_or(0)
    }

    pub fn statements(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<SharedConnection> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self
            .per_backend
            .lock()
            .unwrap()
            .entry(config.database.clone())
            .or_default() += 1;

        Ok(Arc::new(MockConnection {
            backend: config.database.clone(),
            journal: Arc::clone(&self.journal),
        }))
    }
}

/// Catalog where every backend's database is named after its address
pub fn catalog(names: &[&str]) -> BackendCatalog {
    names.iter().fold(BackendCatalog::new(), |catalog, name| {
        catalog.with(name, ConnectionConfig::new("mock", name))
    })
}

/// Fabric on an isolated pool
pub fn fabric(environment: &str, names: &[&str], factory: Arc<MockFactory>) -> DataFabric {
    DataFabric::with_pool(
        FabricConfig::new(environment),
        Arc::new(ConnectionPool::new()),
        Arc::new(catalog(names)),
        factory,
    )
    .unwrap()
}

/// The value a mock read reports as its backend
pub fn backend_of(result: &QueryResult) -> String {
    result
        .get(0, "backend")
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}
