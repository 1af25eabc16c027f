use super::address::Address;
use super::role::Role;
use super::router::MasterScope;
use crate::core::Result;
use crate::interface::SharedConnection;
use crate::result::QueryResult;
use crate::shard::ShardContext;
use std::sync::Arc;

/// Open transaction on a master handle
///
/// Keeps its router on the master role until it is committed, rolled back
/// or dropped. Dropping it unfinished schedules a rollback on the current
/// tokio runtime, since async cleanup cannot run inside `Drop`.
pub struct RoutedTransaction<'r> {
    scope: MasterScope<'r>,
    connection: SharedConnection,
    finished: bool,
}

impl<'r> RoutedTransaction<'r> {
    pub(crate) fn new(scope: MasterScope<'r>, connection: SharedConnection) -> Self {
        Self {
            scope,
            connection,
            finished: false,
        }
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    pub fn connection_name(&self, shards: &ShardContext) -> Result<Address> {
        self.scope.connection_name(shards)
    }

    pub fn current_role(&self) -> Option<Role> {
        self.scope.current_role()
    }

    pub async fn select(&self, sql: &str) -> Result<QueryResult> {
        self.connection.select(sql).await
    }

    pub async fn insert(&self, sql: &str) -> Result<u64> {
        self.connection.insert(sql).await
    }

    pub async fn update(&self, sql: &str) -> Result<u64> {
        self.connection.update(sql).await
    }

    pub async fn delete(&self, sql: &str) -> Result<u64> {
        self.connection.delete(sql).await
    }

    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.connection.execute(sql).await
    }

    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.connection.commit().await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.connection.rollback().await
    }
}

impl Drop for RoutedTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let described = self.connection.describe();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                log::warn!(
                    "Transaction on {} dropped without commit or rollback; rolling back",
                    described
                );
                let connection = Arc::clone(&self.connection);
                runtime.spawn(async move {
                    if let Err(err) = connection.rollback().await {
                        log::error!("Rollback of abandoned transaction on {} failed: {}", described, err);
                    }
                });
            }
            Err(_) => {
                log::error!(
                    "Transaction on {} dropped outside a tokio runtime; it was not rolled back",
                    described
                );
            }
        }
    }
}
