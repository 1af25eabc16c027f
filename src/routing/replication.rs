use super::router::ConnectionRouter;
use crate::core::Result;
use crate::interface::Connection;
use crate::shard::ShardContext;
use async_trait::async_trait;

/// An entity's "re-read myself from the database" path
///
/// Implementations only read through the handle they are given; the router
/// picks which backend that is.
#[async_trait]
pub trait Reload: Send {
    async fn reload_from(&mut self, connection: &dyn Connection) -> Result<()>;
}

impl ConnectionRouter {
    /// Reload `entity`, always from the master when the topology is
    /// replicated
    ///
    /// A reload is an explicit request for the source of truth, so replica
    /// lag must not leak into it. The ambient role is restored afterwards.
    pub async fn reload<E>(&mut self, shards: &ShardContext, entity: &mut E) -> Result<()>
    where
        E: Reload + ?Sized,
    {
        if !self.topology().is_replicated() {
            let connection = self.connection(shards).await?;
            return entity.reload_from(connection.as_ref()).await;
        }

        let mut master = self.master();
        let connection = master.connection(shards).await?;
        entity.reload_from(connection.as_ref()).await
    }
}
