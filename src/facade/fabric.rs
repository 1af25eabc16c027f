use super::config::{ConcurrencyMode, FabricConfig};
use crate::connection::ConnectionSource;
use crate::connection::catalog::ConfigLookup;
use crate::connection::pool::ConnectionPool;
use crate::core::{FabricError, Result};
use crate::interface::ConnectionFactory;
use crate::routing::{Address, AddressTemplate, ConnectionRouter, SwitchHook, Topology};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
struct Registration {
    entity: Arc<str>,
    topology: Arc<Topology>,
    template: Arc<AddressTemplate>,
}

/// Registry of entity topologies and the entry point for routers
///
/// Registration happens once per entity type. Routers are handed out per
/// caller and all of them share one connection pool.
///
/// # Examples
///
/// ```ignore
/// let fabric = DataFabric::new(FabricConfig::from_env()?, catalog, driver)?;
/// fabric.register("Order", Topology::new().replicated(true).shard_by("city"))?;
///
/// let shards = ShardContext::with_shards([("city", "dallas")]);
/// let mut orders = fabric.router("Order")?;
/// orders.select(&shards, "SELECT * FROM orders").await?;          // city_dallas_production_slave
/// orders.insert(&shards, "INSERT INTO orders VALUES (1)").await?; // city_dallas_production_master
/// ```
pub struct DataFabric {
    config: FabricConfig,
    source: ConnectionSource,
    environment: Arc<str>,
    registrations: RwLock<HashMap<String, Registration>>,
    hook: Option<SwitchHook>,
}

impl DataFabric {
    /// Create a fabric using the process-wide connection pool
    pub fn new(
        config: FabricConfig,
        configs: Arc<dyn ConfigLookup>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        Self::with_pool(config, Arc::clone(ConnectionPool::global()), configs, factory)
    }

    /// Create a fabric using a specific pool
    pub fn with_pool(
        config: FabricConfig,
        pool: Arc<ConnectionPool>,
        configs: Arc<dyn ConfigLookup>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            environment: Arc::from(config.environment.as_str()),
            config,
            source: ConnectionSource::with_pool(pool, configs, factory),
            registrations: RwLock::new(HashMap::new()),
            hook: None,
        })
    }

    /// Install a hook observing handle switches of every router handed out
    /// afterwards
    pub fn on_switch(mut self, hook: SwitchHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        self.source.pool()
    }

    /// Declare the topology of `entity`
    ///
    /// Fails with `ConcurrencyUnsupported` when the fabric runs in
    /// `ConcurrencyMode::Shared` and the topology carries routing state.
    pub fn register(&self, entity: &str, topology: Topology) -> Result<()> {
        topology.validate()?;

        if self.config.concurrency == ConcurrencyMode::Shared && !topology.is_plain() {
            return Err(FabricError::ConcurrencyUnsupported(format!(
                "entity '{}' uses sharding or replication, which needs one router per task; \
                 shared routers are not supported",
                entity
            )));
        }

        let mut registrations = self.registrations.write()?;
        if registrations.contains_key(entity) {
            return Err(FabricError::AlreadyRegistered(entity.to_string()));
        }

        let template = AddressTemplate::for_topology(&topology);
        registrations.insert(
            entity.to_string(),
            Registration {
                entity: Arc::from(entity),
                topology: Arc::new(topology),
                template: Arc::new(template),
            },
        );

        log::info!("Creating data fabric router for entity {}", entity);
        Ok(())
    }

    fn registration(&self, entity: &str) -> Result<Registration> {
        let registrations = self.registrations.read()?;
        registrations
            .get(entity)
            .cloned()
            .ok_or_else(|| FabricError::UnknownEntity(entity.to_string()))
    }

    /// A fresh router for `entity`, owned by the caller
    pub fn router(&self, entity: &str) -> Result<ConnectionRouter> {
        let registration = self.registration(entity)?;
        let router = ConnectionRouter::from_parts(
            registration.entity,
            registration.topology,
            registration.template,
            Arc::clone(&self.environment),
            self.source.clone(),
        );

        Ok(match &self.hook {
            Some(hook) => router.on_switch(Arc::clone(hook)),
            None => router,
        })
    }

    pub fn topology(&self, entity: &str) -> Result<Topology> {
        Ok(self.registration(entity)?.topology.as_ref().clone())
    }

    /// Registered entity names, sorted
    pub fn entities(&self) -> Result<Vec<String>> {
        let registrations = self.registrations.read()?;
        let mut names: Vec<String> = registrations.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Every address `entity` can resolve to for the given shard values
    pub fn expected_addresses(&self, entity: &str, shard_values: &[String]) -> Result<Vec<Address>> {
        let registration = self.registration(entity)?;
        Ok(registration
            .template
            .enumerate(shard_values, &self.environment))
    }

    /// Addresses of `entity` with no configuration entry
    pub fn missing_backends(&self, entity: &str, shard_values: &[String]) -> Result<Vec<Address>> {
        let configs = self.source.configs();
        Ok(self
            .expected_addresses(entity, shard_values)?
            .into_iter()
            .filter(|address| configs.lookup(address.as_str()).is_none())
            .collect())
    }

    /// Drop every cached handle in the fabric's pool
    pub async fn clear_pool(&self) -> usize {
        self.source.pool().clear().await
    }
}
