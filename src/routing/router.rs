use super::address::{Address, AddressTemplate};
use super::role::Role;
use super::topology::Topology;
use super::transaction::RoutedTransaction;
use crate::connection::ConnectionSource;
use crate::core::Result;
use crate::interface::SharedConnection;
use crate::result::QueryResult;
use crate::shard::ShardContext;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{Level, event};

/// Callback observing every handle switch of a router
pub type SwitchHook = Arc<dyn Fn(&ConnectionSwitch) + Send + Sync>;

/// A router moved to a (possibly different) backend handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSwitch {
    pub entity: String,
    pub from: Option<Address>,
    pub to: Address,
    /// The pool had no handle for `to` and established one
    pub established: bool,
}

struct CachedConnection {
    address: Address,
    connection: SharedConnection,
    generation: u64,
}

#[derive(Default)]
struct RouterState {
    role: Role,
    cached: Option<CachedConnection>,
    role_changed: bool,
}

/// Routes one entity type's operations to the right backend handle
///
/// Holds the role state and the last resolved handle. Every method that
/// touches that state takes `&mut self`, so a router is confined to a single
/// caller at a time; hand each task its own router (see
/// `DataFabric::router`) and let the shared pool deduplicate handles.
///
/// Reads (`select`, `columns`, `table_exists`) run under the current role.
/// Writes (`insert`, `update`, `delete`, `execute`) and `transaction` always
/// run on the master of a replicated topology.
pub struct ConnectionRouter {
    entity: Arc<str>,
    topology: Arc<Topology>,
    template: Arc<AddressTemplate>,
    environment: Arc<str>,
    source: ConnectionSource,
    hook: Option<SwitchHook>,
    state: RouterState,
}

impl ConnectionRouter {
    pub fn new(entity: &str, topology: Topology, environment: &str, source: ConnectionSource) -> Self {
        let template = AddressTemplate::for_topology(&topology);
        Self::from_parts(
            Arc::from(entity),
            Arc::new(topology),
            Arc::new(template),
            Arc::from(environment),
            source,
        )
    }

    pub(crate) fn from_parts(
        entity: Arc<str>,
        topology: Arc<Topology>,
        template: Arc<AddressTemplate>,
        environment: Arc<str>,
        source: ConnectionSource,
    ) -> Self {
        Self {
            entity,
            topology,
            template,
            environment,
            source,
            hook: None,
            state: RouterState::default(),
        }
    }

    /// Observe handle switches
    pub fn on_switch(mut self, hook: SwitchHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Current role; `None` for topologies without replication
    pub fn current_role(&self) -> Option<Role> {
        self.topology.is_replicated().then_some(self.state.role)
    }

    /// Address the next resolution would use
    pub fn connection_name(&self, shards: &ShardContext) -> Result<Address> {
        self.template.render(shards, self.state.role, &self.environment)
    }

    /// Address of the handle currently held, if any
    pub fn cached_address(&self) -> Option<&Address> {
        self.state.cached.as_ref().map(|cached| &cached.address)
    }

    fn set_role(&mut self, role: Role) {
        if self.topology.is_replicated() && self.state.role != role {
            self.state.role = role;
            self.state.role_changed = true;
        }
    }

    /// Switch to the master role until the returned scope is dropped
    ///
    /// The previous role comes back on every exit path: normal return, `?`,
    /// panic or a cancelled future. No-op for non-replicated topologies.
    pub fn master(&mut self) -> MasterScope<'_> {
        MasterScope::enter(self)
    }

    /// Handle for the current shard context and role
    ///
    /// Reuses the held handle unless the address changed, the role changed
    /// since the last resolution, or the pool was cleared in between.
    pub async fn connection(&mut self, shards: &ShardContext) -> Result<SharedConnection> {
        let address = match self.connection_name(shards) {
            Ok(address) => address,
            Err(err) => {
                event!(Level::DEBUG, entity = %self.entity, error = %err, "address resolution failed");
                return Err(err);
            }
        };

        if let Some(connection) = self.reusable(&address) {
            return Ok(connection);
        }

        self.switch_to(address).await
    }

    fn reusable(&self, address: &Address) -> Option<SharedConnection> {
        if self.state.role_changed {
            return None;
        }
        let cached = self.state.cached.as_ref()?;
        let current = cached.address == *address
            && cached.generation == self.source.pool().generation();
        current.then(|| Arc::clone(&cached.connection))
    }

    async fn switch_to(&mut self, address: Address) -> Result<SharedConnection> {
        let checkout = self.source.checkout(&address).await?;
        checkout.connection.verify().await?;

        let from = self.state.cached.take().map(|cached| cached.address);
        event!(
            Level::DEBUG,
            entity = %self.entity,
            from = from.as_ref().map(Address::as_str).unwrap_or("(none)"),
            to = %address,
            established = checkout.created,
            "switching connection"
        );

        if let Some(hook) = &self.hook {
            hook(&ConnectionSwitch {
                entity: self.entity.to_string(),
                from,
                to: address.clone(),
                established: checkout.created,
            });
        }

        self.state.cached = Some(CachedConnection {
            address,
            connection: Arc::clone(&checkout.connection),
            generation: checkout.generation,
        });
        self.state.role_changed = false;

        Ok(checkout.connection)
    }

    /// Forget the held handle; the pool keeps it for other routers
    pub fn release(&mut self) {
        self.state.cached = None;
    }

    /// Check the held handle, if any
    pub async fn verify(&self) -> Result<()> {
        match &self.state.cached {
            Some(cached) => cached.connection.verify().await,
            None => Ok(()),
        }
    }

    pub async fn select(&mut self, shards: &ShardContext, sql: &str) -> Result<QueryResult> {
        let connection = self.connection(shards).await?;
        connection.select(sql).await
    }

    pub async fn columns(&mut self, shards: &ShardContext, table: &str) -> Result<Vec<String>> {
        let connection = self.connection(shards).await?;
        connection.columns(table).await
    }

    pub async fn table_exists(&mut self, shards: &ShardContext, table: &str) -> Result<bool> {
        let connection = self.connection(shards).await?;
        connection.table_exists(table).await
    }

    pub async fn insert(&mut self, shards: &ShardContext, sql: &str) -> Result<u64> {
        let mut master = self.master();
        let connection = master.connection(shards).await?;
        connection.insert(sql).await
    }

    pub async fn update(&mut self, shards: &ShardContext, sql: &str) -> Result<u64> {
        let mut master = self.master();
        let connection = master.connection(shards).await?;
        connection.update(sql).await
    }

    pub async fn delete(&mut self, shards: &ShardContext, sql: &str) -> Result<u64> {
        let mut master = self.master();
        let connection = master.connection(shards).await?;
        connection.delete(sql).await
    }

    /// Raw statement or DDL, always on the master
    pub async fn execute(&mut self, shards: &ShardContext, sql: &str) -> Result<QueryResult> {
        let mut master = self.master();
        let connection = master.connection(shards).await?;
        connection.execute(sql).await
    }

    /// Begin a transaction on the master
    ///
    /// The router stays on the master until the transaction is committed,
    /// rolled back or dropped.
    pub async fn transaction(&mut self, shards: &ShardContext) -> Result<RoutedTransaction<'_>> {
        let mut master = self.master();
        let connection = master.connection(shards).await?;
        connection.begin().await?;
        Ok(RoutedTransaction::new(master, connection))
    }
}

impl fmt::Debug for ConnectionRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRouter")
            .field("entity", &self.entity)
            .field("topology", &self.topology)
            .field("environment", &self.environment)
            .field("role", &self.current_role())
            .field("cached_address", &self.cached_address())
            .finish()
    }
}

/// RAII guard for the master role
///
/// Derefs to the router, so everything done through the scope runs against
/// the master.
pub struct MasterScope<'r> {
    router: &'r mut ConnectionRouter,
    previous: Role,
}

impl<'r> MasterScope<'r> {
    fn enter(router: &'r mut ConnectionRouter) -> Self {
        let previous = router.state.role;
        router.set_role(Role::Master);
        Self { router, previous }
    }
}

impl Deref for MasterScope<'_> {
    type Target = ConnectionRouter;

    fn deref(&self) -> &ConnectionRouter {
        &*self.router
    }
}

impl DerefMut for MasterScope<'_> {
    fn deref_mut(&mut self) -> &mut ConnectionRouter {
        &mut *self.router
    }
}

impl Drop for MasterScope<'_> {
    fn drop(&mut self) {
        self.router.set_role(self.previous);
    }
}
