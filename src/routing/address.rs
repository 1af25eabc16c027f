use super::role::Role;
use super::topology::Topology;
use crate::core::Result;
use crate::shard::ShardContext;
use std::borrow::Borrow;
use std::fmt;

/// Separator between address segments
pub const DELIMITER: &str = "_";

/// Resolved name of one physical backend
///
/// Format: `[prefix_][shardGroup_shardValue_]environment[_role]`. Doubles as
/// the pool key and the configuration lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Address {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Current value of the named shard group
    ActiveShard(String),
    Environment,
    Role,
}

/// Ordered address segments for one topology
///
/// Built once per registration and rendered on every resolution, so the
/// address always reflects the live shard context and role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTemplate {
    segments: Vec<Segment>,
}

impl AddressTemplate {
    pub fn for_topology(topology: &Topology) -> Self {
        let mut segments = Vec::with_capacity(5);

        if let Some(prefix) = topology.prefix() {
            segments.push(Segment::Literal(prefix.to_string()));
        }
        if let Some(group) = topology.shard_group() {
            segments.push(Segment::Literal(group.to_string()));
            segments.push(Segment::ActiveShard(group.to_string()));
        }
        segments.push(Segment::Environment);
        if topology.is_replicated() {
            segments.push(Segment::Role);
        }

        Self { segments }
    }

    /// Render against the live context
    ///
    /// Fails with `NoActiveShard`/`ShardNotActive` when the topology's shard
    /// group has no value. `role` is ignored for non-replicated topologies.
    pub fn render(&self, shards: &ShardContext, role: Role, environment: &str) -> Result<Address> {
        let mut parts = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            let part = match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::ActiveShard(group) => shards.get(group)?,
                Segment::Environment => environment,
                Segment::Role => role.as_str(),
            };
            parts.push(part);
        }

        Ok(Address(parts.join(DELIMITER)))
    }

    /// Whether rendering depends on the role
    pub fn has_role(&self) -> bool {
        self.segments.contains(&Segment::Role)
    }

    /// Shard group read during rendering, if any
    pub fn shard_group(&self) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::ActiveShard(group) => Some(group.as_str()),
            _ => None,
        })
    }

    /// Every address this template can render to for the given shard values
    ///
    /// `shard_values` is ignored for unsharded topologies. Handy for checking
    /// a configuration catalog before deploying.
    pub fn enumerate(&self, shard_values: &[String], environment: &str) -> Vec<Address> {
        let contexts: Vec<ShardContext> = match self.shard_group() {
            Some(group) => shard_values
                .iter()
                .map(|value| ShardContext::with_shards([(group, value)]))
                .collect(),
            None => vec![ShardContext::new()],
        };
        let roles: &[Role] = if self.has_role() {
            &[Role::Master, Role::Slave]
        } else {
            &[Role::Slave]
        };

        let mut addresses = Vec::with_capacity(contexts.len() * roles.len());
        for context in &contexts {
            for role in roles {
                if let Ok(address) = self.render(context, *role, environment) {
                    addresses.push(address);
                }
            }
        }
        addresses
    }
}

/// One-shot resolution of `topology` against the live context
///
/// ```
/// use datafabric::{Role, ShardContext, Topology, routing::resolve};
///
/// let topology = Topology::new().replicated(true).shard_by("city").with_prefix("acme");
/// let shards = ShardContext::with_shards([("city", "dallas")]);
///
/// let address = resolve(&topology, &shards, Role::Master, "production").unwrap();
/// assert_eq!(address, "acme_city_dallas_production_master");
/// ```
pub fn resolve(
    topology: &Topology,
    shards: &ShardContext,
    role: Role,
    environment: &str,
) -> Result<Address> {
    AddressTemplate::for_topology(topology).render(shards, role, environment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FabricError;

    fn enchilada() -> Topology {
        Topology::new()
            .replicated(true)
            .shard_by("city")
            .with_prefix("acme")
    }

    #[test]
    fn test_plain_topology_is_environment() {
        let topology = Topology::new();

        for shards in [
            ShardContext::new(),
            ShardContext::with_shards([("city", "dallas")]),
        ] {
            for role in [Role::Master, Role::Slave] {
                assert_eq!(resolve(&topology, &shards, role, "test").unwrap(), "test");
            }
        }
    }

    #[test]
    fn test_prefix_only() {
        let topology = Topology::new().with_prefix("prefix");
        let address = resolve(&topology, &ShardContext::new(), Role::Slave, "test").unwrap();
        assert_eq!(address, "prefix_test");
    }

    #[test]
    fn test_replicated_only() {
        let topology = Topology::new().replicated(true);
        let shards = ShardContext::new();

        assert_eq!(resolve(&topology, &shards, Role::Master, "production").unwrap(), "production_master");
        assert_eq!(resolve(&topology, &shards, Role::Slave, "production").unwrap(), "production_slave");
    }

    #[test]
    fn test_sharded_requires_active_shard() {
        let topology = Topology::new().shard_by("city");

        let err = resolve(&topology, &ShardContext::new(), Role::Slave, "test").unwrap_err();
        assert!(matches!(err, FabricError::NoActiveShard(group) if group == "city"));

        let other = ShardContext::with_shards([("category", "art")]);
        let err = resolve(&topology, &other, Role::Slave, "test").unwrap_err();
        assert!(matches!(err, FabricError::ShardNotActive(group) if group == "city"));

        let austin = ShardContext::with_shards([("city", "austin"), ("category", "art")]);
        assert_eq!(resolve(&topology, &austin, Role::Slave, "test").unwrap(), "city_austin_test");
    }

    #[test]
    fn test_full_topology() {
        let shards = ShardContext::with_shards([("city", "dallas")]);

        assert_eq!(
            resolve(&enchilada(), &shards, Role::Slave, "test").unwrap(),
            "acme_city_dallas_test_slave"
        );
        assert_eq!(
            resolve(&enchilada(), &shards, Role::Master, "test").unwrap(),
            "acme_city_dallas_test_master"
        );
    }

    #[test]
    fn test_template_introspection() {
        let template = AddressTemplate::for_topology(&enchilada());
        assert!(template.has_role());
        assert_eq!(template.shard_group(), Some("city"));

        let plain = AddressTemplate::for_topology(&Topology::new());
        assert!(!plain.has_role());
        assert_eq!(plain.shard_group(), None);
    }

    #[test]
    fn test_enumerate() {
        let template = AddressTemplate::for_topology(&enchilada());
        let shards = vec!["austin".to_string(), "dallas".to_string()];

        let names: Vec<String> = template
            .enumerate(&shards, "production")
            .into_iter()
            .map(Address::into_string)
            .collect();

        assert_eq!(
            names,
            vec![
                "acme_city_austin_production_master",
                "acme_city_austin_production_slave",
                "acme_city_dallas_production_master",
                "acme_city_dallas_production_slave",
            ]
        );

        let plain = AddressTemplate::for_topology(&Topology::new());
        assert_eq!(plain.enumerate(&shards, "production"), vec![Address::from("production")]);
    }
}
