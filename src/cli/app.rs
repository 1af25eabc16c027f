use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use datafabric::connection::catalog::BackendCatalog;
use datafabric::routing::{AddressTemplate, Role, Topology};
use datafabric::shard::ShardContext;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "datafabric")]
#[command(about = "Inspect how entity topologies resolve to backend names")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the backend name for one shard and role
    Resolve {
        #[command(flatten)]
        topology: TopologyArgs,
        /// Active shard value for the topology's shard group
        #[arg(long)]
        shard: Option<String>,
        #[arg(long, value_enum, default_value_t = RoleArg::Slave)]
        role: RoleArg,
    },
    /// List every backend name a topology can resolve to
    Names {
        #[command(flatten)]
        topology: TopologyArgs,
        /// Comma-separated shard values
        #[arg(long, value_delimiter = ',')]
        shards: Vec<String>,
        /// JSON backend catalog to check the names against
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TopologyArgs {
    #[arg(long, env = "DATA_FABRIC_ENV", default_value = "development")]
    env: String,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    shard_by: Option<String>,
    #[arg(long)]
    replicated: bool,
}

impl TopologyArgs {
    fn topology(&self) -> Result<Topology> {
        let mut topology = Topology::new().replicated(self.replicated);
        if let Some(prefix) = &self.prefix {
            topology = topology.with_prefix(prefix);
        }
        if let Some(group) = &self.shard_by {
            topology = topology.shard_by(group);
        }
        topology.validate().context("invalid topology")?;
        Ok(topology)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Master,
    Slave,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Master => Role::Master,
            RoleArg::Slave => Role::Slave,
        }
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Resolve {
                topology,
                shard,
                role,
            } => resolve(&topology, shard.as_deref(), role.into()),
            Command::Names {
                topology,
                shards,
                catalog,
            } => names(&topology, &shards, catalog.as_deref()),
        }
    }
}

fn resolve(args: &TopologyArgs, shard: Option<&str>, role: Role) -> Result<()> {
    let topology = args.topology()?;

    let mut shards = ShardContext::new();
    if let (Some(group), Some(value)) = (topology.shard_group(), shard) {
        shards.activate([(group, value)]);
    }

    let address = datafabric::routing::resolve(&topology, &shards, role, &args.env)
        .context("failed to resolve backend name")?;
    println!("{}", address);
    Ok(())
}

fn names(args: &TopologyArgs, shards: &[String], catalog: Option<&std::path::Path>) -> Result<()> {
    let topology = args.topology()?;
    if topology.shard_group().is_some() && shards.is_empty() {
        bail!("--shards is required for a sharded topology");
    }

    let addresses = AddressTemplate::for_topology(&topology).enumerate(shards, &args.env);

    let Some(path) = catalog else {
        for address in &addresses {
            println!("{}", address);
        }
        return Ok(());
    };

    let catalog = BackendCatalog::from_path(path)
        .with_context(|| format!("failed to load catalog {}", path.display()))?;

    let mut missing = 0;
    for address in &addresses {
        if catalog.contains(address.as_str()) {
            println!("  ok       {}", address);
        } else {
            missing += 1;
            println!("  missing  {}", address);
        }
    }

    tracing::debug!(checked = addresses.len(), missing, "catalog check finished");
    if missing > 0 {
        bail!("{} of {} backend names missing from {}", missing, addresses.len(), path.display());
    }
    Ok(())
}
