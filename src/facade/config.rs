use crate::core::{FabricError, Result};

/// Whether routers may be shared between concurrently running tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Every caller works with its own router (the default)
    #[default]
    Confined,
    /// The host shares one router across tasks. Only topologies without
    /// sharding or replication can be routed this way, since those have no
    /// per-call routing state.
    Shared,
}

impl ConcurrencyMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "confined" => Ok(Self::Confined),
            "shared" => Ok(Self::Shared),
            other => Err(FabricError::ConfigError(format!(
                "unknown concurrency mode '{}', expected 'confined' or 'shared'",
                other
            ))),
        }
    }
}

/// Process-level routing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricConfig {
    /// Environment segment of every address, e.g. `production`
    pub environment: String,

    /// How routers are shared
    pub concurrency: ConcurrencyMode,
}

impl FabricConfig {
    /// Primary environment variable naming the environment
    pub const ENV_VAR: &'static str = "DATA_FABRIC_ENV";
    /// Fallback environment variable
    pub const FALLBACK_ENV_VAR: &'static str = "RUST_ENV";
    /// Concurrency mode variable (`confined` | `shared`)
    pub const CONCURRENCY_VAR: &'static str = "DATA_FABRIC_CONCURRENCY";
    pub const DEFAULT_ENVIRONMENT: &'static str = "development";

    pub fn new(environment: &str) -> Self {
        Self {
            environment: environment.to_string(),
            concurrency: ConcurrencyMode::default(),
        }
    }

    /// Set the environment
    pub fn environment(mut self, environment: &str) -> Self {
        self.environment = environment.to_string();
        self
    }

    /// Set the concurrency mode
    pub fn concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(Self::ENV_VAR)
            .or_else(|| lookup(Self::FALLBACK_ENV_VAR))
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_ENVIRONMENT.to_string());

        let concurrency = match lookup(Self::CONCURRENCY_VAR) {
            Some(value) => ConcurrencyMode::parse(&value)?,
            None => ConcurrencyMode::default(),
        };

        let config = Self::new(environment.trim()).concurrency(concurrency);
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_empty() {
            return Err(FabricError::ConfigError("environment cannot be empty".into()));
        }
        Ok(())
    }
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENVIRONMENT)
    }
}
