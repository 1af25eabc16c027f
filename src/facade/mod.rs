pub mod config;
pub mod fabric;

pub use config::{ConcurrencyMode, FabricConfig};
pub use fabric::DataFabric;
