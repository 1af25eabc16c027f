use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FabricError {
    /// The shard context was never initialized for this task. Holds the
    /// shard group(s) the caller asked for.
    #[error("No shard has been activated (needed for {0})")]
    NoActiveShard(String),

    /// The topology references a shard group that is not active.
    #[error("No active shard for {0}")]
    ShardNotActive(String),

    #[error("Unknown database config: {address}, have [{}]", .known.join(", "))]
    UnknownBackend { address: String, known: Vec<String> },

    #[error("Concurrency unsupported: {0}")]
    ConcurrencyUnsupported(String),

    #[error("Entity '{0}' is not registered")]
    UnknownEntity(String),

    #[error("Entity '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection to '{address}' timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    /// Driver failures pass through untouched.
    #[error(transparent)]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, FabricError>;

impl FabricError {
    /// Wraps a driver error without altering it.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// True for the errors caused by a missing shard activation.
    pub fn is_shard_error(&self) -> bool {
        matches!(self, Self::NoActiveShard(_) | Self::ShardNotActive(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for FabricError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for FabricError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// I/O failures come from drivers and pass through untouched.
impl From<std::io::Error> for FabricError {
    fn from(err: std::io::Error) -> Self {
        Self::backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_lists_known_names() {
        let err = FabricError::UnknownBackend {
            address: "city_austin_test".to_string(),
            known: vec!["city_dallas_test".to_string(), "test".to_string()],
        };

        let message = err.to_string();
        assert!(message.contains("city_austin_test"));
        assert!(message.contains("city_dallas_test, test"));
    }

    #[test]
    fn test_shard_error_classification() {
        assert!(FabricError::NoActiveShard("city".into()).is_shard_error());
        assert_eq!(
            FabricError::NoActiveShard("city".into()).to_string(),
            "No shard has been activated (needed for city)"
        );
        assert!(FabricError::ShardNotActive("city".into()).is_shard_error());
        assert!(!FabricError::UnknownEntity("Order".into()).is_shard_error());
        assert_eq!(
            FabricError::ShardNotActive("city".into()).to_string(),
            "No active shard for city"
        );
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err = FabricError::backend(io);
        assert_eq!(err.to_string(), "peer reset");
    }

    #[test]
    fn test_propagated_io_error_stays_backend() {
        fn read_socket() -> Result<()> {
            let write: std::io::Result<()> =
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe"));
            write?;
            Ok(())
        }

        let err = read_socket().unwrap_err();
        assert!(matches!(err, FabricError::Backend(_)));
        assert_eq!(err.to_string(), "broken pipe");

        let FabricError::Backend(inner) = err else {
            unreachable!()
        };
        let io = inner.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
