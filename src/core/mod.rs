pub mod error;
pub mod value;

pub use error::{FabricError, Result};
pub use value::Value;

/// One result row, column values in select order.
pub type Row = Vec<Value>;
