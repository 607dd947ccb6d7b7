pub mod config;
pub mod error;
pub mod types;

pub use config::{IdStrategy, MakerConfig};
pub use error::{PopError, Result};
pub use types::{AgentId, LocationId, NodeId, Record, Value};
