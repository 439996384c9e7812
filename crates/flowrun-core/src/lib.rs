pub mod config;
pub mod error;
pub mod graph;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{FlowError, Result, ValidationError};
pub use graph::*;
pub use types::*;
