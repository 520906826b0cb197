pub mod error;
pub mod config;
pub mod agent;
pub mod rerank;
pub mod metadata;
pub mod db;
pub mod interaction_log;
pub mod sample;
pub mod tools;
pub mod tracing;

pub use error::{AskDbError, Result};
pub use config::Settings;
pub use tools::SqlAgent;
