//! # fedb Common
//!
//! Common errors, configuration, and utilities shared across all fedb crates.

pub mod config;
pub mod error;
pub mod utils;

pub use config::*;
pub use error::{Error, Result};

/// Re-export commonly used external types
pub mod prelude {
    pub use super::config::*;
    pub use super::error::{
        Error, ProtocolError, Result, StatementError, StorageError, TransactionError,
    };
    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
