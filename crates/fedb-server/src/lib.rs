//! # fedb Server
//!
//! Server library for fedb providing:
//! - The session driver handed to the protocol layer
//! - Per-connection sessions with session variables and a lazy transaction
//! - The MySQL collation-id table

pub mod charset;
pub mod driver;
pub mod session;
pub mod vars;

pub use driver::FedbDriver;
pub use session::FedbSession;
pub use charset::{collation_by_id, collation_by_name, Collation};
pub use vars::SessionVars;

// Re-export dependencies for convenience
pub use fedb_common;
pub use fedb_protocol;
pub use fedb_storage;
pub use fedb_txn;
