//! # fedb Transaction
//!
//! Lazy transaction state for fedb sessions.
//!
//! A session does not start a transaction when a statement begins. It asks the
//! store's oracle for a start timestamp *future* and parks it in a
//! [`TxnState::Pending`]. Only a statement that actually touches storage
//! resolves the future into a transaction, so statements that never read or
//! write data never pay for a timestamp.

pub mod state;

pub use state::{TxnFuture, TxnState};
