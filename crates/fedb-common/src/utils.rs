//! Utility functions and helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Longest query prefix written to logs.
pub const MAX_LOGGED_QUERY_CHARS: usize = 4096;

/// Get current timestamp in milliseconds since epoch
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Render a query for logging, truncating long statements.
pub fn query_for_log(sql: &str) -> String {
    match sql.char_indices().nth(MAX_LOGGED_QUERY_CHARS) {
        Some((cut, _)) => format!("{}(len: {})", &sql[..cut], sql.len()),
        None => sql.to_string(),
    }
}
