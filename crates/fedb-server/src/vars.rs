//! Session variables

use std::collections::HashMap;

use fedb_common::prelude::*;

use crate::charset::collation_by_id;

pub const CHARACTER_SET_CLIENT: &str = "character_set_client";
pub const CHARACTER_SET_CONNECTION: &str = "character_set_connection";
pub const CHARACTER_SET_RESULTS: &str = "character_set_results";
pub const COLLATION_CONNECTION: &str = "collation_connection";

/// Variables changed together by `SET NAMES`.
pub const SET_NAMES_VARIABLES: [&str; 3] = [
    CHARACTER_SET_CLIENT,
    CHARACTER_SET_CONNECTION,
    CHARACTER_SET_RESULTS,
];

pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_bin";

/// Per-session state visible to statements.
#[derive(Debug, Clone, Default)]
pub struct SessionVars {
    systems: HashMap<String, String>,

    /// Server status flags reported to the client.
    pub status: u16,
    pub client_capability: u32,
    pub connection_id: u64,
    pub current_db: String,
}

impl SessionVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// System variable names are case-insensitive.
    pub fn set_system_var(&mut self, name: &str, value: &str) {
        self.systems
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn system_var(&self, name: &str) -> Option<&str> {
        self.systems
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Apply collation `id`, as `SET NAMES` would.
    pub fn set_collation(&mut self, id: u8) -> Result<()> {
        let collation = collation_by_id(id).ok_or_else(|| StatementError::unknown_collation(id))?;
        for name in SET_NAMES_VARIABLES {
            self.set_system_var(name, collation.charset);
        }
        self.set_system_var(COLLATION_CONNECTION, collation.name);
        Ok(())
    }

    /// Charset and collation of the connection.
    pub fn charset_info(&self) -> (&str, &str) {
        (
            self.system_var(CHARACTER_SET_CONNECTION)
                .unwrap_or(DEFAULT_CHARSET),
            self.system_var(COLLATION_CONNECTION)
                .unwrap_or(DEFAULT_COLLATION),
        )
    }
}
