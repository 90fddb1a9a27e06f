//! Error types for fedb

use thiserror::Error;

/// Result type alias using fedb's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fedb
#[derive(Error, Debug)]
pub enum Error {
    // Wire protocol errors, fatal to the connection that produced them
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Client sent COM_QUIT
    #[error("EOF")]
    Eof,

    // Statement errors, reported to the client
    #[error("{0}")]
    Statement(#[from] StatementError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // Transaction errors
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    // The client cannot assume the statement succeeded or failed
    #[error("Result undetermined: {0}")]
    ResultUndetermined(String),

    // The process is degraded and must stop accepting work
    #[error("Critical error: {0}")]
    Critical(String),

    // Cancelled
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed packet")]
    MalformedPacket,

    #[error("invalid sequence {got} != {expected}")]
    InvalidSequence { expected: u8, got: u8 },

    #[error("command {0} not supported now")]
    CommandNotSupported(u8),

    #[error("SSL connection is not supported")]
    SslUnsupported,

    #[error("empty command packet")]
    EmptyCommand,
}

/// A recoverable error raised while executing a statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StatementError {
    pub code: u16,
    pub state: String,
    pub message: String,
}

impl StatementError {
    pub fn new(code: u16, state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            state: state.into(),
            message: message.into(),
        }
    }

    /// ER_EMPTY_QUERY
    pub fn empty_query() -> Self {
        Self::new(1065, "42000", "Query was empty")
    }

    /// ER_UNKNOWN_COLLATION
    pub fn unknown_collation(id: impl std::fmt::Display) -> Self {
        Self::new(1273, "HY000", format!("Unknown collation: '{}'", id))
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    #[error("invalid uri, [{0}] scheme not registered")]
    UnknownScheme(String),

    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("uri scheme expected ({expected}) but found ({found})")]
    SchemeMismatch { expected: String, found: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("transaction state is {0}, expected invalid")]
    NotInvalid(&'static str),

    #[error("transaction state is {0}, expected pending")]
    NotPending(&'static str),

    #[error("transaction is no longer valid")]
    Invalidated,
}

impl Error {
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn critical(msg: impl Into<String>) -> Self {
        Error::Critical(msg.into())
    }

    pub fn result_undetermined(msg: impl Into<String>) -> Self {
        Error::ResultUndetermined(msg.into())
    }

    /// Errors meaning the peer is gone or asked to leave.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Eof)
    }

    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Storage(StorageError::Unavailable(_)) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Return the MySQL server error number for this error.
    ///
    /// See <https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html>
    pub fn mysql_code(&self) -> u16 {
        match self {
            Error::Protocol(pe) => match pe {
                ProtocolError::MalformedPacket => 1835,          // ER_MALFORMED_PACKET
                ProtocolError::InvalidSequence { .. } => 1156,   // ER_NET_PACKETS_OUT_OF_ORDER
                ProtocolError::CommandNotSupported(_) => 1047,   // ER_UNKNOWN_COM_ERROR
                ProtocolError::SslUnsupported => 1043,           // ER_HANDSHAKE_ERROR
                ProtocolError::EmptyCommand => 1835,
            },
            Error::Statement(se) => se.code,
            Error::Storage(_) => 1105,
            Error::Transaction(_) => 1105,
            Error::Cancelled(_) => 1317,                         // ER_QUERY_INTERRUPTED
            Error::Io(_) | Error::Eof => 1105,
            Error::ResultUndetermined(_)
            | Error::Critical(_)
            | Error::Config(_)
            | Error::Internal(_) => 1105,                        // ER_UNKNOWN_ERROR
        }
    }

    /// Return the 5-character SQLSTATE for this error.
    pub fn sql_state(&self) -> &str {
        match self {
            Error::Protocol(pe) => match pe {
                ProtocolError::CommandNotSupported(_) => "08S01",
                ProtocolError::SslUnsupported => "08S01",
                _ => "HY000",
            },
            Error::Statement(se) => &se.state,
            Error::Cancelled(_) => "70100",
            _ => "HY000",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Protocol(ProtocolError::MalformedPacket);
        assert_eq!(err.to_string(), "Protocol error: malformed packet");

        let err = Error::Storage(StorageError::UnknownScheme("foo".into()));
        assert_eq!(
            err.to_string(),
            "Storage error: invalid uri, [foo] scheme not registered"
        );

        let err: Error = StatementError::empty_query().into();
        assert_eq!(err.to_string(), "Query was empty");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_disconnect());
        assert!(Error::Eof.is_disconnect());
        assert!(!Error::critical("x").is_disconnect());
    }

    #[test]
    fn test_mysql_codes() {
        assert_eq!(Error::Protocol(ProtocolError::MalformedPacket).mysql_code(), 1835);
        assert_eq!(Error::Protocol(ProtocolError::CommandNotSupported(0x16)).mysql_code(), 1047);
        assert_eq!(Error::Protocol(ProtocolError::CommandNotSupported(0x16)).sql_state(), "08S01");
        assert_eq!(Error::Statement(StatementError::empty_query()).mysql_code(), 1065);
        assert_eq!(Error::Statement(StatementError::empty_query()).sql_state(), "42000");
        assert_eq!(Error::Cancelled("kill".into()).mysql_code(), 1317);
        assert_eq!(Error::internal("oops").mysql_code(), 1105);
        assert_eq!(Error::internal("oops").sql_state(), "HY000");
    }

    #[test]
    fn test_sql_state_all_five_chars() {
        let errors: Vec<Error> = vec![
            Error::Protocol(ProtocolError::MalformedPacket),
            Error::Protocol(ProtocolError::InvalidSequence { expected: 1, got: 3 }),
            Error::Protocol(ProtocolError::SslUnsupported),
            Error::Statement(StatementError::unknown_collation(999)),
            Error::Storage(StorageError::Closed),
            Error::Transaction(TransactionError::Invalidated),
            Error::Cancelled("".into()),
            Error::ResultUndetermined("".into()),
            Error::Critical("".into()),
            Error::Config("".into()),
        ];
        for err in &errors {
            let state = err.sql_state();
            assert_eq!(state.len(), 5, "SQLSTATE for {:?} is '{}' (not 5 chars)", err, state);
        }
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Storage(StorageError::Unavailable("busy".into())).is_retryable());
        assert!(!Error::Storage(StorageError::UnknownScheme("x".into())).is_retryable());
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(Error::Io(timeout).is_retryable());
    }
}
