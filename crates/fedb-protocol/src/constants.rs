//! MySQL protocol constants
//!
//! See: https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basics.html

/// Initial handshake protocol version
pub const PROTOCOL_VERSION: u8 = 10;

/// Server version string sent in the initial handshake
pub const SERVER_VERSION: &str = "5.7.25-fedb";

/// Authentication plugin advertised in the initial handshake
pub const AUTH_PLUGIN_NAME: &str = "mysql_native_password";

/// Collation used when the client does not pick one (utf8mb4_bin)
pub const DEFAULT_COLLATION_ID: u8 = 46;

/// Length of the authentication salt
pub const SALT_LEN: usize = 20;

// Capability flags
pub const CLIENT_LONG_PASSWORD: u32 = 0x0001;
pub const CLIENT_FOUND_ROWS: u32 = 0x0002;
pub const CLIENT_LONG_FLAG: u32 = 0x0004;
pub const CLIENT_CONNECT_WITH_DB: u32 = 0x0008;
pub const CLIENT_NO_SCHEMA: u32 = 0x0010;
pub const CLIENT_COMPRESS: u32 = 0x0020;
pub const CLIENT_ODBC: u32 = 0x0040;
pub const CLIENT_LOCAL_FILES: u32 = 0x0080;
pub const CLIENT_IGNORE_SPACE: u32 = 0x0100;
pub const CLIENT_PROTOCOL_41: u32 = 0x0200;
pub const CLIENT_INTERACTIVE: u32 = 0x0400;
pub const CLIENT_SSL: u32 = 0x0800;
pub const CLIENT_IGNORE_SIGPIPE: u32 = 0x1000;
pub const CLIENT_TRANSACTIONS: u32 = 0x2000;
pub const CLIENT_RESERVED: u32 = 0x4000;
pub const CLIENT_SECURE_CONNECTION: u32 = 0x8000;
pub const CLIENT_MULTI_STATEMENTS: u32 = 0x00010000;
pub const CLIENT_MULTI_RESULTS: u32 = 0x00020000;
pub const CLIENT_PS_MULTI_RESULTS: u32 = 0x00040000;
pub const CLIENT_PLUGIN_AUTH: u32 = 0x00080000;
pub const CLIENT_CONNECT_ATTRS: u32 = 0x00100000;
pub const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 0x00200000;

/// Capabilities offered by the server
pub const DEFAULT_CAPABILITY: u32 = CLIENT_LONG_PASSWORD
    | CLIENT_LONG_FLAG
    | CLIENT_CONNECT_WITH_DB
    | CLIENT_PROTOCOL_41
    | CLIENT_TRANSACTIONS
    | CLIENT_SECURE_CONNECTION
    | CLIENT_FOUND_ROWS
    | CLIENT_MULTI_STATEMENTS
    | CLIENT_MULTI_RESULTS
    | CLIENT_LOCAL_FILES
    | CLIENT_CONNECT_ATTRS
    | CLIENT_PLUGIN_AUTH;

// Server status flags
pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;

// Command types
pub const COM_SLEEP: u8 = 0x00;
pub const COM_QUIT: u8 = 0x01;
pub const COM_INIT_DB: u8 = 0x02;
pub const COM_QUERY: u8 = 0x03;
pub const COM_FIELD_LIST: u8 = 0x04;
pub const COM_CREATE_DB: u8 = 0x05;
pub const COM_DROP_DB: u8 = 0x06;
pub const COM_REFRESH: u8 = 0x07;
pub const COM_SHUTDOWN: u8 = 0x08;
pub const COM_STATISTICS: u8 = 0x09;
pub const COM_PROCESS_INFO: u8 = 0x0a;
pub const COM_CONNECT: u8 = 0x0b;
pub const COM_PROCESS_KILL: u8 = 0x0c;
pub const COM_DEBUG: u8 = 0x0d;
pub const COM_PING: u8 = 0x0e;
pub const COM_CHANGE_USER: u8 = 0x11;
pub const COM_STMT_PREPARE: u8 = 0x16;
pub const COM_STMT_EXECUTE: u8 = 0x17;
pub const COM_STMT_SEND_LONG_DATA: u8 = 0x18;
pub const COM_STMT_CLOSE: u8 = 0x19;
pub const COM_STMT_RESET: u8 = 0x1a;
pub const COM_SET_OPTION: u8 = 0x1b;
pub const COM_STMT_FETCH: u8 = 0x1c;
pub const COM_RESET_CONNECTION: u8 = 0x1f;

// Response packet headers
pub const OK_HEADER: u8 = 0x00;
pub const ERR_HEADER: u8 = 0xff;

/// Human-readable command name, for logs.
pub fn command_name(cmd: u8) -> &'static str {
    match cmd {
        COM_SLEEP => "Sleep",
        COM_QUIT => "Quit",
        COM_INIT_DB => "InitDB",
        COM_QUERY => "Query",
        COM_FIELD_LIST => "FieldList",
        COM_CREATE_DB => "CreateDB",
        COM_DROP_DB => "DropDB",
        COM_REFRESH => "Refresh",
        COM_SHUTDOWN => "Shutdown",
        COM_STATISTICS => "Statistics",
        COM_PROCESS_INFO => "ProcessInfo",
        COM_CONNECT => "Connect",
        COM_PROCESS_KILL => "ProcessKill",
        COM_DEBUG => "Debug",
        COM_PING => "Ping",
        COM_CHANGE_USER => "ChangeUser",
        COM_STMT_PREPARE => "StmtPrepare",
        COM_STMT_EXECUTE => "StmtExecute",
        COM_STMT_SEND_LONG_DATA => "StmtSendLongData",
        COM_STMT_CLOSE => "StmtClose",
        COM_STMT_RESET => "StmtReset",
        COM_SET_OPTION => "SetOption",
        COM_STMT_FETCH => "StmtFetch",
        COM_RESET_CONNECTION => "ResetConnection",
        _ => "Unknown",
    }
}
