//! # fedb Protocol
//!
//! MySQL wire protocol front-end for fedb:
//! - Packet framing and reassembly ([`PacketIo`])
//! - Connection phase (initial handshake, HandshakeResponse41)
//! - Per-connection command loop ([`Connection`])
//! - TCP listener and connection registry ([`Server`])
//!
//! Statements are not interpreted here. A [`SessionDriver`] opens a
//! [`QueryCtx`] for every authenticated connection and receives its queries.
//!
//! # Usage
//!
//! ```ignore
//! use fedb_protocol::Server;
//!
//! let server = Server::new(config, driver).await?;
//! server.run().await?;
//! ```

pub mod codec;
pub mod connection;
pub mod constants;
pub mod driver;
pub mod handshake;
pub mod packet;
pub mod server;

pub use codec::{ErrPacket, OkPacket, PayloadReader};
pub use connection::{ConnContext, ConnHandle, ConnStatus, Connection};
pub use driver::{QueryCtx, QueryResult, SessionDriver};
pub use handshake::{HandshakeResponse, HandshakeResponseBuilder, InitialHandshake};
pub use packet::{PacketIo, MAX_PAYLOAD_LEN};
pub use server::{ConnRegistry, Server};

/// Enable TCP keepalive on an accepted socket.
pub fn set_tcp_keepalive(stream: &tokio::net::TcpStream) -> std::io::Result<()> {
    let sock_ref = socket2::SockRef::from(stream);
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(std::time::Duration::from_secs(60))
        .with_interval(std::time::Duration::from_secs(10));
    sock_ref.set_tcp_keepalive(&keepalive)
}
