//! Connection-phase packets
//!
//! - Initial handshake (protocol v10), sent by the server
//! - HandshakeResponse41, sent by the client
//!
//! See: https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase.html

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use fedb_common::prelude::*;

use crate::codec::{write_null_terminated, PayloadReader};
use crate::constants::*;

/// Fixed-size prefix of a HandshakeResponse41 (and the whole SSL request).
pub const RESPONSE_HEADER_LEN: usize = 32;

/// Initial handshake packet.
#[derive(Debug, Clone)]
pub struct InitialHandshake<'a> {
    pub connection_id: u32,
    pub salt: &'a [u8; SALT_LEN],
    pub capability: u32,
    pub collation: u8,
    pub status: u16,
}

impl<'a> InitialHandshake<'a> {
    pub fn encode(&self, buf: &mut BytesMut) {
        // Protocol version
        buf.put_u8(PROTOCOL_VERSION);

        // Server version (null-terminated)
        write_null_terminated(buf, SERVER_VERSION.as_bytes());

        // Connection ID
        buf.put_u32_le(self.connection_id);

        // Auth-plugin-data-part-1 (first 8 bytes of salt)
        buf.put_slice(&self.salt[..8]);
        buf.put_u8(0); // filler

        // Capability flags (lower 2 bytes)
        buf.put_u16_le((self.capability & 0xFFFF) as u16);

        buf.put_u8(self.collation);

        buf.put_u16_le(self.status);

        // Capability flags (upper 2 bytes)
        buf.put_u16_le((self.capability >> 16) as u16);

        // Auth-plugin-data-len
        buf.put_u8((SALT_LEN + 1) as u8);

        // Reserved
        buf.put_slice(&[0u8; 10]);

        // Auth-plugin-data-part-2
        write_null_terminated(buf, &self.salt[8..]);

        write_null_terminated(buf, AUTH_PLUGIN_NAME.as_bytes());
    }
}

/// Parsed HandshakeResponse41.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub capability: u32,
    pub max_packet_size: u32,
    pub collation: u8,
    pub user: String,
    pub auth: Vec<u8>,
    pub db_name: String,
    pub auth_plugin: String,
    pub attrs: HashMap<String, String>,
}

impl HandshakeResponse {
    /// An SSL request is a bare response header with the SSL bit set.
    pub fn is_ssl_request(data: &[u8]) -> bool {
        data.len() == RESPONSE_HEADER_LEN
            && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) & CLIENT_SSL != 0
    }

    /// Parse a full response. Any truncation yields `MalformedPacket`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < RESPONSE_HEADER_LEN {
            return Err(ProtocolError::MalformedPacket.into());
        }

        let mut reader = PayloadReader::new(data);
        let mut resp = HandshakeResponse {
            capability: reader.u32_le()?,
            max_packet_size: reader.u32_le()?,
            collation: reader.u8()?,
            ..Default::default()
        };
        reader.skip(23)?;

        resp.user = lossy(reader.null_terminated()?);

        resp.auth = if resp.capability & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            reader.lenenc_bytes()?.to_vec()
        } else if resp.capability & CLIENT_SECURE_CONNECTION != 0 {
            let len = reader.u8()? as usize;
            reader.take(len)?.to_vec()
        } else {
            reader.null_terminated()?.to_vec()
        };

        if resp.capability & CLIENT_CONNECT_WITH_DB != 0 && !reader.is_empty() {
            resp.db_name = lossy(reader.null_terminated_or_rest());
        }

        if resp.capability & CLIENT_PLUGIN_AUTH != 0 && !reader.is_empty() {
            resp.auth_plugin = lossy(reader.null_terminated_or_rest());
        }

        if resp.capability & CLIENT_CONNECT_ATTRS != 0 && !reader.is_empty() {
            match parse_attrs(&mut reader) {
                Ok(attrs) => resp.attrs = attrs,
                Err(e) => warn!(user = %resp.user, error = %e, "ignoring malformed connection attributes"),
            }
        }

        Ok(resp)
    }
}

fn parse_attrs(reader: &mut PayloadReader<'_>) -> Result<HashMap<String, String>> {
    let total = reader.lenenc_int()?;
    let total = usize::try_from(total).map_err(|_| ProtocolError::MalformedPacket)?;
    let mut block = PayloadReader::new(reader.take(total)?);

    let mut attrs = HashMap::new();
    while !block.is_empty() {
        let key = lossy(block.lenenc_bytes()?);
        let value = lossy(block.lenenc_bytes()?);
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Builds HandshakeResponse41 payloads the way common clients do.
#[derive(Debug, Clone)]
pub struct HandshakeResponseBuilder {
    pub capability: u32,
    pub collation: u8,
    pub user: String,
    pub auth: Vec<u8>,
    pub db_name: Option<String>,
    pub auth_plugin: Option<String>,
    pub attrs: Vec<(String, String)>,
}

impl HandshakeResponseBuilder {
    pub fn new(user: &str) -> Self {
        Self {
            capability: CLIENT_PROTOCOL_41 | CLIENT_SECURE_CONNECTION | CLIENT_LONG_PASSWORD,
            collation: DEFAULT_COLLATION_ID,
            user: user.to_string(),
            auth: Vec::new(),
            db_name: None,
            auth_plugin: None,
            attrs: Vec::new(),
        }
    }

    pub fn db(mut self, db: &str) -> Self {
        self.capability |= CLIENT_CONNECT_WITH_DB;
        self.db_name = Some(db.to_string());
        self
    }

    pub fn auth(mut self, auth: &[u8]) -> Self {
        self.auth = auth.to_vec();
        self
    }

    pub fn plugin(mut self, name: &str) -> Self {
        self.capability |= CLIENT_PLUGIN_AUTH;
        self.auth_plugin = Some(name.to_string());
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.capability |= CLIENT_CONNECT_ATTRS;
        self.attrs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(&self) -> BytesMut {
        use crate::codec::{write_lenenc_bytes, write_lenenc_int};

        let mut buf = BytesMut::new();
        buf.put_u32_le(self.capability);
        buf.put_u32_le(MAX_PACKET_SIZE);
        buf.put_u8(self.collation);
        buf.put_slice(&[0u8; 23]);
        write_null_terminated(&mut buf, self.user.as_bytes());

        if self.capability & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            write_lenenc_bytes(&mut buf, &self.auth);
        } else if self.capability & CLIENT_SECURE_CONNECTION != 0 {
            buf.put_u8(self.auth.len() as u8);
            buf.put_slice(&self.auth);
        } else {
            write_null_terminated(&mut buf, &self.auth);
        }

        if let Some(db) = &self.db_name {
            write_null_terminated(&mut buf, db.as_bytes());
        }
        if let Some(plugin) = &self.auth_plugin {
            write_null_terminated(&mut buf, plugin.as_bytes());
        }
        if self.capability & CLIENT_CONNECT_ATTRS != 0 {
            let mut block = BytesMut::new();
            for (key, value) in &self.attrs {
                write_lenenc_bytes(&mut block, key.as_bytes());
                write_lenenc_bytes(&mut block, value.as_bytes());
            }
            write_lenenc_int(&mut buf, block.len() as u64);
            buf.put_slice(&block);
        }
        buf
    }
}

/// Max packet size advertised by [`HandshakeResponseBuilder`].
const MAX_PACKET_SIZE: u32 = 16 * 1024 * 1024;
