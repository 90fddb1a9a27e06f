//! Payload encoding helpers
//!
//! Writers append to a `BytesMut`. [`PayloadReader`] walks a received payload
//! and reports truncation as a malformed packet instead of panicking.

use bytes::{BufMut, BytesMut};

use fedb_common::prelude::*;

use crate::constants::{ERR_HEADER, OK_HEADER, CLIENT_PROTOCOL_41};

// ============================================================================
// Writers
// ============================================================================

pub fn write_lenenc_int(buf: &mut BytesMut, value: u64) {
    if value < 251 {
        buf.put_u8(value as u8);
    } else if value < 65536 {
        buf.put_u8(0xfc);
        buf.put_u16_le(value as u16);
    } else if value < 16777216 {
        buf.put_u8(0xfd);
        buf.put_u8((value & 0xFF) as u8);
        buf.put_u8(((value >> 8) & 0xFF) as u8);
        buf.put_u8(((value >> 16) & 0xFF) as u8);
    } else {
        buf.put_u8(0xfe);
        buf.put_u64_le(value);
    }
}

pub fn write_lenenc_bytes(buf: &mut BytesMut, data: &[u8]) {
    write_lenenc_int(buf, data.len() as u64);
    buf.put_slice(data);
}

/// Append `s` followed by a NUL terminator.
pub fn write_null_terminated(buf: &mut BytesMut, s: &[u8]) {
    buf.put_slice(s);
    buf.put_u8(0);
}

/// OK packet body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: u16,
    pub warnings: u16,
}

impl OkPacket {
    pub fn encode(&self, buf: &mut BytesMut, capability: u32) {
        buf.put_u8(OK_HEADER);
        write_lenenc_int(buf, self.affected_rows);
        write_lenenc_int(buf, self.last_insert_id);
        if capability & CLIENT_PROTOCOL_41 != 0 {
            buf.put_u16_le(self.status);
            buf.put_u16_le(self.warnings);
        }
    }
}

/// Error packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket<'a> {
    pub code: u16,
    pub state: &'a str,
    pub message: &'a str,
}

impl<'a> ErrPacket<'a> {
    pub fn encode(&self, buf: &mut BytesMut, capability: u32) {
        buf.put_u8(ERR_HEADER);
        buf.put_u16_le(self.code);
        if capability & CLIENT_PROTOCOL_41 != 0 {
            buf.put_u8(b'#');
            buf.put_slice(self.state.as_bytes());
        }
        buf.put_slice(self.message.as_bytes());
    }
}

// ============================================================================
// Reader
// ============================================================================

fn malformed() -> Error {
    ProtocolError::MalformedPacket.into()
}

/// Bounds-checked cursor over a packet payload.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(malformed());
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u24_le(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64_le(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    /// Bytes up to the next NUL, consuming the NUL.
    pub fn null_terminated(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == 0).ok_or_else(malformed)?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    /// Bytes up to the next NUL, or everything left if there is none.
    pub fn null_terminated_or_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                &rest[..end]
            }
            None => {
                self.pos = self.data.len();
                rest
            }
        }
    }

    /// Length-encoded integer. The NULL marker (0xfb) reads as 0.
    pub fn lenenc_int(&mut self) -> Result<u64> {
        match self.u8()? {
            n @ 0..=0xfa => Ok(n as u64),
            0xfb => Ok(0),
            0xfc => self.u16_le().map(u64::from),
            0xfd => self.u24_le().map(u64::from),
            0xfe => self.u64_le(),
            _ => Err(malformed()),
        }
    }

    pub fn lenenc_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.lenenc_int()?;
        let len = usize::try_from(len).map_err(|_| malformed())?;
        self.take(len)
    }
}
