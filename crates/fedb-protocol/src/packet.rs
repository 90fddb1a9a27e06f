//! Packet transport
//!
//! Every physical packet is a 4-byte header followed by the payload:
//!
//! ```text
//! +----------------+----------+-------------------+
//! | length (3, LE) | sequence | payload (length)  |
//! +----------------+----------+-------------------+
//! ```
//!
//! A logical message longer than [`MAX_PAYLOAD_LEN`] is split across several
//! packets; a packet shorter than the maximum (possibly empty) ends it.
//! Sequence numbers are shared by both directions and wrap at 256.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};

use fedb_common::prelude::*;

/// Largest payload carried by one physical packet.
pub const MAX_PAYLOAD_LEN: usize = (1 << 24) - 1;

/// Read and write buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Frames and reassembles protocol messages over a byte stream.
#[derive(Debug)]
pub struct PacketIo<S> {
    stream: BufStream<S>,
    sequence: u8,
}

impl<S> PacketIo<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::with_capacity(DEFAULT_BUFFER_SIZE, DEFAULT_BUFFER_SIZE, stream),
            sequence: 0,
        }
    }

    /// Sequence number expected on the next packet.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Start a new command exchange.
    pub fn reset_sequence(&mut self) {
        self.sequence = 0;
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Read one physical packet, appending its payload to `out`.
    async fn read_packet_into(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).await?;

        let got = header[3];
        if got != self.sequence {
            return Err(ProtocolError::InvalidSequence {
                expected: self.sequence,
                got,
            }
            .into());
        }
        self.sequence = self.sequence.wrapping_add(1);

        let length = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        let start = out.len();
        out.resize(start + length, 0);
        self.stream.read_exact(&mut out[start..]).await?;
        Ok(length)
    }

    /// Read one logical message.
    pub async fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        while self.read_packet_into(&mut payload).await? == MAX_PAYLOAD_LEN {}
        Ok(payload)
    }

    /// Write one logical message. Output stays buffered until [`flush`](Self::flush).
    pub async fn write_message(&mut self, payload: &[u8]) -> Result<()> {
        let mut rest = payload;
        loop {
            let (chunk, tail) = rest.split_at(rest.len().min(MAX_PAYLOAD_LEN));
            let length = (chunk.len() as u32).to_le_bytes();
            self.stream
                .write_all(&[length[0], length[1], length[2], self.sequence])
                .await?;
            self.stream.write_all(chunk).await?;
            self.sequence = self.sequence.wrapping_add(1);

            if chunk.len() < MAX_PAYLOAD_LEN {
                return Ok(());
            }
            rest = tail;
        }
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Flush and shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    fn pair() -> (PacketIo<DuplexStream>, DuplexStream) {
        let (a, b) = duplex(64 * 1024);
        (PacketIo::new(a), b)
    }

    async fn round_trip(len: usize) -> (Vec<u8>, u8, u8) {
        let (a, b) = duplex(256 * 1024);
        let mut writer = PacketIo::new(a);
        let mut reader = PacketIo::new(b);

        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();
        let write = tokio::spawn(async move {
            writer.write_message(&payload).await.unwrap();
            writer.flush().await.unwrap();
            writer.sequence()
        });

        let got = reader.read_message().await.unwrap();
        let written_seq = write.await.unwrap();
        assert_eq!(got.len(), expected.len());
        assert!(got == expected, "payload of length {} corrupted", len);
        (got, written_seq, reader.sequence())
    }

    #[tokio::test]
    async fn test_round_trip_small() {
        for len in [0usize, 1, 250, 4096] {
            let (_, w, r) = round_trip(len).await;
            assert_eq!((w, r), (1, 1));
        }
    }

    #[tokio::test]
    async fn test_round_trip_just_below_max() {
        let (_, w, r) = round_trip(MAX_PAYLOAD_LEN - 1).await;
        assert_eq!((w, r), (1, 1));
    }

    #[tokio::test]
    async fn test_round_trip_exact_max_needs_terminator() {
        let (_, w, r) = round_trip(MAX_PAYLOAD_LEN).await;
        assert_eq!((w, r), (2, 2));
    }

    #[tokio::test]
    async fn test_round_trip_split() {
        let (_, w, r) = round_trip(MAX_PAYLOAD_LEN + 1).await;
        assert_eq!((w, r), (2, 2));

        let (_, w, r) = round_trip(2 * MAX_PAYLOAD_LEN).await;
        assert_eq!((w, r), (3, 3));
    }

    #[tokio::test]
    async fn test_header_layout() {
        let (mut io, mut raw) = pair();
        io.write_message(b"\x03select 1").await.unwrap();
        io.write_message(b"").await.unwrap();
        io.flush().await.unwrap();

        let mut buf = [0u8; 17];
        raw.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..4], &[9, 0, 0, 0]);
        assert_eq!(&buf[4..13], b"\x03select 1");
        assert_eq!(&buf[13..], &[0, 0, 0, 1]);
    }

    #[tokio::test]
    async fn test_sequence_wraps() {
        let (mut io, mut raw) = pair();
        for seq in 0..=255u8 {
            raw.write_all(&[1, 0, 0, seq, b'x']).await.unwrap();
            assert_eq!(io.read_message().await.unwrap(), b"x");
        }
        assert_eq!(io.sequence(), 0);
    }

    #[tokio::test]
    async fn test_sequence_mismatch_leaves_counter() {
        let (mut io, mut raw) = pair();
        raw.write_all(&[1, 0, 0, 0, b'a']).await.unwrap();
        io.read_message().await.unwrap();
        assert_eq!(io.sequence(), 1);

        raw.write_all(&[1, 0, 0, 5, b'b']).await.unwrap();
        let err = io.read_message().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidSequence { expected: 1, got: 5 })
        ));
        assert_eq!(io.sequence(), 1);
    }

    #[tokio::test]
    async fn test_reset_sequence() {
        let (mut io, mut raw) = pair();
        raw.write_all(&[1, 0, 0, 0, 0x0e]).await.unwrap();
        io.read_message().await.unwrap();
        io.write_message(&[0x00, 0, 0]).await.unwrap();
        assert_eq!(io.sequence(), 2);

        io.reset_sequence();
        raw.write_all(&[1, 0, 0, 0, 0x0e]).await.unwrap();
        assert_eq!(io.read_message().await.unwrap(), &[0x0e]);
    }

    #[tokio::test]
    async fn test_short_header_is_io_error() {
        let (mut io, mut raw) = pair();
        raw.write_all(&[5, 0]).await.unwrap();
        drop(raw);
        let err = io.read_message().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_short_payload_is_io_error() {
        let (mut io, mut raw) = pair();
        raw.write_all(&[5, 0, 0, 0, b'a', b'b']).await.unwrap();
        drop(raw);
        let err = io.read_message().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
