//! Newline-delimited message framing.
//!
//! The framing is the same one MCP uses for stdio, carried over TCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//!
//! [`LineTransport`] works over any async reader/writer pair, so the server
//! and the client share it.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Largest accepted message line, in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Why a received line was rejected before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedLine {
    /// Longer than [`MAX_LINE_BYTES`].
    TooLong,
    /// Not valid UTF-8.
    NotUtf8,
}

impl std::fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLong => write!(f, "message exceeds {MAX_LINE_BYTES} bytes"),
            Self::NotUtf8 => f.write_str("message is not valid UTF-8"),
        }
    }
}

/// One line received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, without its terminator.
    Line(String),
    /// A line that was read in full but cannot be a message.
    Malformed(MalformedLine),
}

/// A line-framed JSON transport.
pub struct LineTransport<R, W> {
    /// Buffered reader for incoming lines.
    reader: BufReader<R>,
    /// Writer for outgoing lines.
    writer: W,
}

/// Transport over the two halves of a TCP stream.
pub type TcpTransport = LineTransport<OwnedReadHalf, OwnedWriteHalf>;

impl TcpTransport {
    /// Wraps a connected TCP stream.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over a reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the peer closed the connection (EOF). A line that
    /// cannot carry a message (too long, or not UTF-8) is consumed up to its
    /// newline and reported as [`Frame::Malformed`], so the caller can answer
    /// it and keep reading.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the underlying stream fails.
    pub async fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        let limit = MAX_LINE_BYTES as u64 + 1;
        let mut bytes = Vec::new();
        let bytes_read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut bytes)
            .await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        } else if bytes_read as u64 == limit {
            self.discard_line().await?;
            return Ok(Some(Frame::Malformed(MalformedLine::TooLong)));
        }

        Ok(Some(String::from_utf8(bytes).map_or(
            Frame::Malformed(MalformedLine::NotUtf8),
            Frame::Line,
        )))
    }

    /// Skips the rest of the current line, including its newline.
    async fn discard_line(&mut self) -> io::Result<()> {
        loop {
            let (used, done) = {
                let available = self.reader.fill_buf().await?;
                match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => (pos + 1, true),
                    None => (available.len(), available.is_empty()),
                }
            };
            self.reader.consume(used);
            if done {
                return Ok(());
            }
        }
    }

    /// Serialises `message` and writes it as one line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
