//! Line-delimited transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The transport is generic over its reader and writer so the server can be
//! driven from in-memory buffers in tests.
//!
//! # Cancellation
//!
//! [`LineTransport::read_line`] is cancel safe: the server races it against
//! tool-call completions, and a partially received line is kept for the
//! next call.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::mcp::protocol::OutgoingMessage;

/// A newline-delimited JSON-RPC transport.
pub struct LineTransport<R, W> {
    /// Line reader over the input stream.
    lines: Lines<R>,
    /// Output stream.
    writer: W,
}

/// The transport used in production: stdin and stdout.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: reader.lines(),
            writer,
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` once the input is closed (EOF). Trailing `\r` is
    /// stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the line is not UTF-8.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let Some(mut line) = self.lines.next_line().await? else {
            return Ok(None);
        };
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Writes a response or error, terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message(&mut self, message: &OutgoingMessage) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
