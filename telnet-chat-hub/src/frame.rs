use std::{io, sync::Arc};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Identity assigned to a connection when the hub registers it.
pub type ClientId = u64;

const LINE_TERMINATOR: u8 = b'\n';

/// One line read from a client, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: ClientId,
    pub line: Vec<u8>,
}

impl InboundMessage {
    pub fn new(sender: ClientId, line: Vec<u8>) -> Self {
        Self { sender, line }
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(self.sender, &self.line)
    }
}

/// Tagged broadcast line, encoded once and shared by every write task of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Arc<[u8]>);

impl Frame {
    pub fn new(sender: ClientId, line: &[u8]) -> Self {
        let tag = format!("Client {sender} > ");
        let mut encoded = Vec::with_capacity(tag.len() + line.len());
        encoded.extend_from_slice(tag.as_bytes());
        encoded.extend_from_slice(line);
        Self(encoded.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Reads the next newline-terminated line as raw bytes.
///
/// A line only counts once its terminator arrives: EOF, including EOF in the
/// middle of a line, is reported as `UnexpectedEof` and the fragment is dropped.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    reader.read_until(LINE_TERMINATOR, &mut line).await?;
    if line.last() != Some(&LINE_TERMINATOR) {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before line terminator",
        ));
    }
    Ok(line)
}

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}
