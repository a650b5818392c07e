//! Serial transport implementation over tokio-serial

use crate::transport::traits::ModemTransport;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Line-oriented transport over any async byte stream
///
/// Bytes of a line that has not completed within the read wait are kept and
/// prefixed to the next read.
pub struct StreamTransport<S> {
    reader: BufReader<S>,
    pending: Vec<u8>,
}

/// Transport over a UART device
pub type SerialTransport = StreamTransport<SerialStream>;

impl SerialTransport {
    /// Open the serial device at `port`
    pub fn open(port: &str, baud: u32) -> io::Result<Self> {
        let stream = tokio_serial::new(port, baud)
            .open_native_async()
            .map_err(io::Error::other)?;
        Ok(Self::new(stream))
    }
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl<S> ModemTransport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await
    }

    async fn read_line(&mut self, wait: Duration) -> io::Result<Option<Bytes>> {
        match timeout(wait, self.reader.read_until(b'\n', &mut self.pending)).await {
            Ok(Ok(0)) if self.pending.is_empty() => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "modem stream closed",
            )),
            Ok(Ok(_)) => Ok(Some(Bytes::from(std::mem::take(&mut self.pending)))),
            Ok(Err(e)) => Err(e),
            // Partial bytes stay in `pending`
            Err(_) => Ok(None),
        }
    }

    async fn drain(&mut self) -> io::Result<usize> {
        let mut dropped = self.pending.len();
        self.pending.clear();

        let buffered = self.reader.buffer().len();
        Pin::new(&mut self.reader).consume(buffered);
        dropped += buffered;

        let mut scratch = [0u8; 256];
        loop {
            match timeout(Duration::ZERO, self.reader.get_mut().read(&mut scratch)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => dropped += n,
                Ok(Err(e)) => return Err(e),
            }
        }

        Ok(dropped)
    }
}
