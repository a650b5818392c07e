//! Transport trait abstraction for the modem's serial link and reset pin

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::time::Duration;

/// Duplex byte channel to the modem
///
/// Absence of data must be observable without hanging: `read_line` returns
/// `Ok(None)` once `wait` elapses without a complete line.
#[async_trait]
pub trait ModemTransport: Send {
    /// Write all bytes to the modem
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one line, including its terminator, waiting at most `wait`
    async fn read_line(&mut self, wait: Duration) -> io::Result<Option<Bytes>>;

    /// Discard any buffered input, returning the number of bytes dropped
    async fn drain(&mut self) -> io::Result<usize>;
}

/// Logic level of a digital output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// The modem's reset input
pub trait ResetLine: Send {
    fn set_level(&mut self, level: Level) -> io::Result<()>;
}

impl<L: ResetLine + ?Sized> ResetLine for Box<L> {
    fn set_level(&mut self, level: Level) -> io::Result<()> {
        (**self).set_level(level)
    }
}
