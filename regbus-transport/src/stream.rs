//! Stream accessor trait for the transport layer

use async_trait::async_trait;
use regbus_core::{RegbusError, RegbusResult};
use std::time::Duration;

/// Stream accessor interface to a physical byte stream towards a device
///
/// Semantics the frame layer relies on:
/// - `read` blocks up to the configured timeout; an elapsed timeout is
///   `RegbusError::Timeout`, a clean EOF is `Ok(0)`.
/// - the accessor imposes no framing of its own.
#[async_trait]
pub trait StreamAccessor: Send {
    /// Set the read timeout. `None` means wait indefinitely.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> RegbusResult<()>;

    /// Read up to `buf.len()` bytes, returning the count (0 on EOF)
    async fn read(&mut self, buf: &mut [u8]) -> RegbusResult<usize>;

    /// Fill `buf` completely
    ///
    /// Fails if the stream is exhausted before the buffer is full.
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> RegbusResult<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(RegbusError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Failed to read exact number of bytes",
                )));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Write data to the stream, returning the count written
    async fn write(&mut self, buf: &[u8]) -> RegbusResult<usize>;

    /// Write all of `buf`
    async fn write_all(&mut self, buf: &[u8]) -> RegbusResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(RegbusError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> RegbusResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> RegbusResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> RegbusResult<()>;
}
