//! Serial port transport implementation
//!
//! Devices speak over a USB CDC serial bridge at 1 Mbaud, 8 data bits, one
//! stop bit, no parity, RTS/CTS flow control. Those are the defaults here;
//! everything is overridable through [`SerialSettings`].

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use regbus_core::{RegbusError, RegbusResult};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialStream;

/// Default baud rate of the device link
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

impl Deref for DebugSerialStream {
    type Target = SerialStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugSerialStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Serial port transport layer settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create settings with the device link defaults (1 Mbaud, 8N1, RTS/CTS)
    pub fn new(port_name: String) -> Self {
        Self {
            port_name,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::Hardware,
            timeout: Some(Duration::from_secs(1)),
        }
    }

    /// Create settings with an explicit baud rate
    pub fn with_baud_rate(port_name: String, baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::new(port_name)
        }
    }
}

/// Serial port transport layer implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create serial transport for a port with the default link settings
    pub fn new_simple(port_name: String) -> Self {
        Self::new(SerialSettings::new(port_name))
    }

    fn stream_mut(&mut self) -> RegbusResult<&mut DebugSerialStream> {
        self.stream.as_mut().ok_or_else(|| {
            RegbusError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
            ))
        })
    }
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> RegbusResult<()> {
        if !self.closed {
            return Err(RegbusError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            RegbusError::Connection(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;

        self.stream = Some(DebugSerialStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> RegbusResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> RegbusResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| RegbusError::Timeout)?
                .map_err(RegbusError::Connection)
        } else {
            stream.read(buf).await.map_err(RegbusError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(RegbusError::Timeout) => Err(RegbusError::Timeout),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> RegbusResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| RegbusError::Timeout)?
                .map_err(RegbusError::Connection)
        } else {
            stream.write(buf).await.map_err(RegbusError::Connection)
        }
    }

    async fn flush(&mut self) -> RegbusResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(RegbusError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> RegbusResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
        }
        self.closed = true;
        Ok(())
    }
}
