//! Client builder
//!
//! Fluent configuration of the transport and multiplexer, collapsing the
//! open/spawn/wrap sequence into one call.

use crate::client::RegisterClient;
use crate::multiplexer::{Multiplexer, MultiplexerConfig, QueuePolicy};
use regbus_core::{RegbusError, RegbusResult};
use regbus_transport::{
    SerialSettings, SerialTransport, StreamAccessor, TransportLayer, DEFAULT_BAUD_RATE,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`RegisterClient`] over a serial port
///
/// ```rust,no_run
/// use regbus_client::ClientBuilder;
///
/// # async fn run() -> regbus_core::RegbusResult<()> {
/// let client = ClientBuilder::new()
///     .serial("/dev/ttyUSB0")
///     .deadline(std::time::Duration::from_millis(500))
///     .connect()
///     .await?;
/// let info = client.device_info().await?;
/// println!("connected to {}", info);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    port_name: Option<String>,
    baud_rate: u32,
    deadline: Duration,
    config: MultiplexerConfig,
}

impl ClientBuilder {
    /// Create a builder with default settings (1 Mbaud, 1 s deadline)
    pub fn new() -> Self {
        Self {
            port_name: None,
            baud_rate: DEFAULT_BAUD_RATE,
            deadline: Duration::from_secs(1),
            config: MultiplexerConfig::default(),
        }
    }

    /// Serial port to open (e.g. "/dev/ttyUSB0" or "COM3")
    pub fn serial(mut self, port_name: &str) -> Self {
        self.port_name = Some(port_name.to_string());
        self
    }

    /// Override the baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Deadline applied to every request/reply exchange
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Same-address send policy
    pub fn queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.config.queue_policy = policy;
        self
    }

    /// How long the read loop waits for a frame before serving commands
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Capacity of the event fan-out channel
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Append every received raw frame to this file
    pub fn dump_to(mut self, path: PathBuf) -> Self {
        self.config.dump_path = Some(path);
        self
    }

    /// Open the serial port and start the multiplexer
    pub async fn connect(self) -> RegbusResult<RegisterClient> {
        let port_name = self.port_name.clone().ok_or_else(|| {
            RegbusError::InvalidData("serial port must be configured".to_string())
        })?;
        let mut transport =
            SerialTransport::new(SerialSettings::with_baud_rate(port_name, self.baud_rate));
        transport.open().await?;
        Ok(self.attach(transport))
    }

    /// Start the multiplexer over an already-open transport
    pub fn attach<S>(self, transport: S) -> RegisterClient
    where
        S: StreamAccessor + 'static,
    {
        let mux = Multiplexer::spawn(transport, self.config);
        RegisterClient::new(Arc::new(mux), self.deadline)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
