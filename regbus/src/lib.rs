//! regbus - async register-access protocol client for lab instruments
//!
//! Devices expose their state as numbered registers behind a binary framed
//! protocol over a duplex serial link. This library provides the frame
//! codec, a transport multiplexer that keeps request/reply traffic and
//! spontaneous device events apart on the shared stream, and a typed
//! register client.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `regbus-core`: Error types, payload type descriptors, register values
//! - `regbus-transport`: Serial transport behind the `StreamAccessor` trait
//! - `regbus-protocol`: Frame codec, checksum, stream frame reader
//! - `regbus-client`: Multiplexer, event subscriptions, register client
//!
//! # Usage
//!
//! ```no_run
//! use regbus::client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn run() -> regbus::RegbusResult<()> {
//! let client = ClientBuilder::new()
//!     .serial("/dev/ttyUSB0")
//!     .deadline(Duration::from_millis(500))
//!     .connect()
//!     .await?;
//!
//! println!("{}", client.device_info().await?);
//!
//! let mut events = client.events();
//! while let Ok(event) = events.recv().await {
//!     println!("register {} fired: {}", event.address(), event);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use regbus_core::{PayloadType, RegbusError, RegbusResult, RegisterValue};

// Re-export protocol types
pub use regbus_protocol::{
    registers, DeviceTimestamp, MessageType, ReplyFrame, RequestFrame,
};

// Re-export client API
pub mod client {
    pub use regbus_client::*;
}

// Re-export transport API
pub mod transport {
    pub use regbus_transport::*;
}
