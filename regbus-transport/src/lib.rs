//! Transport layer for the regbus register protocol
//!
//! The protocol core never touches a serial port directly; it talks to a
//! [`StreamAccessor`], a blocking-with-timeout byte stream. The serial
//! implementation lives here, behind the same trait, so tests can substitute
//! scripted streams.

pub mod serial;
pub mod stream;

pub use serial::{SerialSettings, SerialTransport, DEFAULT_BAUD_RATE};
pub use stream::{StreamAccessor, TransportLayer};
