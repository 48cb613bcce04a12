//! Wire-level protocol for regbus devices
//!
//! A frame is `[type][length][address][port][payload_type]{timestamp}
//! {payload}[checksum]`, where the checksum is the sum of all preceding
//! bytes mod 256. Requests carry no timestamp; replies and events always
//! carry a 6-byte one (32 µs resolution).

pub mod checksum;
pub mod frame;
pub mod reader;
pub mod registers;

pub use checksum::Checksum;
pub use frame::{DeviceTimestamp, MessageType, ReplyFrame, RequestFrame, DEFAULT_PORT};
pub use reader::FrameReader;
