//! Request and reply frame structures and encoding/decoding

use crate::checksum::Checksum;
use bytes::{Buf, BufMut};
use regbus_core::{
    decode_payload, encode_payload, PayloadType, RegbusError, RegbusResult, RegisterValue,
};
use std::fmt;
use std::time::Duration;

/// Port byte addressing the device itself rather than an attached peripheral
pub const DEFAULT_PORT: u8 = 255;

/// Byte offset of the payload within a reply frame
const REPLY_PAYLOAD_OFFSET: usize = 11;

/// Smallest valid reply: 5 header bytes + 6 timestamp bytes + checksum
const REPLY_MIN_LEN: usize = 12;

/// Longest payload a request can carry: the length byte counts 4 header
/// bytes plus the payload and must fit in a u8
const REQUEST_MAX_PAYLOAD: usize = u8::MAX as usize - 4;

/// Resolution of the sub-second timestamp field
const TICK: f64 = 32e-6;

/// Wire-level message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Read,
    Write,
    Event,
    ReadError,
    WriteError,
}

impl MessageType {
    /// Decode a message type byte
    pub fn from_byte(byte: u8) -> RegbusResult<Self> {
        match byte {
            1 => Ok(MessageType::Read),
            2 => Ok(MessageType::Write),
            3 => Ok(MessageType::Event),
            9 => Ok(MessageType::ReadError),
            10 => Ok(MessageType::WriteError),
            other => Err(RegbusError::InvalidData(format!(
                "Unknown message type byte: 0x{:02X}",
                other
            ))),
        }
    }

    /// Encode the message type byte
    pub fn to_byte(self) -> u8 {
        match self {
            MessageType::Read => 1,
            MessageType::Write => 2,
            MessageType::Event => 3,
            MessageType::ReadError => 9,
            MessageType::WriteError => 10,
        }
    }

    /// Whether a frame of this type answers a pending request
    ///
    /// Events never do; they are spontaneous.
    pub fn is_reply(self) -> bool {
        !matches!(self, MessageType::Event)
    }

    /// Whether this type signals a rejected request
    pub fn is_error(self) -> bool {
        matches!(self, MessageType::ReadError | MessageType::WriteError)
    }
}

/// Device timestamp: whole seconds plus a sub-second count in 32 µs ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceTimestamp {
    pub seconds: u32,
    pub ticks: u16,
}

impl DeviceTimestamp {
    /// Timestamp as fractional seconds since the device epoch
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.ticks as f64 * TICK
    }

    /// Timestamp as a [`Duration`] since the device epoch
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.seconds as u64) + Duration::from_micros(self.ticks as u64 * 32)
    }
}

impl fmt::Display for DeviceTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// A host-to-device command frame
///
/// Built once per call, encoded, written, discarded. The `length` and
/// checksum bytes are derived during [`RequestFrame::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    message_type: MessageType,
    address: u8,
    port: u8,
    payload_type: PayloadType,
    payload: Vec<u8>,
}

impl RequestFrame {
    /// Build a register read request
    pub fn read(address: u8, payload_type: PayloadType) -> Self {
        Self {
            message_type: MessageType::Read,
            address,
            port: DEFAULT_PORT,
            payload_type,
            payload: Vec::new(),
        }
    }

    /// Build a register write request carrying the given values
    pub fn write(
        address: u8,
        payload_type: PayloadType,
        values: &[RegisterValue],
    ) -> RegbusResult<Self> {
        let payload = encode_payload(payload_type, values)?;
        if payload.len() > REQUEST_MAX_PAYLOAD {
            return Err(RegbusError::Encoding(format!(
                "payload of {} bytes exceeds the {}-byte frame limit",
                payload.len(),
                REQUEST_MAX_PAYLOAD
            )));
        }
        Ok(Self {
            message_type: MessageType::Write,
            address,
            port: DEFAULT_PORT,
            payload_type,
            payload,
        })
    }

    /// Address the request at a peripheral port instead of the device itself
    pub fn with_port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    /// Get the message type
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Get the register address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Get the port byte
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Get the payload type descriptor
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Encode the frame for the wire
    ///
    /// Layout: `[type][length][address][port][payload_type]{payload}[checksum]`
    /// with length = 4 for reads and 4 + payload length for writes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + self.payload.len());
        out.put_u8(self.message_type.to_byte());
        out.put_u8(4 + self.payload.len() as u8);
        out.put_u8(self.address);
        out.put_u8(self.port);
        out.put_u8(self.payload_type.to_byte());
        out.put_slice(&self.payload);
        out.put_u8(Checksum::of(&out));
        out
    }
}

/// A device-to-host frame: reply, error reply, or spontaneous event
///
/// Layout: 5-byte header, 6-byte timestamp (always present, whatever the
/// descriptor's timestamp bit says), payload, 1-byte checksum. Total length
/// on the wire is 2 + the header's length byte.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyFrame {
    message_type: MessageType,
    length: u8,
    address: u8,
    port: u8,
    payload_type: PayloadType,
    timestamp: DeviceTimestamp,
    payload: Vec<u8>,
    checksum: u8,
}

impl ReplyFrame {
    /// Decode a reply frame from its raw bytes
    ///
    /// Verifies overall length, message type, payload type and checksum.
    pub fn decode(raw: &[u8]) -> RegbusResult<Self> {
        if raw.len() < REPLY_MIN_LEN {
            return Err(RegbusError::TruncatedFrame(format!(
                "reply frame needs at least {} bytes, got {}",
                REPLY_MIN_LEN,
                raw.len()
            )));
        }

        let mut header = &raw[..REPLY_PAYLOAD_OFFSET];
        let message_type = MessageType::from_byte(header.get_u8())?;
        let length = header.get_u8();
        let address = header.get_u8();
        let port = header.get_u8();
        let payload_type = PayloadType::from_byte(header.get_u8())?;
        let timestamp = DeviceTimestamp {
            seconds: header.get_u32_le(),
            ticks: header.get_u16_le(),
        };

        let total = 2 + length as usize;
        if raw.len() != total {
            return Err(RegbusError::TruncatedFrame(format!(
                "length byte {} implies a {}-byte frame, got {}",
                length,
                total,
                raw.len()
            )));
        }

        let checksum = raw[total - 1];
        let mut calc = Checksum::new();
        calc.update_bytes(&raw[..total - 1]);
        calc.validate(checksum)?;

        Ok(Self {
            message_type,
            length,
            address,
            port,
            payload_type,
            timestamp,
            payload: raw[REPLY_PAYLOAD_OFFSET..total - 1].to_vec(),
            checksum,
        })
    }

    /// Get the message type
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Get the header length byte
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Get the register address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Get the port byte
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Get the payload type descriptor
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Get the device timestamp
    pub fn timestamp(&self) -> DeviceTimestamp {
        self.timestamp
    }

    /// Get the raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the checksum byte received on the wire
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Whether this frame signals a rejected request
    pub fn is_error(&self) -> bool {
        self.message_type.is_error()
    }

    /// Decode the payload into typed values per the descriptor
    pub fn values(&self) -> RegbusResult<Vec<RegisterValue>> {
        decode_payload(self.payload_type, &self.payload)
    }

    /// Decode the payload as a single value
    ///
    /// Fails with `Decoding` if the payload holds zero or several values.
    pub fn value(&self) -> RegbusResult<RegisterValue> {
        let values = self.values()?;
        match values.as_slice() {
            [single] => Ok(*single),
            other => Err(RegbusError::Decoding(format!(
                "expected a single value, payload holds {}",
                other.len()
            ))),
        }
    }

    /// Interpret the payload as a UTF-8 string (string registers)
    ///
    /// Trailing NUL padding is stripped.
    pub fn payload_str(&self) -> RegbusResult<&str> {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.payload.len());
        std::str::from_utf8(&self.payload[..end])
            .map_err(|e| RegbusError::Decoding(format!("payload is not valid UTF-8: {}", e)))
    }
}

impl fmt::Display for ReplyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} frame: register={}, port={}, type={:?}, t={}, {} payload byte(s)",
            self.message_type,
            self.address,
            self.port,
            self.payload_type,
            self.timestamp,
            self.payload.len()
        )
    }
}
