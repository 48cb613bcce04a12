//! Payload-type descriptor for register values
//!
//! Every frame carries a one-byte descriptor of its payload encoding:
//! bit 7 = signed, bit 6 = float, bit 4 = timestamped values, bits 0-3 =
//! element width in bytes (1, 2, 4 or 8). The protocol only uses a fixed
//! enumeration of descriptor bytes; anything else is rejected.

use crate::error::{RegbusError, RegbusResult};

const SIGNED_BIT: u8 = 0x80;
const FLOAT_BIT: u8 = 0x40;
const TIMESTAMP_BIT: u8 = 0x10;

/// Payload-type descriptor
///
/// The fixed enumeration of descriptor bytes supported by the protocol.
/// Floats are always IEEE-754 single precision (width 4). The `Timestamped*`
/// variants mark payloads whose values were sampled against the device clock;
/// the wire layout of a reply is identical either way (replies always carry
/// the timestamp field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    F32,
    TimestampedU8,
    TimestampedS8,
    TimestampedU16,
    TimestampedS16,
    TimestampedU32,
    TimestampedS32,
    TimestampedU64,
    TimestampedS64,
    TimestampedF32,
}

impl PayloadType {
    /// Decode a descriptor byte
    ///
    /// Returns `InvalidPayloadType` for any byte outside the fixed
    /// enumeration (unsupported width, float with a width other than 4,
    /// signed float, or stray bits).
    pub fn from_byte(byte: u8) -> RegbusResult<Self> {
        const S: u8 = SIGNED_BIT;
        const F: u8 = FLOAT_BIT;
        let ty = match byte & !TIMESTAMP_BIT {
            1 => PayloadType::U8,
            2 => PayloadType::U16,
            4 => PayloadType::U32,
            8 => PayloadType::U64,
            x if x == S | 1 => PayloadType::S8,
            x if x == S | 2 => PayloadType::S16,
            x if x == S | 4 => PayloadType::S32,
            x if x == S | 8 => PayloadType::S64,
            x if x == F | 4 => PayloadType::F32,
            _ => return Err(RegbusError::InvalidPayloadType(byte)),
        };
        if byte & TIMESTAMP_BIT != 0 {
            Ok(ty.timestamped())
        } else {
            Ok(ty)
        }
    }

    /// Encode the descriptor byte
    pub fn to_byte(self) -> u8 {
        let mut byte = self.width();
        if self.is_signed() {
            byte |= SIGNED_BIT;
        }
        if self.is_float() {
            byte = FLOAT_BIT | 4;
        }
        if self.has_timestamp() {
            byte |= TIMESTAMP_BIT;
        }
        byte
    }

    /// Element width in bytes (1, 2, 4 or 8)
    pub fn width(self) -> u8 {
        match self.base() {
            PayloadType::U8 | PayloadType::S8 => 1,
            PayloadType::U16 | PayloadType::S16 => 2,
            PayloadType::U32 | PayloadType::S32 | PayloadType::F32 => 4,
            PayloadType::U64 | PayloadType::S64 => 8,
            _ => unreachable!("base() never returns a timestamped variant"),
        }
    }

    /// Whether values are two's-complement signed integers
    pub fn is_signed(self) -> bool {
        matches!(
            self.base(),
            PayloadType::S8 | PayloadType::S16 | PayloadType::S32 | PayloadType::S64
        )
    }

    /// Whether values are IEEE-754 single-precision floats
    pub fn is_float(self) -> bool {
        matches!(self.base(), PayloadType::F32)
    }

    /// Whether the timestamp bit is set on the descriptor
    pub fn has_timestamp(self) -> bool {
        self.base() != self
    }

    /// The descriptor with the timestamp bit cleared
    pub fn base(self) -> Self {
        match self {
            PayloadType::TimestampedU8 => PayloadType::U8,
            PayloadType::TimestampedS8 => PayloadType::S8,
            PayloadType::TimestampedU16 => PayloadType::U16,
            PayloadType::TimestampedS16 => PayloadType::S16,
            PayloadType::TimestampedU32 => PayloadType::U32,
            PayloadType::TimestampedS32 => PayloadType::S32,
            PayloadType::TimestampedU64 => PayloadType::U64,
            PayloadType::TimestampedS64 => PayloadType::S64,
            PayloadType::TimestampedF32 => PayloadType::F32,
            other => other,
        }
    }

    /// The descriptor with the timestamp bit set
    pub fn timestamped(self) -> Self {
        match self.base() {
            PayloadType::U8 => PayloadType::TimestampedU8,
            PayloadType::S8 => PayloadType::TimestampedS8,
            PayloadType::U16 => PayloadType::TimestampedU16,
            PayloadType::S16 => PayloadType::TimestampedS16,
            PayloadType::U32 => PayloadType::TimestampedU32,
            PayloadType::S32 => PayloadType::TimestampedS32,
            PayloadType::U64 => PayloadType::TimestampedU64,
            PayloadType::S64 => PayloadType::TimestampedS64,
            PayloadType::F32 => PayloadType::TimestampedF32,
            _ => unreachable!("base() never returns a timestamped variant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_bytes() {
        assert_eq!(PayloadType::U8.to_byte(), 1);
        assert_eq!(PayloadType::S8.to_byte(), 129);
        assert_eq!(PayloadType::U16.to_byte(), 2);
        assert_eq!(PayloadType::S16.to_byte(), 130);
        assert_eq!(PayloadType::U32.to_byte(), 4);
        assert_eq!(PayloadType::S32.to_byte(), 132);
        assert_eq!(PayloadType::U64.to_byte(), 8);
        assert_eq!(PayloadType::S64.to_byte(), 136);
        assert_eq!(PayloadType::F32.to_byte(), 68);
        assert_eq!(PayloadType::TimestampedU16.to_byte(), 0x12);
        assert_eq!(PayloadType::TimestampedF32.to_byte(), 0x54);
    }

    #[test]
    fn test_byte_round_trip() {
        let all = [
            PayloadType::U8,
            PayloadType::S8,
            PayloadType::U16,
            PayloadType::S16,
            PayloadType::U32,
            PayloadType::S32,
            PayloadType::U64,
            PayloadType::S64,
            PayloadType::F32,
        ];
        for ty in all {
            assert_eq!(PayloadType::from_byte(ty.to_byte()).unwrap(), ty);
            let stamped = ty.timestamped();
            assert_eq!(PayloadType::from_byte(stamped.to_byte()).unwrap(), stamped);
            assert!(stamped.has_timestamp());
            assert_eq!(stamped.base(), ty);
            assert_eq!(stamped.width(), ty.width());
        }
    }

    #[test]
    fn test_rejects_unsupported_descriptors() {
        // Width 3 does not exist
        assert!(matches!(
            PayloadType::from_byte(3),
            Err(RegbusError::InvalidPayloadType(3))
        ));
        // Float must have width 4
        assert!(PayloadType::from_byte(0x41).is_err());
        assert!(PayloadType::from_byte(0x48).is_err());
        // Signed float is not a thing
        assert!(PayloadType::from_byte(0xC4).is_err());
        // Bare timestamp (width 0) is not part of the enumeration
        assert!(PayloadType::from_byte(0x10).is_err());
        assert!(PayloadType::from_byte(0).is_err());
    }
}
