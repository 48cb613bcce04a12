//! Typed register values and the payload codec
//!
//! Values travel on the wire as fixed-width little-endian fields: unsigned
//! integers, two's-complement signed integers, or IEEE-754 single-precision
//! floats, as described by the frame's [`PayloadType`] descriptor.

use crate::error::{RegbusError, RegbusResult};
use crate::payload::PayloadType;
use std::fmt;

/// A single decoded register value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    U8(u8),
    S8(i8),
    U16(u16),
    S16(i16),
    U32(u32),
    S32(i32),
    U64(u64),
    S64(i64),
    F32(f32),
}

impl RegisterValue {
    /// Build a value of the descriptor's kind from an unsigned integer
    ///
    /// Fails with `Encoding` if the descriptor is signed or float, or if the
    /// value does not fit the descriptor's width.
    pub fn from_unsigned(ty: PayloadType, value: u64) -> RegbusResult<Self> {
        let out_of_range = || {
            RegbusError::Encoding(format!(
                "value {} out of range for {:?}",
                value,
                ty.base()
            ))
        };
        match ty.base() {
            PayloadType::U8 => Ok(RegisterValue::U8(
                u8::try_from(value).map_err(|_| out_of_range())?,
            )),
            PayloadType::U16 => Ok(RegisterValue::U16(
                u16::try_from(value).map_err(|_| out_of_range())?,
            )),
            PayloadType::U32 => Ok(RegisterValue::U32(
                u32::try_from(value).map_err(|_| out_of_range())?,
            )),
            PayloadType::U64 => Ok(RegisterValue::U64(value)),
            other => Err(RegbusError::Encoding(format!(
                "unsigned value given for {:?} payload",
                other
            ))),
        }
    }

    /// Build a value of the descriptor's kind from a signed integer
    pub fn from_signed(ty: PayloadType, value: i64) -> RegbusResult<Self> {
        let out_of_range = || {
            RegbusError::Encoding(format!(
                "value {} out of range for {:?}",
                value,
                ty.base()
            ))
        };
        match ty.base() {
            PayloadType::S8 => Ok(RegisterValue::S8(
                i8::try_from(value).map_err(|_| out_of_range())?,
            )),
            PayloadType::S16 => Ok(RegisterValue::S16(
                i16::try_from(value).map_err(|_| out_of_range())?,
            )),
            PayloadType::S32 => Ok(RegisterValue::S32(
                i32::try_from(value).map_err(|_| out_of_range())?,
            )),
            PayloadType::S64 => Ok(RegisterValue::S64(value)),
            other => Err(RegbusError::Encoding(format!(
                "signed value given for {:?} payload",
                other
            ))),
        }
    }

    /// The descriptor kind this value belongs to (timestamp bit cleared)
    pub fn payload_type(&self) -> PayloadType {
        match self {
            RegisterValue::U8(_) => PayloadType::U8,
            RegisterValue::S8(_) => PayloadType::S8,
            RegisterValue::U16(_) => PayloadType::U16,
            RegisterValue::S16(_) => PayloadType::S16,
            RegisterValue::U32(_) => PayloadType::U32,
            RegisterValue::S32(_) => PayloadType::S32,
            RegisterValue::U64(_) => PayloadType::U64,
            RegisterValue::S64(_) => PayloadType::S64,
            RegisterValue::F32(_) => PayloadType::F32,
        }
    }

    /// The value widened to u64, if it is an unsigned integer
    pub fn as_unsigned(&self) -> Option<u64> {
        match *self {
            RegisterValue::U8(v) => Some(v as u64),
            RegisterValue::U16(v) => Some(v as u64),
            RegisterValue::U32(v) => Some(v as u64),
            RegisterValue::U64(v) => Some(v),
            _ => None,
        }
    }

    /// The value widened to i64, if it is any integer
    pub fn as_signed(&self) -> Option<i64> {
        match *self {
            RegisterValue::U8(v) => Some(v as i64),
            RegisterValue::U16(v) => Some(v as i64),
            RegisterValue::U32(v) => Some(v as i64),
            RegisterValue::U64(v) => i64::try_from(v).ok(),
            RegisterValue::S8(v) => Some(v as i64),
            RegisterValue::S16(v) => Some(v as i64),
            RegisterValue::S32(v) => Some(v as i64),
            RegisterValue::S64(v) => Some(v),
            RegisterValue::F32(_) => None,
        }
    }

    /// The value as f32, if it is a float
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            RegisterValue::F32(v) => Some(v),
            _ => None,
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        match *self {
            RegisterValue::U8(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::S8(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::S16(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::S32(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::S64(v) => out.extend_from_slice(&v.to_le_bytes()),
            RegisterValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn read_le(ty: PayloadType, chunk: &[u8]) -> Self {
        match ty.base() {
            PayloadType::U8 => RegisterValue::U8(chunk[0]),
            PayloadType::S8 => RegisterValue::S8(chunk[0] as i8),
            PayloadType::U16 => RegisterValue::U16(u16::from_le_bytes([chunk[0], chunk[1]])),
            PayloadType::S16 => RegisterValue::S16(i16::from_le_bytes([chunk[0], chunk[1]])),
            PayloadType::U32 => RegisterValue::U32(u32::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3],
            ])),
            PayloadType::S32 => RegisterValue::S32(i32::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3],
            ])),
            PayloadType::U64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(chunk);
                RegisterValue::U64(u64::from_le_bytes(b))
            }
            PayloadType::S64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(chunk);
                RegisterValue::S64(i64::from_le_bytes(b))
            }
            PayloadType::F32 => RegisterValue::F32(f32::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3],
            ])),
            _ => unreachable!("base() never returns a timestamped variant"),
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::U8(v) => write!(f, "{}", v),
            RegisterValue::S8(v) => write!(f, "{}", v),
            RegisterValue::U16(v) => write!(f, "{}", v),
            RegisterValue::S16(v) => write!(f, "{}", v),
            RegisterValue::U32(v) => write!(f, "{}", v),
            RegisterValue::S32(v) => write!(f, "{}", v),
            RegisterValue::U64(v) => write!(f, "{}", v),
            RegisterValue::S64(v) => write!(f, "{}", v),
            RegisterValue::F32(v) => write!(f, "{}", v),
        }
    }
}

/// Serialize values as the payload of a frame with the given descriptor
///
/// Every value must match the descriptor's kind; mixing kinds or passing a
/// value of the wrong width fails with `Encoding`.
pub fn encode_payload(ty: PayloadType, values: &[RegisterValue]) -> RegbusResult<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * ty.width() as usize);
    for value in values {
        if value.payload_type() != ty.base() {
            return Err(RegbusError::Encoding(format!(
                "{:?} value in a {:?} payload",
                value.payload_type(),
                ty.base()
            )));
        }
        value.write_le(&mut out);
    }
    Ok(out)
}

/// Deserialize a frame payload into values per the descriptor
///
/// Fails with `Decoding` if the byte count is not a multiple of the
/// descriptor's width.
pub fn decode_payload(ty: PayloadType, bytes: &[u8]) -> RegbusResult<Vec<RegisterValue>> {
    let width = ty.width() as usize;
    if bytes.len() % width != 0 {
        return Err(RegbusError::Decoding(format!(
            "payload length {} is not a multiple of element width {}",
            bytes.len(),
            width
        )));
    }
    Ok(bytes
        .chunks_exact(width)
        .map(|chunk| RegisterValue::read_le(ty, chunk))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(ty: PayloadType, value: RegisterValue) {
        let bytes = encode_payload(ty, &[value]).unwrap();
        assert_eq!(bytes.len(), ty.width() as usize);
        let decoded = decode_payload(ty, &bytes).unwrap();
        assert_eq!(decoded, vec![value]);
    }

    #[test]
    fn test_round_trip_boundaries() {
        round_trip(PayloadType::U8, RegisterValue::U8(0));
        round_trip(PayloadType::U8, RegisterValue::U8(u8::MAX));
        round_trip(PayloadType::S8, RegisterValue::S8(i8::MIN));
        round_trip(PayloadType::S8, RegisterValue::S8(i8::MAX));
        round_trip(PayloadType::U16, RegisterValue::U16(0));
        round_trip(PayloadType::U16, RegisterValue::U16(u16::MAX));
        round_trip(PayloadType::S16, RegisterValue::S16(i16::MIN));
        round_trip(PayloadType::S16, RegisterValue::S16(i16::MAX));
        round_trip(PayloadType::U32, RegisterValue::U32(u32::MAX));
        round_trip(PayloadType::S32, RegisterValue::S32(i32::MIN));
        round_trip(PayloadType::U64, RegisterValue::U64(u64::MAX));
        round_trip(PayloadType::S64, RegisterValue::S64(i64::MIN));
        round_trip(PayloadType::F32, RegisterValue::F32(0.0));
        round_trip(PayloadType::F32, RegisterValue::F32(f32::MAX));
    }

    #[test]
    fn test_little_endian_two_complement() {
        let bytes = encode_payload(PayloadType::U16, &[RegisterValue::U16(1024)]).unwrap();
        assert_eq!(bytes, vec![0, 4]);
        let bytes = encode_payload(PayloadType::S16, &[RegisterValue::S16(-4837)]).unwrap();
        assert_eq!(bytes, vec![27, 237]);
        let bytes = encode_payload(PayloadType::S8, &[RegisterValue::S8(-3)]).unwrap();
        assert_eq!(bytes, vec![0xFD]);
    }

    #[test]
    fn test_multi_value_payload() {
        let values = vec![
            RegisterValue::U16(1),
            RegisterValue::U16(2),
            RegisterValue::U16(515),
        ];
        let bytes = encode_payload(PayloadType::U16, &values).unwrap();
        assert_eq!(bytes, vec![1, 0, 2, 0, 3, 2]);
        assert_eq!(decode_payload(PayloadType::U16, &bytes).unwrap(), values);
    }

    #[test]
    fn test_decode_rejects_ragged_payload() {
        let err = decode_payload(PayloadType::U16, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, RegbusError::Decoding(_)));
    }

    #[test]
    fn test_encode_rejects_kind_mismatch() {
        let err = encode_payload(PayloadType::U16, &[RegisterValue::U8(1)]).unwrap_err();
        assert!(matches!(err, RegbusError::Encoding(_)));
    }

    #[test]
    fn test_checked_constructors() {
        assert_eq!(
            RegisterValue::from_unsigned(PayloadType::U8, 255).unwrap(),
            RegisterValue::U8(255)
        );
        assert!(RegisterValue::from_unsigned(PayloadType::U8, 256).is_err());
        assert_eq!(
            RegisterValue::from_signed(PayloadType::S16, -32768).unwrap(),
            RegisterValue::S16(i16::MIN)
        );
        assert!(RegisterValue::from_signed(PayloadType::S16, 32768).is_err());
        assert!(RegisterValue::from_unsigned(PayloadType::S8, 1).is_err());
        assert!(RegisterValue::from_signed(PayloadType::F32, 1).is_err());
        // Timestamped descriptors carry the same value kinds
        assert_eq!(
            RegisterValue::from_unsigned(PayloadType::TimestampedU16, 7).unwrap(),
            RegisterValue::U16(7)
        );
    }
}
