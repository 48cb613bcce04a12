//! Common register addresses
//!
//! Every device exposes the same core register block below address 0x0D.
//! Device-specific maps live with the device, not here; these are the
//! protocol-defined addresses a generic client may rely on.

/// Device identity, `U16`
pub const WHO_AM_I: u8 = 0x00;
/// Hardware version, major part, `U8`
pub const HW_VERSION_H: u8 = 0x01;
/// Hardware version, minor part, `U8`
pub const HW_VERSION_L: u8 = 0x02;
/// Assembly version, `U8`
pub const ASSEMBLY_VERSION: u8 = 0x03;
/// Core protocol version, major part, `U8`
pub const CORE_VERSION_H: u8 = 0x04;
/// Core protocol version, minor part, `U8`
pub const CORE_VERSION_L: u8 = 0x05;
/// Firmware version, major part, `U8`
pub const FIRMWARE_VERSION_H: u8 = 0x06;
/// Firmware version, minor part, `U8`
pub const FIRMWARE_VERSION_L: u8 = 0x07;
/// Device clock, whole seconds, `U32`
pub const TIMESTAMP_SECOND: u8 = 0x08;
/// Device clock, sub-second ticks, `U16`
pub const TIMESTAMP_MICRO: u8 = 0x09;
/// Operation control: mode bits, dump flags, `U8`
pub const OPERATION_CTRL: u8 = 0x0A;
/// Write to reset the device, `U8`
pub const RESET_DEV: u8 = 0x0B;
/// User-assigned device name, NUL-padded string
pub const DEVICE_NAME: u8 = 0x0C;

/// Mask of the operation-mode bits within [`OPERATION_CTRL`]
pub const OPERATION_MODE_MASK: u8 = 0x03;

/// Operation modes encoded in the low bits of [`OPERATION_CTRL`]
///
/// A device emits Event frames only while in [`DeviceMode::Active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Registers respond to reads/writes; events are suppressed
    Standby = 0,
    /// Events fire for every enabled event source
    Active = 1,
}

impl DeviceMode {
    /// Decode the mode bits of an OPERATION_CTRL value
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & OPERATION_MODE_MASK {
            0 => Some(DeviceMode::Standby),
            1 => Some(DeviceMode::Active),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_bits() {
        assert_eq!(DeviceMode::from_bits(0x00), Some(DeviceMode::Standby));
        assert_eq!(DeviceMode::from_bits(0x01), Some(DeviceMode::Active));
        // Upper bits (dump flags etc.) do not disturb the mode
        assert_eq!(DeviceMode::from_bits(0x81), Some(DeviceMode::Active));
        assert_eq!(DeviceMode::from_bits(0x03), None);
    }
}
