//! Frame checksum calculation
//!
//! The protocol uses a one-byte additive checksum: the sum of every frame
//! byte preceding the checksum, modulo 256.

use regbus_core::{RegbusError, RegbusResult};

/// Additive checksum calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct Checksum {
    value: u8,
}

impl Checksum {
    /// Create a new checksum calculator
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the checksum to its initial state
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Update the checksum with a single byte
    pub fn update(&mut self, byte: u8) {
        self.value = self.value.wrapping_add(byte);
    }

    /// Update the checksum with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Get the current checksum value
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Validate the checksum against the byte received on the wire
    pub fn validate(&self, received: u8) -> RegbusResult<()> {
        if self.value != received {
            Err(RegbusError::ChecksumMismatch {
                expected: received,
                computed: self.value,
            })
        } else {
            Ok(())
        }
    }

    /// Checksum of a complete byte slice
    pub fn of(data: &[u8]) -> u8 {
        let mut calc = Self::new();
        calc.update_bytes(data);
        calc.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_wraps_mod_256() {
        assert_eq!(Checksum::of(&[1, 4, 42, 255, 2]), 48);
        assert_eq!(Checksum::of(&[2, 5, 42, 255, 1, 23]), 72);
        assert_eq!(Checksum::of(&[]), 0);
    }

    #[test]
    fn test_validate() {
        let mut calc = Checksum::new();
        calc.update_bytes(&[1, 4, 42, 255, 2]);
        assert!(calc.validate(48).is_ok());
        assert!(matches!(
            calc.validate(49),
            Err(RegbusError::ChecksumMismatch {
                expected: 49,
                computed: 48
            })
        ));
    }
}
