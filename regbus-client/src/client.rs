//! High-level register access
//!
//! [`RegisterClient`] is a thin convenience layer over the multiplexer: it
//! builds request frames, applies one default deadline to every exchange,
//! and turns device error replies into [`RegbusError::RegisterRejected`].
//! It adds no protocol state of its own.

use crate::multiplexer::{EventSubscription, Multiplexer};
use crate::statistics::StatisticsSnapshot;
use regbus_core::{PayloadType, RegbusError, RegbusResult, RegisterValue};
use regbus_protocol::registers::{self, DeviceMode};
use regbus_protocol::{ReplyFrame, RequestFrame};
use std::sync::Arc;
use std::time::Duration;

/// Identity block read from the core registers of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device identity code (`WHO_AM_I`)
    pub who_am_i: u16,
    /// Hardware version as (major, minor)
    pub hardware_version: (u8, u8),
    /// Assembly variant
    pub assembly_version: u8,
    /// Core protocol version as (major, minor)
    pub core_version: (u8, u8),
    /// Firmware version as (major, minor)
    pub firmware_version: (u8, u8),
    /// User-assigned device name, NUL padding stripped
    pub device_name: String,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (id {}, hw {}.{}, fw {}.{})",
            self.device_name,
            self.who_am_i,
            self.hardware_version.0,
            self.hardware_version.1,
            self.firmware_version.0,
            self.firmware_version.1,
        )
    }
}

/// Typed register access over a running [`Multiplexer`]
///
/// Clones share the multiplexer, so a client can be handed to several
/// tasks; request ordering guarantees are those of the multiplexer's queue
/// policy.
#[derive(Clone)]
pub struct RegisterClient {
    mux: Arc<Multiplexer>,
    deadline: Duration,
}

impl RegisterClient {
    /// Wrap a multiplexer, applying `deadline` to every exchange
    pub fn new(mux: Arc<Multiplexer>, deadline: Duration) -> Self {
        Self { mux, deadline }
    }

    /// Read a register, returning the full reply frame
    pub async fn read(&self, address: u8, payload_type: PayloadType) -> RegbusResult<ReplyFrame> {
        let reply = self
            .mux
            .send(RequestFrame::read(address, payload_type), self.deadline)
            .await?;
        Self::check_rejection(reply)
    }

    /// Read a register expected to hold exactly one value
    pub async fn read_value(
        &self,
        address: u8,
        payload_type: PayloadType,
    ) -> RegbusResult<RegisterValue> {
        self.read(address, payload_type).await?.value()
    }

    /// Read a register holding an array of values
    pub async fn read_values(
        &self,
        address: u8,
        payload_type: PayloadType,
    ) -> RegbusResult<Vec<RegisterValue>> {
        self.read(address, payload_type).await?.values()
    }

    /// Read a `U8` register
    pub async fn read_u8(&self, address: u8) -> RegbusResult<u8> {
        match self.read_value(address, PayloadType::U8).await? {
            RegisterValue::U8(v) => Ok(v),
            other => Err(RegbusError::Decoding(format!(
                "register {} replied with {:?} instead of a u8",
                address, other
            ))),
        }
    }

    /// Read a `U16` register
    pub async fn read_u16(&self, address: u8) -> RegbusResult<u16> {
        match self.read_value(address, PayloadType::U16).await? {
            RegisterValue::U16(v) => Ok(v),
            other => Err(RegbusError::Decoding(format!(
                "register {} replied with {:?} instead of a u16",
                address, other
            ))),
        }
    }

    /// Read a register holding a NUL-padded string
    pub async fn read_str(&self, address: u8) -> RegbusResult<String> {
        let reply = self.read(address, PayloadType::U8).await?;
        Ok(reply.payload_str()?.to_owned())
    }

    /// Write one or more values to a register, returning the echo reply
    pub async fn write(
        &self,
        address: u8,
        payload_type: PayloadType,
        values: &[RegisterValue],
    ) -> RegbusResult<ReplyFrame> {
        let request = RequestFrame::write(address, payload_type, values)?;
        let reply = self.mux.send(request, self.deadline).await?;
        Self::check_rejection(reply)
    }

    /// Write a single value to a register
    pub async fn write_value(&self, address: u8, value: RegisterValue) -> RegbusResult<ReplyFrame> {
        self.write(address, value.payload_type(), &[value]).await
    }

    /// Read the identity block every device exposes
    pub async fn device_info(&self) -> RegbusResult<DeviceInfo> {
        Ok(DeviceInfo {
            who_am_i: self.read_u16(registers::WHO_AM_I).await?,
            hardware_version: (
                self.read_u8(registers::HW_VERSION_H).await?,
                self.read_u8(registers::HW_VERSION_L).await?,
            ),
            assembly_version: self.read_u8(registers::ASSEMBLY_VERSION).await?,
            core_version: (
                self.read_u8(registers::CORE_VERSION_H).await?,
                self.read_u8(registers::CORE_VERSION_L).await?,
            ),
            firmware_version: (
                self.read_u8(registers::FIRMWARE_VERSION_H).await?,
                self.read_u8(registers::FIRMWARE_VERSION_L).await?,
            ),
            device_name: self.read_str(registers::DEVICE_NAME).await?,
        })
    }

    /// Read the current operation mode
    pub async fn mode(&self) -> RegbusResult<DeviceMode> {
        let ctrl = self.read_u8(registers::OPERATION_CTRL).await?;
        DeviceMode::from_bits(ctrl).ok_or_else(|| {
            RegbusError::InvalidData(format!("unknown operation mode bits {:#04x}", ctrl))
        })
    }

    /// Switch the operation mode, preserving the other control bits
    pub async fn set_mode(&self, mode: DeviceMode) -> RegbusResult<()> {
        let ctrl = self.read_u8(registers::OPERATION_CTRL).await?;
        let ctrl = (ctrl & !registers::OPERATION_MODE_MASK) | mode as u8;
        self.write_value(registers::OPERATION_CTRL, RegisterValue::U8(ctrl))
            .await?;
        Ok(())
    }

    /// Ask the device to reset itself
    ///
    /// The device drops the link while rebooting, so no echo is awaited.
    pub async fn reset(&self) -> RegbusResult<()> {
        match self
            .write_value(registers::RESET_DEV, RegisterValue::U8(1))
            .await
        {
            Ok(_) | Err(RegbusError::Timeout) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Subscribe to unsolicited Event frames
    pub fn events(&self) -> EventSubscription {
        self.mux.subscribe()
    }

    /// Copy the link statistics counters
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.mux.statistics()
    }

    /// Access the underlying multiplexer
    pub fn multiplexer(&self) -> &Multiplexer {
        &self.mux
    }

    fn check_rejection(reply: ReplyFrame) -> RegbusResult<ReplyFrame> {
        if reply.is_error() {
            return Err(RegbusError::RegisterRejected {
                address: reply.address(),
                write: reply.message_type() == regbus_protocol::MessageType::WriteError,
            });
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::MultiplexerConfig;
    use crate::testing::{frame, MockTransport};
    use bytes::BufMut;

    fn client(transport: &MockTransport) -> RegisterClient {
        let mux = Multiplexer::spawn(transport.clone(), MultiplexerConfig::default());
        RegisterClient::new(Arc::new(mux), Duration::from_secs(2))
    }

    fn u16_reply(address: u8, value: u16) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.put_u16_le(value);
        frame(1, address, 2, &payload)
    }

    #[tokio::test]
    async fn test_read_u16_register() {
        let transport = MockTransport::default();
        transport.script_reply(u16_reply(registers::WHO_AM_I, 1024));
        let client = client(&transport);

        assert_eq!(client.read_u16(registers::WHO_AM_I).await.unwrap(), 1024);

        // The request frame on the wire: Read, U16, port 255.
        let written = transport.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], vec![1, 4, registers::WHO_AM_I, 255, 2, 6]);
    }

    #[tokio::test]
    async fn test_error_reply_surfaces_as_rejection() {
        let transport = MockTransport::default();
        // WriteError echo for register 42.
        transport.script_reply(frame(10, 42, 1, &[23]));
        let client = client(&transport);

        let err = client
            .write_value(42, RegisterValue::U8(23))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegbusError::RegisterRejected {
                address: 42,
                write: true,
            }
        ));
    }

    #[tokio::test]
    async fn test_device_info_reads_the_core_block() {
        let transport = MockTransport::default();
        transport.script_reply(u16_reply(registers::WHO_AM_I, 2080));
        transport.script_reply(frame(1, registers::HW_VERSION_H, 1, &[1]));
        transport.script_reply(frame(1, registers::HW_VERSION_L, 1, &[2]));
        transport.script_reply(frame(1, registers::ASSEMBLY_VERSION, 1, &[0]));
        transport.script_reply(frame(1, registers::CORE_VERSION_H, 1, &[1]));
        transport.script_reply(frame(1, registers::CORE_VERSION_L, 1, &[11]));
        transport.script_reply(frame(1, registers::FIRMWARE_VERSION_H, 1, &[3]));
        transport.script_reply(frame(1, registers::FIRMWARE_VERSION_L, 1, &[4]));
        transport.script_reply(frame(1, registers::DEVICE_NAME, 1, b"Behavior\0\0\0\0"));
        let client = client(&transport);

        let info = client.device_info().await.unwrap();
        assert_eq!(info.who_am_i, 2080);
        assert_eq!(info.hardware_version, (1, 2));
        assert_eq!(info.core_version, (1, 11));
        assert_eq!(info.firmware_version, (3, 4));
        assert_eq!(info.device_name, "Behavior");
        assert_eq!(info.to_string(), "Behavior (id 2080, hw 1.2, fw 3.4)");
    }

    #[tokio::test]
    async fn test_set_mode_preserves_other_control_bits() {
        let transport = MockTransport::default();
        // OPERATION_CTRL currently 0x80 | Standby: dump flag set, mode 0.
        transport.script_reply(frame(1, registers::OPERATION_CTRL, 1, &[0x80]));
        // Echo of the write.
        transport.script_reply(frame(2, registers::OPERATION_CTRL, 1, &[0x81]));
        let client = client(&transport);

        client.set_mode(DeviceMode::Active).await.unwrap();

        let written = transport.written();
        assert_eq!(written.len(), 2);
        // Second frame is the write carrying 0x81: flag preserved, mode set.
        assert_eq!(written[1][0], 2);
        assert_eq!(written[1][5], 0x81);
    }

    #[tokio::test]
    async fn test_reset_tolerates_a_silent_device() {
        let transport = MockTransport::default();
        // No scripted echo: the device reboots without answering.
        let mux = Multiplexer::spawn(transport.clone(), MultiplexerConfig::default());
        let client = RegisterClient::new(Arc::new(mux), Duration::from_millis(50));

        client.reset().await.unwrap();
        assert_eq!(client.statistics().timeouts, 1);
    }
}
