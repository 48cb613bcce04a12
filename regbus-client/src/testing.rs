//! Shared test doubles for the client crate

use async_trait::async_trait;
use bytes::BufMut;
use regbus_core::{RegbusError, RegbusResult};
use regbus_protocol::{Checksum, DEFAULT_PORT};
use regbus_transport::StreamAccessor;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scriptable duplex stream shared between a test and the read loop
///
/// Reads serve bytes from `incoming`; an empty buffer yields a short sleep
/// and then `Timeout`, like a silent serial port. Each `write` appends to
/// `written` and releases the next scripted `on_write` entry into
/// `incoming`, so replies only become readable once the request is on the
/// wire.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    incoming: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    on_write: VecDeque<Vec<u8>>,
}

impl MockTransport {
    pub(crate) fn push_incoming(&self, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .incoming
            .extend(bytes.iter().copied());
    }

    pub(crate) fn script_reply(&self, bytes: Vec<u8>) {
        self.state.lock().unwrap().on_write.push_back(bytes);
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }
}

#[async_trait]
impl StreamAccessor for MockTransport {
    async fn set_timeout(&mut self, _timeout: Option<Duration>) -> RegbusResult<()> {
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> RegbusResult<usize> {
        let served = {
            let mut state = self.state.lock().unwrap();
            let n = state.incoming.len().min(buf.len());
            for slot in buf.iter_mut().take(n) {
                *slot = state.incoming.pop_front().unwrap();
            }
            n
        };
        if served == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            return Err(RegbusError::Timeout);
        }
        Ok(served)
    }

    async fn write(&mut self, buf: &[u8]) -> RegbusResult<usize> {
        let mut state = self.state.lock().unwrap();
        state.written.push(buf.to_vec());
        if let Some(reply) = state.on_write.pop_front() {
            state.incoming.extend(reply);
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> RegbusResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }

    async fn close(&mut self) -> RegbusResult<()> {
        Ok(())
    }
}

/// Build a complete device frame with a zeroed timestamp and valid checksum
pub(crate) fn frame(message_type: u8, address: u8, payload_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.put_u8(message_type);
    raw.put_u8(10 + payload.len() as u8);
    raw.put_u8(address);
    raw.put_u8(DEFAULT_PORT);
    raw.put_u8(payload_type);
    raw.put_u32_le(11);
    raw.put_u16_le(0);
    raw.extend_from_slice(payload);
    raw.put_u8(Checksum::of(&raw));
    raw
}

/// A Read reply carrying one `U8` value
pub(crate) fn reply(address: u8, value: u8) -> Vec<u8> {
    frame(1, address, 1, &[value])
}

/// An Event frame carrying one `U8` value
pub(crate) fn event(address: u8, value: u8) -> Vec<u8> {
    frame(3, address, 1, &[value])
}

/// Poll `condition` for up to a second before giving up
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}
