//! Stream frame reader
//!
//! Reassembles exactly one raw frame per call from a [`StreamAccessor`]:
//! one message-type byte, one length byte, then `length` further bytes.
//! The reader never imposes a timeout of its own; pacing belongs to the
//! stream. A timeout before the first byte simply means "no frame yet".

use regbus_core::{RegbusError, RegbusResult};
use regbus_transport::StreamAccessor;

/// Frame reader over a raw byte stream
pub struct FrameReader;

impl FrameReader {
    /// Read one complete frame from the stream
    ///
    /// Returns `Ok(None)` when the stream timed out before producing the
    /// first byte. Once the first byte has arrived the frame must complete:
    /// a timeout or EOF mid-frame is a `TruncatedFrame` error. EOF before
    /// the first byte is `StreamClosed`.
    ///
    /// Partial reads are fine; the frame may arrive in any number of chunks.
    pub async fn read_frame<S: StreamAccessor + ?Sized>(
        stream: &mut S,
    ) -> RegbusResult<Option<Vec<u8>>> {
        let mut header = [0u8; 2];

        // Message type byte. Silence here is not an error.
        match Self::read_one(stream, &mut header[..1]).await {
            Ok(()) => {}
            Err(RegbusError::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        }

        // Length byte and body: the frame has started, it must finish.
        Self::read_remainder(stream, &mut header[1..]).await?;
        let length = header[1] as usize;

        let mut frame = Vec::with_capacity(2 + length);
        frame.extend_from_slice(&header);
        frame.resize(2 + length, 0);
        Self::read_remainder(stream, &mut frame[2..]).await?;

        Ok(Some(frame))
    }

    /// Read the first byte of a frame
    async fn read_one<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        buf: &mut [u8],
    ) -> RegbusResult<()> {
        match stream.read(buf).await? {
            0 => Err(RegbusError::StreamClosed),
            _ => Ok(()),
        }
    }

    /// Fill `buf`, converting exhaustion into `TruncatedFrame`
    async fn read_remainder<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        mut buf: &mut [u8],
    ) -> RegbusResult<()> {
        let wanted = buf.len();
        let mut got = 0usize;
        while !buf.is_empty() {
            let n = match stream.read(buf).await {
                Ok(n) => n,
                Err(RegbusError::Timeout) | Err(RegbusError::Connection(_)) => {
                    return Err(RegbusError::TruncatedFrame(format!(
                        "stream ended after {} of {} frame bytes",
                        got, wanted
                    )));
                }
                Err(e) => return Err(e),
            };
            if n == 0 {
                return Err(RegbusError::TruncatedFrame(format!(
                    "stream ended after {} of {} frame bytes",
                    got, wanted
                )));
            }
            got += n;
            buf = &mut buf[n..];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Scripted byte source serving pre-arranged read chunks
    struct ScriptedStream {
        chunks: VecDeque<Vec<u8>>,
        eof: bool,
    }

    impl ScriptedStream {
        fn new(chunks: Vec<Vec<u8>>, eof: bool) -> Self {
            Self {
                chunks: chunks.into(),
                eof,
            }
        }
    }

    #[async_trait]
    impl StreamAccessor for ScriptedStream {
        async fn set_timeout(&mut self, _timeout: Option<Duration>) -> RegbusResult<()> {
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8]) -> RegbusResult<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(chunk[n..].to_vec());
                    }
                    Ok(n)
                }
                None if self.eof => Ok(0),
                None => Err(RegbusError::Timeout),
            }
        }

        async fn write(&mut self, buf: &[u8]) -> RegbusResult<usize> {
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

    // A 13-byte reply frame: type=1, length=11, one payload byte.
    fn sample_frame() -> Vec<u8> {
        vec![1, 11, 42, 255, 1, 0, 0, 0, 0, 0, 0, 7, 61]
    }

    #[tokio::test]
    async fn test_whole_frame_in_one_read() {
        let mut stream = ScriptedStream::new(vec![sample_frame()], false);
        let frame = FrameReader::read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(frame, sample_frame());
    }

    #[tokio::test]
    async fn test_frame_across_three_partial_reads() {
        let raw = sample_frame();
        let chunks = vec![raw[..1].to_vec(), raw[1..6].to_vec(), raw[6..].to_vec()];
        let mut stream = ScriptedStream::new(chunks, false);
        let frame = FrameReader::read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(frame, raw);
        // Exactly one frame; the stream is now silent
        assert!(FrameReader::read_frame(&mut stream)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_silent_stream_is_no_frame_yet() {
        let mut stream = ScriptedStream::new(vec![], false);
        assert!(FrameReader::read_frame(&mut stream)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_eof_before_frame_is_stream_closed() {
        let mut stream = ScriptedStream::new(vec![], true);
        assert!(matches!(
            FrameReader::read_frame(&mut stream).await,
            Err(RegbusError::StreamClosed)
        ));
    }

    #[tokio::test]
    async fn test_exhaustion_mid_frame_is_truncated() {
        let raw = sample_frame();
        let mut stream = ScriptedStream::new(vec![raw[..5].to_vec()], true);
        assert!(matches!(
            FrameReader::read_frame(&mut stream).await,
            Err(RegbusError::TruncatedFrame(_))
        ));

        // Same with a timeout instead of EOF
        let mut stream = ScriptedStream::new(vec![raw[..5].to_vec()], false);
        assert!(matches!(
            FrameReader::read_frame(&mut stream).await,
            Err(RegbusError::TruncatedFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_two_frames_back_to_back() {
        let mut both = sample_frame();
        both.extend_from_slice(&sample_frame());
        let mut stream = ScriptedStream::new(vec![both], false);
        let first = FrameReader::read_frame(&mut stream).await.unwrap().unwrap();
        let second = FrameReader::read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(first, sample_frame());
        assert_eq!(second, sample_frame());
    }
}
