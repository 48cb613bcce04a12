//! Transport multiplexer
//!
//! One duplex byte stream carries both the reply to every outstanding
//! request and any Event frame the device decides to emit. A design that
//! writes a request and blockingly reads "the" next frame is only correct
//! while the device is otherwise silent; once events are enabled the next
//! frame may belong to nobody, to a subscriber, or to a different caller.
//! The multiplexer therefore owns the stream exclusively: a single internal
//! task pumps frames off the wire, matches reply-shaped frames against
//! pending requests by register address, and fans Event frames out to
//! subscribers.
//!
//! Per request the lifecycle is `AwaitingReply -> Completed | TimedOut |
//! Failed`, each terminal state reached exactly once. The protocol carries
//! no request id, only the register address, so at most one request per
//! address is on the wire at a time; a second `send` to the same address
//! queues behind it or fails fast, per [`QueuePolicy`].

use crate::statistics::{LinkStatistics, StatisticsSnapshot};
use regbus_core::{PayloadType, RegbusError, RegbusResult};
use regbus_protocol::{FrameReader, MessageType, ReplyFrame, RequestFrame};
use regbus_transport::StreamAccessor;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};

/// What to do with a `send` for an address that already has a request in flight
///
/// The wire carries no request id, so two outstanding requests to one
/// address cannot be told apart. `FailFast` rejects the second caller;
/// `QueuePerAddress` holds its frame back and writes it once the first
/// request completes. Cancelling an in-flight request promotes the next
/// queued frame immediately, accepting that a late reply to the cancelled
/// request is then indistinguishable from the promoted one's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Reject with `RequestAlreadyInFlight`
    #[default]
    FailFast,
    /// FIFO-queue per address, one frame on the wire at a time
    QueuePerAddress,
}

/// Multiplexer configuration
#[derive(Debug, Clone)]
pub struct MultiplexerConfig {
    /// Same-address send policy
    pub queue_policy: QueuePolicy,
    /// How long one read-loop iteration waits for the first byte of a frame
    /// before draining the command queue again
    pub poll_interval: Duration,
    /// Capacity of the event fan-out channel; on overflow the oldest event
    /// is dropped and the lagging subscription's drop counter advances
    pub event_capacity: usize,
    /// Append every received raw frame to this file (audit/replay)
    pub dump_path: Option<PathBuf>,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            queue_policy: QueuePolicy::default(),
            poll_interval: Duration::from_millis(20),
            event_capacity: 256,
            dump_path: None,
        }
    }
}

enum Command {
    Send {
        id: u64,
        request: RequestFrame,
        reply_tx: oneshot::Sender<RegbusResult<ReplyFrame>>,
    },
    Cancel {
        address: u8,
        id: u64,
    },
}

/// One request awaiting its reply, exclusively owned by the read loop
struct PendingRequest {
    id: u64,
    payload_type: PayloadType,
    issued_at: Instant,
    reply_tx: oneshot::Sender<RegbusResult<ReplyFrame>>,
    /// Frame bytes still to be written; `None` once on the wire
    encoded: Option<Vec<u8>>,
}

/// A caller's subscription to unsolicited Event frames
///
/// Delivery never blocks the read loop: the channel is bounded and drops
/// its oldest entry on overflow. [`EventSubscription::dropped`] reports how
/// many events this subscriber has lost that way.
pub struct EventSubscription {
    rx: broadcast::Receiver<ReplyFrame>,
    dropped: u64,
}

impl EventSubscription {
    /// Receive the next Event frame, in arrival order
    ///
    /// Returns `StreamClosed` once the multiplexer is gone and the buffer
    /// is drained.
    pub async fn recv(&mut self) -> RegbusResult<ReplyFrame> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.dropped += n;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(RegbusError::StreamClosed)
                }
            }
        }
    }

    /// How many events this subscription has lost to buffer overflow
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Handle to a running multiplexer
///
/// Cheap to use from many tasks; all stream access happens inside the
/// internal task. Dropping the last handle shuts the read loop down.
pub struct Multiplexer {
    cmd_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<ReplyFrame>,
    stats: Arc<LinkStatistics>,
    next_id: AtomicU64,
}

impl Multiplexer {
    /// Take ownership of the transport and spawn the read loop
    pub fn spawn<S>(transport: S, config: MultiplexerConfig) -> Self
    where
        S: StreamAccessor + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let stats = Arc::new(LinkStatistics::new());

        let read_loop = ReadLoop {
            transport,
            cmd_rx,
            event_tx: event_tx.clone(),
            stats: Arc::clone(&stats),
            config,
            pending: HashMap::new(),
            dump: None,
        };
        tokio::spawn(read_loop.run());

        Self {
            cmd_tx,
            event_tx,
            stats,
            next_id: AtomicU64::new(0),
        }
    }

    /// Issue a request and suspend until its reply or the deadline
    ///
    /// On deadline the request is cancelled and `Timeout` returned; a reply
    /// arriving afterwards is counted as an orphan, never delivered to a
    /// later caller.
    pub async fn send(
        &self,
        request: RequestFrame,
        deadline: Duration,
    ) -> RegbusResult<ReplyFrame> {
        let address = request.address();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(Command::Send {
                id,
                request,
                reply_tx,
            })
            .await
            .map_err(|_| RegbusError::StreamClosed)?;

        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RegbusError::StreamClosed),
            Err(_) => {
                // Cooperative cancellation: the read loop drops the pending
                // entry, so a late reply becomes an orphan.
                let _ = self.cmd_tx.send(Command::Cancel { address, id }).await;
                self.stats.increment_timeouts();
                Err(RegbusError::Timeout)
            }
        }
    }

    /// Register a sink for unsolicited Event frames
    ///
    /// Events are delivered in arrival order to every live subscription and
    /// never satisfy a pending request.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.event_tx.subscribe(),
            dropped: 0,
        }
    }

    /// Copy the link statistics counters
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }
}

/// The single owner of the transport
struct ReadLoop<S> {
    transport: S,
    cmd_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<ReplyFrame>,
    stats: Arc<LinkStatistics>,
    config: MultiplexerConfig,
    /// AwaitingReply requests, FIFO per register address; only the front
    /// entry of a queue is on the wire
    pending: HashMap<u8, VecDeque<PendingRequest>>,
    dump: Option<tokio::fs::File>,
}

impl<S: StreamAccessor> ReadLoop<S> {
    async fn run(mut self) {
        if let Some(path) = self.config.dump_path.clone() {
            match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(file) => self.dump = Some(file),
                Err(e) => log::warn!("could not open dump file {:?}: {}", path, e),
            }
        }

        if let Err(e) = self
            .transport
            .set_timeout(Some(self.config.poll_interval))
            .await
        {
            log::error!("could not configure stream timeout: {}", e);
        }

        loop {
            if !self.drain_commands().await {
                break;
            }

            match FrameReader::read_frame(&mut self.transport).await {
                Ok(None) => continue, // no frame yet, go serve commands
                Ok(Some(raw)) => self.dispatch(raw).await,
                Err(e) => {
                    log::error!("read loop stopping: {}", e);
                    self.fail_all_pending();
                    break;
                }
            }
        }

        let _ = self.transport.close().await;
    }

    /// Serve queued commands; false once all handles are gone
    async fn drain_commands(&mut self) -> bool {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(Command::Send {
                    id,
                    request,
                    reply_tx,
                }) => self.handle_send(id, request, reply_tx).await,
                Ok(Command::Cancel { address, id }) => self.handle_cancel(address, id).await,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    self.fail_all_pending();
                    return false;
                }
            }
        }
    }

    async fn handle_send(
        &mut self,
        id: u64,
        request: RequestFrame,
        reply_tx: oneshot::Sender<RegbusResult<ReplyFrame>>,
    ) {
        let address = request.address();
        let payload_type = request.payload_type();
        let encoded = request.encode();

        let in_flight = self.pending.get(&address).is_some_and(|q| !q.is_empty());
        if in_flight {
            match self.config.queue_policy {
                QueuePolicy::FailFast => {
                    let _ = reply_tx.send(Err(RegbusError::RequestAlreadyInFlight(address)));
                }
                QueuePolicy::QueuePerAddress => {
                    self.pending
                        .entry(address)
                        .or_default()
                        .push_back(PendingRequest {
                            id,
                            payload_type,
                            issued_at: Instant::now(),
                            reply_tx,
                            encoded: Some(encoded),
                        });
                }
            }
            return;
        }

        self.pending
            .entry(address)
            .or_default()
            .push_back(PendingRequest {
                id,
                payload_type,
                issued_at: Instant::now(),
                reply_tx,
                encoded: None,
            });

        if let Err(e) = self.write_frame(&encoded).await {
            log::error!("write for register {} failed: {}", address, e);
            if let Some(pending) = self
                .pending
                .get_mut(&address)
                .and_then(|q| q.pop_back())
            {
                let _ = pending.reply_tx.send(Err(e));
            }
            self.cleanup(address);
        }
    }

    async fn handle_cancel(&mut self, address: u8, id: u64) {
        let Some(queue) = self.pending.get_mut(&address) else {
            return;
        };
        let Some(pos) = queue.iter().position(|p| p.id == id) else {
            return;
        };
        let was_on_wire = pos == 0 && queue[pos].encoded.is_none();
        queue.remove(pos);
        log::debug!("cancelled request {} for register {}", id, address);

        if was_on_wire {
            self.promote(address).await;
        }
        self.cleanup(address);
    }

    /// Classify one raw frame: reply, event, or garbage
    async fn dispatch(&mut self, raw: Vec<u8>) {
        self.stats.increment_frames_received();

        if let Some(dump) = self.dump.as_mut() {
            if let Err(e) = dump.write_all(&raw).await {
                log::warn!("dump write failed, disabling dump: {}", e);
                self.dump = None;
            }
        }

        let reply = match ReplyFrame::decode(&raw) {
            Ok(reply) => reply,
            Err(e @ RegbusError::ChecksumMismatch { .. }) => {
                self.stats.increment_checksum_errors();
                log::warn!("discarding corrupt frame: {}", e);
                return;
            }
            Err(e) => {
                self.stats.increment_frames_rejected();
                log::warn!("discarding undecodable frame: {}", e);
                return;
            }
        };

        if reply.message_type() == MessageType::Event {
            self.stats.increment_events_received();
            // No live subscriber just means nobody cares right now.
            let _ = self.event_tx.send(reply);
            return;
        }

        let address = reply.address();
        match self.pending.get_mut(&address).and_then(|q| q.pop_front()) {
            Some(pending) => {
                if pending.payload_type.base() != reply.payload_type().base() {
                    log::debug!(
                        "reply for register {} carries {:?}, request asked for {:?}",
                        address,
                        reply.payload_type(),
                        pending.payload_type
                    );
                }
                log::trace!(
                    "register {} answered in {:?}",
                    address,
                    pending.issued_at.elapsed()
                );
                if pending.reply_tx.send(Ok(reply)).is_err() {
                    // The caller hit its deadline between our pop and this
                    // delivery; same outcome as an orphan.
                    self.stats.increment_orphan_replies();
                }
                self.promote(address).await;
                self.cleanup(address);
            }
            None => {
                self.stats.increment_orphan_replies();
                log::warn!("orphan reply: {}", reply);
            }
        }
    }

    /// Put the next queued frame for `address` on the wire, if any
    async fn promote(&mut self, address: u8) {
        loop {
            let encoded = match self
                .pending
                .get_mut(&address)
                .and_then(|q| q.front_mut())
            {
                Some(front) => match front.encoded.take() {
                    Some(bytes) => bytes,
                    None => return, // already on the wire
                },
                None => return,
            };

            match self.write_frame(&encoded).await {
                Ok(()) => return,
                Err(e) => {
                    log::error!("write for register {} failed: {}", address, e);
                    if let Some(pending) =
                        self.pending.get_mut(&address).and_then(|q| q.pop_front())
                    {
                        let _ = pending.reply_tx.send(Err(e));
                    }
                    // try the next queued request
                }
            }
        }
    }

    async fn write_frame(&mut self, encoded: &[u8]) -> RegbusResult<()> {
        self.transport.write_all(encoded).await?;
        self.transport.flush().await?;
        self.stats.increment_frames_sent();
        Ok(())
    }

    fn cleanup(&mut self, address: u8) {
        if self.pending.get(&address).is_some_and(|q| q.is_empty()) {
            self.pending.remove(&address);
        }
    }

    /// Terminal failure: every AwaitingReply request fails exactly once
    fn fail_all_pending(&mut self) {
        for (_, queue) in self.pending.drain() {
            for pending in queue {
                let _ = pending.reply_tx.send(Err(RegbusError::StreamClosed));
            }
        }
    }
}
