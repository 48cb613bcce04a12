//! Register client for regbus devices
//!
//! The [`Multiplexer`] owns the transport: a single internal task is the
//! only reader and the only writer of the byte stream. Callers issue
//! request/reply exchanges through [`Multiplexer::send`] (or the
//! [`RegisterClient`] convenience layer) while spontaneous Event frames are
//! fanned out to [`EventSubscription`]s, so synchronous traffic and device
//! events share one duplex stream without stealing each other's frames.

pub mod builder;
pub mod client;
pub mod multiplexer;
pub mod statistics;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::ClientBuilder;
pub use client::{DeviceInfo, RegisterClient};
pub use multiplexer::{EventSubscription, Multiplexer, MultiplexerConfig, QueuePolicy};
pub use statistics::{LinkStatistics, StatisticsSnapshot};
