//! Core types and utilities for the regbus register protocol
//!
//! This crate provides the error taxonomy, the payload-type descriptor and
//! the typed register values used throughout the implementation.

pub mod error;
pub mod payload;
pub mod value;

pub use error::{RegbusError, RegbusResult};
pub use payload::PayloadType;
pub use value::{decode_payload, encode_payload, RegisterValue};
