use thiserror::Error;

/// Main error type for regbus operations
#[derive(Error, Debug)]
pub enum RegbusError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Stream closed")]
    StreamClosed,

    #[error("Truncated frame: {0}")]
    TruncatedFrame(String),

    #[error("Checksum mismatch: expected 0x{expected:02X}, computed 0x{computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("Invalid payload type byte: 0x{0:02X}")]
    InvalidPayloadType(u8),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("A request for register {0} is already in flight")]
    RequestAlreadyInFlight(u8),

    #[error("Device rejected access to register {address} (write: {write})")]
    RegisterRejected { address: u8, write: bool },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for regbus operations
pub type RegbusResult<T> = Result<T, RegbusError>;
