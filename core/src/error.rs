use thiserror::Error;

#[derive(Debug, Error)]
pub enum UatError {
    #[error("invalid arguments: {0}")]
    Args(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated IQ input ({0} trailing bytes)")]
    TruncatedInput(usize),

    #[error("malformed frame header: {0}")]
    MalformedHeader(String),

    #[error("unknown packet type byte {0:?}")]
    UnknownPacketType(char),

    #[error("stream ended inside a packet frame")]
    TruncatedFrame,

    #[error("invalid shift schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, UatError>;
