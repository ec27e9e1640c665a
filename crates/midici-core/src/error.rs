//! Error types for MIDI-CI value construction and decoding.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MUID out of range: {0:#x} (max 0x0fffffff)")]
    MuidOutOfRange(u32),

    #[error("MUID byte {index} is not 7-bit: {value:#04x}")]
    MuidByte { index: usize, value: u8 },

    #[error("Unknown subscription command: {0}")]
    UnknownCommand(String),

    #[error("Malformed property header: {0}")]
    MalformedHeader(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
