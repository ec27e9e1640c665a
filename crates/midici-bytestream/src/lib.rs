//! MIDI 1.0 bytestream message extraction.
//!
//! Turns raw bytes arriving in arbitrary chunks (e.g. from a legacy MIDI input
//! callback) into whole channel/system messages and sysex chunks, handling
//! running status and real-time bytes interleaved with other messages.
//!
//! # Example
//!
//! ```
//! use midici_bytestream::{BytestreamSysexExtractor, SysexExtractorCallbackKind};
//!
//! let mut extractor = BytestreamSysexExtractor::new();
//! let mut messages = Vec::new();
//!
//! extractor.push(&[0x90, 0x3C, 0x64, 0x40, 0x00], |kind, bytes| {
//!     assert_eq!(kind, SysexExtractorCallbackKind::NotSysex);
//!     messages.push(bytes.to_vec());
//! });
//!
//! assert_eq!(messages, vec![vec![0x90, 0x3C, 0x64], vec![0x90, 0x40, 0x00]]);
//! ```

mod extractor;
pub mod status;

pub use extractor::{BytestreamSysexExtractor, SysexExtractorCallbackKind};
