//! # midici - MIDI-CI protocol engines
//!
//! Umbrella crate for the midici subsystems.
//!
//! ## Architecture
//!
//! - **midici-core** - Shared identifiers (MUID, tokens, keys) and property exchange types
//! - **midici-bytestream** - MIDI 1.0 bytestream splitting with running status and sysex chunking
//! - **midici-subscription** - Property exchange subscription negotiation, retry and teardown
//!
//! ## Quick Start
//!
//! ```
//! use midici::prelude::*;
//!
//! // Split a legacy MIDI input stream into messages
//! let mut extractor = BytestreamSysexExtractor::new();
//! let mut sysex = Vec::new();
//! extractor.push(&[0xF0, 0x7E, 0x7F, 0xF7], |kind, bytes| {
//!     if kind == SysexExtractorCallbackKind::LastSysex {
//!         sysex.extend_from_slice(bytes);
//!     }
//! });
//! assert_eq!(sysex, [0xF0, 0x7E, 0x7F, 0xF7]);
//!
//! // Identify a remote device
//! let muid = Muid::new(0x0123_4567)?;
//! let header = PropertySubscriptionHeader::start("ChannelList");
//! assert_eq!(header.to_json()?, r#"{"command":"start","resource":"ChannelList"}"#);
//! # let _ = muid;
//! # Ok::<(), midici::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Both engines
//! - `bytestream` - [`BytestreamSysexExtractor`]
//! - `subscription` - [`SubscriptionManager`]

/// Re-export of midici-core for direct access
pub use midici_core as core;

// Core types
pub use midici_core::{
    // Error
    Error,
    // Identifiers
    Muid,
    // Property exchange
    PropertyExchangeError,
    PropertyExchangeResult,
    PropertySubscriptionCommand,
    PropertySubscriptionHeader,
    ReplyHeader,
    RequestKey,
    Result,
    SubscriptionKey,
    Token64,
};

// Bytestream extraction
#[cfg(feature = "bytestream")]
pub use midici_bytestream as bytestream;
#[cfg(feature = "bytestream")]
pub use midici_bytestream::{BytestreamSysexExtractor, SysexExtractorCallbackKind};

// Subscriptions
#[cfg(feature = "subscription")]
pub use midici_subscription as subscription;
#[cfg(feature = "subscription")]
pub use midici_subscription::{
    ReplyHandle, SubscriptionManager, SubscriptionManagerBuilder, SubscriptionManagerConfig,
    SubscriptionManagerDelegate, SubscriptionPhase,
};

/// Commonly used types, for `use midici::prelude::*`.
pub mod prelude {
    pub use crate::{
        Error, Muid, PropertyExchangeError, PropertyExchangeResult, PropertySubscriptionCommand,
        PropertySubscriptionHeader, RequestKey, Result, SubscriptionKey, Token64,
    };

    #[cfg(feature = "bytestream")]
    pub use crate::{BytestreamSysexExtractor, SysexExtractorCallbackKind};

    #[cfg(feature = "subscription")]
    pub use crate::{
        ReplyHandle, SubscriptionManager, SubscriptionManagerBuilder, SubscriptionManagerDelegate,
        SubscriptionPhase,
    };
}
