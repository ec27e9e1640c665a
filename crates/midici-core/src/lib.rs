//! Core MIDI-CI types shared by the midici subsystems.
//!
//! Identifiers for remote devices ([`Muid`]) and local requests ([`Token64`],
//! [`SubscriptionKey`], [`RequestKey`]), plus the property exchange header and
//! result types that travel between a subscription manager and its transport.
//!
//! # Example
//!
//! ```
//! use midici_core::{Muid, PropertySubscriptionCommand, PropertySubscriptionHeader};
//!
//! let muid = Muid::new(0x0123_4567)?;
//! assert_eq!(Muid::from_bytes(muid.to_bytes())?, muid);
//!
//! let header = PropertySubscriptionHeader::start("X-CustomProp");
//! assert_eq!(header.command, PropertySubscriptionCommand::Start);
//! # Ok::<(), midici_core::Error>(())
//! ```

pub mod error;
pub use error::{Error, Result};

mod keys;
mod muid;
mod property;

pub use keys::{RequestKey, SubscriptionKey, Token64};
pub use muid::Muid;
pub use property::{
    PropertyExchangeError, PropertyExchangeResult, PropertySubscriptionCommand,
    PropertySubscriptionHeader, ReplyHeader, STATUS_NOTIFY, STATUS_OK, STATUS_RETRY,
};
