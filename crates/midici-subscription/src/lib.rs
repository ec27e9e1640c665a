//! MIDI-CI property exchange subscriptions.
//!
//! [`SubscriptionManager`] negotiates subscriptions to resources on remote
//! devices and keeps track of them until they end, whether from this side
//! or the responder's. The transport is supplied by a
//! [`SubscriptionManagerDelegate`]; replies flow back through [`ReplyHandle`].
//!
//! # Example
//!
//! ```
//! use midici_subscription::{
//!     Muid, PropertyExchangeResult, PropertySubscriptionHeader, ReplyHandle, RequestKey,
//!     SubscriptionKey, SubscriptionManager, SubscriptionManagerDelegate, Token64,
//! };
//!
//! #[derive(Default)]
//! struct Transport {
//!     in_flight: Vec<ReplyHandle>,
//!     next: u64,
//! }
//!
//! impl SubscriptionManagerDelegate for Transport {
//!     fn send_property_subscribe(
//!         &mut self,
//!         muid: Muid,
//!         _header: &PropertySubscriptionHeader,
//!         on_result: ReplyHandle,
//!     ) -> Option<RequestKey> {
//!         self.next += 1;
//!         self.in_flight.push(on_result);
//!         Some(RequestKey::new(muid, Token64::new(self.next)))
//!     }
//!
//!     fn abort_property_request(&mut self, _request: RequestKey) {}
//!
//!     fn property_subscription_changed(&mut self, key: SubscriptionKey, id: Option<&str>) {
//!         println!("{key}: {id:?}");
//!     }
//! }
//!
//! let mut manager = SubscriptionManager::new(Transport::default());
//! let key = manager.begin_subscription(Muid::new(0x42)?, &PropertySubscriptionHeader::start("ProgramList"));
//!
//! // The responder answers later; the reply is applied on the next call.
//! let handle = manager.delegate_mut().in_flight.pop().unwrap();
//! handle.resolve(PropertyExchangeResult::subscribed("sub-7"));
//! manager.dispatch_replies();
//!
//! assert_eq!(manager.get_subscribe_id_for_key(key), Some("sub-7"));
//! # Ok::<(), midici_subscription::Error>(())
//! ```

mod config;
mod delegate;
mod manager;
mod state;

pub use config::{SubscriptionManagerBuilder, SubscriptionManagerConfig};
pub use delegate::{ReplyHandle, SubscriptionManagerDelegate};
pub use manager::SubscriptionManager;
pub use state::SubscriptionPhase;

pub use midici_core::{
    Error, Muid, PropertyExchangeError, PropertyExchangeResult, PropertySubscriptionCommand,
    PropertySubscriptionHeader, ReplyHeader, RequestKey, Result, SubscriptionKey, Token64,
};
