//! Test helpers for midici-subscription integration tests.
//!
//! [`MockTransport`] stands in for a MIDI-CI device: it records every request,
//! keeps reply handles for accepted requests, and lets a test answer them later.

#![allow(dead_code)]

use std::collections::BTreeMap;

use midici_subscription::{
    Muid, PropertyExchangeResult, PropertySubscriptionCommand, PropertySubscriptionHeader,
    ReplyHandle, RequestKey, SubscriptionKey, SubscriptionManager, SubscriptionManagerDelegate,
    Token64,
};

/// A recorded `property_subscription_changed` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Changed {
    pub key: SubscriptionKey,
    pub subscribe_id: Option<String>,
}

#[derive(Debug)]
pub struct MockTransport {
    send_should_succeed: bool,
    /// Refuse sends to these devices regardless of `send_should_succeed`.
    refused: Vec<Muid>,
    callbacks: BTreeMap<RequestKey, ReplyHandle>,
    /// Every header handed to the transport, accepted or not.
    pub sent: Vec<(Muid, PropertySubscriptionHeader)>,
    pub changed: Vec<Changed>,
    send_count: u64,
    abort_count: u64,
    last_request: u64,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            send_should_succeed: true,
            refused: Vec::new(),
            callbacks: BTreeMap::new(),
            sent: Vec::new(),
            changed: Vec::new(),
            send_count: 0,
            abort_count: 0,
            last_request: 0,
        }
    }
}

impl MockTransport {
    pub fn set_send_should_succeed(&mut self, succeed: bool) {
        self.send_should_succeed = succeed;
    }

    pub fn refuse(&mut self, muid: Muid) {
        self.refused.push(muid);
    }

    pub fn accept(&mut self, muid: Muid) {
        self.refused.retain(|m| *m != muid);
    }

    /// Answer an outstanding request. Unknown keys are ignored.
    pub fn send_result(&mut self, request: RequestKey, result: PropertyExchangeResult) {
        if let Some(handle) = self.callbacks.remove(&request) {
            handle.resolve(result);
        }
    }

    pub fn ongoing_requests(&self) -> Vec<RequestKey> {
        self.callbacks.keys().copied().collect()
    }

    pub fn last_request(&self) -> RequestKey {
        *self
            .callbacks
            .keys()
            .next_back()
            .expect("no outstanding request")
    }

    pub fn request_command(&self, request: RequestKey) -> Option<PropertySubscriptionCommand> {
        self.callbacks.get(&request).map(ReplyHandle::command)
    }

    pub fn take_send_count(&mut self) -> u64 {
        std::mem::take(&mut self.send_count)
    }

    pub fn take_abort_count(&mut self) -> u64 {
        std::mem::take(&mut self.abort_count)
    }

    pub fn take_changed(&mut self) -> Vec<Changed> {
        std::mem::take(&mut self.changed)
    }
}

impl SubscriptionManagerDelegate for MockTransport {
    fn send_property_subscribe(
        &mut self,
        muid: Muid,
        header: &PropertySubscriptionHeader,
        on_result: ReplyHandle,
    ) -> Option<RequestKey> {
        self.send_count += 1;
        self.sent.push((muid, header.clone()));

        if !self.send_should_succeed || self.refused.contains(&muid) {
            return None;
        }

        self.last_request += 1;
        let request = RequestKey::new(muid, Token64::new(self.last_request));
        self.callbacks.insert(request, on_result);
        Some(request)
    }

    fn abort_property_request(&mut self, request: RequestKey) {
        self.abort_count += 1;
        self.callbacks.remove(&request);
    }

    fn property_subscription_changed(&mut self, key: SubscriptionKey, subscribe_id: Option<&str>) {
        self.changed.push(Changed {
            key,
            subscribe_id: subscribe_id.map(str::to_string),
        });
    }
}

pub type TestManager = SubscriptionManager<MockTransport>;

/// Route manager logs to the test harness output. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn test_manager() -> TestManager {
    init_tracing();
    SubscriptionManager::new(MockTransport::default())
}

pub fn device(value: u32) -> Muid {
    Muid::new(value).expect("valid test MUID")
}

pub fn custom_prop() -> PropertySubscriptionHeader {
    PropertySubscriptionHeader::start("X-CustomProp")
}

/// Answer `request` and let the manager apply the reply.
pub fn reply(manager: &mut TestManager, request: RequestKey, result: PropertyExchangeResult) {
    manager.delegate_mut().send_result(request, result);
    manager.dispatch_replies();
}

/// Answer the newest outstanding request.
pub fn reply_last(manager: &mut TestManager, result: PropertyExchangeResult) {
    let request = manager.delegate().last_request();
    reply(manager, request, result);
}
