//! Subscription table, send queue and reply handling.
//!
//! Every subscription lives in one table keyed by [`SubscriptionKey`]. Messages
//! that still have to go out (start requests, end requests) are sent in the
//! order they were queued; when the transport refuses one for a device, the
//! rest of that device's queue waits for the next
//! [`send_pending_messages`](SubscriptionManager::send_pending_messages) pass.

use std::collections::{BTreeMap, BTreeSet};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, trace, warn};

use midici_core::{
    Muid, PropertyExchangeError, PropertyExchangeResult, PropertySubscriptionHeader,
    SubscriptionKey, Token64,
};

use crate::config::SubscriptionManagerConfig;
use crate::delegate::{Reply, ReplyHandle, ReplyTarget, SubscriptionManagerDelegate};
use crate::state::{Subscription, SubscriptionPhase, SubscriptionState, Unsubscribe};

/// A queued message, ordered by the token it was queued under.
#[derive(Clone, Copy, Debug)]
enum Outgoing {
    Subscription(SubscriptionKey),
    Unsubscribe { muid: Muid, token: Token64 },
}

impl Outgoing {
    fn muid(&self) -> Muid {
        match self {
            Self::Subscription(key) => key.muid(),
            Self::Unsubscribe { muid, .. } => *muid,
        }
    }
}

/// How the responder answered a start request.
enum ReplyOutcome {
    Accepted(String),
    Retry,
    Rejected(String),
}

fn classify(result: &PropertyExchangeResult) -> ReplyOutcome {
    if let Some(error) = result.error() {
        return match error {
            PropertyExchangeError::TooManyTransactions => ReplyOutcome::Retry,
            other => ReplyOutcome::Rejected(other.to_string()),
        };
    }

    let Some(header) = result.reply_header() else {
        return ReplyOutcome::Rejected("unreadable reply header".to_string());
    };

    if let Some(status) = header.status {
        if !header.is_success() {
            return ReplyOutcome::Rejected(format!("status {status}"));
        }
    }

    match header.subscribe_id {
        Some(subscribe_id) => ReplyOutcome::Accepted(subscribe_id),
        None => ReplyOutcome::Rejected("reply without subscribeId".to_string()),
    }
}

/// Negotiates and tracks property exchange subscriptions on remote devices.
///
/// The delegate is the transport: it sends requests and is told when a
/// subscription starts or ends. Pass `&mut delegate` to keep ownership with
/// the caller; the manager only needs it for its own lifetime.
///
/// Nothing here blocks. Replies come back through [`ReplyHandle`]s and are
/// applied on the next mutating call, so the delegate is never re-entered
/// from inside its own callbacks. Call
/// [`send_pending_messages`](Self::send_pending_messages) periodically until
/// it returns `true` to push out anything the transport refused earlier.
pub struct SubscriptionManager<D> {
    delegate: D,
    config: SubscriptionManagerConfig,
    subscriptions: BTreeMap<SubscriptionKey, Subscription>,
    /// Sent end requests whose reply hasn't arrived, by end token.
    /// Cleared by a reply, by retries running out, or by
    /// `end_subscriptions_from_responder` for a device that went away.
    unsubscribes: BTreeMap<Token64, Unsubscribe>,
    last_token: u64,
    reply_tx: Sender<Reply>,
    reply_rx: Receiver<Reply>,
}

impl<D: SubscriptionManagerDelegate> SubscriptionManager<D> {
    pub fn new(delegate: D) -> Self {
        Self::with_config(delegate, SubscriptionManagerConfig::default())
    }

    pub fn with_config(delegate: D, config: SubscriptionManagerConfig) -> Self {
        let (reply_tx, reply_rx) = unbounded();
        Self {
            delegate,
            config,
            subscriptions: BTreeMap::new(),
            unsubscribes: BTreeMap::new(),
            last_token: 0,
            reply_tx,
            reply_rx,
        }
    }

    pub fn config(&self) -> &SubscriptionManagerConfig {
        &self.config
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    pub fn into_delegate(self) -> D {
        self.delegate
    }

    fn next_token(&mut self) -> Token64 {
        self.last_token += 1;
        Token64::new(self.last_token)
    }

    // ==================== Subscription lifecycle ====================

    /// Subscribe to the resource named in `header` on device `muid`.
    ///
    /// The start request is sent straight away if the transport accepts it,
    /// otherwise it stays queued. The header's command is always sent as `start`.
    pub fn begin_subscription(
        &mut self,
        muid: Muid,
        header: &PropertySubscriptionHeader,
    ) -> SubscriptionKey {
        self.dispatch_replies();

        let key = SubscriptionKey::new(muid, self.next_token());
        let subscription = Subscription::new(header);
        debug!(%key, resource = subscription.resource(), "subscription requested");
        self.subscriptions.insert(key, subscription);

        self.send_pending_messages();
        key
    }

    /// End a subscription from this side.
    ///
    /// Unsent requests are dropped, in-flight start requests are aborted, and
    /// confirmed subscriptions send an end request. Unknown or already-ending
    /// keys are ignored.
    pub fn end_subscription(&mut self, key: SubscriptionKey) {
        self.dispatch_replies();

        let Some(phase) = self.get_phase_for_key(key) else {
            trace!(%key, "end for unknown subscription");
            return;
        };

        match phase {
            SubscriptionPhase::PendingSend => {
                self.subscriptions.remove(&key);
                debug!(%key, "subscription cancelled before sending");
            }
            SubscriptionPhase::AwaitingReply => {
                if let Some(Subscription {
                    state: SubscriptionState::AwaitingReply { request },
                    ..
                }) = self.subscriptions.remove(&key)
                {
                    debug!(%key, "aborting subscription start request");
                    self.delegate.abort_property_request(request);
                }
            }
            SubscriptionPhase::Active => {
                let end_token = self.next_token();
                if let Some(subscription) = self.subscriptions.get_mut(&key) {
                    subscription.request_end(end_token);
                    debug!(%key, "subscription end queued");
                }
                self.send_pending_messages();
            }
            SubscriptionPhase::EndPending => {}
        }
    }

    /// The responder ended the subscription identified by `subscribe_id`.
    ///
    /// No request is sent; the delegate is told the subscription ended.
    pub fn end_subscription_from_responder(&mut self, muid: Muid, subscribe_id: &str) {
        self.dispatch_replies();

        let ended: Vec<SubscriptionKey> = self
            .subscriptions_for_muid(muid)
            .filter(|(_, subscription)| subscription.state.subscribe_id() == Some(subscribe_id))
            .map(|(key, _)| *key)
            .collect();

        for key in &ended {
            self.subscriptions.remove(key);
        }
        self.unsubscribes.retain(|_, entry| {
            entry.muid != muid || entry.header.subscribe_id.as_deref() != Some(subscribe_id)
        });

        for key in ended {
            debug!(%key, subscribe_id, "subscription ended by responder");
            self.delegate.property_subscription_changed(key, None);
        }
    }

    /// Every subscription on `muid` ended, e.g. because the device went away.
    ///
    /// Also forgets end requests still waiting on that device. Call this when a
    /// responder disappears without answering them; nothing else expires them.
    pub fn end_subscriptions_from_responder(&mut self, muid: Muid) {
        self.dispatch_replies();

        let ended: Vec<SubscriptionKey> = self
            .subscriptions_for_muid(muid)
            .map(|(key, _)| *key)
            .collect();

        for key in &ended {
            self.subscriptions.remove(key);
        }
        self.unsubscribes.retain(|_, entry| entry.muid != muid);

        debug!(%muid, count = ended.len(), "all subscriptions ended by responder");
        for key in ended {
            self.delegate.property_subscription_changed(key, None);
        }
    }

    // ==================== Queries ====================

    /// Keys of every subscription that hasn't terminated, ordered by key.
    pub fn get_ongoing_subscriptions(&self) -> Vec<SubscriptionKey> {
        self.subscriptions.keys().copied().collect()
    }

    /// The responder-assigned id, while the subscription is active.
    pub fn get_subscribe_id_for_key(&self, key: SubscriptionKey) -> Option<&str> {
        match &self.subscriptions.get(&key)?.state {
            SubscriptionState::Active { subscribe_id } => Some(subscribe_id.as_str()),
            _ => None,
        }
    }

    pub fn get_resource_for_key(&self, key: SubscriptionKey) -> Option<&str> {
        self.subscriptions
            .get(&key)
            .map(|subscription| subscription.resource())
    }

    pub fn get_phase_for_key(&self, key: SubscriptionKey) -> Option<SubscriptionPhase> {
        self.subscriptions
            .get(&key)
            .map(|subscription| subscription.state.phase())
    }

    /// Whether any message is still waiting to be (re)sent.
    pub fn has_pending_messages(&self) -> bool {
        self.subscriptions.values().any(|subscription| {
            matches!(
                subscription.state,
                SubscriptionState::PendingSend | SubscriptionState::EndPending { .. }
            )
        }) || self.unsubscribes.values().any(|entry| !entry.in_flight)
    }

    fn subscriptions_for_muid(
        &self,
        muid: Muid,
    ) -> impl Iterator<Item = (&SubscriptionKey, &Subscription)> {
        let first = SubscriptionKey::new(muid, Token64::new(0));
        let last = SubscriptionKey::new(muid, Token64::new(u64::MAX));
        self.subscriptions.range(first..=last)
    }

    // ==================== Sending ====================

    /// Try to send every queued message, oldest first.
    ///
    /// Returns `true` when nothing is left waiting to be sent. A `false`
    /// result means the transport refused something; call again later.
    pub fn send_pending_messages(&mut self) -> bool {
        self.dispatch_replies();

        let mut outgoing: Vec<(Token64, Outgoing)> = self
            .subscriptions
            .iter()
            .filter_map(|(key, subscription)| match &subscription.state {
                SubscriptionState::PendingSend => Some((key.token(), Outgoing::Subscription(*key))),
                SubscriptionState::EndPending { end_token, .. } => {
                    Some((*end_token, Outgoing::Subscription(*key)))
                }
                _ => None,
            })
            .collect();

        outgoing.extend(
            self.unsubscribes
                .iter()
                .filter(|(_, entry)| !entry.in_flight)
                .map(|(token, entry)| {
                    (
                        *token,
                        Outgoing::Unsubscribe {
                            muid: entry.muid,
                            token: *token,
                        },
                    )
                }),
        );
        outgoing.sort_by_key(|(token, _)| *token);

        let mut blocked = BTreeSet::new();
        for (_, message) in outgoing {
            let muid = message.muid();
            if blocked.contains(&muid) {
                continue;
            }

            let sent = match message {
                Outgoing::Subscription(key) => self.send_subscription_message(key),
                Outgoing::Unsubscribe { token, .. } => self.resend_unsubscribe(token),
            };

            if !sent {
                trace!(%muid, "transport busy, holding remaining messages for device");
                blocked.insert(muid);
            }
        }

        self.dispatch_replies();
        !self.has_pending_messages()
    }

    /// Send the start or end request for `key`. Returns `false` if the transport refused it.
    fn send_subscription_message(&mut self, key: SubscriptionKey) -> bool {
        let Some(subscription) = self.subscriptions.get_mut(&key) else {
            return true;
        };

        let (header, target) = match &subscription.state {
            SubscriptionState::PendingSend => {
                (subscription.header.clone(), ReplyTarget::Begin(key))
            }
            SubscriptionState::EndPending {
                subscribe_id,
                end_token,
            } => (
                subscription.end_header(subscribe_id),
                ReplyTarget::End {
                    muid: key.muid(),
                    token: *end_token,
                },
            ),
            _ => return true,
        };

        subscription.attempt += 1;
        let attempt = subscription.attempt;
        let handle = ReplyHandle::new(target, attempt, self.reply_tx.clone());

        let Some(request) = self
            .delegate
            .send_property_subscribe(key.muid(), &header, handle)
        else {
            subscription.failures += 1;
            let failures = subscription.failures;
            if self.config.retries_exhausted(failures) {
                self.give_up(key);
            }
            return false;
        };

        match target {
            ReplyTarget::Begin(_) => {
                subscription.state = SubscriptionState::AwaitingReply { request };
                debug!(%key, "subscription start sent");
            }
            ReplyTarget::End { muid, token } => {
                self.subscriptions.remove(&key);
                self.unsubscribes.insert(
                    token,
                    Unsubscribe {
                        muid,
                        header,
                        in_flight: true,
                        attempt,
                        failures: 0,
                    },
                );
                debug!(%key, "subscription end sent");
            }
        }
        true
    }

    /// Re-send an end request the responder asked us to retry.
    fn resend_unsubscribe(&mut self, token: Token64) -> bool {
        let Some(entry) = self.unsubscribes.get_mut(&token) else {
            return true;
        };
        if entry.in_flight {
            return true;
        }

        entry.attempt += 1;
        let target = ReplyTarget::End {
            muid: entry.muid,
            token,
        };
        let handle = ReplyHandle::new(target, entry.attempt, self.reply_tx.clone());

        if self
            .delegate
            .send_property_subscribe(entry.muid, &entry.header, handle)
            .is_some()
        {
            entry.in_flight = true;
            return true;
        }

        entry.failures += 1;
        if self.config.retries_exhausted(entry.failures) {
            warn!(muid = %entry.muid, "giving up on subscription end request");
            self.unsubscribes.remove(&token);
        }
        false
    }

    /// Drop a subscription whose retries ran out.
    fn give_up(&mut self, key: SubscriptionKey) {
        let Some(subscription) = self.subscriptions.remove(&key) else {
            return;
        };

        match subscription.state {
            SubscriptionState::EndPending { .. } => {
                warn!(%key, "giving up on subscription end, treating as ended");
            }
            _ => {
                warn!(%key, resource = subscription.resource(), "giving up on subscription start");
                self.delegate.property_subscription_changed(key, None);
            }
        }
    }

    // ==================== Replies ====================

    /// Apply every reply resolved since the last call. Returns how many were applied.
    pub fn dispatch_replies(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.apply_reply(reply);
            applied += 1;
        }
        applied
    }

    fn apply_reply(&mut self, reply: Reply) {
        match reply.target {
            ReplyTarget::Begin(key) => self.apply_start_reply(key, reply.attempt, &reply.result),
            ReplyTarget::End { token, .. } => {
                self.apply_end_reply(token, reply.attempt, &reply.result)
            }
        }
    }

    fn apply_start_reply(
        &mut self,
        key: SubscriptionKey,
        attempt: u64,
        result: &PropertyExchangeResult,
    ) {
        let Some(subscription) = self.subscriptions.get_mut(&key) else {
            trace!(%key, "reply for ended subscription");
            return;
        };
        if subscription.attempt != attempt
            || !matches!(subscription.state, SubscriptionState::AwaitingReply { .. })
        {
            trace!(%key, attempt, "stale subscription reply");
            return;
        }

        match classify(result) {
            ReplyOutcome::Accepted(subscribe_id) => {
                debug!(%key, %subscribe_id, "subscription confirmed");
                subscription.state = SubscriptionState::Active {
                    subscribe_id: subscribe_id.clone(),
                };
                subscription.failures = 0;
                self.delegate
                    .property_subscription_changed(key, Some(&subscribe_id));
            }
            ReplyOutcome::Retry => {
                subscription.state = SubscriptionState::PendingSend;
                subscription.failures += 1;
                let failures = subscription.failures;
                if self.config.retries_exhausted(failures) {
                    self.give_up(key);
                } else {
                    debug!(%key, failures, "responder busy, subscription start requeued");
                }
            }
            ReplyOutcome::Rejected(reason) => {
                debug!(%key, %reason, "subscription refused");
                self.subscriptions.remove(&key);
                self.delegate.property_subscription_changed(key, None);
            }
        }
    }

    fn apply_end_reply(&mut self, token: Token64, attempt: u64, result: &PropertyExchangeResult) {
        let Some(entry) = self.unsubscribes.get_mut(&token) else {
            trace!(%token, "reply for forgotten subscription end");
            return;
        };
        if entry.attempt != attempt || !entry.in_flight {
            trace!(%token, attempt, "stale subscription end reply");
            return;
        }

        if result.error() == Some(PropertyExchangeError::TooManyTransactions) {
            entry.in_flight = false;
            entry.failures += 1;
            if self.config.retries_exhausted(entry.failures) {
                warn!(muid = %entry.muid, "giving up on subscription end request");
                self.unsubscribes.remove(&token);
            } else {
                debug!(muid = %entry.muid, "responder busy, subscription end requeued");
            }
            return;
        }

        // Any other answer, including a refusal, closes the subscription for good.
        debug!(muid = %entry.muid, "subscription end acknowledged");
        self.unsubscribes.remove(&token);
    }
}
