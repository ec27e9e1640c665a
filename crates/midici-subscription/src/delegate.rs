//! Transport seam between the subscription manager and its owner.

use crossbeam_channel::Sender;
use midici_core::{
    Muid, PropertyExchangeResult, PropertySubscriptionCommand, PropertySubscriptionHeader,
    RequestKey, SubscriptionKey, Token64,
};

/// Sends subscription requests on behalf of a [`SubscriptionManager`](crate::SubscriptionManager)
/// and receives its notifications.
///
/// The manager never stores the delegate's state; it only calls these methods.
pub trait SubscriptionManagerDelegate {
    /// Try to send a subscription request to `muid`.
    ///
    /// Return `None` when the request can't be sent right now (e.g. no free
    /// request slots); the manager will retry it from
    /// [`send_pending_messages`](crate::SubscriptionManager::send_pending_messages).
    /// When a reply arrives, resolve `on_result` with it.
    fn send_property_subscribe(
        &mut self,
        muid: Muid,
        header: &PropertySubscriptionHeader,
        on_result: ReplyHandle,
    ) -> Option<RequestKey>;

    /// Cancel a request previously accepted by [`send_property_subscribe`](Self::send_property_subscribe).
    fn abort_property_request(&mut self, request: RequestKey);

    /// A subscription was confirmed (`Some(subscribe_id)`) or ended (`None`).
    fn property_subscription_changed(&mut self, key: SubscriptionKey, subscribe_id: Option<&str>);
}

impl<D: SubscriptionManagerDelegate + ?Sized> SubscriptionManagerDelegate for &mut D {
    fn send_property_subscribe(
        &mut self,
        muid: Muid,
        header: &PropertySubscriptionHeader,
        on_result: ReplyHandle,
    ) -> Option<RequestKey> {
        (**self).send_property_subscribe(muid, header, on_result)
    }

    fn abort_property_request(&mut self, request: RequestKey) {
        (**self).abort_property_request(request)
    }

    fn property_subscription_changed(&mut self, key: SubscriptionKey, subscribe_id: Option<&str>) {
        (**self).property_subscription_changed(key, subscribe_id)
    }
}

impl<D: SubscriptionManagerDelegate + ?Sized> SubscriptionManagerDelegate for Box<D> {
    fn send_property_subscribe(
        &mut self,
        muid: Muid,
        header: &PropertySubscriptionHeader,
        on_result: ReplyHandle,
    ) -> Option<RequestKey> {
        (**self).send_property_subscribe(muid, header, on_result)
    }

    fn abort_property_request(&mut self, request: RequestKey) {
        (**self).abort_property_request(request)
    }

    fn property_subscription_changed(&mut self, key: SubscriptionKey, subscribe_id: Option<&str>) {
        (**self).property_subscription_changed(key, subscribe_id)
    }
}

/// Which queued message a reply belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReplyTarget {
    Begin(SubscriptionKey),
    End { muid: Muid, token: Token64 },
}

#[derive(Debug)]
pub(crate) struct Reply {
    pub target: ReplyTarget,
    pub attempt: u64,
    pub result: PropertyExchangeResult,
}

/// Completion handle for one sent subscription request.
///
/// Resolving posts the reply to the manager's queue; it is applied on the
/// manager's next mutating call (or [`dispatch_replies`](crate::SubscriptionManager::dispatch_replies)),
/// never from inside `resolve`. Resolving after the manager is gone does nothing.
#[derive(Debug)]
pub struct ReplyHandle {
    target: ReplyTarget,
    attempt: u64,
    sender: Sender<Reply>,
}

impl ReplyHandle {
    pub(crate) fn new(target: ReplyTarget, attempt: u64, sender: Sender<Reply>) -> Self {
        Self {
            target,
            attempt,
            sender,
        }
    }

    pub fn muid(&self) -> Muid {
        match self.target {
            ReplyTarget::Begin(key) => key.muid(),
            ReplyTarget::End { muid, .. } => muid,
        }
    }

    /// The command of the request this handle completes.
    pub fn command(&self) -> PropertySubscriptionCommand {
        match self.target {
            ReplyTarget::Begin(_) => PropertySubscriptionCommand::Start,
            ReplyTarget::End { .. } => PropertySubscriptionCommand::End,
        }
    }

    /// The subscription a start request was sent for.
    pub fn subscription_key(&self) -> Option<SubscriptionKey> {
        match self.target {
            ReplyTarget::Begin(key) => Some(key),
            ReplyTarget::End { .. } => None,
        }
    }

    pub fn resolve(self, result: PropertyExchangeResult) {
        let reply = Reply {
            target: self.target,
            attempt: self.attempt,
            result,
        };
        if self.sender.send(reply).is_err() {
            tracing::trace!(reply_target = ?self.target, "reply for dropped subscription manager");
        }
    }
}
