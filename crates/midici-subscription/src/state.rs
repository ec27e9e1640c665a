//! Per-subscription negotiation state.

use midici_core::{
    Muid, PropertySubscriptionCommand, PropertySubscriptionHeader, RequestKey, Token64,
};

/// Where a subscription is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionPhase {
    /// Start request not yet accepted by the transport.
    PendingSend,
    /// Start request sent, waiting for the responder.
    AwaitingReply,
    /// The responder assigned a subscribeId.
    Active,
    /// Ended locally; the end request still has to be sent.
    EndPending,
}

#[derive(Debug)]
pub(crate) enum SubscriptionState {
    PendingSend,
    AwaitingReply {
        request: RequestKey,
    },
    Active {
        subscribe_id: String,
    },
    /// `end_token` orders the end request among other queued messages.
    EndPending {
        subscribe_id: String,
        end_token: Token64,
    },
}

impl SubscriptionState {
    pub fn phase(&self) -> SubscriptionPhase {
        match self {
            Self::PendingSend => SubscriptionPhase::PendingSend,
            Self::AwaitingReply { .. } => SubscriptionPhase::AwaitingReply,
            Self::Active { .. } => SubscriptionPhase::Active,
            Self::EndPending { .. } => SubscriptionPhase::EndPending,
        }
    }

    /// Remote-assigned id, known once the responder confirmed the subscription.
    pub fn subscribe_id(&self) -> Option<&str> {
        match self {
            Self::Active { subscribe_id } | Self::EndPending { subscribe_id, .. } => {
                Some(subscribe_id.as_str())
            }
            Self::PendingSend | Self::AwaitingReply { .. } => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Subscription {
    /// Start request as it goes on the wire.
    pub header: PropertySubscriptionHeader,
    pub state: SubscriptionState,
    /// Bumped on every send so late replies to earlier attempts can be told apart.
    pub attempt: u64,
    /// Failed attempts since the last state change.
    pub failures: u32,
}

impl Subscription {
    pub fn new(header: &PropertySubscriptionHeader) -> Self {
        Self {
            header: PropertySubscriptionHeader {
                command: PropertySubscriptionCommand::Start,
                subscribe_id: None,
                ..header.clone()
            },
            state: SubscriptionState::PendingSend,
            attempt: 0,
            failures: 0,
        }
    }

    pub fn resource(&self) -> &str {
        &self.header.resource
    }

    pub fn end_header(&self, subscribe_id: &str) -> PropertySubscriptionHeader {
        PropertySubscriptionHeader {
            command: PropertySubscriptionCommand::End,
            subscribe_id: Some(subscribe_id.to_string()),
            ..self.header.clone()
        }
    }

    /// Active -> EndPending. Other states are left alone.
    pub fn request_end(&mut self, end_token: Token64) -> bool {
        let SubscriptionState::Active { subscribe_id } = &mut self.state else {
            return false;
        };
        let subscribe_id = std::mem::take(subscribe_id);
        self.state = SubscriptionState::EndPending {
            subscribe_id,
            end_token,
        };
        self.failures = 0;
        true
    }
}

/// End request accepted by the transport, kept until the responder answers.
#[derive(Debug)]
pub(crate) struct Unsubscribe {
    pub muid: Muid,
    pub header: PropertySubscriptionHeader,
    pub in_flight: bool,
    pub attempt: u64,
    pub failures: u32,
}
