//! Local identifiers for subscriptions and in-flight requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::muid::Muid;

/// Opaque 64-bit identifier generated by the local side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token64(u64);

impl Token64 {
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Token64 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Token64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one subscription owned by a subscription manager.
///
/// Ordering is by MUID first, then token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    muid: Muid,
    token: Token64,
}

impl SubscriptionKey {
    pub fn new(muid: Muid, token: Token64) -> Self {
        Self { muid, token }
    }

    #[inline]
    pub fn muid(&self) -> Muid {
        self.muid
    }

    #[inline]
    pub fn token(&self) -> Token64 {
        self.token
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.muid, self.token)
    }
}

/// Handle issued by a transport for a request it accepted, used to abort it later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    muid: Muid,
    token: Token64,
}

impl RequestKey {
    pub fn new(muid: Muid, token: Token64) -> Self {
        Self { muid, token }
    }

    #[inline]
    pub fn muid(&self) -> Muid {
        self.muid
    }

    #[inline]
    pub fn token(&self) -> Token64 {
        self.token
    }
}
