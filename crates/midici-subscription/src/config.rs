//! SubscriptionManager configuration and builder.

use serde::{Deserialize, Serialize};

use midici_core::{Error, Result};

use crate::delegate::SubscriptionManagerDelegate;
use crate::manager::SubscriptionManager;

/// Retry policy for queued subscription messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SubscriptionManagerConfig {
    /// Failed attempts tolerated per message before giving up.
    /// `None` retries until the subscription is ended.
    pub max_retries: Option<u32>,
}

impl SubscriptionManagerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    #[inline]
    pub(crate) fn retries_exhausted(&self, failures: u32) -> bool {
        self.max_retries.is_some_and(|max| failures > max)
    }
}

#[derive(Debug, Default)]
pub struct SubscriptionManagerBuilder {
    config: SubscriptionManagerConfig,
}

impl SubscriptionManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on a message after `retries` failed re-sends.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = Some(retries);
        self
    }

    /// Keep retrying until the subscription is ended (the default).
    pub fn unbounded_retries(mut self) -> Self {
        self.config.max_retries = None;
        self
    }

    pub fn config(mut self, config: SubscriptionManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build<D: SubscriptionManagerDelegate>(self, delegate: D) -> SubscriptionManager<D> {
        SubscriptionManager::with_config(delegate, self.config)
    }
}
