//! Premium-account status: the collaborator interface and its result shape.
//!
//! The actual lookup service lives outside this crate. Whatever it does, the
//! search path only ever sees a [`PremiumStatus`]; failures are folded into one
//! via [`PremiumStatus::failed`].
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::identity::IdentityKey;

#[derive(Debug, thiserror::Error)]
pub enum PremiumError {
    #[error("premium lookup is not configured")]
    NotConfigured,
    #[error("premium lookup failed: {0}")]
    Lookup(String),
    #[error("invalid premium response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PremiumStatus {
    pub is_premium: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PremiumStatus {
    pub fn premium(uuid: Option<String>, extra: Option<Value>) -> Self {
        Self {
            is_premium: true,
            uuid,
            extra,
            error: None,
        }
    }

    pub fn not_premium() -> Self {
        Self {
            is_premium: false,
            uuid: None,
            extra: None,
            error: None,
        }
    }

    /// "Not premium" carrying the reason the lookup did not succeed.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::not_premium()
        }
    }
}

/// External premium-status capability.
pub trait PremiumLookup: Send + Sync {
    fn check_status(&self, identity: &str) -> Result<PremiumStatus, PremiumError>;
}

/// Default collaborator when no lookup service is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

impl PremiumLookup for Unconfigured {
    fn check_status(&self, _identity: &str) -> Result<PremiumStatus, PremiumError> {
        Err(PremiumError::NotConfigured)
    }
}

/// Memoizes successful lookups per identity for the life of the process.
/// Failures are not cached, so a later call retries.
pub struct CachedLookup<L> {
    inner: L,
    cache: RwLock<HashMap<IdentityKey, PremiumStatus>>,
}

impl<L: PremiumLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl<L: PremiumLookup> PremiumLookup for CachedLookup<L> {
    fn check_status(&self, identity: &str) -> Result<PremiumStatus, PremiumError> {
        let key = IdentityKey::new(identity);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(status) = cache.get(&key) {
                debug!("premium status for {} served from cache", key);
                return Ok(status.clone());
            }
        }
        let status = self.inner.check_status(key.as_str())?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.entry(key).or_insert(status).clone())
    }
}
