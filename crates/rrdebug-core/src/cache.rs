#![forbid(unsafe_code)]

//! Two-tier, single-slot payload cache used to hand events from the intake
//! page to the playback page.
//!
//! The primary tier is a structured object store (IndexedDB in the browser)
//! that keeps the payload as-is. The secondary tier is a flat string store
//! (`sessionStorage`) that keeps its JSON text. Both hold exactly one value
//! under the configured key; every store overwrites it.
//!
//! Retrieval probes the primary tier first and falls back to the secondary
//! one, so a payload written by an older page, or one that only fit in one
//! tier, is still found.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HandoffConfig;

/// Failure reported by a single storage tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    /// The backing store cannot be opened at all (disabled, blocked,
    /// private mode).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The store is reachable but refused the operation (quota, aborted
    /// transaction).
    #[error("storage operation failed: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to store events (primary: {primary}; fallback: {secondary})")]
    StoreFailed {
        primary: TierError,
        secondary: TierError,
    },

    #[error("failed to serialize events: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("stored events are not valid JSON: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("failed to read stored events (primary: {primary}; fallback: {secondary})")]
    ReadFailed {
        primary: TierError,
        secondary: TierError,
    },
}

/// Structured, schema-less object store.
///
/// Futures are not required to be `Send`: browser storage lives on the
/// page's event loop.
pub trait StructuredTier {
    fn put(&self, key: &str, payload: &Value) -> impl Future<Output = Result<(), TierError>>;
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, TierError>>;
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), TierError>>;
}

/// Flat string-keyed store.
pub trait StringTier {
    fn set_item(&self, key: &str, value: &str) -> Result<(), TierError>;
    fn get_item(&self, key: &str) -> Result<Option<String>, TierError>;
    fn remove_item(&self, key: &str) -> Result<(), TierError>;
}

/// Single-slot handoff cache over two tiers.
#[derive(Debug, Clone)]
pub struct PayloadCache<P, S> {
    primary: P,
    secondary: S,
    key: String,
}

impl<P: StructuredTier, S: StringTier> PayloadCache<P, S> {
    /// Cache using the default handoff key.
    pub fn new(primary: P, secondary: S) -> Self {
        Self::with_config(primary, secondary, &HandoffConfig::default())
    }

    pub fn with_config(primary: P, secondary: S, config: &HandoffConfig) -> Self {
        Self {
            primary,
            secondary,
            key: config.key.clone(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn primary(&self) -> &P {
        &self.primary
    }

    #[must_use]
    pub fn secondary(&self) -> &S {
        &self.secondary
    }

    /// Persist `payload` in both tiers.
    ///
    /// Succeeds when at least one tier holds the new value. A tier that
    /// rejected the write is cleared so it cannot serve an older payload.
    pub async fn store(&self, payload: &Value) -> Result<(), CacheError> {
        let text = serde_json::to_string(payload).map_err(CacheError::Serialize)?;

        let primary = self.primary.put(&self.key, payload).await;
        if let Err(err) = &primary {
            warn!(key = %self.key, error = %err, "primary tier rejected events");
            if let Err(err) = self.primary.delete(&self.key).await {
                debug!(error = %err, "could not clear stale primary entry");
            }
        }

        let secondary = self.secondary.set_item(&self.key, &text);
        if let Err(err) = &secondary {
            warn!(key = %self.key, bytes = text.len(), error = %err, "fallback tier rejected events");
            if let Err(err) = self.secondary.remove_item(&self.key) {
                debug!(error = %err, "could not clear stale fallback entry");
            }
        }

        match (primary, secondary) {
            (Err(primary), Err(secondary)) => Err(CacheError::StoreFailed { primary, secondary }),
            _ => {
                debug!(key = %self.key, bytes = text.len(), "events stored");
                Ok(())
            }
        }
    }

    /// Read the payload back, primary tier first.
    ///
    /// `Ok(None)` means neither tier holds anything; it is not an error.
    pub async fn retrieve(&self) -> Result<Option<Value>, CacheError> {
        let primary_err = match self.primary.get(&self.key).await {
            Ok(Some(payload)) => {
                debug!(key = %self.key, "events loaded from primary tier");
                return Ok(Some(payload));
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key = %self.key, error = %err, "primary tier unreadable, trying fallback");
                Some(err)
            }
        };

        match self.secondary.get_item(&self.key) {
            Ok(Some(text)) => {
                let payload = serde_json::from_str(&text).map_err(CacheError::Corrupt)?;
                debug!(key = %self.key, "events loaded from fallback tier");
                Ok(Some(payload))
            }
            Ok(None) => Ok(None),
            Err(secondary) => match primary_err {
                Some(primary) => Err(CacheError::ReadFailed { primary, secondary }),
                None => {
                    warn!(key = %self.key, error = %secondary, "fallback tier unreadable");
                    Ok(None)
                }
            },
        }
    }

    /// Whether either tier still holds a payload.
    pub async fn contains(&self) -> bool {
        if matches!(self.primary.get(&self.key).await, Ok(Some(_))) {
            return true;
        }
        matches!(self.secondary.get_item(&self.key), Ok(Some(_)))
    }
}

/// In-memory structured tier. Clones share the same slots, which models two
/// pages of one browsing session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStructuredTier {
    slots: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl MemoryStructuredTier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, as if the browser evicted the database.
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl StructuredTier for MemoryStructuredTier {
    async fn put(&self, key: &str, payload: &Value) -> Result<(), TierError> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), payload.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, TierError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

/// In-memory string tier with shared slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStringTier {
    items: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStringTier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl StringTier for MemoryStringTier {
    fn set_item(&self, key: &str, value: &str) -> Result<(), TierError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, TierError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn remove_item(&self, key: &str) -> Result<(), TierError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
