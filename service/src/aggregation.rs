//! Per-source fetch state for every configured lawmaker source.
//!
//! [`AggregationState`] owns one [`SourceFetchLifecycle`] per source and
//! publishes each source's [`FetchState`] independently. Sources are never
//! merged: one source failing or stalling has no effect on another.
//!
//! Each source's state lives in a `tokio::sync::watch` channel, so a reader
//! always sees a whole snapshot, and renderers can [`subscribe`] instead of
//! polling.
//!
//! [`subscribe`]: AggregationState::subscribe

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sources::{
    FetchState, LawmakerRecord, SourceDescriptor, SourceFetchLifecycle, SourceTransport,
};

/// Identifies one attempt for one source. `0` means never triggered.
pub type AttemptId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("source configured twice: {0}")]
    DuplicateSource(String),

    #[error("source has never been triggered: {0}")]
    NotTriggered(String),
}

/// What a reader sees for one source at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    pub source: String,
    pub attempt: AttemptId,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: FetchState<LawmakerRecord>,
}

struct SourceSlot {
    lifecycle: SourceFetchLifecycle,
    credential: Mutex<Option<String>>,
    last_attempt: AtomicU64,
    tx: watch::Sender<SourceSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SourceSlot {
    fn name(&self) -> &str {
        self.lifecycle.descriptor().name()
    }

    fn trigger(self: &Arc<Self>) -> AttemptId {
        // Held for the whole trigger so concurrent triggers for this source
        // publish Loading in attempt order.
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = task.take() {
            previous.abort();
        }

        let attempt = self.last_attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let source = self.name().to_string();
        self.tx.send_modify(|snapshot| {
            snapshot.attempt = attempt;
            snapshot.state = FetchState::Loading;
            snapshot.updated_at = Utc::now();
        });
        tracing::debug!(source, attempt, "source attempt started");

        let credential = self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let slot = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            let state = slot.lifecycle.run(credential.as_deref()).await;
            slot.publish(attempt, state);
        }));

        attempt
    }

    /// Publish `state` if `attempt` is still the current one.
    fn publish(&self, attempt: AttemptId, state: FetchState<LawmakerRecord>) -> bool {
        let published = self.tx.send_if_modified(|snapshot| {
            if snapshot.attempt != attempt {
                return false;
            }
            snapshot.state = state;
            snapshot.updated_at = Utc::now();
            true
        });

        if !published {
            tracing::debug!(
                source = self.name(),
                attempt,
                "discarding result of superseded attempt"
            );
        }
        published
    }
}

/// Source name → independently published [`FetchState`].
#[derive(Clone)]
pub struct AggregationState {
    slots: Arc<BTreeMap<String, Arc<SourceSlot>>>,
}

impl AggregationState {
    /// Build the aggregation from descriptors and explicit credentials.
    ///
    /// Sources without an entry in `credentials` simply have none. Nothing is
    /// fetched until [`trigger`](Self::trigger) or
    /// [`trigger_all`](Self::trigger_all) is called.
    ///
    /// # Errors
    /// Returns an error if two descriptors share a name or a credential names
    /// an unconfigured source.
    pub fn new(
        descriptors: Vec<SourceDescriptor>,
        credentials: &BTreeMap<String, String>,
        transport: Arc<dyn SourceTransport>,
    ) -> Result<Self, AggregationError> {
        if let Some(unknown) = credentials
            .keys()
            .find(|name| !descriptors.iter().any(|d| d.name() == name.as_str()))
        {
            return Err(AggregationError::UnknownSource(unknown.clone()));
        }

        let mut slots = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.name().to_string();
            if slots.contains_key(&name) {
                return Err(AggregationError::DuplicateSource(name));
            }

            let (tx, _) = watch::channel(SourceSnapshot {
                source: name.clone(),
                attempt: 0,
                updated_at: Utc::now(),
                state: FetchState::Loading,
            });
            let slot = SourceSlot {
                lifecycle: SourceFetchLifecycle::new(Arc::new(descriptor), Arc::clone(&transport)),
                credential: Mutex::new(credentials.get(&name).cloned()),
                last_attempt: AtomicU64::new(0),
                tx,
                task: Mutex::new(None),
            };
            slots.insert(name, Arc::new(slot));
        }

        Ok(Self {
            slots: Arc::new(slots),
        })
    }

    fn slot(&self, source: &str) -> Result<&Arc<SourceSlot>, AggregationError> {
        self.slots
            .get(source)
            .ok_or_else(|| AggregationError::UnknownSource(source.to_string()))
    }

    /// Configured source names, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Start a new attempt for `source`, superseding any outstanding one.
    ///
    /// `Loading` is published before this returns; the outstanding attempt's
    /// task is aborted and its result, should it still arrive, is discarded.
    ///
    /// # Errors
    /// Returns [`AggregationError::UnknownSource`] for an unconfigured name.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn trigger(&self, source: &str) -> Result<AttemptId, AggregationError> {
        Ok(self.slot(source)?.trigger())
    }

    /// Trigger every configured source.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn trigger_all(&self) -> Vec<(String, AttemptId)> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.trigger()))
            .collect()
    }

    /// Replace `source`'s credential. Re-triggers the source when the value
    /// changed and returns the new attempt id.
    ///
    /// # Errors
    /// Returns [`AggregationError::UnknownSource`] for an unconfigured name.
    ///
    /// # Panics
    /// Panics if the credential changed and this is called outside a Tokio
    /// runtime.
    pub fn set_credential(
        &self,
        source: &str,
        credential: Option<String>,
    ) -> Result<Option<AttemptId>, AggregationError> {
        let slot = self.slot(source)?;
        {
            let mut current = slot
                .credential
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *current == credential {
                return Ok(None);
            }
            *current = credential;
        }
        tracing::info!(source, "credential changed; re-triggering source");
        Ok(Some(slot.trigger()))
    }

    /// Current state of `source`.
    ///
    /// # Errors
    /// Returns [`AggregationError::UnknownSource`] for an unconfigured name.
    pub fn get(&self, source: &str) -> Result<FetchState<LawmakerRecord>, AggregationError> {
        Ok(self.snapshot(source)?.state)
    }

    /// Current state of `source` with its attempt id and timestamp.
    ///
    /// # Errors
    /// Returns [`AggregationError::UnknownSource`] for an unconfigured name.
    pub fn snapshot(&self, source: &str) -> Result<SourceSnapshot, AggregationError> {
        Ok(self.slot(source)?.tx.borrow().clone())
    }

    /// Snapshots of every source, sorted by name.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SourceSnapshot> {
        self.slots
            .values()
            .map(|slot| slot.tx.borrow().clone())
            .collect()
    }

    /// Receiver notified on every publication for `source`.
    ///
    /// # Errors
    /// Returns [`AggregationError::UnknownSource`] for an unconfigured name.
    pub fn subscribe(
        &self,
        source: &str,
    ) -> Result<watch::Receiver<SourceSnapshot>, AggregationError> {
        Ok(self.slot(source)?.tx.subscribe())
    }

    /// Wait until `source`'s current attempt has settled.
    ///
    /// # Errors
    /// Returns [`AggregationError::UnknownSource`] for an unconfigured name and
    /// [`AggregationError::NotTriggered`] if no attempt was ever started.
    pub async fn settled(&self, source: &str) -> Result<SourceSnapshot, AggregationError> {
        let slot = self.slot(source)?;
        let mut rx = slot.tx.subscribe();
        if rx.borrow().attempt == 0 {
            return Err(AggregationError::NotTriggered(source.to_string()));
        }

        let snapshot = match rx.wait_for(|snapshot| snapshot.state.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => slot.tx.borrow().clone(),
        };
        Ok(snapshot)
    }
}
