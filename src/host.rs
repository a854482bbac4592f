//! Contracts toward the host: sample source, update sink, state store.
//!
//! The kernel is a library consumed by a host platform (originally an
//! Android sensor plugin; any host providing these three collaborators
//! works). The traits stay minimal so a host adapter is a page of glue,
//! not a port.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;

use crate::types::StepUpdate;

/// A push-based producer of accelerometer samples.
///
/// The service calls these from registration transitions: consuming starts
/// when the first requester registers and stops when the last one leaves.
/// Both calls must be cheap and idempotent.
pub trait SampleSource: Send + Sync {
    fn start_consuming(&self);
    fn stop_consuming(&self);
}

/// A receiver for gated aggregate updates.
///
/// `push` is called from the sample hot path and must not block. No
/// acknowledgment; delivery is at-most-once per emission event.
pub trait UpdateSink: Send + Sync {
    fn push(&self, update: StepUpdate);
}

/// A key-value store for crash-safe persistence of running state.
///
/// Only the detector writes its keys, so last-write-wins is sufficient.
/// Absent keys mean first start, not an error.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<i64>;
    fn put(&self, key: &str, value: i64) -> Result<(), StoreError>;
}

/// Failure writing to the host's key-value store.
///
/// Persistence failures are local and non-fatal: the service logs them and
/// keeps counting.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store rejected write for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },
}

// Shared collaborators are common (one store serving the service and the
// host's own reads), so the contracts pass through Arc.
impl<T: SampleSource + ?Sized> SampleSource for std::sync::Arc<T> {
    fn start_consuming(&self) {
        (**self).start_consuming();
    }
    fn stop_consuming(&self) {
        (**self).stop_consuming();
    }
}

impl<T: UpdateSink + ?Sized> UpdateSink for std::sync::Arc<T> {
    fn push(&self, update: StepUpdate) {
        (**self).push(update);
    }
}

impl<T: StateStore + ?Sized> StateStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Option<i64> {
        (**self).get(key)
    }
    fn put(&self, key: &str, value: i64) -> Result<(), StoreError> {
        (**self).put(key, value)
    }
}

/// Update sink backed by an unbounded channel.
///
/// Emissions are handed to the channel and never awaited; the consumer
/// drains the receiver at its own pace. A disconnected receiver silently
/// drops updates, which matches the at-most-once contract.
pub struct ChannelSink {
    tx: Sender<StepUpdate>,
}

impl ChannelSink {
    /// Create a sink and the receiver its updates arrive on.
    pub fn new() -> (Self, Receiver<StepUpdate>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl UpdateSink for ChannelSink {
    fn push(&self, update: StepUpdate) {
        let _ = self.tx.send(update);
    }
}

/// In-memory state store for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.values.lock().get(key).copied()
    }

    fn put(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}
