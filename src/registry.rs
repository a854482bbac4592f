//! Registration of downstream consumers and their gating preferences.
//!
//! The registry owns the active-request set; the service queries it for the
//! effective policy whenever the set changes. It deliberately holds no
//! detector state and makes no lifecycle decisions itself.

use std::collections::HashMap;

use crate::gating::{GatingPolicy, GatingRequest};

/// The set of active requesters and their gating requests.
#[derive(Debug, Default)]
pub struct Registry {
    requests: HashMap<String, GatingRequest>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a requester's gating request. Returns the recomputed
    /// effective policy.
    pub fn register(&mut self, requester_id: impl Into<String>, request: GatingRequest) -> GatingPolicy {
        self.requests.insert(requester_id.into(), request);
        self.effective_policy()
    }

    /// Remove a requester. Unknown ids are a no-op. Returns the recomputed
    /// effective policy.
    pub fn unregister(&mut self, requester_id: &str) -> GatingPolicy {
        self.requests.remove(requester_id);
        self.effective_policy()
    }

    /// The element-wise minimum over active requests, with defaults for
    /// unspecified fields.
    pub fn effective_policy(&self) -> GatingPolicy {
        GatingPolicy::merge(self.requests.values())
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}
