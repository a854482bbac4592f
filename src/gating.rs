//! Update-gating policy and the merge over active requests.
//!
//! Every registered consumer may state how often it wants aggregate updates:
//! a minimum step increment and a minimum interval between emissions. The
//! detector runs with the most demanding (element-wise minimum) of all
//! active requests, so no consumer sees updates less often than it asked
//! for. Fields nobody specifies fall back to the defaults.

use serde::{Deserialize, Serialize};

/// Default minimum step increment between emissions.
pub const DEFAULT_MIN_STEPS_INCREMENT: u32 = 1;

/// Default minimum interval between emissions, in milliseconds.
pub const DEFAULT_MIN_UPDATE_INTERVAL_MS: u64 = 10_000;

/// Per-requester gating preferences. Unspecified fields do not participate
/// in the merge.
///
/// Values arrive from a best-effort merge of external requesters, so
/// nonsensical values (zero or negative) are normalized to "unspecified"
/// rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatingRequest {
    /// Desired minimum step increment between updates. Must be positive to
    /// take effect.
    pub min_steps_increment: Option<i64>,
    /// Desired minimum time between updates in milliseconds. Must be
    /// non-negative to take effect.
    pub min_update_interval_ms: Option<i64>,
}

impl GatingRequest {
    /// A request with no stated preferences; merges as the defaults.
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Normalized step-increment preference, if usable.
    fn steps_increment(&self) -> Option<u32> {
        match self.min_steps_increment {
            Some(v) if v > 0 => Some(v.min(u32::MAX as i64) as u32),
            _ => None,
        }
    }

    /// Normalized interval preference, if usable.
    fn update_interval_ms(&self) -> Option<u64> {
        match self.min_update_interval_ms {
            Some(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }
}

/// The effective gating policy the detector runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatingPolicy {
    /// Minimum `steps_today - last_emitted_steps` before an emission.
    pub min_steps_increment: u32,
    /// Minimum time since the previous emission, in milliseconds.
    pub min_update_interval_ms: u64,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self {
            min_steps_increment: DEFAULT_MIN_STEPS_INCREMENT,
            min_update_interval_ms: DEFAULT_MIN_UPDATE_INTERVAL_MS,
        }
    }
}

impl GatingPolicy {
    /// Merge the active requests into an effective policy.
    ///
    /// Each field is the minimum over the requests that specify it; a field
    /// no request specifies takes its default. An empty request set yields
    /// the default policy.
    pub fn merge<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a GatingRequest>,
    {
        let mut min_steps: Option<u32> = None;
        let mut min_interval: Option<u64> = None;

        for request in requests {
            if let Some(steps) = request.steps_increment() {
                min_steps = Some(min_steps.map_or(steps, |m| m.min(steps)));
            }
            if let Some(interval) = request.update_interval_ms() {
                min_interval = Some(min_interval.map_or(interval, |m| m.min(interval)));
            }
        }

        Self {
            min_steps_increment: min_steps.unwrap_or(DEFAULT_MIN_STEPS_INCREMENT),
            min_update_interval_ms: min_interval.unwrap_or(DEFAULT_MIN_UPDATE_INTERVAL_MS),
        }
    }
}
