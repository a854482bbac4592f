//! The step-detection and update-gating core.
//!
//! A stream of accelerometer samples goes through a fixed pipeline per
//! sample: magnitude computation, threshold + refractory acceptance, lazy
//! day rollover, then the emission gate. Everything is O(1) per sample with
//! no buffering, so the detector is safe to drive at sensor rate.
//!
//! Known limitation: this is a peak/refractory detector, not a band-pass
//! filter. Sustained vibration above the threshold is rejected only for the
//! refractory window after each accepted step, so it can still count at the
//! refractory rate.

use tracing::{debug, trace};

use crate::calendar::{same_calendar_day, DayBoundary};
use crate::gating::GatingPolicy;
use crate::persistence::PersistedState;
use crate::types::{AccelSample, StepUpdate};

/// Acceptance threshold on the signal vector magnitude, in m/s² including
/// gravity.
pub const DEFAULT_THRESHOLD: f32 = 13.0;

/// Refractory window after an accepted step, in milliseconds. No further
/// step is accepted until strictly more than this has elapsed.
pub const DEFAULT_INTER_STEP_MS: u64 = 300;

/// Configuration for the step detector.
#[derive(Debug, Clone, Copy)]
pub struct StepDetectorConfig {
    /// Minimum signal vector magnitude to accept a step (m/s², with gravity).
    pub threshold: f32,
    /// Minimum time between accepted steps in milliseconds.
    pub inter_step_ms: u64,
    /// Timezone policy for the daily rollover.
    pub day_boundary: DayBoundary,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            inter_step_ms: DEFAULT_INTER_STEP_MS,
            day_boundary: DayBoundary::default(),
        }
    }
}

/// Streaming step detector with gated aggregate emissions.
///
/// The detector is purely timestamp-driven: it never reads a wall clock, so
/// behavior is fully reproducible from the sample stream. The refractory
/// re-arm is a time-gated predicate on the incoming timestamps; the sample
/// source keeps running throughout.
pub struct StepDetector {
    config: StepDetectorConfig,
    policy: GatingPolicy,

    // Running state
    steps_today: u32,
    last_step_ms: Option<u64>,

    // Emission gating state
    last_update_ms: Option<u64>,
    last_emitted_steps: u32,
}

impl StepDetector {
    /// Create a detector with zeroed state ("no step yet").
    pub fn new(config: StepDetectorConfig, policy: GatingPolicy) -> Self {
        Self {
            config,
            policy,
            steps_today: 0,
            last_step_ms: None,
            last_update_ms: None,
            last_emitted_steps: 0,
        }
    }

    /// Create a detector with default configuration and policy.
    pub fn with_defaults() -> Self {
        Self::new(StepDetectorConfig::default(), GatingPolicy::default())
    }

    /// Restore running state from a persisted snapshot.
    ///
    /// Emission-gating state is not persisted; after a restart the first
    /// accepted step may emit immediately, which downstream tolerates
    /// (idempotent on repeated counts).
    pub fn restore(&mut self, state: PersistedState) {
        self.steps_today = state.steps_today;
        self.last_step_ms = state.last_step_ms;
        self.last_update_ms = None;
        self.last_emitted_steps = 0;
    }

    /// Snapshot the state that must survive a restart.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            steps_today: self.steps_today,
            last_step_ms: self.last_step_ms,
        }
    }

    /// Process one sample. Returns an update when the emission gate opens.
    ///
    /// Non-accepted samples (below threshold, inside the refractory window,
    /// non-finite, or moving backwards in time) cause no state change and no
    /// emission.
    pub fn on_sample(&mut self, sample: &AccelSample) -> Option<StepUpdate> {
        if !sample.is_finite() {
            trace!(timestamp_ms = sample.timestamp_ms, "dropping non-finite sample");
            return None;
        }

        let svm = sample.svm();
        if !svm.is_finite() || svm <= self.config.threshold {
            return None;
        }

        // Clock regression: a sample older than the last accepted step is
        // untrustworthy. Fail safe by missing a step rather than double
        // counting.
        if let Some(last) = self.last_step_ms {
            if sample.timestamp_ms < last {
                trace!(
                    timestamp_ms = sample.timestamp_ms,
                    last_step_ms = last,
                    "dropping sample behind last accepted step"
                );
                return None;
            }
            // Refractory: strictly more than inter_step_ms must have passed.
            if sample.timestamp_ms - last <= self.config.inter_step_ms {
                return None;
            }
        }

        self.accept_step(sample.timestamp_ms, svm)
    }

    /// Replace the active gating policy. Takes effect from the next
    /// accepted step.
    pub fn set_policy(&mut self, policy: GatingPolicy) {
        self.policy = policy;
    }

    /// The active gating policy.
    pub fn policy(&self) -> GatingPolicy {
        self.policy
    }

    /// Steps counted since the last day rollover.
    pub fn steps_today(&self) -> u32 {
        self.steps_today
    }

    /// Timestamp of the most recently accepted step, if any.
    pub fn last_step_ms(&self) -> Option<u64> {
        self.last_step_ms
    }

    fn accept_step(&mut self, timestamp_ms: u64, svm: f32) -> Option<StepUpdate> {
        // Lazy day rollover: detected on the next accepted step, never by a
        // background timer. The emission baseline resets with the count so
        // the new day's first update is not suppressed by yesterday's total.
        if let Some(last) = self.last_step_ms {
            if !same_calendar_day(last, timestamp_ms, self.config.day_boundary) {
                debug!(
                    previous_steps = self.steps_today,
                    "day rollover, resetting count"
                );
                self.steps_today = 0;
                self.last_emitted_steps = 0;
            }
        }

        self.steps_today = self.steps_today.saturating_add(1);
        self.last_step_ms = Some(timestamp_ms);
        trace!(timestamp_ms, svm, steps_today = self.steps_today, "step accepted");

        self.try_emit(timestamp_ms)
    }

    /// Emission gate: both the interval and the increment condition must
    /// hold. A detector that has never emitted treats the interval as
    /// trivially satisfied.
    fn try_emit(&mut self, now_ms: u64) -> Option<StepUpdate> {
        let interval_ok = match self.last_update_ms {
            Some(last) => now_ms.saturating_sub(last) > self.policy.min_update_interval_ms,
            None => true,
        };
        let increment_ok = self.steps_today.saturating_sub(self.last_emitted_steps)
            >= self.policy.min_steps_increment;

        if !(interval_ok && increment_ok) {
            return None;
        }

        self.last_update_ms = Some(now_ms);
        self.last_emitted_steps = self.steps_today;
        debug!(
            timestamp_ms = now_ms,
            steps_today = self.steps_today,
            "emitting aggregate update"
        );
        Some(StepUpdate::new(now_ms, self.steps_today))
    }
}
