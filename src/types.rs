//! Core data types for the step-detection kernel.
//!
//! Design principle: types should make intent obvious. If a concept exists,
//! it gets a type. Never pass raw tuples or untyped collections across
//! boundaries.

use serde::{Deserialize, Serialize};

/// A single raw accelerometer sample.
///
/// This is the minimal input contract: three-axis acceleration (including
/// gravity) and a timestamp. Samples are ephemeral; the detector consumes
/// them once and never retains them.
///
/// Design note: f32 components are sufficient for on-device execution.
/// Precision beyond sensor noise is not needed for threshold detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelSample {
    /// Timestamp in milliseconds since the Unix epoch.
    ///
    /// Expected to be non-decreasing within a stream; the detector rejects
    /// samples that move backwards in time rather than trusting them.
    pub timestamp_ms: u64,

    /// Accelerometer reading [x, y, z] in m/s², gravity included.
    pub accel: [f32; 3],
}

impl AccelSample {
    /// Creates a new sample.
    pub fn new(timestamp_ms: u64, accel: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            accel,
        }
    }

    /// Signal vector magnitude: the Euclidean norm of the acceleration vector.
    ///
    /// With the device at rest this sits near 9.81 m/s² (gravity); a heel
    /// strike pushes it well above.
    pub fn svm(&self) -> f32 {
        let x2 = self.accel[0] * self.accel[0];
        let y2 = self.accel[1] * self.accel[1];
        let z2 = self.accel[2] * self.accel[2];
        (x2 + y2 + z2).sqrt()
    }

    /// Whether all components are finite. A NaN or infinite reading from a
    /// faulty sensor must never reach the acceptance test.
    pub fn is_finite(&self) -> bool {
        self.accel.iter().all(|c| c.is_finite())
    }
}

/// An aggregated step-count update emitted to the downstream consumer.
///
/// Emissions are gated (see [`crate::gating`]); a consumer sees these at most
/// as often as the effective policy allows. Delivery is at-most-once per
/// emission event; downstream is idempotent on repeated identical counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpdate {
    /// Timestamp of the step that triggered this emission, in ms since epoch.
    pub timestamp_ms: u64,
    /// Steps counted since the last day rollover, at emission time.
    pub steps_today: u32,
}

impl StepUpdate {
    pub fn new(timestamp_ms: u64, steps_today: u32) -> Self {
        Self {
            timestamp_ms,
            steps_today,
        }
    }
}

/// Lifecycle phase of the detector service.
///
/// The phase is driven entirely by the active-registration set: the service
/// is `Active` (consuming the sample source) exactly while at least one
/// requester is registered. Accelerometer polling is expensive, so an idle
/// service must not hold the source open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    /// No registered consumers; the sample source is released.
    Idle,
    /// At least one registered consumer; samples are being processed.
    Active,
}
