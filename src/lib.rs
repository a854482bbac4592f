//! step-sense: a streaming step-detection kernel.
//!
//! Converts a push stream of timestamped 3-axis accelerometer samples into
//! discrete step events, maintains a running daily count, and emits gated
//! aggregate updates to a downstream consumer.
//!
//! # Design Philosophy
//!
//! - **Timestamp-driven**: the core never reads a wall clock; behavior is
//!   fully reproducible from the sample stream.
//! - **Fail-safe on bad input**: non-finite samples and clock regressions
//!   are dropped, never counted and never allowed to corrupt state.
//! - **O(1) per sample**: no buffers, no background threads; the refractory
//!   re-arm is a pure time predicate.
//! - **Host-agnostic**: the OS sensor layer, preference storage, and
//!   downstream consumers appear only as three small traits.
//!
//! # Example
//!
//! ```ignore
//! use step_sense::{
//!     AccelSample, ChannelSink, GatingRequest, MemoryStore, StepService,
//!     StepServiceConfig,
//! };
//!
//! let (sink, updates) = ChannelSink::new();
//! let service = StepService::new(
//!     StepServiceConfig::default(),
//!     my_sensor_adapter,
//!     sink,
//!     MemoryStore::new(),
//! );
//! service.start();
//! service.register("dashboard", GatingRequest::unspecified());
//! // ... sensor adapter delivers samples via service.on_sample(...) ...
//! ```

pub mod calendar;
pub mod detector;
pub mod gating;
pub mod host;
pub mod persistence;
pub mod registry;
pub mod service;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use calendar::{same_calendar_day, DayBoundary};
pub use detector::{StepDetector, StepDetectorConfig, DEFAULT_INTER_STEP_MS, DEFAULT_THRESHOLD};
pub use gating::{GatingPolicy, GatingRequest};
pub use host::{ChannelSink, MemoryStore, SampleSource, StateStore, StoreError, UpdateSink};
pub use persistence::PersistedState;
pub use registry::Registry;
pub use service::{StepService, StepServiceConfig};
pub use types::{AccelSample, DetectorPhase, StepUpdate};
