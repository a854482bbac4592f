//! Detector service: lifecycle, serialization, and host wiring.
//!
//! Wraps the pure [`StepDetector`] with everything the host contract needs:
//! an explicit `Idle -> Active` state machine driven by registrations, a
//! single mutex serializing samples against registration changes and
//! shutdown, persistence on stop, and fan-out of emissions to the update
//! sink.
//!
//! Lock discipline: every state transition happens under one mutex, so
//! samples observe a total order and never see a half-applied policy.
//! Emissions are handed to the sink after the lock is released; the sink
//! contract is non-blocking either way.

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::detector::{StepDetector, StepDetectorConfig};
use crate::gating::{GatingPolicy, GatingRequest};
use crate::host::{SampleSource, StateStore, UpdateSink};
use crate::persistence;
use crate::registry::Registry;
use crate::types::{AccelSample, DetectorPhase};

/// Service configuration.
#[derive(Debug, Clone, Copy)]
pub struct StepServiceConfig {
    /// Detector configuration (threshold, refractory window, day boundary).
    pub detector: StepDetectorConfig,
    /// Flush a snapshot to the store every N accepted steps while active.
    /// Zero disables incremental persistence; state is then written only on
    /// stop and deregistration.
    pub persist_every_steps: u32,
}

impl Default for StepServiceConfig {
    fn default() -> Self {
        Self {
            detector: StepDetectorConfig::default(),
            persist_every_steps: 64,
        }
    }
}

struct ServiceState {
    detector: StepDetector,
    registry: Registry,
    phase: DetectorPhase,
    started: bool,
    steps_since_flush: u32,
}

/// The step-detection service a host embeds.
///
/// Generic over the three host collaborators so tests can substitute
/// in-memory fakes without any framework.
pub struct StepService<Src, Sink, Store> {
    config: StepServiceConfig,
    state: Mutex<ServiceState>,
    source: Src,
    sink: Sink,
    store: Store,
}

impl<Src, Sink, Store> StepService<Src, Sink, Store>
where
    Src: SampleSource,
    Sink: UpdateSink,
    Store: StateStore,
{
    /// Create a stopped service. Call [`start`](Self::start) before
    /// registering consumers.
    pub fn new(config: StepServiceConfig, source: Src, sink: Sink, store: Store) -> Self {
        let detector = StepDetector::new(config.detector, GatingPolicy::default());
        Self {
            config,
            state: Mutex::new(ServiceState {
                detector,
                registry: Registry::new(),
                phase: DetectorPhase::Idle,
                started: false,
                steps_since_flush: 0,
            }),
            source,
            sink,
            store,
        }
    }

    /// Restore persisted state and begin accepting registrations.
    ///
    /// Idempotent: a second call while started is a no-op and does not
    /// reload state.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.started {
            return;
        }
        let persisted = persistence::load(&self.store);
        state.detector.restore(persisted);
        state.started = true;
        // Registrations may predate start; honor them now.
        if !state.registry.is_empty() {
            state.phase = DetectorPhase::Active;
            self.source.start_consuming();
        }
        info!(
            steps_today = persisted.steps_today,
            last_step_ms = persisted.last_step_ms,
            "step service started"
        );
    }

    /// Persist running state, release the sample source, and go idle.
    ///
    /// Safe to call concurrently with sample delivery: the mutex guarantees
    /// the persisted state reflects every sample processed strictly before
    /// this call won the lock, and no sample mutates state afterwards.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.started {
            return;
        }
        self.persist(&state);
        if state.phase == DetectorPhase::Active {
            self.source.stop_consuming();
        }
        state.phase = DetectorPhase::Idle;
        state.started = false;
        info!(steps_today = state.detector.steps_today(), "step service stopped");
    }

    /// Register a consumer's interest with its gating preferences.
    ///
    /// Recomputes the effective policy; the first registration transitions
    /// the service to `Active` and starts the sample source.
    pub fn register(&self, requester_id: impl Into<String>, request: GatingRequest) {
        let mut state = self.state.lock();
        let policy = state.registry.register(requester_id, request);
        state.detector.set_policy(policy);
        if state.started && state.phase == DetectorPhase::Idle && !state.registry.is_empty() {
            state.phase = DetectorPhase::Active;
            self.source.start_consuming();
            info!(?policy, "first registration, consuming sample source");
        }
    }

    /// Drop a consumer's registration.
    ///
    /// Recomputes the effective policy; when the last registration leaves,
    /// the service stops the sample source and persists its state.
    pub fn unregister(&self, requester_id: &str) {
        let mut state = self.state.lock();
        let policy = state.registry.unregister(requester_id);
        state.detector.set_policy(policy);
        if state.phase == DetectorPhase::Active && state.registry.is_empty() {
            state.phase = DetectorPhase::Idle;
            self.source.stop_consuming();
            self.persist(&state);
            info!("last registration gone, sample source released");
        }
    }

    /// Deliver one accelerometer sample.
    ///
    /// Samples arriving while idle or stopped are dropped; the source is not
    /// supposed to be running then, but a late in-flight sample must not
    /// mutate state.
    pub fn on_sample(&self, sample: &AccelSample) {
        let update = {
            let mut state = self.state.lock();
            if !state.started || state.phase != DetectorPhase::Active {
                return;
            }

            let steps_before = state.detector.steps_today();
            let last_before = state.detector.last_step_ms();
            let update = state.detector.on_sample(sample);

            let accepted = state.detector.last_step_ms() != last_before
                || state.detector.steps_today() != steps_before;
            if accepted && self.config.persist_every_steps > 0 {
                state.steps_since_flush += 1;
                if state.steps_since_flush >= self.config.persist_every_steps {
                    self.persist(&state);
                    state.steps_since_flush = 0;
                }
            }
            update
        };

        // Fan out after the lock is dropped; the sink never sees the mutex.
        if let Some(update) = update {
            self.sink.push(update);
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> DetectorPhase {
        self.state.lock().phase
    }

    /// Steps counted since the last day rollover.
    pub fn steps_today(&self) -> u32 {
        self.state.lock().detector.steps_today()
    }

    /// The gating policy currently in effect.
    pub fn effective_policy(&self) -> GatingPolicy {
        self.state.lock().detector.policy()
    }

    fn persist(&self, state: &ServiceState) {
        let snapshot = state.detector.snapshot();
        if let Err(err) = persistence::save(&self.store, &snapshot) {
            warn!(%err, "failed to persist detector state");
        }
    }

    /// Current running state, for host-side diagnostics.
    pub fn snapshot(&self) -> persistence::PersistedState {
        self.state.lock().detector.snapshot()
    }
}
