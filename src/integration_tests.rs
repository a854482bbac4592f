//! End-to-end tests driving the full service the way a host would:
//! registration, sample delivery, emission fan-out, shutdown, restore.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::calendar::DayBoundary;
use crate::detector::StepDetectorConfig;
use crate::host::{ChannelSink, MemoryStore, SampleSource};
use crate::service::{StepService, StepServiceConfig};
use crate::types::{AccelSample, StepUpdate};
use crate::GatingRequest;

const DAY_MS: u64 = 86_400_000;

/// Source fake tracking whether the service currently consumes it.
#[derive(Default)]
struct FlagSource {
    consuming: AtomicBool,
}

impl SampleSource for FlagSource {
    fn start_consuming(&self) {
        self.consuming.store(true, Ordering::SeqCst);
    }
    fn stop_consuming(&self) {
        self.consuming.store(false, Ordering::SeqCst);
    }
}

fn utc_config() -> StepServiceConfig {
    StepServiceConfig {
        detector: StepDetectorConfig {
            day_boundary: DayBoundary::Utc,
            ..StepDetectorConfig::default()
        },
        persist_every_steps: 0,
    }
}

fn spike(timestamp_ms: u64) -> AccelSample {
    AccelSample::new(timestamp_ms, [1.0, 2.0, 18.0])
}

fn quiet(timestamp_ms: u64) -> AccelSample {
    AccelSample::new(timestamp_ms, [0.1, 0.2, 9.8])
}

/// A synthetic walk: a quiet baseline with an impact spike every
/// `step_period_ms`, sampled at 50Hz.
fn walk(start_ms: u64, duration_ms: u64, step_period_ms: u64) -> Vec<AccelSample> {
    (0..duration_ms / 20)
        .map(|i| {
            let t = start_ms + i * 20;
            if (t - start_ms) % step_period_ms == 0 {
                spike(t)
            } else {
                quiet(t)
            }
        })
        .collect()
}

#[test]
fn test_full_walk_counts_and_emits() {
    let (sink, updates) = ChannelSink::new();
    let service = StepService::new(utc_config(), FlagSource::default(), sink, MemoryStore::new());
    service.start();
    service.register(
        "walker",
        GatingRequest {
            min_steps_increment: Some(1),
            min_update_interval_ms: Some(0),
        },
    );

    // 10 seconds of walking at 2 steps per second.
    for sample in walk(0, 10_000, 500) {
        service.on_sample(&sample);
    }

    assert_eq!(service.steps_today(), 20);
    let received: Vec<StepUpdate> = updates.try_iter().collect();
    assert_eq!(received.len(), 20);
    assert_eq!(received.last().unwrap().steps_today, 20);
    // Counts are non-decreasing across emissions.
    for pair in received.windows(2) {
        assert!(pair[1].steps_today >= pair[0].steps_today);
    }
}

#[test]
fn test_default_gating_throttles_updates() {
    let (sink, updates) = ChannelSink::new();
    let service = StepService::new(utc_config(), FlagSource::default(), sink, MemoryStore::new());
    service.start();
    // Default policy: min 1 step, min 10s between updates.
    service.register("slow-consumer", GatingRequest::unspecified());

    for sample in walk(0, 30_000, 500) {
        service.on_sample(&sample);
    }

    let received: Vec<StepUpdate> = updates.try_iter().collect();
    // 60 steps over 30s but at most one update per 10s window plus the
    // initial one.
    assert!(
        received.len() <= 4,
        "expected throttled updates, got {}",
        received.len()
    );
    for pair in received.windows(2) {
        assert!(pair[1].timestamp_ms - pair[0].timestamp_ms > 10_000);
    }
}

#[test]
fn test_restart_resumes_count_across_the_same_day() {
    let store = Arc::new(MemoryStore::new());

    let (sink, _updates) = ChannelSink::new();
    let service =
        StepService::new(utc_config(), FlagSource::default(), sink, Arc::clone(&store));
    service.start();
    service.register("walker", GatingRequest::unspecified());
    for sample in walk(0, 5_000, 500) {
        service.on_sample(&sample);
    }
    assert_eq!(service.steps_today(), 10);
    service.stop();

    // Restart an hour later, same civil day: the count continues.
    let (sink, _updates) = ChannelSink::new();
    let service = StepService::new(utc_config(), FlagSource::default(), sink, store);
    service.start();
    service.register("walker", GatingRequest::unspecified());
    for sample in walk(3_600_000, 2_000, 500) {
        service.on_sample(&sample);
    }
    assert_eq!(service.steps_today(), 14);
}

#[test]
fn test_restart_across_midnight_rolls_over() {
    let store = Arc::new(MemoryStore::new());

    let (sink, _updates) = ChannelSink::new();
    let service =
        StepService::new(utc_config(), FlagSource::default(), sink, Arc::clone(&store));
    service.start();
    service.register("walker", GatingRequest::unspecified());
    for sample in walk(DAY_MS - 5_000, 4_000, 500) {
        service.on_sample(&sample);
    }
    assert_eq!(service.steps_today(), 8);
    service.stop();

    // Restart the next day: first accepted step resets to 1.
    let (sink, _updates) = ChannelSink::new();
    let service = StepService::new(utc_config(), FlagSource::default(), sink, store);
    service.start();
    assert_eq!(service.steps_today(), 8); // restored as persisted
    service.register("walker", GatingRequest::unspecified());
    service.on_sample(&spike(DAY_MS + 3_600_000));
    assert_eq!(service.steps_today(), 1);
}

#[test]
fn test_source_consumption_tracks_registrations() {
    let source = Arc::new(FlagSource::default());
    let (sink, _updates) = ChannelSink::new();
    let service =
        StepService::new(utc_config(), Arc::clone(&source), sink, MemoryStore::new());
    service.start();
    assert!(!source.consuming.load(Ordering::SeqCst));

    service.register("a", GatingRequest::unspecified());
    assert!(source.consuming.load(Ordering::SeqCst));

    service.register("b", GatingRequest::unspecified());
    service.unregister("a");
    assert!(source.consuming.load(Ordering::SeqCst));

    service.unregister("b");
    assert!(!source.consuming.load(Ordering::SeqCst));
}

#[test]
fn test_concurrent_samples_and_stop_lose_nothing_processed() {
    let store = Arc::new(MemoryStore::new());
    let (sink, _updates) = ChannelSink::new();
    let service = Arc::new(StepService::new(
        utc_config(),
        FlagSource::default(),
        sink,
        Arc::clone(&store),
    ));
    service.start();
    service.register("walker", GatingRequest::unspecified());

    let feeder = {
        let service = Arc::clone(&service);
        std::thread::spawn(move || {
            for i in 0..200u64 {
                service.on_sample(&spike(i * 400));
            }
        })
    };
    // Stop midway through delivery.
    std::thread::sleep(std::time::Duration::from_millis(2));
    service.stop();
    feeder.join().unwrap();

    // Whatever was processed before stop won the lock is persisted; samples
    // after stop mutated nothing.
    let persisted = crate::persistence::load(store.as_ref());
    assert_eq!(persisted.steps_today, service.steps_today());
    assert!(u64::from(persisted.steps_today) <= 200);
}

#[test]
fn test_vibration_counts_at_most_refractory_rate() {
    // Known limitation made concrete: sustained above-threshold vibration
    // at 50Hz is clamped to one count per refractory window, not filtered.
    let (sink, _updates) = ChannelSink::new();
    let service = StepService::new(utc_config(), FlagSource::default(), sink, MemoryStore::new());
    service.start();
    service.register("walker", GatingRequest::unspecified());

    for i in 0..500u64 {
        service.on_sample(&spike(i * 20)); // 10 seconds of constant shaking
    }

    // One step per 320ms window (300ms refractory, 20ms sample grid).
    let counted = service.steps_today();
    assert!(counted <= 10_000 / 300 + 1, "counted {counted}");
    assert!(counted >= 30, "counted {counted}");
}
