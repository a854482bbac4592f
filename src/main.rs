//! Demo binary: runs a synthetic walking stream through the step service
//! and prints every gated update as a JSON line.

use std::sync::Arc;

use step_sense::persistence::KEY_STEPS_TODAY;
use step_sense::{
    AccelSample, ChannelSink, GatingRequest, MemoryStore, StateStore, StepService,
    StepServiceConfig,
};

/// The demo pushes samples by hand, so the source hooks just log.
struct LoggingSource;

impl step_sense::SampleSource for LoggingSource {
    fn start_consuming(&self) {
        tracing::info!("sample source opened");
    }
    fn stop_consuming(&self) {
        tracing::info!("sample source released");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (sink, updates) = ChannelSink::new();
    let store = Arc::new(MemoryStore::new());
    let service = StepService::new(
        StepServiceConfig::default(),
        LoggingSource,
        sink,
        Arc::clone(&store),
    );

    service.start();
    service.register(
        "demo",
        GatingRequest {
            min_steps_increment: Some(1),
            min_update_interval_ms: Some(1000),
        },
    );

    // One minute of walking at 2 steps/s, sampled at 50Hz: a quiet gravity
    // baseline with an impact spike every 500ms.
    let start_ms = 1_700_000_000_000u64;
    for i in 0..3000u64 {
        let t = start_ms + i * 20;
        let accel = if i % 25 == 0 {
            [1.2, 2.1, 17.5]
        } else {
            [0.1, 0.2, 9.8]
        };
        service.on_sample(&AccelSample::new(t, accel));
    }

    service.stop();

    for update in updates.try_iter() {
        match serde_json::to_string(&update) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(%err, "failed to encode update"),
        }
    }
    println!(
        "final: {} steps today (persisted: {:?})",
        service.steps_today(),
        store.get(KEY_STEPS_TODAY)
    );
}
