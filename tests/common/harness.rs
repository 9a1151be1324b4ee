//! tests/common/harness.rs
use bytes::Bytes;
use dao_guard::config::{Config, SourceConfig};
use dao_guard::events::{MitigationEvent, MitigationStats};
use dao_guard::message::NodeId;
use dao_guard::root::{RootGuard, RootGuardHandle};
use dao_guard::source::AdaptiveSource;
use std::sync::Once;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dao_guard=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A test harness wiring a root guard to scripted or live traffic sources.
///
/// Meant to run under `#[tokio::test(start_paused = true)]`: every paced
/// send below advances virtual time deterministically, so arrival
/// timestamps and recovery ticks line up exactly across runs.
pub struct FloodHarness {
    pub handle: RootGuardHandle,
    pub started_at: Instant,
    metrics: mpsc::UnboundedReceiver<MitigationEvent>,
    observed: Vec<MitigationEvent>,
}

impl FloodHarness {
    pub fn start(config: &Config) -> Self {
        init_tracing();
        let (mut guard, handle) = RootGuard::new(config).unwrap();
        let metrics = guard.metrics_channel();
        let started_at = Instant::now();
        tokio::spawn(guard.run());
        Self {
            handle,
            started_at,
            metrics,
            observed: Vec::new(),
        }
    }

    /// Sends paced control messages from `source` at `rate` msg/s for
    /// `duration`, as the network-layer collaborator would.
    ///
    /// Pacing uses `tokio::time::advance` rather than `sleep`: the sleep
    /// timer is rounded up to millisecond granularity, which would distort
    /// sub-millisecond gaps (an 800 msg/s flood paces at 1.25ms), while
    /// `advance` moves the paused clock exactly.
    pub async fn drive(&self, source: NodeId, rate: f64, duration: Duration) {
        let gap = Duration::from_secs_f64(1.0 / rate);
        let count = (rate * duration.as_secs_f64()).round() as usize;
        for _ in 0..count {
            self.handle
                .control_message(source, Bytes::from_static(&[0u8; 120]))
                .await
                .unwrap();
            // Let the root stamp and process the arrival at the current
            // virtual instant before the clock moves.
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            tokio::time::advance(gap).await;
        }
    }

    /// Spawns a live adaptive source wired to the root's feedback channel.
    pub async fn spawn_adaptive(&self, id: NodeId, config: &SourceConfig) {
        let (lane_tx, lane_rx) = mpsc::channel(16);
        self.handle.register_source(id, lane_tx).await.unwrap();
        let model = AdaptiveSource::new(id, config);
        tokio::spawn(model.run(self.handle.clone(), lane_rx));
    }

    pub async fn stats(&self) -> MitigationStats {
        self.handle.stats().await.unwrap()
    }

    /// Every event observed so far, in emission order.
    pub fn events(&mut self) -> &[MitigationEvent] {
        while let Ok(event) = self.metrics.try_recv() {
            self.observed.push(event);
        }
        &self.observed
    }

    /// Times (relative to harness start) of enforcement and release events
    /// for one source, in observation order.
    pub fn lifecycle_of(&mut self, id: NodeId) -> (Vec<Duration>, Vec<Duration>) {
        let started_at = self.started_at;
        let mut enforced = Vec::new();
        let mut released = Vec::new();
        for event in self.events() {
            match *event {
                MitigationEvent::SourceEnforced { source, at } if source == id => {
                    enforced.push(at - started_at);
                }
                MitigationEvent::SourceReleased { source, at } if source == id => {
                    released.push(at - started_at);
                }
                _ => {}
            }
        }
        (enforced, released)
    }
}
