//! Recovery hysteresis: release timing, clock-driven re-evaluation and
//! re-entrancy of the enforcement state machine.

pub mod common;

use common::harness::FloodHarness;
use dao_guard::config::Config;
use dao_guard::message::NodeId;
use std::time::Duration;
use tokio::time::sleep;

const ATTACKER: NodeId = NodeId(1);

/// A 25-message burst at 1000 msg/s, offset slightly from harness start so
/// that burst arrivals never sit exactly on a recovery-tick window edge.
async fn burst(harness: &FloodHarness) {
    sleep(Duration::from_millis(10)).await;
    harness
        .drive(ATTACKER, 1000.0, Duration::from_millis(25))
        .await;
}

fn assert_close(actual: Duration, expected: Duration, what: &str) {
    let slack = Duration::from_millis(100);
    assert!(
        actual >= expected.saturating_sub(slack) && actual <= expected + slack,
        "{what}: expected ~{expected:?}, got {actual:?}"
    );
}

/// With `recovery_windows_required = 1`, release is driven purely by the
/// periodic recovery clock: the source goes silent after its burst, and the
/// first tick that sees the admitted window drained lifts enforcement.
///
/// The burst lands at t ≈ 10..35ms; the tick at 1s still sees it in the
/// window (hot), the tick at 2s sees an empty window and releases.
#[tokio::test(start_paused = true)]
async fn silent_source_is_released_by_the_recovery_clock() {
    let mut harness = FloodHarness::start(&Config::default());

    burst(&harness).await;
    sleep(Duration::from_secs(4)).await;

    let (enforced, released) = harness.lifecycle_of(ATTACKER);
    assert_eq!(enforced.len(), 1);
    assert_eq!(released.len(), 1);
    assert_close(released[0], Duration::from_secs(2), "release time");
}

/// Scenario D: with `recovery_windows_required = 2` the same burst is
/// released one full recovery window later — at the second consecutive
/// clear tick, not the first.
#[tokio::test(start_paused = true)]
async fn two_required_windows_delay_release_by_one_tick() {
    let mut config = Config::default();
    config.mitigation.recovery_windows_required = 2;
    let mut harness = FloodHarness::start(&config);

    burst(&harness).await;
    sleep(Duration::from_secs(4)).await;

    let (enforced, released) = harness.lifecycle_of(ATTACKER);
    assert_eq!(enforced.len(), 1);
    assert_eq!(released.len(), 1);
    assert_close(released[0], Duration::from_secs(3), "release time");
}

/// The state machine is re-entrant, not one-shot: a source released after
/// recovery that reoffends above threshold is enforced again, with a fresh
/// throttle directive.
#[tokio::test(start_paused = true)]
async fn released_source_that_reoffends_is_enforced_again() {
    let mut harness = FloodHarness::start(&Config::default());

    burst(&harness).await;
    // Past the release at ~2s.
    sleep(Duration::from_millis(2500)).await;
    harness
        .drive(ATTACKER, 1000.0, Duration::from_millis(25))
        .await;
    sleep(Duration::from_millis(100)).await;

    let (enforced, released) = harness.lifecycle_of(ATTACKER);
    assert_eq!(enforced.len(), 2);
    assert_eq!(released.len(), 1);
    assert!(enforced[1] > released[0]);

    let stats = harness.stats().await;
    assert_eq!(stats.enforce_transitions, 2);
    assert_eq!(stats.release_transitions, 1);
    assert_eq!(stats.currently_enforced, 1);
}

/// A source that keeps flooding hard enough to stay above threshold even
/// after admission thinning is never released.
#[tokio::test(start_paused = true)]
async fn source_still_hot_after_thinning_stays_enforced() {
    let mut harness = FloodHarness::start(&Config::default());

    // 800/s thinned by 0.9 still admits ~80/s > 20/s.
    harness
        .drive(ATTACKER, 800.0, Duration::from_secs(5))
        .await;

    let (enforced, released) = harness.lifecycle_of(ATTACKER);
    assert_eq!(enforced.len(), 1);
    assert!(released.is_empty());
    assert_eq!(harness.stats().await.currently_enforced, 1);
}
