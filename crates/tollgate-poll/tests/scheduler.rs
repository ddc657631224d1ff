//! Integration tests for the verification poll scheduler.
//!
//! All tests run on a paused clock (`start_paused = true`): sleeping in the
//! test body auto-advances time, so a 60 s scenario finishes instantly and
//! poll counts are deterministic.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tollgate_poll::{PollConfig, PollOutcome, SchedulerState, VerificationScheduler, Verifier};

// =========================================================================
// Helpers
// =========================================================================

/// Counts calls and answers from a script (then `Valid` forever).
#[derive(Clone, Default)]
struct ScriptedVerifier {
    calls: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    max_in_flight: Arc<AtomicU64>,
    script: Arc<Mutex<VecDeque<PollOutcome>>>,
    delay: Duration,
}

impl ScriptedVerifier {
    fn answering(outcomes: &[PollOutcome]) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.iter().copied().collect())),
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Verifier for ScriptedVerifier {
    async fn verify(&self) -> PollOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(PollOutcome::Valid)
    }
}

fn every_5s() -> VerificationScheduler {
    VerificationScheduler::new(PollConfig::default())
}

// =========================================================================
// Arming
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_arm_first_poll_after_one_interval() {
    let s = every_5s();
    let v = ScriptedVerifier::default();

    assert!(s.arm(v.clone()));

    sleep(Duration::from_millis(4_900)).await;
    assert_eq!(v.calls(), 0, "no poll before the first interval elapses");

    sleep(Duration::from_millis(200)).await;
    assert_eq!(v.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_arm_polls_every_interval() {
    let s = every_5s();
    let v = ScriptedVerifier::default();
    s.arm(v.clone());

    sleep(Duration::from_millis(15_500)).await;

    assert_eq!(v.calls(), 3);
    let m = s.metrics();
    assert_eq!(m.polls_started, 3);
    assert_eq!(m.polls_completed, 3);
}

#[tokio::test(start_paused = true)]
async fn test_arm_twice_runs_one_loop() {
    let s = every_5s();
    let v = ScriptedVerifier::default();

    assert!(s.arm(v.clone()));
    assert!(!s.arm(v.clone()), "second arm is a no-op");

    sleep(Duration::from_millis(10_500)).await;

    assert_eq!(v.calls(), 2, "one loop, not two");
    assert_eq!(s.metrics().arms, 1);
    assert_eq!(s.state(), SchedulerState::Armed);
}

#[test]
fn test_arm_outside_runtime_returns_false() {
    let s = every_5s();

    assert!(!s.arm(ScriptedVerifier::default()));
    assert!(!s.is_armed());
}

#[tokio::test(start_paused = true)]
async fn test_initial_jitter_delays_only_the_first_poll() {
    let s = VerificationScheduler::new(PollConfig {
        interval: Duration::from_secs(5),
        initial_jitter: Duration::from_secs(2),
    });
    let v = ScriptedVerifier::default();
    s.arm(v.clone());

    sleep(Duration::from_millis(4_900)).await;
    assert_eq!(v.calls(), 0);

    // First poll lands in [5 s, 7 s); the second 5 s after that.
    sleep(Duration::from_millis(2_200)).await;
    assert_eq!(v.calls(), 1);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(v.calls(), 2);
}

// =========================================================================
// Disarming
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_disarm_stops_further_polls() {
    let s = every_5s();
    let v = ScriptedVerifier::default();
    s.arm(v.clone());
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(v.calls(), 2);

    assert!(s.disarm());
    sleep(Duration::from_secs(60)).await;

    assert_eq!(v.calls(), 2, "no calls after disarm");
    assert_eq!(s.state(), SchedulerState::Idle);
    assert_eq!(s.metrics().disarms, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disarm_twice_second_is_noop() {
    let s = every_5s();
    s.arm(ScriptedVerifier::default());

    assert!(s.disarm());
    assert!(!s.disarm());
    assert_eq!(s.metrics().disarms, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rearm_after_disarm_starts_fresh_loop() {
    let s = every_5s();
    let v = ScriptedVerifier::default();
    s.arm(v.clone());
    sleep(Duration::from_millis(5_500)).await;
    s.disarm();

    assert!(s.arm(v.clone()));
    sleep(Duration::from_millis(4_000)).await;
    assert_eq!(v.calls(), 1, "new loop waits a full interval");
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(v.calls(), 2);
    assert_eq!(s.metrics().arms, 2);
}

#[tokio::test(start_paused = true)]
async fn test_disarm_cancels_in_flight_poll() {
    let s = every_5s();
    let v = ScriptedVerifier::slow(Duration::from_secs(3));
    s.arm(v.clone());

    // First poll starts at 5 s and would finish at 8 s.
    sleep(Duration::from_millis(6_000)).await;
    assert_eq!(v.calls(), 1);
    s.disarm();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(s.metrics().polls_completed, 0, "in-flight poll was cancelled");
    assert_eq!(v.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_loop() {
    let v = ScriptedVerifier::default();
    {
        let s = every_5s();
        s.arm(v.clone());
        sleep(Duration::from_millis(5_500)).await;
    }

    sleep(Duration::from_secs(60)).await;

    assert_eq!(v.calls(), 1);
}

// =========================================================================
// Loop termination from the verifier
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_invalid_outcome_stops_loop() {
    let s = every_5s();
    let v = ScriptedVerifier::answering(&[PollOutcome::Valid, PollOutcome::Invalid]);
    s.arm(v.clone());

    sleep(Duration::from_secs(60)).await;

    assert_eq!(v.calls(), 2);
    assert!(!s.is_armed());
    let m = s.metrics();
    assert_eq!(m.invalid_results, 1);
    assert_eq!(m.disarms, 1);
}

#[tokio::test(start_paused = true)]
async fn test_detached_outcome_stops_loop() {
    let s = every_5s();
    let v = ScriptedVerifier::answering(&[PollOutcome::Detached]);
    s.arm(v.clone());

    sleep(Duration::from_secs(60)).await;

    assert_eq!(v.calls(), 1);
    assert!(!s.is_armed());
    assert_eq!(s.metrics().invalid_results, 0);
}

#[tokio::test(start_paused = true)]
async fn test_arm_after_loop_ended_itself_succeeds() {
    let s = every_5s();
    let v = ScriptedVerifier::answering(&[PollOutcome::Invalid]);
    s.arm(v.clone());
    sleep(Duration::from_millis(5_500)).await;
    assert!(!s.is_armed());

    assert!(s.arm(v.clone()));
    sleep(Duration::from_millis(5_500)).await;

    assert_eq!(v.calls(), 2);
}

// =========================================================================
// Serialization
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_polls_never_overlap() {
    let s = every_5s();
    // Each poll takes longer than the interval.
    let v = ScriptedVerifier::slow(Duration::from_secs(12));
    s.arm(v.clone());

    sleep(Duration::from_secs(60)).await;

    assert_eq!(v.max_in_flight.load(Ordering::SeqCst), 1);
    // Polls at 5, 17, 29, 41, 53: missed ticks are delayed, not bursted.
    assert_eq!(v.calls(), 5);
}
