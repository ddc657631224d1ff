//! Verification poll scheduler for Tollgate.
//!
//! While a user is logged in, the session is re-validated against the
//! credential server on a fixed interval. The scheduler owns that loop as
//! an explicit, cancellable task:
//!
//! ```text
//!        arm(verifier)                 disarm() / Invalid / Detached / drop
//!   Idle ─────────────→ Armed ─────────────────────────────────────────→ Idle
//!                         │  ↑
//!                         └──┘ tick → verify() → Valid
//! ```
//!
//! Polls are serialized: each `verify()` is awaited before the next tick is
//! taken, and ticks missed while a slow poll was outstanding are delayed,
//! never fired in a burst.
//!
//! # Integration
//!
//! ```ignore
//! // on the transition into "authenticated":
//! scheduler.arm(my_verifier);
//! // on logout or invalidation:
//! scheduler.disarm();
//! ```

#![allow(async_fn_in_trait)]

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the verification loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between polls. The first poll happens one interval after arming.
    pub interval: Duration,
    /// Random delay (0..max) added before the *first* poll only, so many
    /// clients logging in at once don't poll in lockstep.
    pub initial_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            initial_jitter: Duration::ZERO,
        }
    }
}

impl PollConfig {
    /// Shortest interval accepted; anything below is clamped.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`VerificationScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "poll interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// What a single poll found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Session still valid; keep polling.
    Valid,
    /// Session no longer valid; the loop stops.
    Invalid,
    /// Whatever owned the session is gone; the loop stops.
    Detached,
}

/// Re-validates the session once.
///
/// Implementations must not fail: any error is already folded into
/// [`PollOutcome::Invalid`] by the time it gets here, because nobody is
/// awaiting the background task to hear about it.
pub trait Verifier: Send + Sync + 'static {
    fn verify(&self) -> impl Future<Output = PollOutcome> + Send;
}

// ---------------------------------------------------------------------------
// State and metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
}

/// Counters over the scheduler's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollMetrics {
    /// Times the loop was started.
    pub arms: u64,
    /// Times the loop stopped, for any reason.
    pub disarms: u64,
    pub polls_started: u64,
    pub polls_completed: u64,
    /// Polls that came back [`PollOutcome::Invalid`].
    pub invalid_results: u64,
}

struct Armed {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Shared {
    slot: Mutex<Option<Armed>>,
    metrics: Mutex<PollMetrics>,
}

impl Shared {
    /// Called by a loop that is ending on its own. Only clears the slot if
    /// it still belongs to that loop; a newer arm may have replaced it.
    fn release(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|armed| armed.generation == generation) {
            *slot = None;
            self.metrics.lock().disarms += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the recurring verification task.
///
/// Dropping the scheduler cancels the task.
pub struct VerificationScheduler {
    config: PollConfig,
    shared: Arc<Shared>,
    next_generation: AtomicU64,
}

impl VerificationScheduler {
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_ms = config.initial_jitter.as_millis() as u64,
            "verification scheduler created"
        );
        Self {
            config,
            shared: Arc::new(Shared {
                slot: Mutex::new(None),
                metrics: Mutex::new(PollMetrics::default()),
            }),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Starts polling with `verifier`.
    ///
    /// Returns `false` and does nothing if the loop is already running, so
    /// calling it on every "became authenticated" edge arms exactly once.
    /// Also returns `false` outside a Tokio runtime.
    pub fn arm<V: Verifier>(&self, verifier: V) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.is_some() {
            trace!("arm ignored, already armed");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("cannot arm verification scheduler outside a tokio runtime");
            return false;
        };

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let handle = runtime.spawn(poll_loop(
            verifier,
            self.config.clone(),
            Arc::clone(&self.shared),
            generation,
        ));
        *slot = Some(Armed { generation, handle });
        self.shared.metrics.lock().arms += 1;

        debug!(generation, "verification scheduler armed");
        true
    }

    /// Stops polling. Once this returns, no new `verify()` call starts, and
    /// one that was in flight is cancelled at its next await point.
    ///
    /// Returns `false` if nothing was armed.
    pub fn disarm(&self) -> bool {
        let Some(armed) = self.shared.slot.lock().take() else {
            return false;
        };
        armed.handle.abort();
        self.shared.metrics.lock().disarms += 1;
        debug!(generation = armed.generation, "verification scheduler disarmed");
        true
    }

    pub fn state(&self) -> SchedulerState {
        if self.shared.slot.lock().is_some() {
            SchedulerState::Armed
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state() == SchedulerState::Armed
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> PollMetrics {
        self.shared.metrics.lock().clone()
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }
}

impl Drop for VerificationScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn poll_loop<V: Verifier>(
    verifier: V,
    config: PollConfig,
    shared: Arc<Shared>,
    generation: u64,
) {
    let jitter = random_jitter(config.initial_jitter);
    let mut ticker = time::interval_at(Instant::now() + config.interval + jitter, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        shared.metrics.lock().polls_started += 1;

        let outcome = verifier.verify().await;

        shared.metrics.lock().polls_completed += 1;
        match outcome {
            PollOutcome::Valid => trace!(generation, "poll: session valid"),
            PollOutcome::Invalid => {
                shared.metrics.lock().invalid_results += 1;
                debug!(generation, "poll: session invalid, stopping");
                break;
            }
            PollOutcome::Detached => {
                debug!(generation, "poll: owner gone, stopping");
                break;
            }
        }
    }

    shared.release(generation);
}

fn random_jitter(max: Duration) -> Duration {
    let max_us = max.as_micros() as u64;
    if max_us == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::rng().random_range(0..max_us))
}
