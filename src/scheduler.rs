//! Periodic refresh timers with single-flight execution.
//!
//! The scheduler owns two independent timers, one polling the current
//! snapshot and one probing gateway health. Each timer runs its task once
//! immediately on start and then at a fixed period. A tick that comes due
//! while the previous run of the same timer is still in flight is skipped and
//! logged, so runs of one timer never overlap and complete in start order.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped ──start──▶ Running ──suspend──▶ Suspended
//!                       ▲                    │
//!                       └──────resume────────┘
//! any ──stop──▶ Stopped (terminal)
//! ```
//!
//! Suspending only cancels future ticks. A run already in flight completes
//! and applies its result.
//!
//! All methods that start tickers must be called from within a tokio runtime.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Work performed on every tick of a timer.
#[async_trait]
pub trait RefreshTask: Send + Sync {
    /// Perform one refresh. Failures are absorbed by the task itself.
    async fn run(&self);
}

/// Which of the two recurring refreshes a timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Snapshot,
    Health,
}

impl TimerKind {
    /// Default period for this timer.
    pub fn default_period(&self) -> Duration {
        match self {
            TimerKind::Snapshot => Duration::from_secs(30),
            TimerKind::Health => Duration::from_secs(5),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimerKind::Snapshot => "snapshot",
            TimerKind::Health => "health",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    Suspended,
}

/// Tick accounting for one timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerCounters {
    /// Runs actually started (scheduled and manual).
    pub started: u64,
    /// Ticks dropped because a run was still in flight.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    skipped: AtomicU64,
}

/// Clears the in-flight flag when the run finishes, including on panic.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// State shared between a timer and its ticker task.
struct Shared {
    kind: TimerKind,
    task: Arc<dyn RefreshTask>,
    in_flight: Arc<AtomicBool>,
    counters: Counters,
}

impl Shared {
    /// Start a run unless one is already in flight.
    fn fire(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            warn!(timer = %self.kind, "previous refresh still in flight, skipping tick");
            return false;
        }

        self.counters.started.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard {
            flag: self.in_flight.clone(),
        };
        let task = self.task.clone();
        let kind = self.kind;
        tokio::spawn(async move {
            let _guard = guard;
            debug!(timer = %kind, "refresh started");
            task.run().await;
            debug!(timer = %kind, "refresh finished");
        });
        true
    }
}

/// One periodic, single-flight timer.
pub struct Timer {
    shared: Arc<Shared>,
    period: Duration,
    state: watch::Sender<TimerState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    terminated: AtomicBool,
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("kind", &self.shared.kind)
            .field("period", &self.period)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl Timer {
    /// Create a stopped timer running `task` every `period`.
    pub fn new(kind: TimerKind, period: Duration, task: Arc<dyn RefreshTask>) -> Self {
        let (state, _) = watch::channel(TimerState::Stopped);
        Self {
            shared: Arc::new(Shared {
                kind,
                task,
                in_flight: Arc::new(AtomicBool::new(false)),
                counters: Counters::default(),
            }),
            period,
            state,
            ticker: Mutex::new(None),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.shared.kind
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> TimerState {
        *self.state.borrow()
    }

    /// Whether a run is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn counters(&self) -> TimerCounters {
        TimerCounters {
            started: self.shared.counters.started.load(Ordering::Relaxed),
            skipped: self.shared.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Begin ticking, running the task once immediately.
    ///
    /// No-op if already running or permanently stopped.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock();

        if self.terminated.load(Ordering::Acquire) {
            warn!(timer = %self.kind(), "start after stop ignored");
            return;
        }
        if ticker.is_some() {
            debug!(timer = %self.kind(), "already running");
            return;
        }

        let shared = self.shared.clone();
        let period = self.period;
        *ticker = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The first tick completes immediately.
                ticks.tick().await;
                shared.fire();
            }
        }));

        self.state.send_replace(TimerState::Running);
        info!(timer = %self.kind(), period = ?self.period, "timer started");
    }

    /// Cancel future ticks. A run in flight is left to complete.
    pub fn suspend(&self) {
        let mut ticker = self.ticker.lock();
        if let Some(handle) = ticker.take() {
            handle.abort();
            self.state.send_replace(TimerState::Suspended);
            info!(timer = %self.kind(), "timer suspended");
        }
    }

    /// Same as [`Timer::start`].
    pub fn resume(&self) {
        self.start();
    }

    /// Cancel the timer permanently.
    pub fn stop(&self) {
        let mut ticker = self.ticker.lock();
        self.terminated.store(true, Ordering::Release);
        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        if self.state.send_replace(TimerState::Stopped) != TimerState::Stopped {
            info!(timer = %self.kind(), "timer stopped");
        }
    }

    /// Run the task now, outside the periodic schedule.
    ///
    /// Subject to the same single-flight rule as scheduled ticks. Returns
    /// whether a run was started.
    pub fn trigger(&self) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        self.shared.fire()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

/// Whether the dashboard is currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// The pair of recurring refresh timers.
#[derive(Debug)]
pub struct RefreshScheduler {
    snapshot: Timer,
    health: Timer,
}

impl RefreshScheduler {
    /// Create a stopped scheduler.
    pub fn new(
        snapshot_task: Arc<dyn RefreshTask>,
        snapshot_period: Duration,
        health_task: Arc<dyn RefreshTask>,
        health_period: Duration,
    ) -> Self {
        Self {
            snapshot: Timer::new(TimerKind::Snapshot, snapshot_period, snapshot_task),
            health: Timer::new(TimerKind::Health, health_period, health_task),
        }
    }

    pub fn timer(&self, kind: TimerKind) -> &Timer {
        match kind {
            TimerKind::Snapshot => &self.snapshot,
            TimerKind::Health => &self.health,
        }
    }

    pub fn start(&self) {
        self.snapshot.start();
        self.health.start();
    }

    pub fn suspend(&self) {
        self.snapshot.suspend();
        self.health.suspend();
    }

    pub fn resume(&self) {
        self.snapshot.resume();
        self.health.resume();
    }

    pub fn stop(&self) {
        self.snapshot.stop();
        self.health.stop();
    }

    /// Suspend while hidden, resume when visible again.
    pub fn set_visibility(&self, visibility: Visibility) {
        match visibility {
            Visibility::Visible => self.resume(),
            Visibility::Hidden => self.suspend(),
        }
    }

    /// Manually run one timer's task now.
    pub fn trigger(&self, kind: TimerKind) -> bool {
        self.timer(kind).trigger()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Counts runs; each run waits for a permit when gated.
    #[derive(Default)]
    struct CountingTask {
        runs: AtomicUsize,
        completed: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
    }

    impl CountingTask {
        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Default::default()
            }
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RefreshTask for CountingTask {
        async fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Let spawned tasks run to their next await point.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn timer(task: &Arc<CountingTask>) -> Timer {
        Timer::new(TimerKind::Snapshot, Duration::from_secs(30), task.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_immediately() {
        let task = Arc::new(CountingTask::default());
        let timer = timer(&task);

        timer.start();
        settle().await;

        assert_eq!(task.runs(), 1);
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_fixed_period() {
        let task = Arc::new(CountingTask::default());
        let timer = timer(&task);

        timer.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;

        assert_eq!(task.runs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let task = Arc::new(CountingTask::default());
        let timer = timer(&task);

        timer.start();
        timer.start();
        settle().await;

        assert_eq!(task.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skipped_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let task = Arc::new(CountingTask::gated(gate.clone()));
        let timer = timer(&task);

        timer.start();
        settle().await;
        assert!(timer.is_in_flight());

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(task.runs(), 1);
        assert_eq!(timer.counters(), TimerCounters { started: 1, skipped: 1 });

        gate.add_permits(1);
        settle().await;
        assert!(!timer.is_in_flight());

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(task.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_lets_in_flight_run_complete() {
        let gate = Arc::new(Semaphore::new(0));
        let task = Arc::new(CountingTask::gated(gate.clone()));
        let timer = timer(&task);

        timer.start();
        settle().await;
        timer.suspend();
        assert_eq!(timer.state(), TimerState::Suspended);

        gate.add_permits(1);
        settle().await;
        assert_eq!(task.completed(), 1);

        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(task.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_runs_immediately_again() {
        let task = Arc::new(CountingTask::default());
        let timer = timer(&task);

        timer.start();
        settle().await;
        timer.suspend();
        tokio::time::advance(Duration::from_secs(10)).await;
        timer.resume();
        settle().await;

        assert_eq!(task.runs(), 2);
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_terminal() {
        let task = Arc::new(CountingTask::default());
        let timer = timer(&task);

        timer.start();
        settle().await;
        timer.stop();
        timer.start();
        assert!(!timer.trigger());

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(task.runs(), 1);
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_respects_single_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let task = Arc::new(CountingTask::gated(gate.clone()));
        let timer = timer(&task);

        assert!(timer.trigger());
        settle().await;
        assert!(!timer.trigger());

        gate.add_permits(1);
        settle().await;
        assert!(timer.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_timers_are_independent() {
        let snapshot = Arc::new(CountingTask::default());
        let health = Arc::new(CountingTask::default());
        let scheduler = RefreshScheduler::new(
            snapshot.clone(),
            TimerKind::Snapshot.default_period(),
            health.clone(),
            TimerKind::Health.default_period(),
        );

        scheduler.start();
        settle().await;
        for _ in 0..6 {
            tokio::time::advance(Duration::from_secs(5)).await;
            settle().await;
        }

        assert_eq!(snapshot.runs(), 2);
        assert_eq!(health.runs(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_suspends_and_resumes() {
        let snapshot = Arc::new(CountingTask::default());
        let health = Arc::new(CountingTask::default());
        let scheduler = RefreshScheduler::new(
            snapshot.clone(),
            Duration::from_secs(30),
            health.clone(),
            Duration::from_secs(5),
        );

        scheduler.start();
        settle().await;
        scheduler.set_visibility(Visibility::Hidden);
        assert_eq!(scheduler.timer(TimerKind::Health).state(), TimerState::Suspended);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(health.runs(), 1);

        scheduler.set_visibility(Visibility::Visible);
        settle().await;
        assert_eq!(health.runs(), 2);
        assert_eq!(snapshot.runs(), 2);
    }
}
