//! Round-robin rotation over enabled markets
//!
//! Each tick polls exactly one market, sends one notification and then
//! sleeps for the global interval. The enabled-symbol list and the interval
//! are re-read on every tick, so registry mutations made by the command
//! consumer between ticks take effect without index skew: the cursor is
//! always reduced modulo the live count.
//!
//! Two states:
//! - `Idle`: no enabled markets; the loop parks until a restart/wake signal
//! - `Running`: cycling; a restart signal cuts the current sleep short

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::adapters::{FetchError, Notifier, PriceSource};
use crate::core::format::{format_fetch_error, format_snapshot};
use crate::core::registry::SharedRegistry;

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Runtime knobs shared between the scheduler loop and the command consumer
#[derive(Debug)]
pub struct SchedulerControl {
    interval_ms: AtomicU64,
    running: AtomicBool,
    restart: Notify,
}

impl SchedulerControl {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
            running: AtomicBool::new(false),
            restart: Notify::new(),
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Spacing between consecutive single-market sends
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    /// Change the spacing; applies from the next sleep onward
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    fn set_state(&self, state: SchedulerState) -> SchedulerState {
        let was_running = self
            .running
            .swap(state == SchedulerState::Running, Ordering::SeqCst);
        if was_running {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Cancel the pending wait and re-evaluate immediately.
    ///
    /// A signal sent while the loop is mid-tick is kept and consumed at the
    /// next wait.
    pub fn restart(&self) {
        self.restart.notify_one();
    }

    /// Wake a parked scheduler without disturbing a running one
    pub fn wake_if_idle(&self) {
        if self.state() == SchedulerState::Idle {
            self.restart.notify_one();
        }
    }

    async fn restarted(&self) {
        self.restart.notified().await;
    }
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No enabled markets
    Idle,
    /// One market was polled
    Polled { symbol: String, success: bool },
}

/// Round-robin poller
pub struct RotationScheduler<P, N>
where
    P: PriceSource,
    N: Notifier,
{
    registry: SharedRegistry,
    source: Arc<P>,
    notifier: Arc<N>,
    control: Arc<SchedulerControl>,
    fetch_timeout: Duration,
    timezone: Tz,
    cursor: usize,
}

impl<P, N> RotationScheduler<P, N>
where
    P: PriceSource,
    N: Notifier,
{
    pub fn new(
        registry: SharedRegistry,
        source: Arc<P>,
        notifier: Arc<N>,
        control: Arc<SchedulerControl>,
        fetch_timeout: Duration,
        timezone: Tz,
    ) -> Self {
        Self {
            registry,
            source,
            notifier,
            control,
            fetch_timeout,
            timezone,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Poll one market and notify about it
    pub async fn tick(&mut self) -> TickOutcome {
        let symbols = self.registry.lock().await.enabled_symbols();

        if symbols.is_empty() {
            if self.control.set_state(SchedulerState::Idle) == SchedulerState::Running {
                info!("No enabled markets, rotation idle");
            }
            return TickOutcome::Idle;
        }
        if self.control.set_state(SchedulerState::Running) == SchedulerState::Idle {
            info!(markets = symbols.len(), "Rotation running");
        }

        let symbol = symbols[self.cursor % symbols.len()].clone();

        let result = match timeout(self.fetch_timeout, self.source.fetch_quote(&symbol)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout.as_millis() as u64)),
        };

        let success = result.is_ok();
        let message = match result {
            Ok(quote) => {
                let recorded = self
                    .registry
                    .lock()
                    .await
                    .record_success(&symbol, &quote, Utc::now());
                recorded.map(|(label, snapshot)| {
                    debug!(symbol = %symbol, price = snapshot.current_price, "Quote fetched");
                    format_snapshot(&label, &snapshot, self.timezone)
                })
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Quote fetch failed");
                let label = self
                    .registry
                    .lock()
                    .await
                    .record_failure(&symbol, &e.to_string());
                label.map(|l| format_fetch_error(&l))
            }
        };

        match message {
            Some(text) => {
                if let Err(e) = self.notifier.send(&text).await {
                    error!(symbol = %symbol, error = %e, "Failed to send notification");
                }
            }
            None => debug!(symbol = %symbol, "Market removed during fetch, nothing sent"),
        }

        self.cursor = (self.cursor + 1) % symbols.len();

        TickOutcome::Polled { symbol, success }
    }

    /// Drive ticks until shutdown
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(interval = ?self.control.interval(), "Rotation scheduler started");

        loop {
            let outcome = tokio::select! {
                _ = shutdown_rx.recv() => break,
                outcome = self.tick() => outcome,
            };

            match outcome {
                TickOutcome::Idle => {
                    // A market added between the snapshot and the state change
                    // would not have woken us
                    if !self.registry.lock().await.enabled_symbols().is_empty() {
                        continue;
                    }
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = self.control.restarted() => {
                            debug!("Rotation woken from idle");
                        }
                    }
                }
                TickOutcome::Polled { .. } => {
                    let wait = self.control.interval();
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.control.restarted() => {
                            info!(interval = ?self.control.interval(), "Rotation restarted");
                        }
                    }
                }
            }
        }

        info!("Rotation scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::traits::tests::{MockPriceSource, RecordingNotifier};
    use crate::core::registry::MarketRegistry;
    use tokio::time::Instant;

    fn registry_with(symbols: &[&str]) -> SharedRegistry {
        let mut registry = MarketRegistry::new();
        for s in symbols {
            registry.add(s).unwrap();
        }
        registry.into_shared()
    }

    fn source_for(symbols: &[&str]) -> Arc<MockPriceSource> {
        let source = MockPriceSource::new();
        for (i, s) in symbols.iter().enumerate() {
            source.set_price(s, 100.0 + i as f64);
        }
        Arc::new(source)
    }

    fn scheduler(
        registry: SharedRegistry,
        source: Arc<MockPriceSource>,
        notifier: Arc<RecordingNotifier>,
        interval: Duration,
    ) -> RotationScheduler<MockPriceSource, RecordingNotifier> {
        RotationScheduler::new(
            registry,
            source,
            notifier,
            SchedulerControl::new(interval).into_shared(),
            Duration::from_millis(200),
            chrono_tz::UTC,
        )
    }

    #[tokio::test]
    async fn test_round_robin_covers_each_once() {
        let symbols = ["GC=F", "CL=F", "BTC-USD"];
        let source = source_for(&symbols);
        let notifier = Arc::new(RecordingNotifier::new());
        let mut sched = scheduler(
            registry_with(&symbols),
            source.clone(),
            notifier.clone(),
            Duration::from_secs(60),
        );

        for _ in 0..3 {
            sched.tick().await;
        }

        assert_eq!(source.calls(), vec!["GC=F", "CL=F", "BTC-USD"]);
        assert_eq!(notifier.sent().len(), 3);
        assert_eq!(sched.cursor(), 0);
    }

    #[tokio::test]
    async fn test_empty_registry_is_idle() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut sched = scheduler(
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            notifier.clone(),
            Duration::from_secs(60),
        );

        assert_eq!(sched.tick().await, TickOutcome::Idle);
        assert_eq!(sched.control.state(), SchedulerState::Idle);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_disable_and_reenable_mid_cycle() {
        let symbols = ["A", "B", "C"];
        let registry = registry_with(&symbols);
        let source = source_for(&symbols);
        let notifier = Arc::new(RecordingNotifier::new());
        let mut sched = scheduler(
            registry.clone(),
            source.clone(),
            notifier,
            Duration::from_secs(60),
        );

        sched.tick().await; // A
        registry.lock().await.set_enabled_by_index(2, false).unwrap();
        sched.tick().await; // cursor 1 over [A, C] -> C
        sched.tick().await; // A
        registry.lock().await.set_enabled_by_index(2, true).unwrap();
        sched.tick().await; // cursor 1 over [A, B, C] -> B
        sched.tick().await; // C

        assert_eq!(source.calls(), vec!["A", "C", "A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_shrinking_registry_wraps_cursor() {
        let symbols = ["A", "B", "C"];
        let registry = registry_with(&symbols);
        let source = source_for(&symbols);
        let mut sched = scheduler(
            registry.clone(),
            source.clone(),
            Arc::new(RecordingNotifier::new()),
            Duration::from_secs(60),
        );

        sched.tick().await; // A
        sched.tick().await; // B, cursor now 2
        registry.lock().await.remove_by_index(3).unwrap();
        registry.lock().await.remove_by_index(2).unwrap();
        sched.tick().await; // cursor 2 % 1 -> A

        assert_eq!(source.calls(), vec!["A", "B", "A"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_sends_error_and_continues() {
        let registry = registry_with(&["GC=F", "NOPE"]);
        let source = Arc::new(MockPriceSource::new().with_price("GC=F", 2000.0));
        let notifier = Arc::new(RecordingNotifier::new());
        let mut sched = scheduler(
            registry.clone(),
            source,
            notifier.clone(),
            Duration::from_secs(60),
        );

        assert_eq!(
            sched.tick().await,
            TickOutcome::Polled {
                symbol: "GC=F".to_string(),
                success: true
            }
        );
        assert_eq!(
            sched.tick().await,
            TickOutcome::Polled {
                symbol: "NOPE".to_string(),
                success: false
            }
        );

        let sent = notifier.sent();
        assert!(sent[0].starts_with("<b>GC=F</b>"));
        assert_eq!(sent[1], "Error fetching data for NOPE");

        let guard = registry.lock().await;
        let failed = guard.get("NOPE").unwrap();
        assert!(failed.enabled);
        assert!(failed.last_error.as_deref().unwrap().contains("NOPE"));
        assert!(guard.get("GC=F").unwrap().last_snapshot.is_some());
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let registry = registry_with(&["GC=F"]);
        let source = Arc::new(
            MockPriceSource::new()
                .with_price("GC=F", 2000.0)
                .with_delay(Duration::from_secs(5)),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let mut sched = scheduler(registry.clone(), source, notifier.clone(), Duration::from_secs(60));

        let outcome = sched.tick().await;

        assert!(matches!(outcome, TickOutcome::Polled { success: false, .. }));
        assert_eq!(notifier.sent(), vec!["Error fetching data for GC=F"]);
        let guard = registry.lock().await;
        assert!(guard
            .get("GC=F")
            .unwrap()
            .last_error
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn test_restart_cuts_sleep_short() {
        let registry = registry_with(&["GC=F"]);
        let source = source_for(&["GC=F"]);
        let notifier = Arc::new(RecordingNotifier::new());
        let sched = scheduler(
            registry,
            source.clone(),
            notifier.clone(),
            Duration::from_secs(3600),
        );
        let control = sched.control.clone();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(sched.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls().len(), 1);

        let started = Instant::now();
        control.set_interval(Duration::from_secs(3600));
        control.restart();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(source.calls().len(), 2);
        assert!(started.elapsed() < Duration::from_secs(5));

        let _ = shutdown_tx.send(());
        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "Scheduler should stop on shutdown");
    }

    #[tokio::test]
    async fn test_idle_scheduler_wakes_on_add() {
        let registry = registry_with(&[]);
        let source = source_for(&["GC=F"]);
        let sched = scheduler(
            registry.clone(),
            source.clone(),
            Arc::new(RecordingNotifier::new()),
            Duration::from_secs(3600),
        );
        let control = sched.control.clone();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(sched.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(control.state(), SchedulerState::Idle);

        registry.lock().await.add("GC=F").unwrap();
        control.wake_if_idle();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(source.calls(), vec!["GC=F"]);
        assert_eq!(control.state(), SchedulerState::Running);

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    #[tokio::test]
    async fn test_short_interval_keeps_rotating() {
        let symbols = ["A", "B"];
        let source = source_for(&symbols);
        let sched = scheduler(
            registry_with(&symbols),
            source.clone(),
            Arc::new(RecordingNotifier::new()),
            Duration::from_millis(20),
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(sched.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

        let calls = source.calls();
        assert!(calls.len() >= 3, "expected several ticks, got {:?}", calls);
        for pair in calls.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
