//! Periodic refresh loop.
//!
//! The scheduler is the only writer of a single-slot `watch` channel holding the
//! latest published snapshot. A tick runs in its own task: an error or a panic
//! discards the tick and leaves the previous snapshot in place. The task is
//! owned by a `JoinSet`, so dropping an in-flight tick aborts its fetches.

use crate::error::{AppError, Result};
use crate::models::AggregateSnapshot;
use crate::pipeline::SnapshotSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Latest published snapshot, `None` until the first successful tick.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<AggregateSnapshot>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// Collecting a snapshot.
    Running,
}

/// Drives a `SnapshotSource` on a fixed interval and publishes each complete result.
pub struct RefreshScheduler<S> {
    source: Arc<S>,
    interval: Duration,
    publisher: watch::Sender<Option<Arc<AggregateSnapshot>>>,
    state: SchedulerState,
    failed_ticks: u64,
}

impl<S: SnapshotSource> RefreshScheduler<S> {
    /// Creates the scheduler together with the receiving end for the presentation context.
    pub fn new(source: S, interval: Duration) -> (Self, SnapshotReceiver) {
        let (publisher, receiver) = watch::channel(None);
        let scheduler = Self {
            source: Arc::new(source),
            interval,
            publisher,
            state: SchedulerState::Idle,
            failed_ticks: 0,
        };
        (scheduler, receiver)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks
    }

    /// The snapshot currently visible to readers.
    pub fn latest(&self) -> Option<Arc<AggregateSnapshot>> {
        self.publisher.borrow().clone()
    }

    /// Runs one tick and publishes its snapshot on success.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TickFailure` if the source failed or panicked; in that
    /// case nothing is published.
    pub async fn tick(&mut self) -> Result<Arc<AggregateSnapshot>> {
        self.state = SchedulerState::Running;
        debug!("Tick started");

        let source = Arc::clone(&self.source);
        let mut in_flight = JoinSet::new();
        in_flight.spawn(async move { source.collect().await });
        let outcome = in_flight.join_next().await;
        self.state = SchedulerState::Idle;

        let snapshot = match outcome {
            Some(Ok(Ok(snapshot))) => Arc::new(snapshot),
            Some(Ok(Err(e))) => return Err(self.discard(e.to_string())),
            Some(Err(join_error)) => return Err(self.discard(join_error.to_string())),
            None => return Err(self.discard("tick task was never started".to_string())),
        };

        self.publisher.send_replace(Some(Arc::clone(&snapshot)));
        info!(
            "Published snapshot for {} ({} points)",
            snapshot.updated_label(),
            snapshot.points.len()
        );
        Ok(snapshot)
    }

    fn discard(&mut self, reason: String) -> AppError {
        self.failed_ticks += 1;
        error!(
            "Tick failed, keeping previous snapshot ({} failed so far): {}",
            self.failed_ticks, reason
        );
        AppError::TickFailure(reason)
    }

    /// Ticks one interval after the previous tick started, until `shutdown`
    /// resolves or every receiver has been dropped. Returns the scheduler so the
    /// caller can inspect its final state.
    ///
    /// The first tick happens one interval from now: the caller is expected to
    /// have run and rendered an initial `tick()` in the foreground. A tick still
    /// in flight at shutdown is aborted and publishes nothing.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Self {
        info!("Refresh scheduler started, interval {:?}", self.interval);
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {},
            }
            if self.publisher.is_closed() {
                info!("No snapshot readers left, stopping refresh scheduler");
                return self;
            }
            // Failures are already logged; the next tick is scheduled normally.
            let interrupted = tokio::select! {
                _ = &mut shutdown => true,
                _ = self.tick() => false,
            };
            if interrupted {
                self.state = SchedulerState::Idle;
                info!("Aborted in-flight tick");
                break;
            }
        }
        info!("Refresh scheduler shut down");
        self
    }
}
