//! Periodic status re-evaluation.
//!
//! Every period the ticker reads the clock once and re-derives the status of
//! every task, completed ones included. A tick that panics is logged and
//! skipped; the next tick recomputes everything from scratch.

use chrono::{DateTime, Utc};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::SharedClock;
use crate::store::SharedTaskStore;

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Outcome of the latest completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Sequence number; 0 before the first tick.
    pub tick: u64,
    pub at: DateTime<Utc>,
    /// Tasks whose status changed on this tick.
    pub changed: usize,
}

pub struct Ticker {
    store: SharedTaskStore,
    clock: SharedClock,
    period: Duration,
    summary_tx: watch::Sender<TickSummary>,
}

impl Ticker {
    pub fn new(store: SharedTaskStore, clock: SharedClock, period: Duration) -> Self {
        let initial = TickSummary {
            tick: 0,
            at: clock.now(),
            changed: 0,
        };
        let (summary_tx, _) = watch::channel(initial);
        Self {
            store,
            clock,
            period,
            summary_tx,
        }
    }

    /// Observe tick summaries.
    pub fn subscribe(&self) -> watch::Receiver<TickSummary> {
        self.summary_tx.subscribe()
    }

    /// Run a single tick. Returns `None` if the tick was skipped.
    pub async fn tick_once(&self) -> Option<TickSummary> {
        let mut store = self.store.write().await;
        let clock = &self.clock;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let now = clock.now();
            (now, store.apply_statuses(now))
        }));
        drop(store);

        match outcome {
            Ok((at, changed)) => {
                let tick = self.summary_tx.borrow().tick + 1;
                let summary = TickSummary { tick, at, changed };
                if changed > 0 {
                    tracing::debug!(tick, changed, "Task statuses updated");
                }
                self.summary_tx.send_replace(summary);
                Some(summary)
            }
            Err(_) => {
                tracing::warn!("Status tick panicked; skipping until next tick");
                None
            }
        }
    }

    /// Tick forever at the configured period.
    pub async fn run(self) {
        tracing::info!(period_ms = self.period.as_millis() as u64, "Deadline ticker started");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick_once().await;
        }
    }

    /// Spawn [`Ticker::run`] onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::{self, TaskStore};
    use crate::task::{Deadline, StatusLabel, Task, TaskId};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    async fn status_of(store: &SharedTaskStore, id: &str) -> StatusLabel {
        store
            .read()
            .await
            .get(&TaskId::new(id))
            .map(|t| t.status.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_tick_tracks_manual_clock() {
        let clock = Arc::new(ManualClock::new(t0()));
        let deadline = Deadline::at(t0() + chrono::Duration::seconds(30));
        let store = store::shared(TaskStore::from_tasks(vec![Task::new(
            "1",
            "Jaringan",
            "Kuis",
            Some(deadline),
        )]));
        let ticker = Ticker::new(store.clone(), clock.clone(), DEFAULT_PERIOD);

        let summary = ticker.tick_once().await.unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(status_of(&store, "1").await, StatusLabel::CountdownSeconds(30));

        clock.advance(chrono::Duration::seconds(29));
        ticker.tick_once().await.unwrap();
        assert_eq!(status_of(&store, "1").await, StatusLabel::CountdownSeconds(1));

        clock.advance(chrono::Duration::seconds(2));
        let summary = ticker.tick_once().await.unwrap();
        assert_eq!(summary.tick, 3);
        assert_eq!(status_of(&store, "1").await, StatusLabel::Expired);

        let summary = ticker.tick_once().await.unwrap();
        assert_eq!(summary.changed, 0);
    }

    #[tokio::test]
    async fn test_completion_takes_effect_next_tick() {
        let clock = Arc::new(ManualClock::new(t0()));
        let deadline = Deadline::at(t0() + chrono::Duration::seconds(10));
        let store = store::shared(TaskStore::from_tasks(vec![Task::new(
            "1",
            "a",
            "b",
            Some(deadline),
        )]));
        let ticker = Ticker::new(store.clone(), clock.clone(), DEFAULT_PERIOD);
        ticker.tick_once().await;

        store.write().await.mark_complete(&TaskId::new("1")).unwrap();
        ticker.tick_once().await;
        assert_eq!(status_of(&store, "1").await, StatusLabel::Completed);

        clock.advance(chrono::Duration::hours(5));
        ticker.tick_once().await;
        assert_eq!(status_of(&store, "1").await, StatusLabel::Completed);
    }

    /// Panics on the first read only.
    struct FlakyClock {
        inner: ManualClock,
        tripped: AtomicBool,
    }

    impl Clock for FlakyClock {
        fn now(&self) -> DateTime<Utc> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("clock hiccup");
            }
            self.inner.now()
        }
    }

    #[tokio::test]
    async fn test_panicking_tick_is_skipped() {
        let store = store::shared(TaskStore::from_tasks(vec![Task::new("1", "a", "b", None)]));
        let ticker = Ticker::new(store.clone(), Arc::new(ManualClock::new(t0())), DEFAULT_PERIOD);
        // Swap the clock after construction so `new` does not trip it.
        let ticker = Ticker {
            clock: Arc::new(FlakyClock {
                inner: ManualClock::new(t0()),
                tripped: AtomicBool::new(false),
            }),
            ..ticker
        };

        assert!(ticker.tick_once().await.is_none());
        let summary = ticker.tick_once().await.unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(status_of(&store, "1").await, StatusLabel::NoDeadline);
    }

    #[tokio::test]
    async fn test_run_publishes_summaries() {
        let clock = Arc::new(ManualClock::new(t0()));
        let deadline = Deadline::at(t0() + chrono::Duration::seconds(45));
        let store = store::shared(TaskStore::from_tasks(vec![Task::new(
            "1",
            "a",
            "b",
            Some(deadline),
        )]));
        let ticker = Ticker::new(store.clone(), clock, Duration::from_millis(10));
        let mut rx = ticker.subscribe();
        let handle = ticker.spawn();

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("ticker did not tick")
            .unwrap();
        assert!(rx.borrow().tick >= 1);
        assert_eq!(status_of(&store, "1").await, StatusLabel::CountdownSeconds(45));

        handle.abort();
    }
}
