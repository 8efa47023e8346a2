//! Timer-driven polling.
//!
//! The scheduler owns at most one pending timer task. When the timer
//! elapses, the poll itself runs on a detached task so that `cancel()` only
//! ever drops a pending timer and never an in-flight request.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::sync::coordinator::{PollOutcome, SyncCoordinator};

pub struct PollingScheduler {
    coordinator: Arc<SyncCoordinator>,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by every schedule/cancel; a finished poll only re-arms if it
    /// still matches.
    epoch: AtomicU64,
    stopped: AtomicBool,
    me: Weak<PollingScheduler>,
}

impl PollingScheduler {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            coordinator,
            timer: Mutex::new(None),
            epoch: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    /// Arm the timer, replacing any pending one.
    pub fn schedule(&self, interval_ms: u64) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let epoch = self.next_epoch();
        let me = self.me.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            if let Some(scheduler) = me.upgrade() {
                tokio::spawn(async move { scheduler.fire(epoch).await });
            }
        });

        debug!("Next poll in {}ms", interval_ms);
        if let Some(previous) = self.timer().replace(handle) {
            previous.abort();
        }
    }

    /// Drop the pending timer. Polls already in flight complete but do not
    /// re-arm.
    pub fn cancel(&self) {
        self.next_epoch();
        if let Some(handle) = self.timer().take() {
            handle.abort();
            debug!("Polling timer cancelled");
        }
    }

    /// Poll right now, even if the circuit is open, then re-arm on the
    /// current interval.
    pub async fn force_refresh(&self) -> PollOutcome {
        if self.stopped.load(Ordering::SeqCst) {
            return PollOutcome::Paused;
        }

        self.cancel();
        let epoch = self.epoch.load(Ordering::SeqCst);
        let outcome = self.coordinator.poll(true).await;
        self.rearm(epoch, outcome);
        outcome
    }

    /// Start polling on the current interval.
    pub fn start(&self) {
        self.schedule(self.coordinator.current_interval_ms());
    }

    /// Cancel and refuse any further scheduling.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.cancel();
    }

    /// True while a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.timer()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    async fn fire(&self, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        let outcome = self.coordinator.poll(false).await;
        self.rearm(epoch, outcome);
    }

    fn rearm(&self, epoch: u64, outcome: PollOutcome) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Scheduler moved on, not re-arming after {:?}", outcome);
            return;
        }

        match outcome {
            PollOutcome::Succeeded { next_delay_ms } | PollOutcome::Failed { next_delay_ms } => {
                self.schedule(next_delay_ms)
            }
            PollOutcome::ShortCircuited { retry_in_ms } => self.schedule(retry_in_ms),
            PollOutcome::Coalesced => self.schedule(self.coordinator.current_interval_ms()),
            PollOutcome::Hidden => debug!("Hidden; waiting for visibility to resume polling"),
            PollOutcome::Paused => {
                warn!("Polling stopped until the session is re-authenticated");
                info!("Call force_refresh() after signing in again to resume");
            }
        }
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer().take() {
            handle.abort();
        }
    }
}
