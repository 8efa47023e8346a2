//! One authenticated session's worth of sync machinery.

use std::sync::Arc;

use futures::Stream;
use tracing::{info, warn};

use crate::client::NotificationClient;
use crate::config::Config;
use crate::sync::backoff::BackoffPolicy;
use crate::sync::coordinator::{PollOutcome, SyncCoordinator};
use crate::sync::push::{ChannelEvent, PushListener};
use crate::sync::scheduler::PollingScheduler;
use crate::sync::visibility::VisibilityMonitor;

/// Owns the store, coordinator, scheduler, visibility monitor and push
/// listener for a session. Nothing is shared between sessions.
pub struct SyncSession {
    coordinator: Arc<SyncCoordinator>,
    scheduler: Arc<PollingScheduler>,
    monitor: Arc<VisibilityMonitor>,
    push: PushListener,
}

impl SyncSession {
    /// Wire up a fresh session. Nothing touches the network until
    /// [`start`](Self::start).
    ///
    /// Visibility callbacks spawn onto the current tokio runtime, so
    /// `set_visible` has to be called from inside one.
    pub fn init(
        session_id: impl Into<String>,
        client: Arc<dyn NotificationClient + Send + Sync>,
        config: &Config,
    ) -> Self {
        let session_id = session_id.into();
        info!("Initializing sync session {}", session_id);

        let coordinator = Arc::new(SyncCoordinator::new(
            session_id,
            client,
            BackoffPolicy::new(&config.polling),
            config.store.max_items,
        ));
        let scheduler = PollingScheduler::new(coordinator.clone());
        let monitor = Arc::new(VisibilityMonitor::default());

        {
            let coordinator = coordinator.clone();
            let scheduler = scheduler.clone();
            monitor.on_hidden(move || {
                coordinator.set_tab_visible(false);
                scheduler.cancel();
            });
        }
        {
            let coordinator = coordinator.clone();
            let scheduler = scheduler.clone();
            monitor.on_visible(move || {
                coordinator.set_tab_visible(true);
                let scheduler = scheduler.clone();
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            scheduler.force_refresh().await;
                        });
                    }
                    Err(_) => warn!("No runtime available, catch-up poll skipped"),
                }
            });
        }

        let push = PushListener::new(coordinator.clone());

        Self {
            coordinator,
            scheduler,
            monitor,
            push,
        }
    }

    /// Poll immediately, then keep polling on the adaptive cadence.
    pub async fn start(&self) -> PollOutcome {
        info!(
            "Starting sync for session {}",
            self.coordinator.read(|s| s.session_id().to_string())
        );
        self.scheduler.force_refresh().await
    }

    /// Immediate poll that also goes through an open circuit.
    pub async fn force_refresh(&self) -> PollOutcome {
        self.scheduler.force_refresh().await
    }

    pub fn attach_push<S>(&self, channel: S)
    where
        S: Stream<Item = ChannelEvent> + Send + Unpin + 'static,
    {
        self.push.attach(channel);
    }

    /// Host hook for foreground/background changes.
    pub fn set_visible(&self, visible: bool) {
        self.monitor.set_visible(visible);
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.scheduler
    }

    pub fn monitor(&self) -> &Arc<VisibilityMonitor> {
        &self.monitor
    }

    pub fn push(&self) -> &PushListener {
        &self.push
    }

    /// Stop every timer and subscription and drop the session's data.
    pub fn dispose(&self) {
        self.scheduler.shutdown();
        self.push.detach();
        self.monitor.clear_callbacks();
        self.coordinator.reset();
        info!("Sync session disposed");
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.scheduler.shutdown();
        // Callbacks hold the scheduler; release them with the session
        self.monitor.clear_callbacks();
    }
}
