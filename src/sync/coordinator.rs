//! Single entry point for every write to the notification store.
//!
//! Pull results, push events and local mutations are all funnelled through
//! [`SyncCoordinator`]. Store locks are never held across an `.await`.
//!
//! Two counters guard against late responses. The generation advances on
//! every pull, push and local mutation; a count response is only applied if
//! it is still current. List pulls additionally carry their own sequence
//! number, so only a newer list pull supersedes them. Local changes made
//! while a list pull is outstanding are replayed onto its page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::app::{NoticeboardError, Result};
use crate::client::{FetchParams, NotificationClient, NotificationPage};
use crate::domain::presentation::url_for_notification;
use crate::domain::{Notification, NotificationCount};
use crate::store::{NotificationStore, StoreSnapshot, Upsert};
use crate::sync::backoff::{BackoffController, BackoffPolicy, CircuitCheck};

const EVENT_CAPACITY: usize = 256;

/// Change notifications for UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A notification not seen before arrived through the push channel.
    NotificationReceived(Notification),
    /// The list was replaced or extended by a pull.
    ListUpdated,
    CountChanged { unread: u64, total: u64 },
    Error(String),
}

/// What a polling attempt amounted to; the scheduler re-arms from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll was already in flight.
    Coalesced,
    /// Skipped because the client is in the background.
    Hidden,
    /// Skipped without network I/O because the circuit is open.
    ShortCircuited { retry_in_ms: u64 },
    Succeeded { next_delay_ms: u64 },
    Failed { next_delay_ms: u64 },
    /// Polling must stop until the session is re-established.
    Paused,
}

pub struct SyncCoordinator {
    client: Arc<dyn NotificationClient + Send + Sync>,
    store: Mutex<NotificationStore>,
    backoff: BackoffController,
    generation: AtomicU64,
    /// Locked after `store` whenever both are held.
    lists: Mutex<ListPulls>,
    events: broadcast::Sender<SyncEvent>,
}

/// A local change that an outstanding list page cannot know about yet.
#[derive(Debug, Clone)]
enum LocalEdit {
    Read(String),
    ReadAll,
    Delete(String),
    Pushed(Notification),
}

#[derive(Debug, Default)]
struct ListPulls {
    /// Sequence number of the most recently issued list pull.
    latest: u64,
    in_flight: usize,
    /// Only recorded while a list pull is outstanding.
    edits: Vec<(u64, LocalEdit)>,
}

/// Keeps the outstanding-pull count and the loading flag right even if
/// the pulling future is dropped.
struct ListPull<'a> {
    coordinator: &'a SyncCoordinator,
    done: bool,
}

impl ListPull<'_> {
    fn finish(mut self, store: &mut NotificationStore, lists: &mut ListPulls) {
        self.done = true;
        finish_list_pull(store, lists);
    }
}

impl Drop for ListPull<'_> {
    fn drop(&mut self) {
        if !self.done {
            let mut store = self.coordinator.store();
            finish_list_pull(&mut store, &mut self.coordinator.lists());
        }
    }
}

fn finish_list_pull(store: &mut NotificationStore, lists: &mut ListPulls) {
    lists.in_flight = lists.in_flight.saturating_sub(1);
    if lists.in_flight == 0 {
        lists.edits.clear();
    }
    store.set_loading(lists.in_flight > 0);
}

/// Clears `is_poll_in_flight` even if the polling future is dropped.
struct InFlight<'a> {
    coordinator: &'a SyncCoordinator,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.coordinator.store().sync_state_mut().is_poll_in_flight = false;
    }
}

impl SyncCoordinator {
    pub fn new(
        session_id: impl Into<String>,
        client: Arc<dyn NotificationClient + Send + Sync>,
        policy: BackoffPolicy,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = NotificationStore::new(session_id, capacity, policy.base_interval_ms);
        Self {
            client,
            store: Mutex::new(store),
            backoff: BackoffController::new(policy),
            generation: AtomicU64::new(0),
            lists: Mutex::new(ListPulls::default()),
            events,
        }
    }

    fn store(&self) -> MutexGuard<'_, NotificationStore> {
        // A panic while holding the lock leaves plain data behind; keep going with it
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lists(&self) -> MutexGuard<'_, ListPulls> {
        self.lists.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_edit(&self, generation: u64, edit: LocalEdit) {
        let mut lists = self.lists();
        if lists.in_flight > 0 {
            lists.edits.push((generation, edit));
        }
    }

    /// Run `f` against the current store state.
    pub fn read<R>(&self, f: impl FnOnce(&NotificationStore) -> R) -> R {
        f(&self.store())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store().snapshot()
    }

    pub fn unread_count(&self) -> u64 {
        self.store().unread_count()
    }

    pub fn current_interval_ms(&self) -> u64 {
        self.store().sync_state().current_interval_ms
    }

    /// Subscribe to store changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn emit_count(&self, store: &NotificationStore) {
        self.emit(SyncEvent::CountChanged {
            unread: store.unread_count(),
            total: store.total_count(),
        });
    }

    fn surface(&self, err: &NoticeboardError) {
        let message = err.user_message();
        self.store().set_error(message.clone());
        self.emit(SyncEvent::Error(message));
    }

    /// Advance the generation; anything issued before is now stale.
    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Pull a page and reconcile it into the store.
    ///
    /// Page 1 replaces the list, later pages are appended. Local reads,
    /// deletes and pushes that happened while the page was in flight are
    /// replayed onto it first. On error the store keeps what it had and the
    /// error message is surfaced. A pull overtaken by a newer list pull
    /// returns [`NoticeboardError::Superseded`] and changes nothing.
    pub async fn fetch_notifications(&self, params: FetchParams) -> Result<()> {
        let (sequence, issued_at) = {
            let mut store = self.store();
            let mut lists = self.lists();
            lists.latest += 1;
            lists.in_flight += 1;
            store.set_loading(true);
            (lists.latest, self.bump_generation())
        };
        let pull = ListPull {
            coordinator: self,
            done: false,
        };

        let result = self.client.list(&params).await;

        let mut store = self.store();
        let (superseded, edits) = {
            let mut lists = self.lists();
            let superseded = lists.latest != sequence;
            let edits: Vec<LocalEdit> = lists
                .edits
                .iter()
                .filter(|(generation, _)| *generation > issued_at)
                .map(|(_, edit)| edit.clone())
                .collect();
            pull.finish(&mut store, &mut lists);
            (superseded, edits)
        };

        let mut page = match result {
            Ok(page) => page,
            Err(e) => {
                drop(store);
                warn!("Failed to fetch notifications: {}", e);
                self.surface(&e);
                return Err(e);
            }
        };

        if superseded {
            debug!("Page {} superseded by a newer list pull", params.page);
            return Err(NoticeboardError::Superseded);
        }

        let replaces = params.page <= 1;
        if !edits.is_empty() {
            debug!(
                "Replaying {} local changes onto page {}",
                edits.len(),
                params.page
            );
            replay_local_edits(&mut page, &edits, replaces);
        }

        let received = page.notifications.len();
        if replaces {
            store.replace_page(page.notifications);
        } else {
            store.append_page(page.notifications);
        }
        store.set_counts(NotificationCount {
            unread: page.unread_count,
            total: page.total,
        });
        store.clear_error();

        debug!(
            "Fetched page {} ({} notifications, {} unread)",
            params.page, received, page.unread_count
        );
        self.emit(SyncEvent::ListUpdated);
        self.emit_count(&store);
        Ok(())
    }

    /// Count-only pull; cheap enough for the polling cadence.
    pub async fn fetch_notification_count(&self) -> Result<NotificationCount> {
        let generation = self.bump_generation();

        match self.client.count().await {
            Ok(count) => {
                if self.is_current(generation) {
                    let mut store = self.store();
                    store.set_counts(count);
                    self.emit_count(&store);
                } else {
                    debug!("Discarding stale count response");
                }
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to fetch notification count: {}", e);
                self.surface(&e);
                Err(e)
            }
        }
    }

    /// Merge one notification delivered by the push channel.
    ///
    /// Advances the generation so a count issued earlier cannot undo the
    /// new entry's increment.
    pub fn merge_pushed(&self, notification: Notification) -> Upsert {
        let mut store = self.store();
        let generation = self.bump_generation();
        let outcome = store.upsert_front(notification.clone());
        self.record_edit(generation, LocalEdit::Pushed(notification.clone()));

        match outcome {
            Upsert::Inserted => {
                debug!("Pushed notification {} inserted", notification.id);
                self.emit(SyncEvent::NotificationReceived(notification));
            }
            Upsert::Updated => {
                debug!("Pushed notification {} already known", notification.id);
            }
        }
        self.emit_count(&store);
        outcome
    }

    /// Optimistically mark one notification read, then tell the server.
    ///
    /// A server failure is surfaced but the local change stays; the next
    /// successful pull corrects any drift.
    pub async fn mark_as_read(&self, id: &str) -> Result<()> {
        {
            let mut store = self.store();
            let generation = self.bump_generation();
            if store.mark_read(id) {
                self.emit_count(&store);
            }
            self.record_edit(generation, LocalEdit::Read(id.to_string()));
        }

        self.client.mark_read(id).await.inspect_err(|e| {
            warn!("Failed to mark {} as read: {}", id, e);
            self.surface(e);
        })
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        {
            let mut store = self.store();
            let generation = self.bump_generation();
            store.mark_all_read();
            self.emit_count(&store);
            self.record_edit(generation, LocalEdit::ReadAll);
        }

        self.client.mark_all_read().await.inspect_err(|e| {
            warn!("Failed to mark all notifications as read: {}", e);
            self.surface(e);
        })
    }

    /// Remove locally, then delete on the server.
    ///
    /// On failure the entry is not restored; the count is re-pulled instead.
    pub async fn delete_notification(&self, id: &str) -> Result<()> {
        {
            let mut store = self.store();
            let generation = self.bump_generation();
            if store.remove(id).is_some() {
                self.emit_count(&store);
            }
            self.record_edit(generation, LocalEdit::Delete(id.to_string()));
        }

        match self.client.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Failed to delete notification {}: {}", id, e);
                self.surface(&e);
                if let Err(count_err) = self.fetch_notification_count().await {
                    debug!("Count reconciliation after delete failed: {}", count_err);
                }
                Err(e)
            }
        }
    }

    /// Mark as read if needed, then hand the target path to `navigate`.
    ///
    /// A failed read mutation is surfaced through the store but does not
    /// block navigation.
    pub async fn handle_notification_click<F>(
        &self,
        notification: &Notification,
        navigate: F,
    ) -> String
    where
        F: FnOnce(&str),
    {
        if notification.is_unread() {
            let _ = self.mark_as_read(&notification.id).await;
        }

        let target = url_for_notification(notification);
        navigate(&target);
        target
    }

    pub fn clear_error(&self) {
        self.store().clear_error();
    }

    pub(crate) fn set_tab_visible(&self, visible: bool) {
        self.store().sync_state_mut().is_tab_visible = visible;
    }

    /// One polling attempt, governed by visibility, the in-flight flag and
    /// the circuit breaker. `force` polls even while the circuit is open.
    pub(crate) async fn poll(&self, force: bool) -> PollOutcome {
        let now = Utc::now();
        {
            let mut store = self.store();
            let sync = store.sync_state_mut();

            if sync.is_poll_in_flight {
                debug!("Poll already in flight, coalescing");
                return PollOutcome::Coalesced;
            }
            if !sync.is_tab_visible {
                debug!("Client hidden, skipping poll");
                return PollOutcome::Hidden;
            }
            if !force {
                if let CircuitCheck::ShortCircuit { retry_in_ms } =
                    self.backoff.check_circuit(sync, now)
                {
                    drop(store);
                    debug!("Circuit open, skipping poll for {}ms", retry_in_ms);
                    self.surface(&NoticeboardError::Unavailable);
                    return PollOutcome::ShortCircuited { retry_in_ms };
                }
            }
            sync.is_poll_in_flight = true;
        }

        let guard = InFlight { coordinator: self };
        let result = self.fetch_notification_count().await;
        drop(guard);

        let mut store = self.store();
        let sync = store.sync_state_mut();

        match result {
            Ok(count) => {
                self.backoff.on_success(sync, Utc::now());
                let next_delay_ms = sync.current_interval_ms;
                store.clear_error();
                info!("Poll ok: {} unread of {}", count.unread, count.total);
                PollOutcome::Succeeded { next_delay_ms }
            }
            Err(e) => match e.failure_kind() {
                Some(kind) => {
                    let decision = self.backoff.on_failure(sync, kind, Utc::now());
                    if decision.pause {
                        warn!("Polling paused: {}", e);
                        PollOutcome::Paused
                    } else {
                        info!(
                            "Poll failed ({} in a row), retrying in {}ms",
                            sync.consecutive_failure_count, decision.next_delay_ms
                        );
                        PollOutcome::Failed {
                            next_delay_ms: decision.next_delay_ms,
                        }
                    }
                }
                // Not retried early and not counted toward the circuit
                None => PollOutcome::Failed {
                    next_delay_ms: sync.current_interval_ms,
                },
            },
        }
    }

    /// Drop all session data.
    pub(crate) fn reset(&self) {
        self.bump_generation();
        let mut store = self.store();
        {
            // Outstanding list pulls now belong to a dead session
            let mut lists = self.lists();
            lists.latest += 1;
            lists.edits.clear();
        }
        store.clear();
    }
}

/// Re-apply local changes made while `page` was in flight, adjusting the
/// page's counters to match. Pushed entries are only inserted into a page
/// that will replace the list.
fn replay_local_edits(page: &mut NotificationPage, edits: &[LocalEdit], replaces: bool) {
    for edit in edits {
        match edit {
            LocalEdit::Read(id) => {
                if let Some(n) = page.notifications.iter_mut().find(|n| &n.id == id) {
                    if n.is_unread() {
                        n.read = true;
                        page.unread_count = page.unread_count.saturating_sub(1);
                    }
                }
            }
            LocalEdit::ReadAll => {
                for n in page.notifications.iter_mut() {
                    n.read = true;
                }
                page.unread_count = 0;
            }
            LocalEdit::Delete(id) => {
                if let Some(index) = page.notifications.iter().position(|n| &n.id == id) {
                    let removed = page.notifications.remove(index);
                    if removed.is_unread() {
                        page.unread_count = page.unread_count.saturating_sub(1);
                    }
                    page.total = page.total.saturating_sub(1);
                }
            }
            LocalEdit::Pushed(pushed) => {
                match page.notifications.iter_mut().find(|n| n.id == pushed.id) {
                    Some(existing) => {
                        let was_unread = existing.is_unread();
                        existing.merge_from(pushed);
                        if was_unread && existing.read {
                            page.unread_count = page.unread_count.saturating_sub(1);
                        }
                    }
                    None => {
                        if pushed.is_unread() {
                            page.unread_count += 1;
                        }
                        page.total += 1;
                        if replaces {
                            page.notifications.insert(0, pushed.clone());
                        }
                    }
                }
            }
        }
    }
}
