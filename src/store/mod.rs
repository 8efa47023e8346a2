//! Session-scoped in-memory notification inbox.
//!
//! Readers get borrowed views or a cloned [`StoreSnapshot`]. Mutators are
//! crate-private and only the sync coordinator calls them, which keeps the
//! unread counter in step with the list.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::{Notification, NotificationCount, SyncState};

/// Outcome of merging a single pushed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Read-only copy of the store for UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub total_count: u64,
    pub is_loading: bool,
    pub error: Option<String>,
    pub sync: SyncState,
}

#[derive(Debug)]
pub struct NotificationStore {
    session_id: String,
    notifications: Vec<Notification>,
    unread_count: u64,
    total_count: u64,
    is_loading: bool,
    error: Option<String>,
    sync: SyncState,
    capacity: usize,
    base_interval_ms: u64,
}

impl NotificationStore {
    pub fn new(session_id: impl Into<String>, capacity: usize, base_interval_ms: u64) -> Self {
        Self {
            session_id: session_id.into(),
            notifications: Vec::new(),
            unread_count: 0,
            total_count: 0,
            is_loading: false,
            error: None,
            sync: SyncState::new(base_interval_ms),
            capacity: capacity.max(1),
            base_interval_ms,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Most recent first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> u64 {
        self.unread_count
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            notifications: self.notifications.clone(),
            unread_count: self.unread_count,
            total_count: self.total_count,
            is_loading: self.is_loading,
            error: self.error.clone(),
            sync: self.sync.clone(),
        }
    }

    pub(crate) fn sync_state_mut(&mut self) -> &mut SyncState {
        &mut self.sync
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn set_counts(&mut self, count: NotificationCount) {
        self.unread_count = count.unread;
        self.total_count = count.total;
    }

    /// Replace the list with a freshly pulled first page.
    ///
    /// Entries already known keep their read flag if it was set locally.
    pub(crate) fn replace_page(&mut self, page: Vec<Notification>) {
        let previous = std::mem::take(&mut self.notifications);
        let mut merged = dedup_by_id(page);

        for entry in merged.iter_mut() {
            if let Some(local) = previous.iter().find(|p| p.id == entry.id) {
                entry.read |= local.read;
            }
        }

        merged.truncate(self.capacity);
        self.notifications = merged;
    }

    /// Merge a later page after the current list.
    pub(crate) fn append_page(&mut self, page: Vec<Notification>) {
        for incoming in dedup_by_id(page) {
            match self.notifications.iter_mut().find(|n| n.id == incoming.id) {
                Some(existing) => existing.merge_from(&incoming),
                None => self.notifications.push(incoming),
            }
        }
        self.notifications.truncate(self.capacity);
    }

    /// Idempotent upsert of a single notification at the head of the list.
    pub(crate) fn upsert_front(&mut self, incoming: Notification) -> Upsert {
        if let Some(existing) = self.notifications.iter_mut().find(|n| n.id == incoming.id) {
            let was_unread = existing.is_unread();
            existing.merge_from(&incoming);
            if was_unread && existing.read {
                self.unread_count = self.unread_count.saturating_sub(1);
            }
            return Upsert::Updated;
        }

        if incoming.is_unread() {
            self.unread_count += 1;
        }
        self.total_count += 1;
        self.notifications.insert(0, incoming);
        self.notifications.truncate(self.capacity);
        Upsert::Inserted
    }

    /// Returns true if the entry was unread and is now read.
    pub(crate) fn mark_read(&mut self, id: &str) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) if n.is_unread() => {
                n.read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_all_read(&mut self) {
        for n in self.notifications.iter_mut() {
            n.read = true;
        }
        self.unread_count = 0;
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Notification> {
        let index = self.notifications.iter().position(|n| n.id == id)?;
        let removed = self.notifications.remove(index);
        if removed.is_unread() {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        self.total_count = self.total_count.saturating_sub(1);
        Some(removed)
    }

    /// Drop all session data; polling bookkeeping starts over.
    pub(crate) fn clear(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;
        self.total_count = 0;
        self.is_loading = false;
        self.error = None;
        self.sync = SyncState::new(self.base_interval_ms);
    }
}

/// Keep the first occurrence of each id, folding later duplicates into it.
fn dedup_by_id(items: Vec<Notification>) -> Vec<Notification> {
    let mut seen = HashSet::new();
    let mut out: Vec<Notification> = Vec::with_capacity(items.len());

    for item in items {
        if seen.insert(item.id.clone()) {
            out.push(item);
        } else if let Some(existing) = out.iter_mut().find(|n| n.id == item.id) {
            existing.merge_from(&item);
        }
    }
    out
}
