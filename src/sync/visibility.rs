//! Foreground/background tracking for the host runtime.
//!
//! The host calls [`VisibilityMonitor::set_visible`]; registered callbacks
//! run only on actual transitions.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

pub struct VisibilityMonitor {
    state: watch::Sender<Visibility>,
    on_visible: Mutex<Vec<Callback>>,
    on_hidden: Mutex<Vec<Callback>>,
}

impl VisibilityMonitor {
    pub fn new(initial: Visibility) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            on_visible: Mutex::new(Vec::new()),
            on_hidden: Mutex::new(Vec::new()),
        }
    }

    pub fn on_visible(&self, callback: impl Fn() + Send + Sync + 'static) {
        lock(&self.on_visible).push(Arc::new(callback));
    }

    pub fn on_hidden(&self, callback: impl Fn() + Send + Sync + 'static) {
        lock(&self.on_hidden).push(Arc::new(callback));
    }

    pub fn current(&self) -> Visibility {
        *self.state.borrow()
    }

    pub fn is_visible(&self) -> bool {
        self.current() == Visibility::Visible
    }

    /// Watch visibility changes without registering a callback.
    pub fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.state.subscribe()
    }

    /// Report the host state. Returns true if this was a transition.
    pub fn set_visible(&self, visible: bool) -> bool {
        let next = if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };

        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if !changed {
            return false;
        }

        debug!("Visibility changed to {:?}", next);
        // Clone out so callbacks may register further callbacks
        let callbacks: Vec<Callback> = match next {
            Visibility::Visible => lock(&self.on_visible).clone(),
            Visibility::Hidden => lock(&self.on_hidden).clone(),
        };
        for callback in callbacks {
            callback();
        }
        true
    }

    pub(crate) fn clear_callbacks(&self) {
        lock(&self.on_visible).clear();
        lock(&self.on_hidden).clear();
    }
}

impl Default for VisibilityMonitor {
    fn default() -> Self {
        Self::new(Visibility::Visible)
    }
}

fn lock(callbacks: &Mutex<Vec<Callback>>) -> std::sync::MutexGuard<'_, Vec<Callback>> {
    callbacks.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_callbacks_fire_on_transitions_only() {
        let monitor = VisibilityMonitor::default();
        let (hidden, on_hidden) = counter();
        let (visible, on_visible) = counter();
        monitor.on_hidden(on_hidden);
        monitor.on_visible(on_visible);

        assert!(!monitor.set_visible(true));
        assert_eq!(visible.load(Ordering::SeqCst), 0);

        assert!(monitor.set_visible(false));
        assert!(!monitor.set_visible(false));
        assert_eq!(hidden.load(Ordering::SeqCst), 1);

        assert!(monitor.set_visible(true));
        assert_eq!(visible.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_sees_changes() {
        let monitor = VisibilityMonitor::new(Visibility::Hidden);
        let rx = monitor.subscribe();
        assert!(!monitor.is_visible());

        monitor.set_visible(true);
        assert_eq!(*rx.borrow(), Visibility::Visible);
    }

    #[test]
    fn test_clear_callbacks() {
        let monitor = VisibilityMonitor::default();
        let (hidden, on_hidden) = counter();
        monitor.on_hidden(on_hidden);
        monitor.clear_callbacks();

        monitor.set_visible(false);
        assert_eq!(hidden.load(Ordering::SeqCst), 0);
    }
}
