//! # Noticeboard
//!
//! Adaptive notification sync for a student content-sharing service.
//!
//! ## Architecture
//!
//! ```text
//! Visibility ─┐
//! Backoff ────┼─ Scheduler ─┐
//!             │             ├─ Coordinator → Store
//! Push channel ─ Listener ──┘
//! ```
//!
//! Every write to the in-memory inbox goes through the
//! [`SyncCoordinator`](sync::SyncCoordinator): pulled pages, pushed events
//! and optimistic local mutations all merge by notification id. Polling
//! backs off exponentially on transient failures, waits out rate limits,
//! stops on authentication failures and short-circuits while the circuit
//! is open.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the latest notifications
//! noticeboard list
//!
//! # Unread count only
//! noticeboard count
//!
//! # Stay in sync until Ctrl-C
//! noticeboard watch
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`client`]: Notification REST API client
//! - [`config`]: Configuration file handling
//! - [`domain`]: Notification and sync state models
//! - [`store`]: Session-scoped in-memory inbox
//! - [`sync`]: Coordinator, scheduler, backoff, visibility and push

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the config and
/// the HTTP client, and hands out sync sessions.
pub mod app;

/// Command-line interface using clap.
///
/// - `list [--unread] [--page N] [--limit N]` - List notifications
/// - `count` - Unread and total counts
/// - `read <id>` / `read-all` - Mark as read
/// - `delete <id>` - Delete a notification
/// - `open <id>` - Mark read and open the target in the browser
/// - `watch [--no-push]` - Keep syncing until Ctrl-C
pub mod cli;

/// Notification REST endpoints.
///
/// - [`NotificationClient`](client::NotificationClient): Async trait over the endpoints
/// - [`HttpNotificationClient`](client::HttpNotificationClient): reqwest-based implementation
pub mod client;

/// Configuration loaded from `~/.config/noticeboard/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Notification`](domain::Notification): One inbox entry
/// - [`SyncState`](domain::SyncState): Polling and circuit bookkeeping
pub mod domain;

/// Session-scoped in-memory inbox.
///
/// [`NotificationStore`](store::NotificationStore) holds the ordered list,
/// the counters and the polling state. Only the sync coordinator writes to it.
pub mod store;

/// Keeping the store in sync with the server.
pub mod sync;
