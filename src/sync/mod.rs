pub mod backoff;
pub mod coordinator;
pub mod push;
pub mod scheduler;
pub mod session;
pub mod visibility;

pub use backoff::{BackoffController, BackoffDecision, BackoffPolicy, CircuitCheck};
pub use coordinator::{PollOutcome, SyncCoordinator, SyncEvent};
pub use push::{ChannelEvent, PushListener};
pub use scheduler::PollingScheduler;
pub use session::SyncSession;
pub use visibility::{Visibility, VisibilityMonitor};
