use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
}

/// Polling bookkeeping shared by the scheduler and the backoff controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_successful_poll_at: Option<DateTime<Utc>>,
    pub consecutive_failure_count: u32,
    pub current_interval_ms: u64,
    pub circuit_state: CircuitState,
    pub circuit_reopen_at: Option<DateTime<Utc>>,
    pub is_poll_in_flight: bool,
    pub is_tab_visible: bool,
}

impl SyncState {
    pub fn new(base_interval_ms: u64) -> Self {
        Self {
            last_successful_poll_at: None,
            consecutive_failure_count: 0,
            current_interval_ms: base_interval_ms,
            circuit_state: CircuitState::Closed,
            circuit_reopen_at: None,
            is_poll_in_flight: false,
            is_tab_visible: true,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.circuit_state == CircuitState::Open
    }
}
