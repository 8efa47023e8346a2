use serde::Deserialize;

/// Polling cadence and failure handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between count polls when healthy, in milliseconds (default: 30000)
    pub base_interval_ms: u64,

    /// Upper bound for the backed-off interval (default: 300000)
    pub max_interval_ms: u64,

    /// Growth factor applied from the second consecutive failure (default: 2.0)
    pub backoff_multiplier: f64,

    /// Fixed wait after an HTTP 429 (default: 300000)
    pub rate_limit_cooldown_ms: u64,

    /// Consecutive failures that open the circuit (default: 3)
    pub failure_threshold: u32,

    /// How long the circuit stays open before polling resumes (default: 60000)
    pub circuit_cooldown_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 30_000,
            max_interval_ms: 300_000,
            backoff_multiplier: 2.0,
            rate_limit_cooldown_ms: 300_000,
            failure_threshold: 3,
            circuit_cooldown_ms: 60_000,
        }
    }
}
