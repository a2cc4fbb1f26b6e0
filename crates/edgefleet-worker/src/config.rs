//! Worker settings.

/// Tuning for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// How many times an append is retried after a concurrency conflict.
    pub max_append_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_append_retries: 3,
        }
    }
}
