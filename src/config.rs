use std::time::Duration;

pub const DEFAULT_BOUND: i64 = 20;
pub const DEFAULT_PACE: Duration = Duration::from_millis(100);
pub const UP_TASK_NAME: &str = "Thread 1";
pub const DOWN_TASK_NAME: &str = "Thread 2";

/// Knobs for one counting run.
#[derive(Debug, Clone)]
pub struct CountingConfig {
    /// The up task counts from `start` to `bound`.
    pub bound: i64,
    pub start: i64,
    /// Sleep before every step, taken without holding the counter lock.
    pub pace: Duration,
    /// `None` waits for the up task forever.
    pub wait_timeout: Option<Duration>,
    pub up_name: String,
    pub down_name: String,
}

impl Default for CountingConfig {
    fn default() -> Self {
        CountingConfig {
            bound: DEFAULT_BOUND,
            start: 0,
            pace: DEFAULT_PACE,
            wait_timeout: None,
            up_name: UP_TASK_NAME.to_string(),
            down_name: DOWN_TASK_NAME.to_string(),
        }
    }
}

impl CountingConfig {
    pub fn with_bound(mut self, bound: i64) -> Self {
        self.bound = bound;
        self
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }
}
