use std::time::Duration;

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone)]
pub struct Config {
    /// Name attached to the store's log events
    pub name: String,
    /// Longest key a writer accepts, in bytes. `None` means unlimited.
    pub max_key_len: Option<usize>,
    /// How long an update waits for the writer lock. `None` waits forever.
    pub writer_timeout: Option<Duration>,
}

impl Config {
    /// Set the store name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reject keys longer than `max` bytes.
    pub fn with_max_key_len(mut self, max: usize) -> Self {
        self.max_key_len = Some(max);
        self
    }

    /// Fail updates that cannot take the writer lock within `timeout`.
    pub fn with_writer_timeout(mut self, timeout: Duration) -> Self {
        self.writer_timeout = Some(timeout);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "radixkv".to_string(),
            max_key_len: None,
            writer_timeout: None,
        }
    }
}
