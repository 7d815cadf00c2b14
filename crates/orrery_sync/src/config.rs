//! Configuration for action queues.

/// Configuration for an [`crate::ActionQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue name, used in diagnostics and the default bucket key.
    pub name: String,
    /// Whether pushing an action (or reopening a non-empty queue) starts
    /// processing.
    pub auto_process: bool,
    /// Bucket key under which the serialized actions are persisted.
    pub bucket_key: String,
}

impl QueueConfig {
    /// Creates a configuration for a queue named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let bucket_key = format!("{name}-queue");
        Self {
            name,
            auto_process: true,
            bucket_key,
        }
    }

    /// Sets whether processing starts automatically.
    pub fn with_auto_process(mut self, auto_process: bool) -> Self {
        self.auto_process = auto_process;
        self
    }

    /// Overrides the bucket key.
    pub fn with_bucket_key(mut self, key: impl Into<String>) -> Self {
        self.bucket_key = key.into();
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
