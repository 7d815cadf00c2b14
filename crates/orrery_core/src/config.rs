//! Record graph and transform log configuration.

/// Which processors a new cache registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorSet {
    /// Relationship consistency followed by the reverse index.
    Standard,
    /// No processors; callers register their own.
    None,
}

/// Configuration for a [`crate::Cache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Processors registered on construction.
    pub processors: ProcessorSet,
    /// Whether every operation is validated against the schema.
    pub validate_schema: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            processors: ProcessorSet::Standard,
            validate_schema: true,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the processors registered on construction.
    #[must_use]
    pub const fn processors(mut self, processors: ProcessorSet) -> Self {
        self.processors = processors;
        self
    }

    /// Sets whether operations are validated against the schema.
    #[must_use]
    pub const fn validate_schema(mut self, value: bool) -> Self {
        self.validate_schema = value;
        self
    }
}

/// Configuration for a [`crate::TransformLog`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log name, used in diagnostics and the default bucket key.
    pub name: String,
    /// Bucket key under which entries are persisted.
    pub bucket_key: String,
}

impl LogConfig {
    /// Creates a configuration for a log named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let bucket_key = format!("{name}-log");
        Self { name, bucket_key }
    }

    /// Overrides the bucket key.
    #[must_use]
    pub fn with_bucket_key(mut self, key: impl Into<String>) -> Self {
        self.bucket_key = key.into();
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
