use std::path::PathBuf;
use std::time::Duration;

use crate::consume::RetryPolicy;
use crate::watch::ArtifactPattern;

pub const DEFAULT_ROOT: &str = "SCPSL_Data/Dedicated";
pub const DEFAULT_FILE_PREFIX: &str = "sl";
pub const DEFAULT_EXTENSION: &str = "mapi";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(15);
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Where artifacts appear and how they are drained.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WatchConfig {
    pub root: PathBuf,
    pub session_id: String,
    pub file_prefix: String,
    pub extension: String,
    pub settle_delay: Duration,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            session_id: String::new(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }
}

impl WatchConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Directory tree the server drops artifacts into. Watched recursively.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Artifact extension without the leading dot.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Pause between a creation notification and the first read attempt.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Capacity of the queue between notifier threads and the worker. Clamped to at least 1.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry = RetryPolicy::new(attempts);
        self
    }

    pub fn pattern(&self) -> ArtifactPattern {
        ArtifactPattern::new(&self.file_prefix, &self.extension)
    }
}
