use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, trace, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Filesystem step being attempted when an artifact could not be consumed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Operation {
    Open,
    Read,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Read => "read",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single read-then-delete attempt that did not succeed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("artifact vanished before it could be opened")]
    Vanished,
    #[error("could not {operation} artifact: {source}")]
    Unavailable {
        operation: Operation,
        #[source]
        source: io::Error,
    },
}

impl AttemptError {
    fn unavailable(operation: Operation, source: io::Error) -> Self {
        AttemptError::Unavailable { operation, source }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            AttemptError::Vanished => None,
            AttemptError::Unavailable { operation, .. } => Some(*operation),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RetryDecision {
    /// Try again immediately; the writer may still hold the file.
    Retry,
    /// The bound is spent. Leave the file on disk.
    Abandon,
    /// Nothing left to consume.
    Stop,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Decides what to do after `failed_attempts` failures, the latest being `error`.
    pub fn decide(&self, failed_attempts: u32, error: &AttemptError) -> RetryDecision {
        match error {
            AttemptError::Vanished => RetryDecision::Stop,
            AttemptError::Unavailable { .. } if failed_attempts >= self.max_attempts.max(1) => {
                RetryDecision::Abandon
            }
            AttemptError::Unavailable { .. } => RetryDecision::Retry,
        }
    }
}

/// Filesystem operations used to consume artifact bodies.
pub trait ArtifactFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl ArtifactFs for StdFs {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConsumeOutcome {
    /// The artifact was read in full and deleted.
    Consumed(String),
    /// The artifact was gone before it could be opened.
    Vanished,
    /// Every attempt failed; the artifact is still on disk.
    Abandoned { operation: Operation, attempts: u32 },
    /// The server is stopping; nothing should be dispatched.
    Stopped,
}

/// Read-then-delete handoff for artifacts another process may still be holding.
pub struct ArtifactConsumer<F: ArtifactFs = StdFs> {
    fs: F,
    policy: RetryPolicy,
}

impl ArtifactConsumer<StdFs> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_fs(StdFs, policy)
    }
}

impl<F: ArtifactFs> ArtifactConsumer<F> {
    pub fn with_fs(fs: F, policy: RetryPolicy) -> Self {
        Self { fs, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn consume(&self, path: &Path, is_stopping: &dyn Fn() -> bool) -> ConsumeOutcome {
        let mut failed_attempts = 0u32;
        loop {
            if is_stopping() {
                return ConsumeOutcome::Stopped;
            }
            if !self.fs.exists(path) {
                trace!(path = %path.display(), "artifact no longer present");
                return ConsumeOutcome::Vanished;
            }

            let error = match self.attempt(path) {
                Ok(text) => {
                    if is_stopping() {
                        return ConsumeOutcome::Stopped;
                    }
                    debug!(path = %path.display(), bytes = text.len(), "consumed artifact");
                    return ConsumeOutcome::Consumed(text);
                }
                Err(error) => error,
            };

            failed_attempts += 1;
            match self.policy.decide(failed_attempts, &error) {
                RetryDecision::Retry => {
                    trace!(path = %path.display(), attempt = failed_attempts, "{error}");
                }
                RetryDecision::Stop => return ConsumeOutcome::Vanished,
                RetryDecision::Abandon => {
                    let operation = error.operation().unwrap_or(Operation::Open);
                    warn!(
                        path = %path.display(),
                        %operation,
                        attempts = failed_attempts,
                        "giving up on artifact: {error}"
                    );
                    return ConsumeOutcome::Abandoned {
                        operation,
                        attempts: failed_attempts,
                    };
                }
            }
        }
    }

    fn attempt(&self, path: &Path) -> Result<String, AttemptError> {
        let mut reader = self.fs.open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AttemptError::Vanished,
            _ => AttemptError::unavailable(Operation::Open, err),
        })?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|err| AttemptError::unavailable(Operation::Read, err))?;
        drop(reader);

        match self.fs.remove(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(AttemptError::unavailable(Operation::Delete, err)),
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
