use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up artifact ingestion.
///
/// Per-artifact problems never surface here; they are retried, logged, or skipped.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("session id must not be empty")]
    EmptySessionId,
    #[error("artifact root `{path}` does not exist")]
    MissingRoot { path: PathBuf },
    #[error("failed to create filesystem watcher: {source}")]
    Watcher {
        #[source]
        source: notify::Error,
    },
    #[error("failed to watch `{path}`: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to spawn artifact worker: {source}")]
    SpawnWorker {
        #[source]
        source: std::io::Error,
    },
}
