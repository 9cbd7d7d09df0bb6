#![forbid(unsafe_code)]
//! Ingestion of the output artifacts a dedicated game server drops on disk.
//!
//! The server writes each console message into its own small file under a per-session
//! directory. This crate:
//! - Watches the artifact tree and queues new artifacts for a single worker.
//! - Reads then deletes each artifact, retrying while the writer still holds it.
//! - Classifies the text (type tags, inline color tags, structured log lines) and renders it.
//! - Recognizes lifecycle markers and dispatches them to registered listeners.

pub mod classify;
mod config;
mod consume;
mod context;
mod error;
pub mod lexicon;
mod listener;
pub mod marker;
mod pipeline;
mod segment;
mod watch;
mod worker;

pub use classify::{Classification, LogLevel, StructuredLine, TypeTag};
pub use config::{
    WatchConfig, DEFAULT_EXTENSION, DEFAULT_FILE_PREFIX, DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOT,
    DEFAULT_SETTLE_DELAY,
};
pub use consume::{
    ArtifactConsumer, ArtifactFs, AttemptError, ConsumeOutcome, Operation, RetryDecision,
    RetryPolicy, StdFs, DEFAULT_MAX_ATTEMPTS,
};
pub use context::{
    LifecycleState, NoopControl, ServerContext, ServerControl, BUGGED_PLAYER_FIX_MIN_VERSION,
    CORRECTIVE_RESTART_MESSAGE,
};
pub use error::IngestError;
pub use lexicon::{Color, UnknownColor};
pub use listener::{
    AdminActionListener, LifecycleEvent, ListenerRegistry, PlayerConnectListener,
    PlayerDisconnectListener, RoundEndListener, RoundStartListener, ServerFullListener,
    ServerStartListener,
};
pub use marker::Marker;
pub use pipeline::{EventPipeline, ProcessReport, WARNING_COLOR};
pub use segment::{
    render_segments, AnsiConsole, ConsoleSink, ConsoleWrite, MemoryConsole, ParsedSegment,
};
pub use watch::{
    path_in_session, platform_default, ArtifactPattern, ArtifactSource, CreationSettle,
    DirectoryRescan, QueuedArtifact,
};
pub use worker::{ArtifactWorker, Handled, Supervisor, SupervisorStats};
