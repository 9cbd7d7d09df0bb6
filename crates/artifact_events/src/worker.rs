use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::consume::{ArtifactConsumer, ArtifactFs, ConsumeOutcome, StdFs};
use crate::context::ServerContext;
use crate::error::IngestError;
use crate::pipeline::{EventPipeline, ProcessReport};
use crate::watch::{ArtifactSource, QueuedArtifact};

/// Counters reported when ingestion stops.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SupervisorStats {
    pub consumed: u64,
    pub vanished: u64,
    pub abandoned: u64,
    pub skipped: u64,
}

/// What became of one queued artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Processed(ProcessReport),
    Vanished,
    Abandoned,
    Skipped,
}

/// Runs queued artifacts through the consumer and pipeline, one at a time.
pub struct ArtifactWorker<F: ArtifactFs = StdFs> {
    consumer: ArtifactConsumer<F>,
    pipeline: EventPipeline,
    stats: SupervisorStats,
}

impl<F: ArtifactFs> ArtifactWorker<F> {
    pub fn new(consumer: ArtifactConsumer<F>, pipeline: EventPipeline) -> Self {
        Self {
            consumer,
            pipeline,
            stats: SupervisorStats::default(),
        }
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    pub fn handle(&mut self, item: &QueuedArtifact) -> Handled {
        let context = Arc::clone(self.pipeline.context());
        if context.is_stopping() {
            self.stats.skipped += 1;
            return Handled::Skipped;
        }

        let delay = item.remaining_delay(Instant::now());
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let is_stopping = || context.is_stopping();
        match self.consumer.consume(&item.path, &is_stopping) {
            ConsumeOutcome::Consumed(text) => {
                if context.is_stopping() {
                    self.stats.skipped += 1;
                    return Handled::Skipped;
                }
                self.stats.consumed += 1;
                Handled::Processed(self.pipeline.process(&text))
            }
            ConsumeOutcome::Vanished => {
                self.stats.vanished += 1;
                Handled::Vanished
            }
            ConsumeOutcome::Abandoned { operation, .. } => {
                self.stats.abandoned += 1;
                if context.is_stopping() {
                    debug!(path = %item.path.display(), "artifact left behind during shutdown");
                } else {
                    self.pipeline.warn_abandoned(&item.path, operation);
                }
                Handled::Abandoned
            }
            ConsumeOutcome::Stopped => {
                self.stats.skipped += 1;
                Handled::Skipped
            }
        }
    }

    fn run(mut self, queue: Receiver<QueuedArtifact>) -> SupervisorStats {
        for item in queue {
            self.handle(&item);
        }
        debug!(stats = ?self.stats, "artifact queue closed");
        self.stats
    }
}

/// Watches the artifact tree and feeds every discovered artifact to a single worker thread.
pub struct Supervisor {
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<SupervisorStats>>,
    context: Arc<ServerContext>,
    source_name: &'static str,
}

impl Supervisor {
    pub fn start(
        config: &WatchConfig,
        source: Box<dyn ArtifactSource>,
        pipeline: EventPipeline,
    ) -> Result<Self, IngestError> {
        let consumer = ArtifactConsumer::new(config.retry);
        Self::start_with(config, source, ArtifactWorker::new(consumer, pipeline))
    }

    pub fn start_with<F: ArtifactFs + 'static>(
        config: &WatchConfig,
        source: Box<dyn ArtifactSource>,
        worker: ArtifactWorker<F>,
    ) -> Result<Self, IngestError> {
        if config.session_id.trim().is_empty() {
            return Err(IngestError::EmptySessionId);
        }
        if !config.root.is_dir() {
            return Err(IngestError::MissingRoot {
                path: config.root.clone(),
            });
        }

        let context = Arc::clone(worker.pipeline.context());
        let source_name = source.name();
        let (queue_tx, queue_rx) = mpsc::sync_channel::<QueuedArtifact>(config.queue_capacity.max(1));

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => enqueue(&queue_tx, source.artifacts_for(&event)),
                Err(err) => warn!("filesystem watcher error: {err}"),
            }
        })
        .map_err(|source| IngestError::Watcher { source })?;

        watcher
            .watch(&config.root, RecursiveMode::Recursive)
            .map_err(|source| IngestError::Watch {
                path: config.root.clone(),
                source,
            })?;

        let handle = thread::Builder::new()
            .name("artifact-worker".to_string())
            .spawn(move || worker.run(queue_rx))
            .map_err(|source| IngestError::SpawnWorker { source })?;

        info!(
            root = %config.root.display(),
            session = %config.session_id,
            strategy = source_name,
            "watching for server output artifacts"
        );

        Ok(Self {
            watcher: Some(watcher),
            worker: Some(handle),
            context,
            source_name,
        })
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn strategy(&self) -> &'static str {
        self.source_name
    }

    /// Stops watching, lets the worker drain without dispatching, and returns its counters.
    pub fn stop(mut self) -> SupervisorStats {
        self.shutdown()
    }

    fn shutdown(&mut self) -> SupervisorStats {
        self.context.begin_stopping();
        // Dropping the watcher drops the last queue sender, which ends the worker loop.
        self.watcher.take();
        let stats = match self.worker.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                warn!("artifact worker panicked");
                SupervisorStats::default()
            }
            None => SupervisorStats::default(),
        };
        info!(
            consumed = stats.consumed,
            abandoned = stats.abandoned,
            "artifact ingestion stopped"
        );
        stats
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("strategy", &self.source_name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

fn enqueue(queue: &SyncSender<QueuedArtifact>, items: Vec<QueuedArtifact>) {
    for item in items {
        debug!(path = %item.path.display(), "artifact queued");
        // A full queue blocks the notifier thread instead of dropping the artifact.
        if queue.send(item).is_err() {
            debug!("artifact queue closed; dropping notification");
            return;
        }
    }
}
