use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use artifact_events::{
    AdminActionListener, AnsiConsole, ArtifactSource, DirectoryRescan, EventPipeline, IngestError,
    ListenerRegistry, PlayerConnectListener, PlayerDisconnectListener, RoundEndListener,
    RoundStartListener, ServerContext, ServerControl, ServerFullListener, ServerStartListener,
    Supervisor, WatchConfig, DEFAULT_EXTENSION, DEFAULT_FILE_PREFIX, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOT,
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "output-watch")]
#[command(about = "Echo a dedicated server's output artifacts and report lifecycle events")]
struct Cli {
    /// Session id; only artifacts whose path contains it are consumed
    #[arg(long)]
    session: String,

    /// Directory tree the server writes artifacts into
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    prefix: String,

    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Delay between a creation notification and the first read, in milliseconds
    #[arg(long, default_value_t = 15)]
    settle_ms: u64,

    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Read/delete attempts before an artifact is left behind
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Rescan changed directories instead of reacting to individual creations
    #[arg(long)]
    rescan: bool,
}

impl Cli {
    fn config(&self) -> WatchConfig {
        WatchConfig::new(self.session.clone())
            .root(self.root.clone())
            .file_prefix(self.prefix.clone())
            .extension(self.extension.clone())
            .settle_delay(Duration::from_millis(self.settle_ms))
            .queue_capacity(self.queue_capacity)
            .max_attempts(self.max_attempts)
    }
}

/// Reports every lifecycle event to the log.
struct EventLog;

impl AdminActionListener for EventLog {
    fn on_admin_action(&self, message: &str) {
        info!(action = message.trim(), "admin action");
    }
}

impl RoundEndListener for EventLog {
    fn on_round_end(&self) {
        info!("round ended");
    }
}

impl RoundStartListener for EventLog {
    fn on_round_start(&self) {
        info!("round started");
    }
}

impl ServerStartListener for EventLog {
    fn on_server_start(&self) {
        info!("server started");
    }
}

impl ServerFullListener for EventLog {
    fn on_server_full(&self) {
        info!("server full");
    }
}

impl PlayerConnectListener for EventLog {
    fn on_player_connect(&self, player: &str) {
        info!(player = player.trim_start_matches(':').trim(), "player connected");
    }
}

impl PlayerDisconnectListener for EventLog {
    fn on_player_disconnect(&self, player: &str) {
        info!(player = player.trim_start_matches(':').trim(), "player disconnected");
    }
}

/// This tool only observes; commands for the server are logged instead of sent.
struct DetachedControl;

impl ServerControl for DetachedControl {
    fn send_message(&self, message: &str) {
        warn!(command = message, "not attached to the server console; command not sent");
    }
}

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let events = Arc::new(EventLog);
    let mut listeners = ListenerRegistry::new();
    listeners
        .on_admin_action(events.clone())
        .on_round_end(events.clone())
        .on_round_start(events.clone())
        .on_server_start(events.clone())
        .on_server_full(events.clone())
        .on_player_connect(events.clone())
        .on_player_disconnect(events);

    let context = Arc::new(ServerContext::new(
        config.session_id.clone(),
        Arc::new(DetachedControl),
    ));
    let pipeline = EventPipeline::new(context, listeners, Box::new(AnsiConsole::stdout()));

    let source: Box<dyn ArtifactSource> = if cli.rescan {
        Box::new(DirectoryRescan::new(&config))
    } else {
        artifact_events::platform_default(&config)
    };
    let supervisor = Supervisor::start(&config, source, pipeline)?;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
    }

    let stats = supervisor.stop();
    info!(
        consumed = stats.consumed,
        vanished = stats.vanished,
        abandoned = stats.abandoned,
        skipped = stats.skipped,
        "shutting down"
    );
    Ok(())
}
