use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use artifact_events::{
    AdminActionListener, ArtifactConsumer, ArtifactFs, ArtifactWorker, Color, ConsoleWrite,
    DirectoryRescan, EventPipeline, Handled, ListenerRegistry, MemoryConsole,
    PlayerConnectListener, PlayerDisconnectListener, QueuedArtifact, RetryPolicy,
    RoundEndListener, RoundStartListener, ServerContext, ServerControl, ServerFullListener,
    ServerStartListener, StdFs, Supervisor, WatchConfig,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl AdminActionListener for Recorder {
    fn on_admin_action(&self, message: &str) {
        self.push(format!("admin{message}"));
    }
}

impl RoundEndListener for Recorder {
    fn on_round_end(&self) {
        self.push("round_end".into());
    }
}

impl RoundStartListener for Recorder {
    fn on_round_start(&self) {
        self.push("round_start".into());
    }
}

impl ServerStartListener for Recorder {
    fn on_server_start(&self) {
        self.push("server_start".into());
    }
}

impl ServerFullListener for Recorder {
    fn on_server_full(&self) {
        self.push("server_full".into());
    }
}

impl PlayerConnectListener for Recorder {
    fn on_player_connect(&self, player: &str) {
        self.push(format!("connect{player}"));
    }
}

impl PlayerDisconnectListener for Recorder {
    fn on_player_disconnect(&self, player: &str) {
        self.push(format!("disconnect{player}"));
    }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<String>>);

impl ServerControl for Outbox {
    fn send_message(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

struct Harness {
    recorder: Arc<Recorder>,
    outbox: Arc<Outbox>,
    console: MemoryConsole,
    context: Arc<ServerContext>,
}

impl Harness {
    fn new(session: &str) -> Self {
        let outbox = Arc::new(Outbox::default());
        Self {
            recorder: Arc::new(Recorder::default()),
            context: Arc::new(ServerContext::new(session, outbox.clone())),
            outbox,
            console: MemoryConsole::new(),
        }
    }

    fn pipeline(&self) -> EventPipeline {
        let mut listeners = ListenerRegistry::new();
        listeners
            .on_admin_action(self.recorder.clone())
            .on_round_end(self.recorder.clone())
            .on_round_start(self.recorder.clone())
            .on_server_start(self.recorder.clone())
            .on_server_full(self.recorder.clone())
            .on_player_connect(self.recorder.clone())
            .on_player_disconnect(self.recorder.clone());
        EventPipeline::new(
            Arc::clone(&self.context),
            listeners,
            Box::new(self.console.clone()),
        )
    }

    fn worker(&self) -> ArtifactWorker {
        ArtifactWorker::new(ArtifactConsumer::new(RetryPolicy::default()), self.pipeline())
    }
}

fn drop_artifact(dir: &Path, name: &str, text: &str) -> QueuedArtifact {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    QueuedArtifact::now(path)
}

#[test]
fn rich_artifact_renders_one_colored_line() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new("s");
    let mut worker = harness.worker();

    let item = drop_artifact(dir.path(), "sl1.mapi", "Hello@#fg=Red;World@#bg=Blue;Done");
    assert!(matches!(worker.handle(&item), Handled::Processed(_)));

    let parts: Vec<_> = harness
        .console
        .writes()
        .into_iter()
        .filter_map(|write| match write {
            ConsoleWrite::Part(segment) if !segment.text.is_empty() => {
                Some((segment.text, segment.foreground, segment.background))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        parts,
        vec![
            ("Hello".to_string(), Color::Cyan, Color::Black),
            ("World".to_string(), Color::Red, Color::Black),
            ("Done".to_string(), Color::Red, Color::Blue),
        ]
    );
    assert_eq!(harness.console.lines(), vec!["HelloWorldDone".to_string()]);
    assert!(!item.path.exists());
}

#[test]
fn structured_artifact_keeps_embedded_newlines() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new("s");
    let mut worker = harness.worker();

    let item = drop_artifact(
        dir.path(),
        "sl1.mapi",
        "[INFO] [core] started up\nsecond line",
    );
    let Handled::Processed(report) = worker.handle(&item) else {
        panic!("artifact was not processed");
    };

    let line = report.classification.structured.expect("structured line");
    assert_eq!(line.tag, "[core]");
    assert_eq!(line.message, "started up\nsecond line");
    assert_eq!(line.level.color(), Color::Green);
    assert_eq!(line.level.message_color(), Color::White);
    assert_eq!(
        harness.console.lines(),
        vec!["[INFO] [core] started up\nsecond line".to_string()]
    );
}

#[test]
fn waiting_for_players_starts_the_first_round_once() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new("s");
    let mut worker = harness.worker();

    worker.handle(&drop_artifact(dir.path(), "sl1.mapi", "Waiting for players"));
    assert!(harness.context.snapshot().initial_round_started);
    worker.handle(&drop_artifact(dir.path(), "sl2.mapi", "Waiting for players"));

    assert_eq!(harness.recorder.events(), vec!["round_start".to_string()]);
    assert_eq!(harness.console.lines().len(), 2);
}

#[test]
fn every_new_round_is_reported_after_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new("s");
    let mut worker = harness.worker();

    for (name, text) in [
        ("sl1.mapi", "Waiting for players"),
        ("sl2.mapi", "New round has been started"),
        ("sl3.mapi", "Round restarting"),
        ("sl4.mapi", "Waiting for players"),
        ("sl5.mapi", "New round has been started"),
    ] {
        worker.handle(&drop_artifact(dir.path(), name, text));
    }

    assert_eq!(
        harness.recorder.events(),
        vec![
            "round_start".to_string(),
            "round_start".to_string(),
            "round_end".to_string(),
            "round_start".to_string(),
        ]
    );
}

#[test]
fn lifecycle_markers_reach_their_listeners() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new("s");
    let mut worker = harness.worker();

    for (name, text) in [
        ("sl1.mapi", "Level loaded. Creating match..."),
        ("sl2.mapi", "Mod Log: admin banned someone"),
        ("sl3.mapi", "Player connect: Alice (76561198000000000)"),
        ("sl4.mapi", "Server full"),
        ("sl5.mapi", "New round has been started"),
        ("sl6.mapi", "Round restarting"),
        ("sl7.mapi", "Player disconnect: Alice"),
    ] {
        worker.handle(&drop_artifact(dir.path(), name, text));
    }

    assert_eq!(
        harness.recorder.events(),
        vec![
            "server_start".to_string(),
            "admin admin banned someone".to_string(),
            "connect: Alice (76561198000000000)".to_string(),
            "server_full".to_string(),
            "round_start".to_string(),
            "round_end".to_string(),
            "disconnect: Alice".to_string(),
        ]
    );
    // Player traffic is not echoed.
    assert_eq!(harness.console.lines().len(), 5);
}

#[test]
fn corrective_restart_needs_the_banner_first() {
    let dir = tempfile::tempdir().unwrap();

    let gated = Harness::new("s");
    let mut worker = gated.worker();
    worker.handle(&drop_artifact(dir.path(), "sl1.mapi", "ServerMod - Version 1.5.0"));
    worker.handle(&drop_artifact(
        dir.path(),
        "sl2.mapi",
        "Player has connected before load is complete",
    ));
    worker.handle(&drop_artifact(dir.path(), "sl3.mapi", "Waiting for players"));
    assert_eq!(*gated.outbox.0.lock().unwrap(), vec!["ROUNDRESTART".to_string()]);

    let late_banner = Harness::new("s");
    let mut worker = late_banner.worker();
    worker.handle(&drop_artifact(
        dir.path(),
        "sl4.mapi",
        "Player has connected before load is complete",
    ));
    worker.handle(&drop_artifact(dir.path(), "sl5.mapi", "ServerMod - Version 1.6.0"));
    worker.handle(&drop_artifact(dir.path(), "sl6.mapi", "Waiting for players"));
    assert!(late_banner.outbox.0.lock().unwrap().is_empty());

    let old_mod = Harness::new("s");
    let mut worker = old_mod.worker();
    worker.handle(&drop_artifact(dir.path(), "sl7.mapi", "ServerMod - Version 1.4.9"));
    worker.handle(&drop_artifact(
        dir.path(),
        "sl8.mapi",
        "Player has connected before load is complete",
    ));
    worker.handle(&drop_artifact(dir.path(), "sl9.mapi", "Waiting for players"));
    assert!(old_mod.outbox.0.lock().unwrap().is_empty());
    assert!(!old_mod.context.snapshot().fix_bugged_players);
}

/// Real file that can never be opened.
struct Locked;

impl ArtifactFs for Locked {
    fn exists(&self, path: &Path) -> bool {
        StdFs.exists(path)
    }

    fn open(&self, _path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "held by another process",
        ))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        StdFs.remove(path)
    }
}

#[test]
fn stuck_artifact_warns_once_and_stays_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new("s");
    let mut worker = ArtifactWorker::new(
        ArtifactConsumer::with_fs(Locked, RetryPolicy::default()),
        harness.pipeline(),
    );

    let item = drop_artifact(dir.path(), "sl1.mapi", "never read");
    assert_eq!(worker.handle(&item), Handled::Abandoned);

    let writes = harness.console.writes();
    assert_eq!(writes.len(), 1);
    let ConsoleWrite::Line { text, color } = &writes[0] else {
        panic!("expected a warning line");
    };
    assert_eq!(*color, Color::Yellow);
    assert!(text.contains("Could not open"));
    assert!(text.contains("sl1.mapi"));
    assert!(item.path.exists());
    assert_eq!(worker.stats().abandoned, 1);
    assert!(harness.recorder.events().is_empty());
}

#[test]
fn supervisor_drains_artifacts_from_the_watched_tree() {
    let root = tempfile::tempdir().unwrap();
    let session = root.path().join("session-7");
    fs::create_dir(&session).unwrap();

    let harness = Harness::new("session-7");
    let config = WatchConfig::new("session-7").root(root.path());
    let supervisor = Supervisor::start(
        &config,
        Box::new(DirectoryRescan::new(&config)),
        harness.pipeline(),
    )
    .unwrap();
    assert_eq!(supervisor.strategy(), "directory-rescan");

    // Rename into place so the artifact is complete when it first becomes visible.
    let staged = session.join("staged.tmp");
    fs::write(&staged, "Server full").unwrap();
    fs::rename(&staged, session.join("sl0001.mapi")).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while harness.recorder.events().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }

    let stats = supervisor.stop();
    assert_eq!(harness.recorder.events(), vec!["server_full".to_string()]);
    assert_eq!(stats.consumed, 1);
    assert!(!session.join("sl0001.mapi").exists());
    assert!(harness.context.is_stopping());
}
