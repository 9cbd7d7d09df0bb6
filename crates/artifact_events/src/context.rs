use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use semver::Version;

/// Extended-mod release that first understands the corrective restart message.
pub const BUGGED_PLAYER_FIX_MIN_VERSION: (u64, u64, u64) = (1, 5, 0);
pub const CORRECTIVE_RESTART_MESSAGE: &str = "ROUNDRESTART";
pub const DEFAULT_EXTENDED_MOD_BUILD: &str = "A";

/// Out-of-band channel back into the supervised server.
pub trait ServerControl: Send + Sync {
    fn send_message(&self, message: &str);
}

/// Control channel that drops every message; useful when nothing is listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopControl;

impl ServerControl for NoopControl {
    fn send_message(&self, _message: &str) {}
}

/// Flags accumulated from the server's output over its lifetime.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct LifecycleState {
    pub has_extended_mod: bool,
    pub extended_mod_version: String,
    pub extended_mod_build: String,
    pub initial_round_started: bool,
    pub fix_bugged_players: bool,
}

impl LifecycleState {
    /// Parsed banner version; missing components count as zero and trailing junk is ignored.
    pub fn extended_mod_semver(&self) -> Option<Version> {
        if !self.has_extended_mod {
            return None;
        }
        parse_lenient_version(&self.extended_mod_version)
    }

    pub fn extended_mod_at_least(&self, major: u64, minor: u64, patch: u64) -> bool {
        self.extended_mod_semver()
            .map(|version| version >= Version::new(major, minor, patch))
            .unwrap_or(false)
    }

    pub fn bugged_player_fix_supported(&self) -> bool {
        let (major, minor, patch) = BUGGED_PLAYER_FIX_MIN_VERSION;
        self.extended_mod_at_least(major, minor, patch)
    }
}

fn parse_lenient_version(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches(|ch: char| ch == 'v' || ch == 'V');
    let mut parts = [0u64; 3];
    let mut seen = 0;
    for (slot, piece) in parts.iter_mut().zip(raw.split('.')) {
        let digits: String = piece.chars().take_while(|ch| ch.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        *slot = digits.parse().ok()?;
        seen += 1;
        if digits.len() != piece.len() {
            break;
        }
    }
    (seen > 0).then(|| Version::new(parts[0], parts[1], parts[2]))
}

/// Process-wide state for one supervised server instance.
pub struct ServerContext {
    session_id: String,
    stopping: AtomicBool,
    state: Mutex<LifecycleState>,
    control: Arc<dyn ServerControl>,
}

impl ServerContext {
    pub fn new(session_id: impl Into<String>, control: Arc<dyn ServerControl>) -> Self {
        Self {
            session_id: session_id.into(),
            stopping: AtomicBool::new(false),
            state: Mutex::new(LifecycleState::default()),
            control,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn in_session(&self, path: &std::path::Path) -> bool {
        path.to_string_lossy().contains(self.session_id.as_str())
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Marks the server as stopping. There is no way back.
    pub fn begin_stopping(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn send_message(&self, message: &str) {
        self.control.send_message(message);
    }

    pub fn state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LifecycleState {
        self.state().clone()
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("session_id", &self.session_id)
            .field("stopping", &self.is_stopping())
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}
