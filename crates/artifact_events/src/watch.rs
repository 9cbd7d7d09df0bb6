//! Filesystem notification strategies that turn raw notify events into queued artifacts.
//!
//! Two strategies exist and the host picks one when composing the supervisor:
//! - [`DirectoryRescan`] reacts to a changed directory by listing every matching artifact in
//!   it, oldest name first. Rescanning coalesces bursts of artifacts into one ordered batch.
//! - [`CreationSettle`] reacts to each created artifact and asks the worker to wait a short
//!   settle delay so the writer can release the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind};
use tracing::debug;

use crate::config::WatchConfig;

/// File name filter: `<prefix>*.<extension>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArtifactPattern {
    prefix: String,
    suffix: String,
}

impl ArtifactPattern {
    pub fn new(prefix: &str, extension: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: format!(".{}", extension.trim_start_matches('.')),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        name.len() >= self.prefix.len() + self.suffix.len()
            && name.starts_with(&self.prefix)
            && name.ends_with(&self.suffix)
    }
}

pub fn path_in_session(path: &Path, session_id: &str) -> bool {
    path.to_string_lossy().contains(session_id)
}

/// An artifact path waiting for the worker.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct QueuedArtifact {
    pub path: PathBuf,
    /// Earliest instant the worker may start consuming it.
    pub not_before: Option<Instant>,
}

impl QueuedArtifact {
    pub fn now(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            not_before: None,
        }
    }

    pub fn remaining_delay(&self, now: Instant) -> Duration {
        self.not_before
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or_default()
    }
}

/// Maps notification events to the artifacts that should be consumed, in order.
pub trait ArtifactSource: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn artifacts_for(&self, event: &Event) -> Vec<QueuedArtifact>;
}

/// Change-notification strategy: rescan the touched directory.
#[derive(Debug, Clone)]
pub struct DirectoryRescan {
    session_id: String,
    pattern: ArtifactPattern,
}

impl DirectoryRescan {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            session_id: config.session_id.clone(),
            pattern: config.pattern(),
        }
    }

    /// Directory a change touched: the event path itself, or the parent of a changed artifact.
    fn changed_directory(&self, path: &Path) -> Option<PathBuf> {
        if path.is_dir() {
            return Some(path.to_path_buf());
        }
        if self.pattern.matches(path) {
            return path.parent().filter(|parent| parent.is_dir()).map(Path::to_path_buf);
        }
        None
    }

    /// Matching artifacts directly inside `dir`, sorted by name.
    pub fn rescan(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), "rescan failed: {err}");
                return Vec::new();
            }
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.pattern.matches(path))
            .collect();
        files.sort();
        files
    }
}

impl ArtifactSource for DirectoryRescan {
    fn name(&self) -> &'static str {
        "directory-rescan"
    }

    fn artifacts_for(&self, event: &Event) -> Vec<QueuedArtifact> {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return Vec::new();
        }
        let mut dirs: Vec<PathBuf> = Vec::new();
        for path in &event.paths {
            let Some(dir) = self.changed_directory(path) else {
                continue;
            };
            if path_in_session(&dir, &self.session_id) && !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs.iter()
            .flat_map(|dir| self.rescan(dir))
            .map(QueuedArtifact::now)
            .collect()
    }
}

/// Creation-notification strategy: queue each new artifact after a settle delay.
#[derive(Debug, Clone)]
pub struct CreationSettle {
    session_id: String,
    pattern: ArtifactPattern,
    settle_delay: Duration,
}

impl CreationSettle {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            session_id: config.session_id.clone(),
            pattern: config.pattern(),
            settle_delay: config.settle_delay,
        }
    }
}

impl ArtifactSource for CreationSettle {
    fn name(&self) -> &'static str {
        "creation-settle"
    }

    fn artifacts_for(&self, event: &Event) -> Vec<QueuedArtifact> {
        if !matches!(event.kind, EventKind::Create(_)) {
            return Vec::new();
        }
        let not_before = Instant::now() + self.settle_delay;
        event
            .paths
            .iter()
            .filter(|path| self.pattern.matches(path))
            .filter(|path| path_in_session(path, &self.session_id))
            .map(|path| QueuedArtifact {
                path: path.clone(),
                not_before: Some(not_before),
            })
            .collect()
    }
}

/// The strategy suited to the host platform's notification facility.
pub fn platform_default(config: &WatchConfig) -> Box<dyn ArtifactSource> {
    #[cfg(windows)]
    {
        Box::new(DirectoryRescan::new(config))
    }
    #[cfg(not(windows))]
    {
        Box::new(CreationSettle::new(config))
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    use super::*;

    fn event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event {
            kind,
            paths,
            attrs: Default::default(),
        }
    }

    fn touch(path: &Path) {
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn pattern_needs_prefix_and_extension() {
        let pattern = ArtifactPattern::new("sl", "mapi");
        assert!(pattern.matches(Path::new("/a/sl1.mapi")));
        assert!(pattern.matches(Path::new("sl.mapi")));
        assert!(!pattern.matches(Path::new("/a/xl1.mapi")));
        assert!(!pattern.matches(Path::new("/a/sl1.mapi.tmp")));
        assert!(!pattern.matches(Path::new("/a/slmapi")));
    }

    #[test]
    fn rescan_lists_session_artifacts_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("session-42");
        fs::create_dir(&session).unwrap();
        for name in ["sl0003.mapi", "sl0001.mapi", "other.txt", "sl0002.mapi"] {
            touch(&session.join(name));
        }
        fs::create_dir(session.join("sl0000.mapi")).unwrap();

        let source = DirectoryRescan::new(&WatchConfig::new("session-42"));
        let queued = source.artifacts_for(&event(
            EventKind::Modify(ModifyKind::Any),
            vec![session.clone()],
        ));

        let names: Vec<_> = queued
            .iter()
            .map(|item| item.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sl0001.mapi", "sl0002.mapi", "sl0003.mapi"]);
        assert!(queued.iter().all(|item| item.not_before.is_none()));
    }

    #[test]
    fn rescan_ignores_foreign_sessions_and_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        let foreign = root.path().join("old-session");
        fs::create_dir(&foreign).unwrap();
        touch(&foreign.join("sl0001.mapi"));

        let source = DirectoryRescan::new(&WatchConfig::new("session-42"));
        let modify = || EventKind::Modify(ModifyKind::Data(DataChange::Any));
        assert!(source
            .artifacts_for(&event(modify(), vec![foreign]))
            .is_empty());
        assert!(source
            .artifacts_for(&event(modify(), vec![root.path().join("session-42")]))
            .is_empty());
    }

    #[test]
    fn rescan_resolves_artifact_events_to_their_directory() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("s1");
        fs::create_dir(&session).unwrap();
        touch(&session.join("sl2.mapi"));
        touch(&session.join("sl1.mapi"));

        let source = DirectoryRescan::new(&WatchConfig::new("s1"));
        let queued = source.artifacts_for(&event(
            EventKind::Create(CreateKind::File),
            vec![session.join("sl2.mapi"), session.join("sl1.mapi")],
        ));
        assert_eq!(
            queued,
            vec![
                QueuedArtifact::now(session.join("sl1.mapi")),
                QueuedArtifact::now(session.join("sl2.mapi")),
            ]
        );
    }

    #[test]
    fn creation_queues_matching_files_with_a_settle_delay() {
        let config = WatchConfig::new("s1").settle_delay(Duration::from_millis(40));
        let source = CreationSettle::new(&config);
        let before = Instant::now();
        let queued = source.artifacts_for(&event(
            EventKind::Create(CreateKind::File),
            vec![
                PathBuf::from("/d/s1/sl7.mapi"),
                PathBuf::from("/d/s2/sl8.mapi"),
                PathBuf::from("/d/s1/notes.txt"),
            ],
        ));

        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].path, PathBuf::from("/d/s1/sl7.mapi"));
        let deadline = queued[0].not_before.unwrap();
        assert!(deadline >= before + Duration::from_millis(40));
        assert!(queued[0].remaining_delay(deadline) == Duration::ZERO);
    }

    #[test]
    fn creation_ignores_other_event_kinds() {
        let source = CreationSettle::new(&WatchConfig::new("s1"));
        assert!(source
            .artifacts_for(&event(
                EventKind::Remove(RemoveKind::File),
                vec![PathBuf::from("/d/s1/sl7.mapi")],
            ))
            .is_empty());
    }
}
