use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::classify::{self, Classification};
use crate::consume::Operation;
use crate::context::{ServerContext, CORRECTIVE_RESTART_MESSAGE};
use crate::lexicon::Color;
use crate::listener::{LifecycleEvent, ListenerRegistry};
use crate::marker::{self, Marker};
use crate::segment::{render_segments, ConsoleSink};

pub const WARNING_COLOR: Color = Color::Yellow;

/// What the pipeline did with one artifact.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProcessReport {
    pub classification: Classification,
    /// Markers found in the text; empty when the structured-log encoding handled it.
    pub markers: Vec<Marker>,
    /// Whether the body was echoed as a plain line.
    pub displayed_plain: bool,
}

/// Classifies, renders, and dispatches one decoded artifact at a time.
pub struct EventPipeline {
    context: Arc<ServerContext>,
    listeners: ListenerRegistry,
    console: Box<dyn ConsoleSink>,
}

impl EventPipeline {
    pub fn new(
        context: Arc<ServerContext>,
        listeners: ListenerRegistry,
        console: Box<dyn ConsoleSink>,
    ) -> Self {
        Self {
            context,
            listeners,
            console,
        }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn process(&mut self, text: &str) -> ProcessReport {
        let classification = classify::classify(text);
        let mut display = true;

        if let Some(segments) = &classification.rich {
            render_segments(self.console.as_mut(), segments);
            display = false;
        }

        if let Some(line) = &classification.structured {
            render_segments(self.console.as_mut(), &line.segments());
            return ProcessReport {
                classification,
                markers: Vec::new(),
                displayed_plain: false,
            };
        }

        let markers = marker::scan(&classification.body);
        for marker in &markers {
            if marker.suppresses_display() {
                display = false;
            }
            self.apply(marker);
        }

        let mut displayed_plain = false;
        if display {
            if let Some(plain) = classification.plain_text() {
                self.console
                    .write_line(plain, classification.fallback_color());
                displayed_plain = true;
            }
        }

        ProcessReport {
            classification,
            markers,
            displayed_plain,
        }
    }

    /// Tells the operator an artifact had to be left behind.
    pub fn warn_abandoned(&mut self, path: &Path, operation: Operation) {
        self.console.write_line(
            &format!(
                "Message printer warning: Could not {operation} {}. Make sure that the supervisor \
                 has all necessary read-write permissions. Skipping.",
                path.display()
            ),
            WARNING_COLOR,
        );
    }

    fn apply(&mut self, marker: &Marker) {
        match marker {
            Marker::AdminAction(message) => {
                self.listeners
                    .dispatch(&LifecycleEvent::AdminAction(message.clone()));
            }
            Marker::ExtendedModVersion { version, build } => {
                let mut state = self.context.state();
                state.has_extended_mod = true;
                state.extended_mod_version = version.clone();
                state.extended_mod_build = build.clone();
                info!(version = %version, build = %build, "extended mod detected");
            }
            Marker::RoundRestarting => self.listeners.dispatch(&LifecycleEvent::RoundEnd),
            Marker::WaitingForPlayers => self.waiting_for_players(),
            Marker::RoundStarted => self.listeners.dispatch(&LifecycleEvent::RoundStart),
            Marker::LevelLoaded => self.listeners.dispatch(&LifecycleEvent::ServerStart),
            Marker::ServerFull => self.listeners.dispatch(&LifecycleEvent::ServerFull),
            Marker::PlayerConnect(player) => match player {
                Some(player) => {
                    debug!(player = %player, "player connect event");
                    self.listeners
                        .dispatch(&LifecycleEvent::PlayerConnect(player.clone()));
                }
                None => debug!("player connect line without a descriptor"),
            },
            Marker::PlayerDisconnect(player) => match player {
                Some(player) => {
                    debug!(player = %player, "player disconnect event");
                    self.listeners
                        .dispatch(&LifecycleEvent::PlayerDisconnect(player.clone()));
                }
                None => debug!("player disconnect line without a descriptor"),
            },
            Marker::EarlyPlayerConnect => {
                let mut state = self.context.state();
                if state.bugged_player_fix_supported() {
                    state.fix_bugged_players = true;
                    debug!("player connected before load completed; restart queued");
                }
            }
        }
    }

    fn waiting_for_players(&mut self) {
        let (first_round, send_fix) = {
            let mut state = self.context.state();
            let first_round = !state.initial_round_started;
            state.initial_round_started = true;
            let send_fix = state.fix_bugged_players && state.bugged_player_fix_supported();
            if send_fix {
                state.fix_bugged_players = false;
            }
            (first_round, send_fix)
        };

        if first_round {
            self.listeners.dispatch(&LifecycleEvent::RoundStart);
        }
        if send_fix {
            info!("sending corrective round restart");
            self.context.send_message(CORRECTIVE_RESTART_MESSAGE);
        }
    }
}
