//! Semantic markers recognized inside plain server output.

use crate::context::DEFAULT_EXTENDED_MOD_BUILD;

pub const ADMIN_ACTION: &str = "Mod Log:";
pub const EXTENDED_MOD_BANNER: &str = "ServerMod - Version";
pub const ROUND_RESTARTING: &str = "Round restarting";
pub const WAITING_FOR_PLAYERS: &str = "Waiting for players";
pub const NEW_ROUND_STARTED: &str = "New round has been started";
pub const LEVEL_LOADED: &str = "Level loaded. Creating match...";
pub const SERVER_FULL: &str = "Server full";
pub const PLAYER_CONNECT: &str = "Player connect";
pub const PLAYER_DISCONNECT: &str = "Player disconnect";
pub const EARLY_PLAYER_CONNECT: &str = "Player has connected before load is complete";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Marker {
    AdminAction(String),
    ExtendedModVersion { version: String, build: String },
    RoundRestarting,
    WaitingForPlayers,
    RoundStarted,
    LevelLoaded,
    ServerFull,
    /// Descriptor runs from the first `:` onward; `None` when the line has no `:`.
    PlayerConnect(Option<String>),
    PlayerDisconnect(Option<String>),
    EarlyPlayerConnect,
}

impl Marker {
    /// Player traffic is reported through listeners, not echoed to the console.
    pub fn suppresses_display(&self) -> bool {
        matches!(self, Marker::PlayerConnect(_) | Marker::PlayerDisconnect(_))
    }
}

fn player_descriptor(text: &str) -> Option<String> {
    text.find(':').map(|idx| text[idx..].to_string())
}

fn extended_mod_version(text: &str) -> Marker {
    let remainder = text.replace(EXTENDED_MOD_BANNER, "");
    let mut pieces = remainder.split('-');
    let version = pieces.next().unwrap_or_default().trim().to_string();
    let build = pieces
        .next()
        .map(str::trim)
        .unwrap_or(DEFAULT_EXTENDED_MOD_BUILD)
        .to_string();
    Marker::ExtendedModVersion { version, build }
}

/// Every marker found in `text`, in a fixed order. Markers are independent: one line may
/// carry several.
pub fn scan(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    if text.contains(ADMIN_ACTION) {
        markers.push(Marker::AdminAction(text.replace(ADMIN_ACTION, "")));
    }
    if text.contains(EXTENDED_MOD_BANNER) {
        markers.push(extended_mod_version(text));
    }
    if text.contains(ROUND_RESTARTING) {
        markers.push(Marker::RoundRestarting);
    }
    if text.contains(WAITING_FOR_PLAYERS) {
        markers.push(Marker::WaitingForPlayers);
    }
    if text.contains(NEW_ROUND_STARTED) {
        markers.push(Marker::RoundStarted);
    }
    if text.contains(LEVEL_LOADED) {
        markers.push(Marker::LevelLoaded);
    }
    if text.contains(SERVER_FULL) {
        markers.push(Marker::ServerFull);
    }
    if text.contains(PLAYER_CONNECT) {
        markers.push(Marker::PlayerConnect(player_descriptor(text)));
    }
    if text.contains(PLAYER_DISCONNECT) {
        markers.push(Marker::PlayerDisconnect(player_descriptor(text)));
    }
    if text.contains(EARLY_PLAYER_CONNECT) {
        markers.push(Marker::EarlyPlayerConnect);
    }
    markers
}
