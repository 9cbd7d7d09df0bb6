//! Listener capabilities and the registry that dispatches to them.
//!
//! A component registers once per capability it supports. Dispatch walks each capability's
//! list in registration order.

use std::sync::Arc;

pub trait AdminActionListener: Send + Sync {
    fn on_admin_action(&self, message: &str);
}

pub trait RoundEndListener: Send + Sync {
    fn on_round_end(&self);
}

pub trait RoundStartListener: Send + Sync {
    fn on_round_start(&self);
}

pub trait ServerStartListener: Send + Sync {
    fn on_server_start(&self);
}

pub trait ServerFullListener: Send + Sync {
    fn on_server_full(&self);
}

pub trait PlayerConnectListener: Send + Sync {
    fn on_player_connect(&self, player: &str);
}

pub trait PlayerDisconnectListener: Send + Sync {
    fn on_player_disconnect(&self, player: &str);
}

/// Typed lifecycle notification delivered to listeners.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LifecycleEvent {
    AdminAction(String),
    RoundEnd,
    RoundStart,
    ServerStart,
    ServerFull,
    PlayerConnect(String),
    PlayerDisconnect(String),
}

#[derive(Default, Clone)]
pub struct ListenerRegistry {
    admin_action: Vec<Arc<dyn AdminActionListener>>,
    round_end: Vec<Arc<dyn RoundEndListener>>,
    round_start: Vec<Arc<dyn RoundStartListener>>,
    server_start: Vec<Arc<dyn ServerStartListener>>,
    server_full: Vec<Arc<dyn ServerFullListener>>,
    player_connect: Vec<Arc<dyn PlayerConnectListener>>,
    player_disconnect: Vec<Arc<dyn PlayerDisconnectListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_admin_action(&mut self, listener: Arc<dyn AdminActionListener>) -> &mut Self {
        self.admin_action.push(listener);
        self
    }

    pub fn on_round_end(&mut self, listener: Arc<dyn RoundEndListener>) -> &mut Self {
        self.round_end.push(listener);
        self
    }

    pub fn on_round_start(&mut self, listener: Arc<dyn RoundStartListener>) -> &mut Self {
        self.round_start.push(listener);
        self
    }

    pub fn on_server_start(&mut self, listener: Arc<dyn ServerStartListener>) -> &mut Self {
        self.server_start.push(listener);
        self
    }

    pub fn on_server_full(&mut self, listener: Arc<dyn ServerFullListener>) -> &mut Self {
        self.server_full.push(listener);
        self
    }

    pub fn on_player_connect(&mut self, listener: Arc<dyn PlayerConnectListener>) -> &mut Self {
        self.player_connect.push(listener);
        self
    }

    pub fn on_player_disconnect(
        &mut self,
        listener: Arc<dyn PlayerDisconnectListener>,
    ) -> &mut Self {
        self.player_disconnect.push(listener);
        self
    }

    /// Number of listeners registered for the capability `event` targets.
    pub fn listener_count(&self, event: &LifecycleEvent) -> usize {
        match event {
            LifecycleEvent::AdminAction(_) => self.admin_action.len(),
            LifecycleEvent::RoundEnd => self.round_end.len(),
            LifecycleEvent::RoundStart => self.round_start.len(),
            LifecycleEvent::ServerStart => self.server_start.len(),
            LifecycleEvent::ServerFull => self.server_full.len(),
            LifecycleEvent::PlayerConnect(_) => self.player_connect.len(),
            LifecycleEvent::PlayerDisconnect(_) => self.player_disconnect.len(),
        }
    }

    pub fn dispatch(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::AdminAction(message) => {
                for listener in &self.admin_action {
                    listener.on_admin_action(message);
                }
            }
            LifecycleEvent::RoundEnd => {
                for listener in &self.round_end {
                    listener.on_round_end();
                }
            }
            LifecycleEvent::RoundStart => {
                for listener in &self.round_start {
                    listener.on_round_start();
                }
            }
            LifecycleEvent::ServerStart => {
                for listener in &self.server_start {
                    listener.on_server_start();
                }
            }
            LifecycleEvent::ServerFull => {
                for listener in &self.server_full {
                    listener.on_server_full();
                }
            }
            LifecycleEvent::PlayerConnect(player) => {
                for listener in &self.player_connect {
                    listener.on_player_connect(player);
                }
            }
            LifecycleEvent::PlayerDisconnect(player) => {
                for listener in &self.player_disconnect {
                    listener.on_player_disconnect(player);
                }
            }
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("admin_action", &self.admin_action.len())
            .field("round_end", &self.round_end.len())
            .field("round_start", &self.round_start.len())
            .field("server_start", &self.server_start.len())
            .field("server_full", &self.server_full.len())
            .field("player_connect", &self.player_connect.len())
            .field("player_disconnect", &self.player_disconnect.len())
            .finish()
    }
}
