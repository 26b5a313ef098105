//! # Estado del Servidor
//! src/server/state.rs
//!
//! ```text
//! Stopped → Starting → Listening → Stopping → Stopped
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    Stopped,
    Starting,
    Listening,
    Stopping,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Listening => "listening",
            ServerState::Stopping => "stopping",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ServerState::Starting,
            2 => ServerState::Listening,
            3 => ServerState::Stopping,
            _ => ServerState::Stopped,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado compartido entre el controlador y el thread del listener
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ServerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn is(&self, state: ServerState) -> bool {
        self.get() == state
    }
}
