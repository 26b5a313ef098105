//! # Hooks del Ciclo de Vida
//! src/server/hooks.rs
//!
//! Funciones sin argumentos que se disparan alrededor de start y stop. Un
//! panic dentro de un hook se loguea y se descarta: el ciclo de vida sigue.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{panic_message, ServerError};

pub type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    BeforeStart,
    AfterStart,
    BeforeStop,
    AfterStop,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforeStart => "before_start",
            HookPoint::AfterStart => "after_start",
            HookPoint::BeforeStop => "before_stop",
            HookPoint::AfterStop => "after_stop",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Un hook opcional por punto del ciclo de vida
#[derive(Default)]
pub struct Hooks {
    slots: [Option<Hook>; 4],
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (o reemplaza) el hook de un punto
    pub fn set(&mut self, point: HookPoint, hook: Hook) {
        self.slots[point.index()] = Some(hook);
    }

    pub fn is_set(&self, point: HookPoint) -> bool {
        self.slots[point.index()].is_some()
    }

    /// Ejecuta el hook del punto, si hay uno
    ///
    /// Un panic del hook queda logueado como [`ServerError::Hook`] y no sale
    /// de acá.
    pub fn fire(&self, point: HookPoint) {
        let Some(hook) = &self.slots[point.index()] else {
            return;
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook())) {
            let err = ServerError::Hook {
                hook: point.as_str(),
                message: panic_message(payload.as_ref()),
            };
            tracing::error!(hook = point.as_str(), error = %err, "Lifecycle hook failed");
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_start", &self.is_set(HookPoint::BeforeStart))
            .field("after_start", &self.is_set(HookPoint::AfterStart))
            .field("before_stop", &self.is_set(HookPoint::BeforeStop))
            .field("after_stop", &self.is_set(HookPoint::AfterStop))
            .finish()
    }
}
