//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de errores del dispatcher. Cada variante corresponde a una
//! categoría con un manejo distinto:
//!
//! | Variante        | Manejo                                              |
//! |-----------------|-----------------------------------------------------|
//! | `Configuration` | fatal en construcción / registro / start            |
//! | `State`         | se retorna al caller, el servidor sigue corriendo   |
//! | `Transport`     | se loguea durante el servicio, se retorna en start  |
//! | `Handler`       | se loguea y se convierte en 500                     |
//! | `Hook`          | se loguea y se descarta                             |

use thiserror::Error;

use crate::server::ServerState;

/// Errores del ciclo de vida y la configuración del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuración inválida (workers = 0, recurso no sellado, regex inválida...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operación no permitida en el estado actual del servidor
    #[error("state error: {message} (state: {state})")]
    State {
        message: String,
        state: ServerState,
    },

    /// Fallo al hacer bind, aceptar conexiones o crear threads
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Fallo dentro de un handler o sirviendo un archivo estático
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// Panic dentro de un hook del ciclo de vida
    #[error("hook '{hook}' failed: {message}")]
    Hook {
        hook: &'static str,
        message: String,
    },
}

impl ServerError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        ServerError::Configuration(message.into())
    }

    pub(crate) fn state(message: impl Into<String>, state: ServerState) -> Self {
        ServerError::State {
            message: message.into(),
            state,
        }
    }
}

/// Error producido al despachar un request
///
/// El detalle solo se loguea; el cliente recibe un 500 genérico.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// El handler retornó un error propio
    #[error("handler failed: {0}")]
    Failed(String),

    /// El handler hizo panic
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Error de I/O (archivo estático, escritura de la respuesta)
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandlerError {
    /// Atajo para que los handlers construyan un error con mensaje
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    /// Convierte el payload de un panic capturado en un error legible
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        HandlerError::Panicked(panic_message(payload.as_ref()))
    }
}

/// Extrae el mensaje de un payload de panic (`&str` o `String`)
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_display() {
        let err = ServerError::state("cannot change port", ServerState::Listening);
        assert_eq!(
            err.to_string(),
            "state error: cannot change port (state: listening)"
        );
    }

    #[test]
    fn test_hook_error_display() {
        let err = ServerError::Hook {
            hook: "after_start",
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "hook 'after_start' failed: boom");
    }

    #[test]
    fn test_handler_error_converts() {
        let err: ServerError = HandlerError::failed("boom").into();
        assert!(matches!(err, ServerError::Handler(_)));
        assert_eq!(err.to_string(), "handler failed: boom");
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
