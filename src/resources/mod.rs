//! # Recursos Incluidos
//! src/resources/mod.rs
//!
//! Recursos que el binario registra por defecto:
//! - `StatusResource`: /status y /metrics
//! - `EchoResource`: /echo, /reverse, /toupper

pub mod echo;
pub mod status;

pub use echo::EchoResource;
pub use status::StatusResource;
