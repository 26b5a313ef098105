//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! ```text
//! listener ──accept──▶ reader ──push──▶ RequestQueue ──pop──▶ worker-0..N ──▶ Router
//! ```
//!
//! - `listener`: acepta conexiones; un thread lector por conexión parsea y
//!   encola
//! - `queue`: cola FIFO con señal de listo / stop
//! - `worker`: pool de threads que despachan cada request
//! - `tcp`: controlador del ciclo de vida (`Server`)

pub mod context;
pub mod hooks;
pub mod listener;
pub mod queue;
pub mod state;
pub mod tcp;
pub mod worker;

pub use context::{RequestContext, ResponseSink};
pub use hooks::{Hook, HookPoint, Hooks};
pub use queue::RequestQueue;
pub use state::ServerState;
pub use tcp::Server;
pub use worker::WorkerPool;
