//! # REST Dispatch
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente: un thread listener acepta conexiones,
//! un lector por conexión encola cada request, un pool de workers los
//! despacha contra una tabla de rutas por regex (con fallback a archivos
//! estáticos) y un store de métricas registra contadores y muestras para
//! calcular tasas y promedios.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing y serialización de HTTP/1.0
//! - `router`: Tabla de rutas, recursos, archivos estáticos y despacho
//! - `server`: Listener, cola, workers y ciclo de vida
//! - `metrics`: Contadores, historiales de muestras y métricas derivadas
//! - `resources`: Recursos incluidos (status, echo)
//! - `config`: Configuración por CLI / variables de entorno
//! - `error`: Errores del servidor y de los handlers
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::sync::Arc;
//! use rest_dispatch::config::ServerConfig;
//! use rest_dispatch::resources::EchoResource;
//! use rest_dispatch::router::RouteTable;
//! use rest_dispatch::server::Server;
//!
//! let config = ServerConfig::default();
//! let table = RouteTable::builder(config.base_url())
//!     .register(Arc::new(EchoResource))?
//!     .build();
//!
//! let mut server = Server::new(config, table)?;
//! server.start()?;
//! // ...
//! server.stop();
//! # Ok::<(), rest_dispatch::error::ServerError>(())
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod resources;
pub mod router;
pub mod server;

pub use error::{HandlerError, ServerError};
