//! # Configuración del Servidor
//! src/config.rs
//!
//! Parámetros de construcción del servidor con soporte para argumentos CLI y
//! variables de entorno. La configuración es inmutable mientras el servidor
//! no esté en `Stopped` (ver `Server::set_*`).
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./rest_dispatch --host 0.0.0.0 --port 8080 --workers 8 --webroot ./public
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 WORKERS=2 NO_WEBROOT=true ./rest_dispatch
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::ServerError;

/// Cuándo se incrementa el contador de requests exitosos para una ruta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SuccessCounting {
    /// Al encontrar la ruta, antes de invocar el handler. Un handler que
    /// falla incrementa ambos contadores (éxito y fallo).
    OnMatch,

    /// Solo cuando el handler terminó y la respuesta se escribió
    #[default]
    OnCompletion,
}

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "rest_dispatch")]
#[command(about = "Servidor HTTP concurrente con router por regex y métricas derivadas")]
#[command(version = "0.1.0")]
pub struct ServerConfig {
    /// Host usado para el bind y la base URL ("*" o "+" = todas las interfaces)
    #[arg(long, default_value = "localhost", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor (0 = efímero)
    #[arg(short, long, default_value = "1234", env = "HTTP_PORT")]
    pub port: u16,

    /// Esquema de la base URL; solo "http" está soportado
    #[arg(long, default_value = "http", env = "HTTP_PROTOCOL")]
    pub protocol: String,

    /// Directorio raíz para archivos estáticos (default: <dir del ejecutable>/webroot)
    #[arg(long, env = "WEBROOT")]
    pub webroot: Option<PathBuf>,

    /// Deshabilita el fallback a archivos estáticos
    #[arg(long = "no-webroot", env = "NO_WEBROOT")]
    pub no_webroot: bool,

    /// Archivo servido cuando se pide un directorio
    #[arg(long = "dir-index", default_value = "index.html", env = "DIR_INDEX")]
    pub dir_index: String,

    /// Número de workers que procesan la cola de requests
    #[arg(short, long, default_value = "5", env = "WORKERS")]
    pub workers: usize,

    /// Timeout de lectura de cada request, en milisegundos (0 = sin timeout)
    #[arg(long = "read-timeout-ms", default_value = "10000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Política del contador de éxitos
    #[arg(long = "success-counting", value_enum, default_value = "on-completion", env = "SUCCESS_COUNTING")]
    pub success_counting: SuccessCounting,
}

impl ServerConfig {
    /// Parsea argumentos CLI (con fallback a variables de entorno)
    pub fn from_args() -> Self {
        ServerConfig::parse()
    }

    /// Base URL usada para filtrar los scopes de los recursos
    ///
    /// ```
    /// use rest_dispatch::config::ServerConfig;
    ///
    /// let config = ServerConfig::default();
    /// assert_eq!(config.base_url(), "http://localhost:1234/");
    /// ```
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/", self.protocol, self.host, self.port)
    }

    /// Dirección para el bind (host:port)
    ///
    /// Los comodines `*` y `+` se traducen a `0.0.0.0`.
    pub fn address(&self) -> String {
        let host = match self.host.as_str() {
            "*" | "+" => "0.0.0.0",
            host => host,
        };
        format!("{}:{}", host, self.port)
    }

    /// Webroot efectivo, `None` si el fallback estático está deshabilitado
    pub fn resolved_webroot(&self) -> Option<PathBuf> {
        if self.no_webroot {
            return None;
        }
        Some(self.webroot.clone().unwrap_or_else(default_webroot))
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.workers == 0 {
            return Err(ServerError::configuration("workers must be >= 1"));
        }
        if !self.protocol.eq_ignore_ascii_case("http") {
            return Err(ServerError::configuration(format!(
                "unsupported protocol '{}': only http is available",
                self.protocol
            )));
        }
        if self.host.trim().is_empty() {
            return Err(ServerError::configuration("host must not be empty"));
        }
        if self.dir_index.trim().is_empty() || self.dir_index.contains(['/', '\\']) {
            return Err(ServerError::configuration(format!(
                "invalid directory index '{}'",
                self.dir_index
            )));
        }
        Ok(())
    }

    /// Loguea un resumen de la configuración
    pub fn log_summary(&self) {
        tracing::info!(
            base_url = %self.base_url(),
            bind = %self.address(),
            workers = self.workers,
            webroot = ?self.resolved_webroot(),
            dir_index = %self.dir_index,
            read_timeout_ms = self.read_timeout_ms,
            success_counting = ?self.success_counting,
            "Server configuration"
        );
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1234,
            protocol: "http".to_string(),
            webroot: None,
            no_webroot: false,
            dir_index: "index.html".to_string(),
            workers: 5,
            read_timeout_ms: 10_000,
            success_counting: SuccessCounting::default(),
        }
    }
}

/// `<directorio del ejecutable>/webroot`, o `./webroot` si no se puede determinar
fn default_webroot() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("webroot")))
        .unwrap_or_else(|| PathBuf::from("./webroot"))
}
