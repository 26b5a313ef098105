//! # Archivos Estáticos
//! src/router/static_files.rs
//!
//! Fallback para GETs que no coinciden con ninguna ruta. El path (sin query
//! ni fragment) se mapea sobre el webroot:
//!
//! ```text
//! /css/site.css  -> <webroot>/css/site.css         (archivo)
//! /docs          -> <webroot>/docs/index.html      (directorio + dir_index)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HandlerError;
use crate::http::{Response, StatusCode};

/// Resolución de paths sobre un webroot
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    dir_index: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, dir_index: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dir_index: dir_index.into(),
        }
    }

    /// Verifica el webroot creándolo si no existe
    ///
    /// Si no se puede crear, el fallback queda deshabilitado (`None`).
    pub fn prepare(root: &Path, dir_index: &str) -> Option<Self> {
        if !root.is_dir() {
            if let Err(e) = fs::create_dir_all(root) {
                tracing::warn!(webroot = %root.display(), error = %e, "Webroot unavailable, static files disabled");
                return None;
            }
        }
        Some(Self::new(root, dir_index))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resuelve un path de request a un archivo existente
    ///
    /// Un directorio se reintenta con `dir_index`. Los segmentos `..` nunca
    /// resuelven.
    pub fn resolve(&self, raw_path: &str) -> Option<PathBuf> {
        let path = raw_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let mut candidate = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." || segment.contains('\\') || segment.contains(':') {
                return None;
            }
            candidate.push(segment);
        }

        if candidate.is_file() {
            return Some(candidate);
        }

        if candidate.is_dir() {
            let index = candidate.join(&self.dir_index);
            if index.is_file() {
                return Some(index);
            }
        }

        None
    }

    /// Lee el archivo y arma la respuesta 200
    pub fn load(&self, file: &Path) -> Result<Response, HandlerError> {
        let bytes = fs::read(file)?;
        Ok(Response::new(StatusCode::Ok)
            .with_header("Content-Type", content_type(file))
            .with_body_bytes(bytes))
    }
}

/// Content-Type según la extensión
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
