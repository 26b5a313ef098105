//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Despacho de un request ya desencolado:
//!
//! ```text
//! RequestContext → Router → { Handler | Archivo estático | 404 | 500 }
//! ```
//!
//! 1. Se busca en la [`RouteTable`] la primera ruta cuyo patrón coincide
//!    completo con el path y cuyo método coincide.
//! 2. Si no hay ruta y el request es GET, se intenta el webroot.
//! 3. Si nada resuelve: 404. Si algo falló en el camino: 500 con el detalle
//!    solo en el log.
//!
//! Cuándo se cuenta un éxito lo decide [`SuccessCounting`].

pub mod static_files;
pub mod table;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::SuccessCounting;
use crate::error::HandlerError;
use crate::http::{Method, Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::server::RequestContext;

pub use static_files::StaticFiles;
pub use table::{
    BoundHandler, Handler, HandlerResult, Resource, ResourceKind, Route, RouteEntry, RouteTable,
    RouteTableBuilder, Scope,
};

/// Valor del header `Server` en todas las respuestas
pub const SERVER_NAME: &str = "rest-dispatch/1.0";

/// Cómo terminó el despacho de un request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ruta registrada respondió
    Handled,
    /// Se sirvió un archivo del webroot
    Static,
    NotFound,
    /// Falló el handler, la carga del archivo o la escritura
    Failed,
}

/// Router compartido por todos los workers
pub struct Router {
    table: Arc<RouteTable>,
    static_files: Option<StaticFiles>,
    metrics: Arc<MetricsCollector>,
    policy: SuccessCounting,
}

impl Router {
    pub fn new(
        table: Arc<RouteTable>,
        static_files: Option<StaticFiles>,
        metrics: Arc<MetricsCollector>,
        policy: SuccessCounting,
    ) -> Self {
        Self {
            table,
            static_files,
            metrics,
            policy,
        }
    }

    /// Despacha un request y escribe su respuesta
    ///
    /// Nunca hace panic hacia el worker: los panics de handlers se capturan
    /// y se convierten en 500.
    pub fn dispatch(&self, mut ctx: RequestContext) -> Outcome {
        let method = ctx.request().method();
        let path = ctx.request().path().to_string();

        if let Some(entry) = self.table.find(method, &path) {
            tracing::debug!(%method, %path, pattern = entry.pattern(), resource = entry.resource(), "Route matched");
            self.count_on_match();

            let result = panic::catch_unwind(AssertUnwindSafe(|| entry.invoke(ctx.request())))
                .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));

            return self.finish(&mut ctx, result, Outcome::Handled);
        }

        if method == Method::GET {
            if let Some(files) = &self.static_files {
                if let Some(file) = files.resolve(&path) {
                    tracing::debug!(%path, file = %file.display(), "Serving static file");
                    self.count_on_match();
                    let result = files.load(&file);
                    return self.finish(&mut ctx, result, Outcome::Static);
                }
            }
        }

        self.metrics.record_failure();
        tracing::debug!(%method, %path, peer = ?ctx.peer(), "No route matched");
        let mut response =
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path));
        add_common_headers(&mut response);
        if let Err(e) = ctx.respond(&response) {
            tracing::warn!(%path, error = %e, "Failed to write 404 response");
        }
        Outcome::NotFound
    }

    /// Escribe la respuesta del handler o el 500 y ajusta contadores
    fn finish(&self, ctx: &mut RequestContext, result: HandlerResult, outcome: Outcome) -> Outcome {
        let path = ctx.request().path().to_string();

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_failure();
                tracing::error!(%path, peer = ?ctx.peer(), error = %e, "Request handling failed");
                let mut response =
                    Response::error(StatusCode::InternalServerError, "Internal server error");
                add_common_headers(&mut response);
                if let Err(e) = ctx.respond(&response) {
                    tracing::warn!(%path, error = %e, "Failed to write 500 response");
                }
                return Outcome::Failed;
            }
        };

        add_common_headers(&mut response);
        match ctx.respond(&response) {
            Ok(()) => {
                if self.policy == SuccessCounting::OnCompletion {
                    self.metrics.record_success();
                }
                tracing::debug!(
                    %path,
                    status = response.status().as_u16(),
                    elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                    "Request completed"
                );
                outcome
            }
            Err(e) => {
                // El cliente ya no está: no hay a quién mandarle un 500
                self.metrics.record_failure();
                tracing::warn!(%path, peer = ?ctx.peer(), error = %e, "Failed to write response");
                Outcome::Failed
            }
        }
    }

    fn count_on_match(&self) {
        if self.policy == SuccessCounting::OnMatch {
            self.metrics.record_success();
        }
    }
}

/// Agrega headers comunes a todas las respuestas
pub(crate) fn add_common_headers(response: &mut Response) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
}
