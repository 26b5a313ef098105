//! # Tabla de Rutas
//! src/router/table.rs
//!
//! Lista ordenada e inmutable de `(método, patrón, handler, scope)`. Se
//! construye una sola vez con [`RouteTableBuilder`] antes de arrancar el
//! servidor; el orden de registro importa porque gana la primera ruta que
//! coincide.
//!
//! ## Recursos
//!
//! Un recurso agrupa rutas relacionadas y se registra como una única
//! instancia compartida (`Arc`) por todas sus rutas:
//!
//! ```
//! use std::sync::Arc;
//! use rest_dispatch::http::{Method, Request, Response};
//! use rest_dispatch::router::{HandlerResult, Resource, Route, RouteTable};
//!
//! struct Hello;
//!
//! impl Hello {
//!     fn greet(&self, _req: &Request) -> HandlerResult {
//!         Ok(Response::text("hello"))
//!     }
//! }
//!
//! impl Resource for Hello {
//!     fn routes(&self) -> Vec<Route<Self>> {
//!         vec![Route::new(Method::GET, "/hello", Hello::greet)]
//!     }
//! }
//!
//! let table = RouteTable::builder("http://localhost:1234/")
//!     .register(Arc::new(Hello))
//!     .unwrap()
//!     .build();
//! assert!(table.find(Method::GET, "/hello").is_some());
//! assert!(table.find(Method::GET, "/hello/world").is_none());
//! ```

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{HandlerError, ServerError};
use crate::http::{Method, Request, Response};

/// Resultado de un handler
pub type HandlerResult = Result<Response, HandlerError>;

/// Handler declarado por un recurso: método de la instancia compartida
pub type Handler<R> = fn(&R, &Request) -> HandlerResult;

/// Handler ya ligado a su instancia
pub type BoundHandler = Arc<dyn Fn(&Request) -> HandlerResult + Send + Sync>;

/// Si un recurso se puede seguir especializando
///
/// Solo se aceptan recursos hoja (`Sealed`). Un recurso `Open` es una base
/// pensada para que otros la extiendan y registrarlo es un error de
/// configuración.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceKind {
    #[default]
    Sealed,
    Open,
}

/// Base URL a la que se restringe un recurso
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Comodín: cualquier servidor
    Any,
    /// Solo el servidor con esta base URL (ej: "http://localhost:1234/")
    BaseUrl(String),
}

impl Scope {
    /// "*" es el comodín; cualquier otro valor es una base URL
    pub fn parse(raw: &str) -> Self {
        if raw == "*" {
            Scope::Any
        } else {
            Scope::BaseUrl(raw.to_string())
        }
    }

    pub fn matches(&self, base_url: &str) -> bool {
        match self {
            Scope::Any => true,
            Scope::BaseUrl(url) => url == base_url,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Any => f.write_str("*"),
            Scope::BaseUrl(url) => f.write_str(url),
        }
    }
}

/// Declaración de una ruta de un recurso
pub struct Route<R> {
    method: Method,
    pattern: String,
    handler: Handler<R>,
}

impl<R> Route<R> {
    /// `pattern` es una expresión regular que debe coincidir con el path
    /// completo; se ancla automáticamente con `^(?:...)$`.
    pub fn new(method: Method, pattern: &str, handler: Handler<R>) -> Self {
        Self {
            method,
            pattern: pattern.to_string(),
            handler,
        }
    }

    pub fn get(pattern: &str, handler: Handler<R>) -> Self {
        Self::new(Method::GET, pattern, handler)
    }

    pub fn post(pattern: &str, handler: Handler<R>) -> Self {
        Self::new(Method::POST, pattern, handler)
    }
}

/// Un grupo de rutas con una instancia compartida
pub trait Resource: Send + Sync + 'static {
    /// Nombre usado en logs y errores (por defecto, el nombre del tipo)
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Sealed
    }

    /// Scopes del recurso; vacío equivale a `Scope::Any`
    fn scopes(&self) -> Vec<Scope> {
        Vec::new()
    }

    /// Rutas en orden de prioridad
    fn routes(&self) -> Vec<Route<Self>>
    where
        Self: Sized;
}

/// Una entrada compilada de la tabla
pub struct RouteEntry {
    method: Method,
    source: String,
    pattern: Regex,
    handler: BoundHandler,
    scope: Scope,
    resource: String,
}

impl RouteEntry {
    /// Coincide si el método es el mismo y el patrón cubre todo el path
    pub fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && self.pattern.is_match(path)
    }

    pub fn invoke(&self, request: &Request) -> HandlerResult {
        (self.handler)(request)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Patrón tal como fue declarado
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.source)
            .field("scope", &self.scope)
            .field("resource", &self.resource)
            .finish()
    }
}

/// Tabla de rutas inmutable
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    resources: Vec<String>,
}

impl RouteTable {
    pub fn builder(base_url: impl Into<String>) -> RouteTableBuilder {
        RouteTableBuilder::new(base_url)
    }

    /// Tabla sin rutas (todo cae al fallback estático o 404)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Primera entrada que coincide, en orden de registro
    pub fn find(&self, method: Method, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.matches(method, path))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Nombres de los recursos registrados, en orden
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder de la tabla de rutas
#[derive(Debug)]
pub struct RouteTableBuilder {
    base_url: String,
    table: RouteTable,
}

impl RouteTableBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            table: RouteTable::default(),
        }
    }

    /// Registra un recurso y todas sus rutas
    ///
    /// # Errores
    ///
    /// - `Configuration` si el recurso no es `Sealed`
    /// - `Configuration` si ya hay un recurso con el mismo nombre
    /// - `Configuration` si algún patrón no es una regex válida
    ///
    /// Un recurso cuyos scopes no incluyen la base URL se omite sin error.
    pub fn register<R: Resource>(mut self, resource: Arc<R>) -> Result<Self, ServerError> {
        let name = resource.name().to_string();

        if resource.kind() != ResourceKind::Sealed {
            return Err(ServerError::configuration(format!(
                "{} is registered as a resource but is open for extension; only sealed resources can be registered",
                name
            )));
        }

        if self.table.resources.contains(&name) {
            return Err(ServerError::configuration(format!(
                "resource {} is registered twice",
                name
            )));
        }

        let scopes = resource.scopes();
        let scope = if scopes.is_empty() {
            Scope::Any
        } else {
            match scopes.into_iter().find(|s| s.matches(&self.base_url)) {
                Some(scope) => scope,
                None => {
                    tracing::debug!(
                        resource = %name,
                        base_url = %self.base_url,
                        "Resource skipped: out of scope"
                    );
                    return Ok(self);
                }
            }
        };

        let mut entries = Vec::new();
        for route in resource.routes() {
            let pattern = Regex::new(&format!("^(?:{})$", route.pattern)).map_err(|e| {
                ServerError::configuration(format!(
                    "invalid route pattern '{}' in {}: {}",
                    route.pattern, name, e
                ))
            })?;

            let instance = Arc::clone(&resource);
            let handler = route.handler;
            entries.push(RouteEntry {
                method: route.method,
                source: route.pattern,
                pattern,
                handler: Arc::new(move |request: &Request| handler(instance.as_ref(), request)),
                scope: scope.clone(),
                resource: name.clone(),
            });
        }

        tracing::debug!(resource = %name, routes = entries.len(), scope = %scope, "Resource registered");

        self.table.entries.extend(entries);
        self.table.resources.push(name);
        Ok(self)
    }

    pub fn build(self) -> RouteTable {
        self.table
    }
}

/// "my_crate::resources::Notes" -> "Notes"
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
