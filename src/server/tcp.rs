//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Controlador del ciclo de vida: un thread listener que encola requests y
//! un pool de N workers que los despachan con el [`Router`].
//!
//! ```text
//! start: reset contadores → before_start → bind → workers → listener → after_start
//! stop:  before_stop → stop cola → join workers → desbloquear listener
//!        → cerrar lecturas pendientes → after_stop
//! ```
//!
//! Ambas operaciones son idempotentes: un `start` sobre un servidor que ya
//! escucha o un `stop` sobre uno detenido no hacen nada.

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::{Response, StatusCode};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::router::{add_common_headers, RouteTable, Router, StaticFiles};

use super::context::RequestContext;
use super::hooks::{HookPoint, Hooks};
use super::listener::{ListenerHandle, ListenerParts};
use super::queue::RequestQueue;
use super::state::{ServerState, StateCell};
use super::worker::WorkerPool;

/// Recursos vivos entre un start y su stop
struct Running {
    local_addr: SocketAddr,
    queue: RequestQueue<RequestContext>,
    workers: WorkerPool,
    listener: ListenerHandle,
}

/// Servidor HTTP/1.0 concurrente con métricas
pub struct Server {
    config: ServerConfig,
    table: Arc<RouteTable>,
    metrics: Arc<MetricsCollector>,
    hooks: Hooks,
    state: Arc<StateCell>,
    running: Option<Running>,
}

impl Server {
    /// Crea un servidor detenido con un store de métricas propio
    pub fn new(config: ServerConfig, table: RouteTable) -> Result<Self, ServerError> {
        Self::with_metrics(config, table, Arc::new(MetricsCollector::new()))
    }

    /// Crea un servidor que reporta en un store de métricas compartido
    pub fn with_metrics(
        config: ServerConfig,
        table: RouteTable,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        Ok(Self {
            config,
            table: Arc::new(table),
            metrics,
            hooks: Hooks::new(),
            state: Arc::new(StateCell::new()),
            running: None,
        })
    }

    // === Ciclo de vida ===

    /// Arranca el listener y los workers
    ///
    /// Si el bind o la creación de threads falla, el estado vuelve a
    /// `Stopped` y se retorna el error.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.state.is(ServerState::Listening) {
            tracing::debug!("Start ignored: already listening");
            return Ok(());
        }

        self.config.validate()?;
        self.metrics.reset_counters();
        self.hooks.fire(HookPoint::BeforeStart);

        self.state.set(ServerState::Starting);
        match self.launch() {
            Ok(running) => {
                tracing::info!(
                    addr = %running.local_addr,
                    workers = running.workers.len(),
                    routes = self.table.len(),
                    "Server listening"
                );
                self.running = Some(running);
            }
            Err(e) => {
                self.state.set(ServerState::Stopped);
                tracing::error!(error = %e, "Server failed to start");
                return Err(e);
            }
        }

        self.hooks.fire(HookPoint::AfterStart);
        Ok(())
    }

    fn launch(&self) -> Result<Running, ServerError> {
        let listener = TcpListener::bind(self.config.address())?;
        let local_addr = listener.local_addr()?;

        let static_files = self
            .config
            .resolved_webroot()
            .and_then(|root| StaticFiles::prepare(&root, &self.config.dir_index));

        let router = Router::new(
            Arc::clone(&self.table),
            static_files,
            Arc::clone(&self.metrics),
            self.config.success_counting,
        );

        let queue = RequestQueue::new();
        let workers = WorkerPool::spawn(self.config.workers, queue.clone(), move |ctx| {
            router.dispatch(ctx);
        })?;

        // El listener verifica el estado antes del primer accept
        self.state.set(ServerState::Listening);

        let read_timeout = match self.config.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let spawned = ListenerHandle::spawn(ListenerParts {
            listener,
            queue: queue.clone(),
            metrics: Arc::clone(&self.metrics),
            state: Arc::clone(&self.state),
            read_timeout,
        });

        match spawned {
            Ok(listener) => Ok(Running {
                local_addr,
                queue,
                workers,
                listener,
            }),
            Err(e) => {
                queue.stop();
                workers.join();
                Err(e.into())
            }
        }
    }

    /// Detiene el servidor y espera a todos sus threads
    ///
    /// Los requests que quedaron en la cola al detener reciben un 503.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::debug!("Stop ignored: server not running");
            return;
        };

        self.hooks.fire(HookPoint::BeforeStop);
        self.state.set(ServerState::Stopping);

        running.queue.stop();
        running.workers.join();
        running.listener.shutdown();

        for mut ctx in running.queue.drain() {
            let mut response = Response::error(StatusCode::ServiceUnavailable, "Server is stopping");
            add_common_headers(&mut response);
            if let Err(e) = ctx.respond(&response) {
                tracing::debug!(error = %e, "Failed to reject pending request");
            }
        }

        self.state.set(ServerState::Stopped);
        tracing::info!(addr = %running.local_addr, "Server stopped");

        self.hooks.fire(HookPoint::AfterStop);
    }

    // === Configuración (solo en Stopped) ===

    fn ensure_stopped(&self, what: &str) -> Result<(), ServerError> {
        match self.state.get() {
            ServerState::Stopped => Ok(()),
            state => Err(ServerError::state(format!("cannot change {}", what), state)),
        }
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> Result<(), ServerError> {
        self.ensure_stopped("host")?;
        self.config.host = host.into();
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ServerError> {
        self.ensure_stopped("port")?;
        self.config.port = port;
        Ok(())
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) -> Result<(), ServerError> {
        self.ensure_stopped("protocol")?;
        self.config.protocol = protocol.into();
        Ok(())
    }

    /// `None` deshabilita el fallback estático
    pub fn set_webroot(&mut self, webroot: Option<PathBuf>) -> Result<(), ServerError> {
        self.ensure_stopped("webroot")?;
        self.config.no_webroot = webroot.is_none();
        self.config.webroot = webroot;
        Ok(())
    }

    pub fn set_dir_index(&mut self, dir_index: impl Into<String>) -> Result<(), ServerError> {
        self.ensure_stopped("dir_index")?;
        self.config.dir_index = dir_index.into();
        Ok(())
    }

    pub fn set_workers(&mut self, workers: usize) -> Result<(), ServerError> {
        self.ensure_stopped("workers")?;
        if workers == 0 {
            return Err(ServerError::configuration("workers must be >= 1"));
        }
        self.config.workers = workers;
        Ok(())
    }

    // === Hooks ===

    pub fn on_before_start(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.set(HookPoint::BeforeStart, Box::new(hook));
    }

    pub fn on_after_start(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.set(HookPoint::AfterStart, Box::new(hook));
    }

    pub fn on_before_stop(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.set(HookPoint::BeforeStop, Box::new(hook));
    }

    pub fn on_after_stop(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.set(HookPoint::AfterStop, Box::new(hook));
    }

    // === Lectura ===

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    pub fn is_listening(&self) -> bool {
        self.state.is(ServerState::Listening)
    }

    /// Dirección real del socket (útil con puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn success_count(&self) -> u64 {
        self.metrics.success_count()
    }

    pub fn failure_count(&self) -> u64 {
        self.metrics.failure_count()
    }

    pub fn get_count(&self) -> u64 {
        self.metrics.get_count()
    }

    pub fn post_count(&self) -> u64 {
        self.metrics.post_count()
    }

    pub fn average_post_size(&self) -> f64 {
        self.metrics.average_post_size()
    }

    pub fn full_average_post_size(&self) -> f64 {
        self.metrics.full_average_post_size()
    }

    pub fn interval_average_post_size(&self, from: i64, to: i64) -> f64 {
        self.metrics.interval_average_post_size(from, to)
    }

    pub fn requests_per_second(&self) -> f64 {
        self.metrics.requests_per_second()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::http::Request;
    use crate::router::{HandlerResult, Resource, Route};

    struct Ping;

    impl Ping {
        fn ping(&self, _req: &Request) -> HandlerResult {
            Ok(Response::text("pong"))
        }
    }

    impl Resource for Ping {
        fn routes(&self) -> Vec<Route<Self>> {
            vec![Route::get("/ping", Ping::ping)]
        }
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            no_webroot: true,
            workers: 2,
            ..ServerConfig::default()
        }
    }

    fn test_server() -> Server {
        let table = RouteTable::builder("http://127.0.0.1:0/")
            .register(Arc::new(Ping))
            .unwrap()
            .build();
        Server::new(test_config(), table).unwrap()
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        write!(stream, "GET {} HTTP/1.0\r\n\r\n", path).unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_start_serve_stop() {
        let mut server = test_server();
        assert_eq!(server.state(), ServerState::Stopped);

        server.start().unwrap();
        assert!(server.is_listening());
        let addr = server.local_addr().unwrap();

        let response = get(addr, "/ping");
        assert!(response.starts_with("HTTP/1.0 200 OK"));
        assert!(response.ends_with("pong"));

        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
        assert_eq!(server.success_count(), 1);
        assert_eq!(server.get_count(), 1);
    }

    #[test]
    fn test_zero_workers_rejected_at_construction() {
        let config = ServerConfig {
            workers: 0,
            ..test_config()
        };
        let result = Server::new(config, RouteTable::empty());
        assert!(matches!(result, Err(ServerError::Configuration(_))));
    }

    #[test]
    fn test_setters_only_when_stopped() {
        let mut server = test_server();
        server.set_workers(1).unwrap();
        assert!(matches!(
            server.set_workers(0),
            Err(ServerError::Configuration(_))
        ));

        server.start().unwrap();
        assert!(matches!(
            server.set_port(9999),
            Err(ServerError::State {
                state: ServerState::Listening,
                ..
            })
        ));
        assert!(server.set_host("0.0.0.0").is_err());
        assert!(server.set_webroot(None).is_err());

        server.stop();
        server.set_port(0).unwrap();
    }

    #[test]
    fn test_restart_resets_counters_and_keeps_history() {
        let mut server = test_server();

        server.start().unwrap();
        get(server.local_addr().unwrap(), "/ping");
        server.stop();
        assert_eq!(server.success_count(), 1);

        server.start().unwrap();
        assert_eq!(server.success_count(), 0);
        assert_eq!(server.get_count(), 0);
        assert_eq!(server.metrics().request_rate_samples().len(), 1);
        server.stop();
    }

    #[test]
    fn test_hooks_fire_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut server = test_server();

        let counter = |expected: usize| {
            let calls = Arc::clone(&calls);
            move || {
                assert_eq!(calls.fetch_add(1, Ordering::SeqCst), expected);
            }
        };
        server.on_before_start(counter(0));
        server.on_after_start(counter(1));
        server.on_before_stop(counter(2));
        server.on_after_stop(counter(3));

        server.start().unwrap();
        server.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        // Stop redundante: no se disparan hooks
        server.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_bind_failure_reverts_state() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = ServerConfig {
            port,
            ..test_config()
        };
        let mut server = Server::new(config, RouteTable::empty()).unwrap();

        let result = server.start();
        assert!(matches!(result, Err(ServerError::Transport(_))));
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_drop_stops_server() {
        let mut server = test_server();
        server.start().unwrap();
        let addr = server.local_addr().unwrap();
        drop(server);

        assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_err());
    }
}
