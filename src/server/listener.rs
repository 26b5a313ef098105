//! # Listener
//! src/server/listener.rs
//!
//! Thread único que acepta conexiones mientras el servidor esté en
//! `Listening`. El listener solo hace `accept`: cada conexión se pasa a un
//! thread lector propio, que
//!
//! 1. Lee y parsea el request (con timeout de lectura)
//! 2. Cuenta el GET / POST (y el tamaño del payload POST)
//! 3. Encola el [`RequestContext`] y cuenta la muestra de rate
//!
//! Así un cliente que conecta y no manda nada nunca frena el `accept`.
//!
//! `accept` bloquea indefinidamente, así que para detenerlo el controlador
//! cambia el estado y abre una conexión de despertar contra el propio
//! socket. Al salir del loop el listener cierra los sockets que todavía se
//! están leyendo y espera a sus lectores; un `read` sin timeout también
//! vuelve.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::http::{Method, ParseError, Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::add_common_headers;

use super::context::RequestContext;
use super::queue::RequestQueue;
use super::state::{ServerState, StateCell};

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Todo lo que el thread del listener necesita
pub struct ListenerParts {
    pub listener: TcpListener,
    pub queue: RequestQueue<RequestContext>,
    pub metrics: Arc<MetricsCollector>,
    pub state: Arc<StateCell>,
    pub read_timeout: Option<Duration>,
}

/// Handle del thread del listener
pub struct ListenerHandle {
    handle: JoinHandle<()>,
    wake_addr: SocketAddr,
}

impl ListenerHandle {
    /// Lanza el thread "listener"
    pub fn spawn(parts: ListenerParts) -> io::Result<Self> {
        let wake_addr = wake_address(parts.listener.local_addr()?);

        let handle = thread::Builder::new()
            .name("listener".to_string())
            .spawn(move || listen_loop(parts))?;

        Ok(Self { handle, wake_addr })
    }

    /// Desbloquea el `accept` y espera a que terminen el listener y sus
    /// lectores
    ///
    /// El estado ya debe haber salido de `Listening`.
    pub fn shutdown(self) {
        match TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            Ok(stream) => drop(stream),
            Err(e) => {
                tracing::debug!(addr = %self.wake_addr, error = %e, "Wake-up connection failed");
            }
        }

        if self.handle.join().is_err() {
            tracing::error!("Listener thread panicked");
        }
    }
}

/// Dirección a la que conectarse para despertar al listener
fn wake_address(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

fn listen_loop(parts: ListenerParts) {
    let ListenerParts {
        listener,
        queue,
        metrics,
        state,
        read_timeout,
    } = parts;

    tracing::info!(addr = ?listener.local_addr().ok(), "Listener started");

    let reader = ConnectionReader {
        queue,
        metrics,
        read_timeout,
        in_flight: Arc::default(),
    };
    let mut readers: Vec<JoinHandle<()>> = Vec::new();

    while state.is(ServerState::Listening) {
        let accepted = listener.accept();

        if !state.is(ServerState::Listening) {
            break;
        }

        match accepted {
            Ok((stream, peer)) => {
                readers.retain(|handle| !handle.is_finished());
                match reader.spawn(stream, peer) {
                    Ok(handle) => readers.push(handle),
                    Err(e) => tracing::warn!(%peer, error = %e, "Failed to start connection reader"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
            }
        }
    }

    let closed = reader.close_in_flight();
    if closed > 0 {
        tracing::debug!(connections = closed, "Closed connections still being read");
    }
    for handle in readers {
        if handle.join().is_err() {
            tracing::error!("Connection reader panicked");
        }
    }

    tracing::info!("Listener stopped");
}

/// Sockets que todavía se están leyendo, indexados por id de conexión
#[derive(Default)]
struct InFlight {
    next_id: u64,
    streams: HashMap<u64, TcpStream>,
}

/// Lee, clasifica y encola conexiones en threads propios
#[derive(Clone)]
struct ConnectionReader {
    queue: RequestQueue<RequestContext>,
    metrics: Arc<MetricsCollector>,
    read_timeout: Option<Duration>,
    in_flight: Arc<Mutex<InFlight>>,
}

impl ConnectionReader {
    /// Lanza un thread "reader" para la conexión
    fn spawn(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<JoinHandle<()>> {
        let id = self.track(&stream)?;
        let reader = self.clone();

        let spawned = thread::Builder::new()
            .name("reader".to_string())
            .spawn(move || {
                if let Err(e) = reader.handle(id, stream, peer) {
                    tracing::warn!(%peer, error = %e, "Connection error");
                }
            });

        if spawned.is_err() {
            self.untrack(id);
        }
        spawned
    }

    fn track(&self, stream: &TcpStream) -> io::Result<u64> {
        let clone = stream.try_clone()?;
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let id = in_flight.next_id;
        in_flight.next_id += 1;
        in_flight.streams.insert(id, clone);
        Ok(id)
    }

    fn untrack(&self, id: u64) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .streams
            .remove(&id);
    }

    /// Cierra los sockets a medio leer; retorna cuántos había
    fn close_in_flight(&self) -> usize {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        for stream in in_flight.streams.values() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!(error = %e, "Connection already closed");
            }
        }
        let closed = in_flight.streams.len();
        in_flight.streams.clear();
        closed
    }

    fn handle(&self, id: u64, mut stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        let read = stream
            .set_read_timeout(self.read_timeout)
            .map_err(ParseError::from)
            .and_then(|()| Request::read_from(&mut stream));
        self.untrack(id);

        let request = match read {
            Ok(request) => request,
            Err(ParseError::EmptyRequest) => {
                tracing::debug!(%peer, "Connection closed without a request");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(%peer, error = %e, "Rejecting malformed request");
                let status = match e {
                    ParseError::BodyTooLarge(_) => StatusCode::PayloadTooLarge,
                    _ => StatusCode::BadRequest,
                };
                let mut response = Response::error(status, &format!("Invalid: {}", e));
                add_common_headers(&mut response);
                return response.write_to(&mut stream);
            }
        };

        tracing::debug!(%peer, method = %request.method(), target = request.target(), "Request received");

        match request.method() {
            Method::GET => self.metrics.record_get(),
            Method::POST => self
                .metrics
                .record_post(request.content_length().ok().flatten()),
            _ => {}
        }

        let ctx = RequestContext::new(request, Box::new(stream), Some(peer));
        match self.queue.push(ctx) {
            Ok(()) => {
                self.metrics.record_enqueued();
                Ok(())
            }
            Err(mut ctx) => {
                tracing::warn!(%peer, "Queue stopped, rejecting request");
                let mut response = Response::error(StatusCode::ServiceUnavailable, "Server is stopping");
                add_common_headers(&mut response);
                ctx.respond(&response).map_err(|e| io::Error::other(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::sync::mpsc;

    struct Running {
        handle: ListenerHandle,
        addr: SocketAddr,
        queue: RequestQueue<RequestContext>,
        metrics: Arc<MetricsCollector>,
        state: Arc<StateCell>,
    }

    impl Running {
        fn stop(self) {
            self.state.set(ServerState::Stopping);
            self.handle.shutdown();
        }
    }

    fn start(read_timeout: Option<Duration>) -> Running {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let queue = RequestQueue::new();
        let metrics = Arc::new(MetricsCollector::new());
        let state = Arc::new(StateCell::new());
        state.set(ServerState::Listening);

        let handle = ListenerHandle::spawn(ListenerParts {
            listener,
            queue: queue.clone(),
            metrics: Arc::clone(&metrics),
            state: Arc::clone(&state),
            read_timeout,
        })
        .unwrap();

        Running {
            handle,
            addr,
            queue,
            metrics,
            state,
        }
    }

    /// `pop` en otro thread, con límite de espera
    fn pop_within(queue: &RequestQueue<RequestContext>, limit: Duration) -> Option<RequestContext> {
        let (tx, rx) = mpsc::channel();
        let queue = queue.clone();
        thread::spawn(move || {
            let _ = tx.send(queue.pop());
        });
        rx.recv_timeout(limit).ok().flatten()
    }

    #[test]
    fn test_wake_address() {
        let any: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert_eq!(wake_address(any), "127.0.0.1:8080".parse().unwrap());

        let any6: SocketAddr = "[::]:8080".parse().unwrap();
        assert_eq!(wake_address(any6), "[::1]:8080".parse().unwrap());

        let fixed: SocketAddr = "10.0.0.5:80".parse().unwrap();
        assert_eq!(wake_address(fixed), fixed);
    }

    #[test]
    fn test_enqueues_and_counts() {
        let server = start(Some(Duration::from_secs(5)));

        let mut client = TcpStream::connect(server.addr).unwrap();
        client
            .write_all(b"POST /data HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello")
            .unwrap();

        let ctx = server.queue.pop().unwrap();
        assert_eq!(ctx.request().path(), "/data");
        assert_eq!(ctx.request().body(), b"hello");
        assert_eq!(ctx.peer(), Some(client.local_addr().unwrap()));
        assert_eq!(server.metrics.post_count(), 1);
        assert_eq!(server.metrics.full_average_post_size(), 5.0);

        let metrics = Arc::clone(&server.metrics);
        server.stop();

        // La muestra de rate se agrega después del push
        assert_eq!(metrics.request_rate_samples().len(), 1);
    }

    #[test]
    fn test_malformed_request_gets_400() {
        let server = start(Some(Duration::from_secs(5)));

        let mut client = TcpStream::connect(server.addr).unwrap();
        client.write_all(b"garbage\r\n\r\n").unwrap();
        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();

        assert!(buf.contains("400 Bad Request"));
        assert!(server.queue.is_empty());
        assert_eq!(server.metrics.get_count(), 0);

        server.stop();
    }

    #[test]
    fn test_oversized_body_gets_413() {
        let server = start(Some(Duration::from_secs(5)));

        let mut client = TcpStream::connect(server.addr).unwrap();
        client
            .write_all(b"POST /upload HTTP/1.0\r\nContent-Length: 999999999999\r\n\r\n")
            .unwrap();
        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();

        assert!(buf.contains("413 Payload Too Large"));
        assert!(server.queue.is_empty());
        assert_eq!(server.metrics.post_count(), 0);

        server.stop();
    }

    #[test]
    fn test_stopped_queue_gets_503() {
        let server = start(Some(Duration::from_secs(5)));
        server.queue.stop();

        let mut client = TcpStream::connect(server.addr).unwrap();
        client.write_all(b"GET /late HTTP/1.0\r\n\r\n").unwrap();
        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();

        assert!(buf.contains("503 Service Unavailable"));
        assert_eq!(server.metrics.get_count(), 1);
        assert!(server.metrics.request_rate_samples().is_empty());

        server.stop();
    }

    #[test]
    fn test_silent_client_does_not_block_others() {
        // Sin timeout: solo un lector aparte deja pasar al segundo cliente
        let server = start(None);

        let _silent = TcpStream::connect(server.addr).unwrap();
        let mut client = TcpStream::connect(server.addr).unwrap();
        client.write_all(b"GET /after-silent HTTP/1.0\r\n\r\n").unwrap();

        let ctx = pop_within(&server.queue, Duration::from_secs(2));
        assert_eq!(ctx.map(|c| c.request().path().to_string()).as_deref(), Some("/after-silent"));

        server.stop();
    }

    #[test]
    fn test_shutdown_closes_connection_without_timeout() {
        let server = start(None);

        let mut silent = TcpStream::connect(server.addr).unwrap();
        silent.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        // El segundo request confirma que el silencioso ya fue aceptado
        let mut client = TcpStream::connect(server.addr).unwrap();
        client.write_all(b"GET /ready HTTP/1.0\r\n\r\n").unwrap();
        assert!(pop_within(&server.queue, Duration::from_secs(2)).is_some());

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            server.stop();
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_secs(3)).is_ok(), "shutdown did not return");

        // El servidor cerró el socket sin responder
        let mut buf = Vec::new();
        assert_eq!(silent.read_to_end(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_shutdown_unblocks_accept() {
        start(Some(Duration::from_secs(5))).stop();
    }
}
