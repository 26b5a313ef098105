//! # Contexto de Request
//! src/server/context.rs
//!
//! Lo crea el lector de la conexión, pasa por la cola y termina en manos de un único
//! worker hasta que se envía la respuesta.

use std::fmt;
use std::io::Write;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::error::HandlerError;
use crate::http::{Request, Response};

/// Destino de la respuesta (el socket en producción, un buffer en tests)
pub type ResponseSink = Box<dyn Write + Send>;

/// Request en vuelo con su sink de respuesta
pub struct RequestContext {
    request: Request,
    sink: ResponseSink,
    peer: Option<SocketAddr>,
    received_at: Instant,
    responded: bool,
}

impl RequestContext {
    pub fn new(request: Request, sink: ResponseSink, peer: Option<SocketAddr>) -> Self {
        Self {
            request,
            sink,
            peer,
            received_at: Instant::now(),
            responded: false,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Tiempo desde que el request terminó de leerse
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    pub fn has_responded(&self) -> bool {
        self.responded
    }

    /// Escribe la respuesta en el sink
    ///
    /// Solo se envía una respuesta por request; una segunda llamada falla.
    pub fn respond(&mut self, response: &Response) -> Result<(), HandlerError> {
        if self.responded {
            return Err(HandlerError::failed("response already sent"));
        }
        self.responded = true;
        response.write_to(&mut self.sink)?;
        Ok(())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.request.method())
            .field("target", &self.request.target())
            .field("peer", &self.peer)
            .field("responded", &self.responded)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::http::StatusCode;

    #[test]
    fn test_respond_writes_once() {
        let (mut ctx, buffer) = context(b"GET /x HTTP/1.0\r\n\r\n");

        ctx.respond(&Response::text("ok")).unwrap();
        assert!(ctx.has_responded());
        assert!(buffer.contents().starts_with("HTTP/1.0 200 OK"));

        let second = ctx.respond(&Response::new(StatusCode::NotFound));
        assert!(second.is_err());
        assert!(!buffer.contents().contains("404"));
    }

    #[test]
    fn test_respond_broken_sink() {
        let request = Request::parse(b"GET /x HTTP/1.0\r\n\r\n").unwrap();
        let mut ctx = RequestContext::new(request, Box::new(BrokenSink), None);

        let result = ctx.respond(&Response::text("ok"));
        assert!(matches!(result, Err(HandlerError::Io(_))));
    }
}
