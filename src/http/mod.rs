//! # Módulo HTTP
//!
//! Protocolo HTTP/1.x mínimo implementado a mano:
//!
//! - Parsing de requests (request line, headers, body por `Content-Length`)
//! - Construcción de responses
//! - Status codes
//!
//! No hay keep-alive, chunked encoding ni HTTP/2: cada conexión lleva un
//! único request y se cierra después de la respuesta.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
