//! # Parsing de Requests HTTP/1.x
//! src/http/request.rs
//!
//! Parser HTTP/1.0 / HTTP/1.1 mínimo: request line, headers y body
//! delimitado por `Content-Length`. No hay keep-alive ni chunked encoding.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /notes?draft=1 HTTP/1.0\r\n
//! Host: localhost:1234\r\n
//! Content-Length: 11\r\n
//! \r\n
//! hello world
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use thiserror::Error;

/// Tamaño máximo de request line + headers
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Tamaño máximo de body que `read_from` acepta leer
pub const MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    PATCH,
    DELETE,
    OPTIONS,
}

impl Method {
    /// Parsea un método HTTP sin importar mayúsculas/minúsculas
    ///
    /// ```
    /// use rest_dispatch::http::Method;
    ///
    /// assert_eq!(Method::parse("get"), Some(Method::GET));
    /// assert_eq!(Method::parse("Post"), Some(Method::POST));
    /// assert_eq!(Method::parse("BREW"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        const ALL: [Method; 7] = [
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ];
        ALL.into_iter().find(|m| m.as_str().eq_ignore_ascii_case(s))
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Target tal como llegó (ej: "/notes?draft=1#top")
    target: String,

    /// Path sin query ni fragment (ej: "/notes")
    path: String,

    query_params: HashMap<String, String>,

    headers: HashMap<String, String>,

    version: String,

    body: Vec<u8>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Incomplete HTTP request")]
    IncompleteRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Request head exceeds {} bytes", MAX_HEAD_BYTES)]
    HeadTooLarge,

    #[error("Request body of {0} bytes exceeds {max} bytes", max = MAX_BODY_BYTES)]
    BodyTooLarge(u64),

    #[error("Empty request")]
    EmptyRequest,

    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

impl Request {
    /// Parsea un request completo desde un buffer
    ///
    /// Todo lo que sigue a la línea vacía se toma como body (recortado a
    /// `Content-Length` si el header está presente).
    ///
    /// ```
    /// use rest_dispatch::http::Request;
    ///
    /// let raw = b"GET /notes?id=10 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/notes");
    /// assert_eq!(request.query_param("id"), Some("10"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::EmptyRequest);
        }

        let (head, rest) = match find_head_end(buffer) {
            Some(end) => (&buffer[..end], &buffer[end + 4..]),
            None => (buffer, &[][..]),
        };

        let mut request = Self::parse_head(head)?;
        let mut body = rest.to_vec();
        if let Some(len) = request.content_length()? {
            body.truncate(len as usize);
        }
        request.body = body;
        Ok(request)
    }

    /// Lee un request desde un stream (socket)
    ///
    /// Lee hasta el fin de los headers y luego exactamente `Content-Length`
    /// bytes de body. Un `Content-Length` mayor a [`MAX_BODY_BYTES`] se
    /// rechaza antes de leer el body. Sin `Content-Length` el body es lo que
    /// ya llegó junto con los headers; no se espera EOF porque el cliente
    /// espera la respuesta.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ParseError> {
        let mut buffer = Vec::with_capacity(4096);
        let mut chunk = [0u8; 4096];

        let head_end = loop {
            if let Some(end) = find_head_end(&buffer) {
                break end;
            }
            if buffer.len() > MAX_HEAD_BYTES {
                return Err(ParseError::HeadTooLarge);
            }
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                if buffer.iter().all(|b| b.is_ascii_whitespace()) {
                    return Err(ParseError::EmptyRequest);
                }
                return Err(ParseError::IncompleteRequest);
            }
            buffer.extend_from_slice(&chunk[..n]);
        };

        let mut request = Self::parse_head(&buffer[..head_end])?;
        let mut body = buffer.split_off(head_end + 4);

        if let Some(len) = request.content_length()? {
            if len > MAX_BODY_BYTES {
                return Err(ParseError::BodyTooLarge(len));
            }
            let len = len as usize;
            while body.len() < len {
                let n = reader.read(&mut chunk)?;
                if n == 0 {
                    return Err(ParseError::IncompleteRequest);
                }
                body.extend_from_slice(&chunk[..n]);
            }
            body.truncate(len);
        }

        request.body = body;
        Ok(request)
    }

    /// Parsea request line + headers (sin la línea vacía final)
    fn parse_head(head: &[u8]) -> Result<Self, ParseError> {
        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidRequestLine)?;
        let mut lines = head.split("\r\n");

        let request_line = lines.next().ok_or(ParseError::IncompleteRequest)?;
        let (method, target, version) = Self::parse_request_line(request_line)?;
        let (path, query_params) = Self::parse_path_and_query(&target);
        let headers = Self::parse_headers(lines)?;

        Ok(Request {
            method,
            target,
            path,
            query_params,
            headers,
            version,
            body: Vec::new(),
        })
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method =
            Method::parse(parts[0]).ok_or_else(|| ParseError::UnsupportedMethod(parts[0].to_string()))?;

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, parts[1].to_string(), version))
    }

    /// "/notes?id=10&draft#top" -> ("/notes", {"id": "10", "draft": ""})
    fn parse_path_and_query(target: &str) -> (String, HashMap<String, String>) {
        let without_fragment = target.split('#').next().unwrap_or_default();

        match without_fragment.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (without_fragment.to_string(), HashMap::new()),
        }
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| match param.split_once('=') {
                Some((key, value)) => (key.to_string(), url_decode(value)),
                None => (param.to_string(), String::new()),
            })
            .collect()
    }

    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_string(), value.trim().to_string());
                }
                None => return Err(ParseError::InvalidHeader(line.to_string())),
            }
        }

        Ok(headers)
    }

    // === Accesores ===

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target original, con query y fragment
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path sin query ni fragment
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Busca un header ignorando mayúsculas/minúsculas en el nombre
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Valor de `Content-Length`, `None` si el header no vino
    pub fn content_length(&self) -> Result<Option<u64>, ParseError> {
        match self.header("Content-Length") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ParseError::InvalidContentLength(raw.to_string())),
            None => Ok(None),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

/// Posición del `\r\n\r\n` que cierra los headers
fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Decodificación percent-encoding básica (`%XX` y `+`)
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
