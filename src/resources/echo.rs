//! # Comandos de Texto
//! src/resources/echo.rs
//!
//! - POST /echo: devuelve el body recibido
//! - GET /reverse?text=TEXT: invierte el texto
//! - GET /toupper?text=TEXT: convierte a mayúsculas

use serde_json::json;

use crate::error::HandlerError;
use crate::http::{Request, Response, StatusCode};
use crate::router::{HandlerResult, Resource, Route};

#[derive(Debug, Default)]
pub struct EchoResource;

impl EchoResource {
    fn echo(&self, req: &Request) -> HandlerResult {
        let content_type = req
            .header("Content-Type")
            .unwrap_or("application/octet-stream");
        Ok(Response::new(StatusCode::Ok)
            .with_header("Content-Type", content_type)
            .with_body_bytes(req.body().to_vec()))
    }

    /// Handler para /reverse?text=TEXT
    ///
    /// # Ejemplo de response
    /// ```json
    /// {"original": "hola", "reversed": "aloh"}
    /// ```
    fn reverse(&self, req: &Request) -> HandlerResult {
        let Some(text) = req.query_param("text") else {
            return Ok(missing("text"));
        };

        // Invertir por caracteres, no por bytes
        let reversed: String = text.chars().rev().collect();
        let body = json!({ "original": text, "reversed": reversed });
        Ok(Response::json(&body.to_string()))
    }

    fn toupper(&self, req: &Request) -> HandlerResult {
        let Some(text) = req.query_param("text") else {
            return Ok(missing("text"));
        };

        if text.len() > 4096 {
            return Err(HandlerError::failed("text parameter exceeds 4096 bytes"));
        }

        let body = json!({ "original": text, "upper": text.to_uppercase() });
        Ok(Response::json(&body.to_string()))
    }
}

fn missing(param: &str) -> Response {
    Response::error(
        StatusCode::BadRequest,
        &format!("Missing required parameter: {}", param),
    )
}

impl Resource for EchoResource {
    fn routes(&self) -> Vec<Route<Self>> {
        vec![
            Route::post("/echo", EchoResource::echo),
            Route::get("/reverse", EchoResource::reverse),
            Route::get("/toupper", EchoResource::toupper),
        ]
    }
}
