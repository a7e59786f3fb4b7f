//! # Error types
//! Startup/config failures use `GardenerError` (via `thiserror`), surfaced
//! through `anyhow` at the process boundary. Request-handling failures use
//! `ApiError`, which maps directly onto the two HTTP error paths the core
//! recognizes: malformed body and unknown route.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GardenerError {
    #[error("invalid listen address {host}:{port}: {source}")]
    InvalidListenAddr {
        host: String,
        port: u16,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Errors surfaced to HTTP clients. Intentionally narrow: the core has
/// no other error paths.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("Not Found")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
