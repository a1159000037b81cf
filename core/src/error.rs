//! Error types for the SOAR REST API client.
//!
//! # Design
//! The host integration signaled failures by throwing interpolated strings.
//! Here the failure modes form a closed set: callers can match on the kind
//! (configuration vs. transport vs. server status vs. argument) instead of
//! parsing message text. `Request` carries the raw status code and body so
//! operators can debug server rejections; `ResponseParse` is kept distinct
//! from `Request` — a 2xx with an undecodable body is not a server failure.

use thiserror::Error;

/// Errors returned by the client and command handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid or incomplete invocation configuration (missing API key,
    /// Advanced auth without an auth id).
    #[error("configuration error: {0}")]
    Config(String),

    /// The server answered with a status outside [200, 300).
    #[error("request failed: status code {status}, body: {body}")]
    Request { status: u16, body: String },

    /// The response body could not be decoded at all (invalid encoding).
    /// Non-JSON text is *not* an error — it normalizes to plain text.
    #[error("error parsing response, body: {body}")]
    ResponseParse { body: String },

    /// A command was invoked with missing or malformed arguments.
    #[error("argument error: {0}")]
    Argument(String),

    /// Delete or check on a file/indicator that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The injected HTTP transport failed before a status was produced.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
