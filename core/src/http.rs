//! HTTP transport boundary for the host-does-IO pattern.
//!
//! # Design
//! The core builds [`HttpRequest`] values and interprets [`HttpResponse`]
//! values; the actual network round-trip is performed by an injected
//! [`Transport`] implementation. This keeps the core deterministic and
//! testable without a live platform, and matches how the original
//! integration consumed its host's `http`/`httpMultipart` globals.
//!
//! All fields use owned types so values can be queued, logged, or moved
//! across threads without lifetime concerns. Response bodies are raw bytes:
//! downloads may be binary, and normalization (UTF-8 + JSON decode) is a
//! separate, fallible step.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::Result;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A plain HTTP request described as data.
///
/// `save_to_file` asks the transport to stream the response body to a
/// temporary file instead of buffering it, reporting the path in
/// [`HttpResponse::saved_path`]. The transport owns the temp-file lifecycle.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub save_to_file: bool,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Route through the system proxy.
    pub proxy: bool,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: String) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            save_to_file: false,
            insecure: false,
            proxy: false,
        }
    }
}

/// A multipart/form-data upload described as data.
///
/// `file_ref` is an opaque content handle — a platform entry id or a local
/// file path, whichever the caller obtained — that the transport resolves to
/// the file part of the form. `fields` carries the remaining form fields,
/// already JSON-decoded where possible.
#[derive(Debug, Clone)]
pub struct MultipartRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub file_ref: String,
    pub fields: Option<Value>,
    pub insecure: bool,
    pub proxy: bool,
}

/// An HTTP response described as data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Path the body was streamed to when the request set `save_to_file`.
    pub saved_path: Option<PathBuf>,
}

impl HttpResponse {
    /// First value of the named header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Injected HTTP capability.
///
/// Implementations perform the round-trip and return the response as data,
/// including 4xx/5xx statuses — status interpretation belongs to the core.
/// Only failures that prevent a status from being produced (connection
/// refused, TLS failure) are reported as errors.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;

    fn execute_multipart(&self, request: &MultipartRequest) -> Result<HttpResponse>;
}
