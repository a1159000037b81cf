//! Portable client core for a SOAR platform's internal REST API.
//!
//! # Overview
//! Proxies authenticated calls to the host platform's own API: generic
//! get/post/put/delete, multipart uploads, file downloads, incident batch
//! deletion, content-pack installation, and file upload/delete/check
//! helpers. Requests are signed with one of two schemes — a static API key
//! or a per-request nonce/timestamp SHA-256 signature — selected by
//! configuration.
//!
//! # Design
//! - No ambient platform globals: HTTP ([`Transport`]) and the remaining
//!   host capabilities ([`Host`]) are injected traits, so the core runs and
//!   tests without a live platform.
//! - Failures are a closed set ([`ApiError`]), not thrown strings.
//! - Responses normalize into a tagged [`ResponseBody`] (`Json` vs `Text`)
//!   so callers cannot mistake plain text for an object.
//! - Single-threaded and synchronous: one command, at most a short
//!   sequential run of blocking calls, no retries, no shared state across
//!   invocations.

pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod response;

#[cfg(test)]
mod testutil;

pub use auth::AuthMethod;
pub use client::ApiClient;
pub use commands::{run, CommandOutput, FileHandle, Host};
pub use config::{Config, Credential};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartRequest, Transport};
pub use response::ResponseBody;
