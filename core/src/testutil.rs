//! Shared unit-test doubles: a canned-response transport and an in-memory
//! host capability.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use crate::commands::Host;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, MultipartRequest, Transport};

/// Replays canned responses in order and records every request it sees.
pub(crate) struct StubTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    pub requests: RefCell<Vec<HttpRequest>>,
    pub multiparts: RefCell<Vec<MultipartRequest>>,
}

impl StubTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
            multiparts: RefCell::new(Vec::new()),
        }
    }

    fn next(&self) -> Result<HttpResponse> {
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ApiError::Transport("no canned response left".to_string()))
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.next()
    }

    fn execute_multipart(&self, request: &MultipartRequest) -> Result<HttpResponse> {
        self.multiparts.borrow_mut().push(request.clone());
        self.next()
    }
}

pub(crate) fn ok_json(body: &str) -> HttpResponse {
    with_status(200, body)
}

pub(crate) fn with_status(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
        saved_path: None,
    }
}

/// A 200 whose body was streamed to `path`, as a save-to-file transport
/// would report it.
pub(crate) fn ok_saved(path: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: Vec::new(),
        body: Vec::new(),
        saved_path: Some(PathBuf::from(path)),
    }
}

/// Host double: a fixed entry-id → file-name table plus a save-file counter.
pub(crate) struct TestHost {
    pub files: HashMap<String, String>,
    pub saved: RefCell<Vec<Vec<u8>>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            saved: RefCell::new(Vec::new()),
        }
    }

    pub fn with_file(entry_id: &str, name: &str) -> Self {
        let mut host = Self::new();
        host.files.insert(entry_id.to_string(), name.to_string());
        host
    }
}

impl Host for TestHost {
    fn save_file(&self, content: &[u8]) -> Result<String> {
        let mut saved = self.saved.borrow_mut();
        saved.push(content.to_vec());
        Ok(format!("file-{}", saved.len()))
    }

    fn file_name(&self, entry_id: &str) -> Option<String> {
        self.files.get(entry_id).cloned()
    }
}
