//! Request dispatcher: URL resolution, header derivation, status
//! classification.
//!
//! # Design
//! `ApiClient` is request-scoped glue: it resolves the absolute URL
//! (tenant-aware), derives auth headers fresh for every call, hands the
//! request to the injected [`Transport`], and classifies the result by
//! status code. It holds no mutable state; one invocation performs at most a
//! small sequential run of blocking calls, with no retries and no
//! concurrency.

use serde_json::Value;

use crate::auth;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartRequest, Transport};
use crate::response::{self, ResponseBody};

/// Client for the host platform's internal REST API.
pub struct ApiClient<T: Transport> {
    config: Config,
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute URL for a request path: stripped base, optional tenant
    /// segment, exactly one separating slash.
    pub fn request_url(&self, uri: &str) -> String {
        let mut url = self.config.api_base();
        if self.config.use_tenant {
            if let Some(tenant) = self.config.tenant_account() {
                url.push('/');
                url.push_str(&tenant);
            }
        }
        if !uri.starts_with('/') {
            url.push('/');
        }
        url.push_str(uri);
        url
    }

    /// Authenticated call, normalized response.
    pub fn send(&self, method: HttpMethod, uri: &str, body: Option<String>) -> Result<ResponseBody> {
        let res = self.dispatch(method, uri, body, false)?;
        response::normalize(&res)
    }

    /// Authenticated call returning the raw response. Used for downloads,
    /// where the caller needs headers (`Content-Disposition`) and the path
    /// the body was streamed to.
    pub fn send_raw(&self, method: HttpMethod, uri: &str, body: Option<String>) -> Result<HttpResponse> {
        self.dispatch(method, uri, body, true)
    }

    /// Authenticated multipart upload. A string body is parsed as JSON form
    /// fields when possible; pre-formed bodies pass through as a single
    /// string field.
    pub fn send_multipart(
        &self,
        uri: &str,
        file_ref: &str,
        body: Option<&str>,
    ) -> Result<ResponseBody> {
        let url = self.request_url(uri);
        let fields = body.map(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(_) => {
                log::debug!("could not parse multipart body as JSON, passing as is: {raw}");
                Value::String(raw.to_string())
            }
        });
        let headers = self.headers("multipart/form-data")?;
        let request = MultipartRequest {
            url,
            headers,
            file_ref: file_ref.to_string(),
            fields,
            insecure: self.config.insecure,
            proxy: self.config.proxy,
        };
        let res = self.transport.execute_multipart(&request)?;
        let res = classify(res)?;
        response::normalize(&res)
    }

    /// Unauthenticated GET of an external resource, streamed to a temporary
    /// file. Used to fetch pack archives from the marketplace.
    pub fn fetch_to_file(&self, url: &str) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(HttpMethod::Get, url.to_string());
        request.save_to_file = true;
        request.insecure = self.config.insecure;
        request.proxy = self.config.proxy;
        let res = self.transport.execute(&request)?;
        classify(res)
    }

    fn dispatch(
        &self,
        method: HttpMethod,
        uri: &str,
        body: Option<String>,
        save_to_file: bool,
    ) -> Result<HttpResponse> {
        let url = self.request_url(uri);
        log::debug!("{} {url}", method.as_str());
        let headers = self.headers("application/json")?;
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
            save_to_file,
            insecure: self.config.insecure,
            proxy: self.config.proxy,
        };
        let res = self.transport.execute(&request)?;
        classify(res)
    }

    /// Fresh header set for one request. Never cached: Advanced-mode
    /// signatures are single-use.
    fn headers(&self, content_type: &str) -> Result<Vec<(String, String)>> {
        let key = self.config.resolve_key()?;
        let auth_id = self.config.resolve_auth_id();
        auth::build_headers(self.config.auth_method, key, auth_id, content_type)
    }
}

/// Statuses outside [200, 300) are request failures carrying the status and
/// the full body for debugging. 204 with an empty body is a success.
fn classify(response: HttpResponse) -> Result<HttpResponse> {
    if response.status < 200 || response.status >= 300 {
        return Err(ApiError::Request {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    Ok(response)
}
