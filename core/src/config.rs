//! Invocation configuration.
//!
//! # Design
//! Configuration is read once per invocation from externally supplied
//! parameters and never mutated afterwards. Credentials can arrive two ways:
//! as explicit `api_key` / `auth_id` parameters, or inside a credential
//! object whose `password` is the key and whose `identifier` is the auth id.
//! Explicit parameters win. Key resolution failure is a configuration error
//! raised before any request is built.

use crate::auth::AuthMethod;
use crate::error::{ApiError, Result};

/// Marketplace used to resolve pack archives when none is configured.
pub const DEFAULT_MARKETPLACE_URL: &str = "https://marketplace.xsoar.paloaltonetworks.com/";

/// A credential object as supplied by the host's credential store.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Auth id bound to the key.
    pub identifier: String,
    /// The API key itself.
    pub password: String,
}

/// Immutable per-invocation configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the host platform API.
    pub base_url: String,
    /// URL of the serving instance, used only for tenant extraction.
    pub server_url: Option<String>,
    /// Marketplace base for pack archive downloads.
    pub marketplace_url: String,
    pub auth_method: AuthMethod,
    /// Explicit API key parameter; wins over `credential.password`.
    pub api_key: Option<String>,
    /// Explicit auth id parameter; wins over `credential.identifier`.
    pub auth_id: Option<String>,
    pub credential: Option<Credential>,
    /// Prefix request paths with the tenant account segment.
    pub use_tenant: bool,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Route requests through the system proxy.
    pub proxy: bool,
    /// Host platform version, e.g. "6.10.0". Gates request parameters that
    /// newer platform versions introduced.
    pub platform_version: String,
}

impl Config {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            server_url: None,
            marketplace_url: DEFAULT_MARKETPLACE_URL.to_string(),
            auth_method: AuthMethod::default(),
            api_key: None,
            auth_id: None,
            credential: None,
            use_tenant: false,
            insecure: false,
            proxy: false,
            platform_version: String::new(),
        }
    }

    /// The API key, with explicit parameter taking precedence over the
    /// credential object.
    pub fn resolve_key(&self) -> Result<&str> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| self.credential.as_ref().map(|c| c.password.as_str()))
            .filter(|k| !k.is_empty());
        key.ok_or_else(|| ApiError::Config("API key must be provided".to_string()))
    }

    /// The auth id, same precedence as the key. Empty when unset — only
    /// Advanced mode rejects that.
    pub fn resolve_auth_id(&self) -> &str {
        self.auth_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.credential.as_ref().map(|c| c.identifier.as_str()))
            .unwrap_or("")
    }

    /// Base URL with the trailing slash stripped once and, when an auth id
    /// is configured, the `/xsoar` API prefix appended once.
    pub fn api_base(&self) -> String {
        let mut base = self.base_url.strip_suffix('/').unwrap_or(&self.base_url);
        let owned;
        if !self.resolve_auth_id().is_empty() && !base.ends_with("/xsoar") {
            owned = format!("{base}/xsoar");
            base = &owned;
        }
        base.to_string()
    }

    /// Tenant account segment extracted from the server URL, if any.
    pub fn tenant_account(&self) -> Option<String> {
        self.server_url
            .as_deref()
            .and_then(tenant_account_name)
    }

    /// Whether the platform is at or above the given `major.minor.patch`
    /// version. An unset platform version compares below everything.
    pub fn version_ge(&self, version: &str) -> bool {
        version_ge(&self.platform_version, version)
    }
}

/// Extract the `acc_<name>` tenant segment from a server URL.
///
/// `https://account-testing-ysdkvou:443/acc_Test` yields `acc_Test`; a URL
/// without an `acc_` token yields nothing.
pub fn tenant_account_name(server_url: &str) -> Option<String> {
    let idx = server_url.find("/acc_")?;
    // Everything after the *last* occurrence of the marker.
    let name = server_url[idx..].rsplit("acc_").next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(format!("acc_{name}"))
    }
}

/// Compare dot-separated numeric versions, missing segments counting as 0.
/// Non-numeric segments compare as 0, which is good enough for the
/// `major.minor.patch` strings the platform reports.
pub fn version_ge(actual: &str, required: &str) -> bool {
    let parse = |s: &str| -> Vec<u64> {
        s.split('.')
            .map(|seg| seg.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let a = parse(actual);
    let r = parse(required);
    let len = a.len().max(r.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = r.get(i).copied().unwrap_or(0);
        if x != y {
            return x > y;
        }
    }
    true
}
