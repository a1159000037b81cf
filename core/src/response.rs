//! Response normalization.
//!
//! # Design
//! Many platform endpoints answer with JSON, but plenty return plain text or
//! an empty body on success. Normalization is best-effort: a body that
//! decodes as JSON becomes [`ResponseBody::Json`], anything else passes
//! through as [`ResponseBody::Text`] unchanged. The two cases are a tagged
//! sum so downstream code cannot accidentally index into text. Only a body
//! that is not valid UTF-8 at all is an error, and that error is distinct
//! from a non-2xx request failure.

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;

/// A normalized response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }

    /// Collapse into a JSON value; text becomes a JSON string. Used when the
    /// body is embedded into structured command outputs.
    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}

/// Best-effort decode of a response body.
pub fn normalize(response: &HttpResponse) -> Result<ResponseBody> {
    let text = std::str::from_utf8(&response.body).map_err(|_| ApiError::ResponseParse {
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })?;
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(ResponseBody::Json(value)),
        Err(_) => Ok(ResponseBody::Text(text.to_string())),
    }
}
