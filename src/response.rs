//! Handler responses and the envelope returned to the invoking gateway.
//!
//! Handlers build a [`Response`]; the dispatcher turns it into an
//! [`Envelope`] (`statusCode` / `headers` / `body`) at the end of the request.
//!
//! | Body | `content-type` | encoding |
//! |---|---|---|
//! | [`Body::Empty`] | none | no `body` field, status defaults to 204 |
//! | [`Body::Text`] | `text/plain` | as-is |
//! | [`Body::Json`] | `application/json` | serialized JSON |
//! | [`Body::Binary`] | `application/octet-stream` | base64, `isBase64Encoded: true` |
//!
//! Headers set on the response override the defaults above.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smallvec::SmallVec;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage. Names compare case-insensitively.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Permissive CORS headers added to every envelope unless disabled.
pub const CORS_HEADERS: [(&str, &str); 2] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Credentials", "true"),
];

/// Response body produced by a handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Plain text, sent unchanged.
    Text(String),
    /// JSON document, serialized on the way out.
    Json(Value),
    /// Raw bytes, base64-encoded on the way out.
    Binary(Vec<u8>),
}

impl Body {
    /// Whether the body is [`Body::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Body::Empty,
            other => Body::Json(other),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Binary(bytes)
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::Empty
    }
}

/// Response built by a route handler.
///
/// The status is optional: when unset it becomes 200, or 204 for an empty
/// body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    status: Option<u16>,
    headers: HeaderVec,
    body: Body,
}

impl Response {
    /// Response with a body and the default status.
    #[must_use]
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            status: None,
            headers: HeaderVec::new(),
            body: body.into(),
        }
    }

    /// Response with an explicit status.
    #[must_use]
    pub fn with_status(status: u16, body: impl Into<Body>) -> Self {
        Self {
            status: Some(status),
            headers: HeaderVec::new(),
            body: body.into(),
        }
    }

    /// JSON response.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            headers: HeaderVec::new(),
            body: Body::Json(body),
        }
    }

    /// 204 with no body.
    #[must_use]
    pub fn no_content() -> Self {
        Self::default()
    }

    /// JSON error body of the form `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    /// Opaque 500 returned for unexpected handler failures.
    #[must_use]
    pub fn unexpected_error(error_id: &str) -> Self {
        Self::json(
            500,
            json!({ "title": "Unexpected error", "errorId": error_id }),
        )
    }

    /// 500 returned when no route matches the request.
    #[must_use]
    pub fn no_route(method: &str, path: &str) -> Self {
        Self::json(
            500,
            json!({
                "title": "No handler defined for method and resource.",
                "details": { "method": method, "path": path }
            }),
        )
    }

    /// Effective status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.status {
            Some(status) => status,
            None if self.body.is_empty() => 204,
            None => 200,
        }
    }

    /// Override the status code.
    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Headers set by the handler or middleware.
    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    /// Builder form of [`Response::set_header`].
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Convert into the gateway envelope.
    #[must_use]
    pub fn into_envelope(self, cors: bool) -> Envelope {
        let status_code = self.status_code();
        let mut headers: Vec<(String, String)> = Vec::with_capacity(self.headers.len() + 3);

        if cors {
            for (name, value) in CORS_HEADERS {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let (body, is_base64_encoded, content_type) = match self.body {
            Body::Empty => (None, false, None),
            Body::Text(text) => (Some(text), false, Some("text/plain")),
            Body::Json(value) => (Some(value.to_string()), false, Some("application/json")),
            Body::Binary(bytes) => (
                Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                true,
                Some("application/octet-stream"),
            ),
        };
        if let Some(content_type) = content_type {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        for (name, value) in self.headers {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
            headers.push((name.to_string(), value));
        }

        let multi_value_headers = headers
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();

        Envelope {
            status_code,
            headers: headers.into_iter().collect(),
            multi_value_headers,
            body,
            is_base64_encoded,
        }
    }
}

/// Response shape expected by API Gateway / function URL integrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// HTTP status code
    pub status_code: u16,
    /// Single-value headers
    pub headers: BTreeMap<String, String>,
    /// Same headers in multi-value form
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    /// Serialized body, absent for empty responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whether `body` holds base64-encoded bytes
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl Envelope {
    /// Header lookup, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON.
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status() {
        assert_eq!(Response::new("hi").status_code(), 200);
        assert_eq!(Response::new(()).status_code(), 204);
        assert_eq!(Response::new(Value::Null).status_code(), 204);
        assert_eq!(Response::with_status(201, ()).status_code(), 201);
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut res = Response::new("x");
        res.set_header("X-Trace", "a");
        res.set_header("x-trace", "b");
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.get_header("X-TRACE"), Some("b"));
    }

    #[test]
    fn test_user_header_overrides_default() {
        let env = Response::new(json!({"a": 1}))
            .with_header("content-type", "application/hal+json")
            .into_envelope(true);
        assert_eq!(env.header("Content-Type"), Some("application/hal+json"));
        assert_eq!(
            env.headers.keys().filter(|k| k.eq_ignore_ascii_case("content-type")).count(),
            1
        );
    }
}
