//! Inbound invocation events.
//!
//! A function behind an API gateway receives several event shapes on the same
//! entry point. [`EventKind::classify`] tells them apart; [`HttpEvent`]
//! normalizes the two HTTP payload versions into one struct:
//!
//! | Field | REST API (v1) | HTTP API (v2) |
//! |---|---|---|
//! | method | `httpMethod` | `requestContext.http.method` |
//! | path | `path` | `rawPath` (stage prefix stripped) |
//! | query | `queryStringParameters` | `queryStringParameters`, else `rawQueryString` |
//! | cookies | `cookie` header | `cookies` array |

use std::collections::HashMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Execution context handed to the function alongside the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvocationContext {
    /// Invocation id; also used as the error correlation id
    pub aws_request_id: Option<String>,
    pub function_name: Option<String>,
    pub function_version: Option<String>,
    pub invoked_function_arn: Option<String>,
    /// Epoch milliseconds at which the invocation times out
    pub deadline_ms: Option<u64>,
}

impl InvocationContext {
    /// Context carrying only a request id.
    #[must_use]
    pub fn with_request_id(id: impl Into<String>) -> Self {
        Self {
            aws_request_id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Shape of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `source == "aws.events"`
    Scheduled,
    /// Carries `Records` or `messages`
    Batch,
    /// `type == "REQUEST"` with `methodArn` or `routeArn`
    Authorizer,
    /// Carries `path` or `rawPath`
    Http,
    /// None of the above
    Unrecognized,
}

impl EventKind {
    /// Classify an event. Checked in declaration order: authorizer events
    /// also carry a path, so they are recognized before HTTP.
    #[must_use]
    pub fn classify(event: &Value) -> Self {
        if event.get("source").and_then(Value::as_str) == Some("aws.events") {
            return EventKind::Scheduled;
        }
        if is_present(event.get("Records")) || is_present(event.get("messages")) {
            return EventKind::Batch;
        }
        if event.get("type").and_then(Value::as_str) == Some("REQUEST")
            && (str_field(event, "methodArn").is_some() || str_field(event, "routeArn").is_some())
        {
            return EventKind::Authorizer;
        }
        if str_field(event, "path").is_some() || str_field(event, "rawPath").is_some() {
            return EventKind::Http;
        }
        EventKind::Unrecognized
    }

    /// Lower-case name used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Scheduled => "scheduled",
            EventKind::Batch => "batch",
            EventKind::Authorizer => "authorizer",
            EventKind::Http => "http",
            EventKind::Unrecognized => "unrecognized",
        }
    }
}

fn is_present(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Gateway payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVersion {
    /// REST API / `path` based
    V1,
    /// HTTP API / `rawPath` based
    V2,
}

/// HTTP request normalized from either payload version.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpEvent {
    pub version: PayloadVersion,
    /// Upper-cased method as sent; empty when the event carries none
    pub method: String,
    /// Path used for routing
    pub path: String,
    /// Path exactly as received
    pub raw_path: String,
    pub stage: Option<String>,
    pub query: HashMap<String, String>,
    pub multi_value_query: HashMap<String, Vec<String>>,
    /// Header names lower-cased
    pub headers: HashMap<String, String>,
    pub cookies: Vec<String>,
    pub stage_variables: HashMap<String, String>,
    pub request_context: Value,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

impl HttpEvent {
    /// Normalize an HTTP or authorizer event.
    ///
    /// When `strip_stage` is set and the event is v2, a leading `/{stage}`
    /// segment is removed from the routing path unless the stage is
    /// `$default`.
    #[must_use]
    pub fn from_event(event: &Value, strip_stage: bool) -> Self {
        let request_context = event.get("requestContext").cloned().unwrap_or(Value::Null);
        let stage = str_field(&request_context, "stage").map(str::to_string);

        let (version, raw_path) = match str_field(event, "rawPath") {
            Some(raw) => (PayloadVersion::V2, raw.to_string()),
            None => (
                PayloadVersion::V1,
                str_field(event, "path").unwrap_or("/").to_string(),
            ),
        };

        let method = str_field(event, "httpMethod")
            .or_else(|| {
                request_context
                    .get("http")
                    .and_then(|h| str_field(h, "method"))
            })
            .unwrap_or_default()
            .to_ascii_uppercase();

        let path = match (&stage, version) {
            (Some(stage), PayloadVersion::V2) if strip_stage => {
                strip_stage_prefix(&raw_path, stage).to_string()
            }
            _ => raw_path.clone(),
        };

        let mut headers: HashMap<String, String> = string_map(event.get("headers"))
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        let cookies: Vec<String> = match event.get("cookies").and_then(Value::as_array) {
            Some(list) => list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => headers
                .get("cookie")
                .map(|c| c.split(';').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
                .unwrap_or_default(),
        };
        if !cookies.is_empty() {
            headers
                .entry("cookie".to_string())
                .or_insert_with(|| cookies.join("; "));
        }

        let mut query = string_map(event.get("queryStringParameters"));
        if query.is_empty() {
            if let Some(raw) = str_field(event, "rawQueryString") {
                query = parse_query_string(raw);
            }
        }
        let multi_value_query = event
            .get("multiValueQueryStringParameters")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| {
                        let values = v
                            .as_array()
                            .map(|a| a.iter().map(value_to_string).collect())
                            .unwrap_or_else(|| vec![value_to_string(v)]);
                        (k.clone(), values)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            version,
            method,
            path,
            raw_path,
            stage,
            query,
            multi_value_query,
            headers,
            cookies,
            stage_variables: string_map(event.get("stageVariables")),
            request_context,
            body: str_field(event, "body").map(str::to_string),
            is_base64_encoded: event
                .get("isBase64Encoded")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    /// Header value by name, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Remove a leading `/{stage}` segment. `$default` is never stripped.
#[must_use]
pub fn strip_stage_prefix<'a>(path: &'a str, stage: &str) -> &'a str {
    if stage.is_empty() || stage == "$default" {
        return path;
    }
    let Some(rest) = path.strip_prefix('/').and_then(|p| p.strip_prefix(stage)) else {
        return path;
    };
    if rest.is_empty() {
        "/"
    } else if rest.starts_with('/') {
        rest
    } else {
        path
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_map(value: Option<&Value>) -> HashMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj: &Map<String, Value>| {
            obj.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse `a=1&b=two%20words`. Repeated keys keep the last value.
#[must_use]
pub fn parse_query_string(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Decoded request body handed to route handlers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body, or an empty string
    #[default]
    Empty,
    /// Body parsed as JSON
    Json(Value),
    /// Text that is not JSON, or any text when the route asks for raw bodies
    Text(String),
    /// Base64 payload that did not decode to UTF-8
    Binary(Vec<u8>),
}

impl RequestBody {
    /// Decode a gateway body.
    ///
    /// Base64 bodies are decoded first. Unless `raw` is set, text is then
    /// parsed as JSON, falling back to the text itself.
    #[must_use]
    pub fn decode(body: Option<&str>, is_base64_encoded: bool, raw: bool) -> Self {
        let Some(body) = body.filter(|b| !b.is_empty()) else {
            return RequestBody::Empty;
        };

        let text = if is_base64_encoded {
            match base64::engine::general_purpose::STANDARD.decode(body) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(err) => return RequestBody::Binary(err.into_bytes()),
                },
                Err(err) => {
                    tracing::warn!(error = %err, "Body flagged as base64 did not decode; using it as text");
                    body.to_string()
                }
            }
        } else {
            body.to_string()
        };

        if raw {
            return RequestBody::Text(text);
        }
        match serde_json::from_str(&text) {
            Ok(value) => RequestBody::Json(value),
            Err(_) => RequestBody::Text(text),
        }
    }

    /// Parsed JSON, if the body was JSON.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Text content, if the body was text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Deserialize a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the body is not JSON or does not match `T`.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> anyhow::Result<T> {
        match self {
            RequestBody::Json(v) => Ok(T::deserialize(v)?),
            RequestBody::Empty => Ok(T::deserialize(Value::Null)?),
            _ => anyhow::bail!("request body is not JSON"),
        }
    }
}
