#![allow(dead_code)]

use serde_json::{json, Value};

/// REST API (payload v1) event.
pub fn v1_event(method: &str, path: &str) -> Value {
    json!({
        "httpMethod": method,
        "path": path,
        "resource": "/{proxy+}",
        "headers": { "Content-Type": "application/json" },
        "queryStringParameters": null,
        "stageVariables": null,
        "requestContext": { "stage": "prod", "requestId": "req-1" },
        "body": null,
        "isBase64Encoded": false
    })
}

/// HTTP API (payload v2) event.
pub fn v2_event(method: &str, raw_path: &str, stage: &str) -> Value {
    json!({
        "version": "2.0",
        "rawPath": raw_path,
        "rawQueryString": "",
        "headers": { "content-type": "application/json" },
        "requestContext": {
            "stage": stage,
            "http": { "method": method, "path": raw_path }
        },
        "isBase64Encoded": false
    })
}

pub fn with_body(mut event: Value, body: &str, base64: bool) -> Value {
    event["body"] = Value::String(body.to_string());
    event["isBase64Encoded"] = Value::Bool(base64);
    event
}
