use faas_router::response::{Body, Envelope, Response};
use faas_router::HandlerError;
use serde_json::{json, Value};

#[test]
fn test_json_envelope() {
    let env = Response::new(json!({ "id": 1 })).into_envelope(true);
    assert_eq!(env.status_code, 200);
    assert_eq!(env.body.as_deref(), Some(r#"{"id":1}"#));
    assert!(!env.is_base64_encoded);
    assert_eq!(env.header("Content-Type"), Some("application/json"));
    assert_eq!(env.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(env.header("Access-Control-Allow-Credentials"), Some("true"));
    assert_eq!(
        env.multi_value_headers.get("Content-Type"),
        Some(&vec!["application/json".to_string()])
    );
}

#[test]
fn test_json_string_body_is_quoted() {
    let env = Response::new(json!("TOP")).into_envelope(false);
    assert_eq!(env.body.as_deref(), Some(r#""TOP""#));

    let env = Response::new("TOP").into_envelope(false);
    assert_eq!(env.body.as_deref(), Some("TOP"));
    assert_eq!(env.header("content-type"), Some("text/plain"));
}

#[test]
fn test_binary_envelope() {
    let env = Response::new(vec![0u8, 1, 2, 255]).into_envelope(false);
    assert!(env.is_base64_encoded);
    assert_eq!(env.body.as_deref(), Some("AAEC/w=="));
    assert_eq!(env.header("content-type"), Some("application/octet-stream"));
    assert_eq!(env.headers.len(), 1);
}

#[test]
fn test_empty_envelope() {
    let env = Response::no_content().into_envelope(false);
    assert_eq!(env.status_code, 204);
    assert_eq!(env.body, None);
    assert!(env.headers.is_empty());

    let env = Response::with_status(202, Body::Empty).into_envelope(false);
    assert_eq!(env.status_code, 202);
}

#[test]
fn test_headers_override_defaults() {
    let env = Response::json(201, json!({}))
        .with_header("access-control-allow-origin", "https://example.com")
        .with_header("Location", "/pets/1")
        .into_envelope(true);
    assert_eq!(env.status_code, 201);
    assert_eq!(env.header("Access-Control-Allow-Origin"), Some("https://example.com"));
    assert_eq!(env.header("location"), Some("/pets/1"));
    let origins = env
        .headers
        .keys()
        .filter(|k| k.eq_ignore_ascii_case("access-control-allow-origin"))
        .count();
    assert_eq!(origins, 1);
}

#[test]
fn test_envelope_serialization() {
    let env = Response::json(404, json!({ "message": "nope" })).into_envelope(false);
    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value["statusCode"], 404);
    assert_eq!(value["isBase64Encoded"], false);
    assert_eq!(value["headers"]["Content-Type"], "application/json");
    assert_eq!(value["multiValueHeaders"]["Content-Type"], json!(["application/json"]));
    assert_eq!(value["body"], r#"{"message":"nope"}"#);

    let empty = serde_json::to_value(Response::no_content().into_envelope(false)).unwrap();
    assert!(empty.get("body").is_none());

    let back: Envelope = serde_json::from_value(value).unwrap();
    assert_eq!(back, env);
}

#[test]
fn test_canned_error_bodies() {
    let env = Response::unexpected_error("abc").into_envelope(false);
    assert_eq!(env.status_code, 500);
    assert_eq!(
        env.json_body().unwrap(),
        json!({ "title": "Unexpected error", "errorId": "abc" })
    );

    let env = Response::no_route("GET", "/x").into_envelope(false);
    assert_eq!(env.json_body().unwrap()["details"], json!({ "method": "GET", "path": "/x" }));

    let env = Response::error(400, "bad input").into_envelope(false);
    assert_eq!(env.json_body().unwrap(), json!({ "error": "bad input" }));
}

#[test]
fn test_null_json_is_empty() {
    let res = Response::new(Value::Null);
    assert_eq!(res.body(), &Body::Empty);
    assert_eq!(res.status_code(), 204);
}

#[test]
fn test_handler_error_display() {
    let err: HandlerError = Response::with_status(418, "teapot").into();
    assert_eq!(err.to_string(), "handler returned error response (418)");

    let err = HandlerError::msg("boom");
    assert_eq!(err.to_string(), "boom");
    assert!(format!("{err:?}").starts_with("Unexpected"));
}
