use http::Method;

use super::{PathTrie, RouteMethod};
use crate::error::RouterError;

fn get() -> RouteMethod {
    RouteMethod::Verb(Method::GET)
}

fn trie(routes: &[(RouteMethod, &str, &'static str)]) -> PathTrie<&'static str> {
    let mut trie = PathTrie::new();
    for (method, template, value) in routes {
        trie.store(method.clone(), template, *value).unwrap();
    }
    trie
}

#[test]
fn test_root_path() {
    let trie = trie(&[(get(), "/", "root")]);
    assert_eq!(trie.resolve(&Method::GET, "/").unwrap().value, Some(&"root"));
    assert_eq!(trie.resolve(&Method::GET, "").unwrap().value, Some(&"root"));
    assert!(trie.resolve(&Method::GET, "/other").is_none());
}

#[test]
fn test_trailing_slash_is_ignored() {
    let trie = trie(&[(get(), "/items", "items")]);
    assert_eq!(trie.resolve(&Method::GET, "/items/").unwrap().value, Some(&"items"));
}

#[test]
fn test_literal_beats_variable() {
    let trie = trie(&[
        (get(), "/users/{id}", "by_id"),
        (get(), "/users/me", "me"),
    ]);
    let me = trie.resolve(&Method::GET, "/users/me").unwrap();
    assert_eq!(me.value, Some(&"me"));
    assert!(me.tokens.is_empty());

    let other = trie.resolve(&Method::GET, "/users/42").unwrap();
    assert_eq!(other.value, Some(&"by_id"));
    assert_eq!(other.token("id"), Some("42"));
}

#[test]
fn test_no_backtracking_after_literal() {
    let trie = trie(&[
        (get(), "/route/explicit/x", "explicit"),
        (get(), "/route/{var}/y", "var"),
    ]);
    assert!(trie.resolve(&Method::GET, "/route/explicit/y").is_none());
    assert_eq!(trie.resolve(&Method::GET, "/route/other/y").unwrap().value, Some(&"var"));
}

#[test]
fn test_duplicate_route_rejected() {
    let mut trie = PathTrie::new();
    trie.store(get(), "/a/{id}", 1).unwrap();
    let err = trie.store(get(), "/a/{id}", 2).unwrap_err();
    assert_eq!(
        err,
        RouterError::DuplicateRoute {
            method: "GET".into(),
            template: "/a/{id}".into()
        }
    );
    assert_eq!(err.to_string(), "Path already exists: GET /a/{id}");

    // Another method at the same node is fine
    trie.store(RouteMethod::Verb(Method::POST), "/a/{id}", 3).unwrap();
    assert_eq!(trie.len(), 2);
    assert_eq!(trie.resolve(&Method::GET, "/a/x").unwrap().value, Some(&1));
    assert_eq!(trie.resolve(&Method::POST, "/a/x").unwrap().value, Some(&3));
}

#[test]
fn test_duplicate_detection_ignores_variable_names() {
    let mut trie = PathTrie::new();
    trie.store(get(), "/a/{id}", 1).unwrap();
    assert!(matches!(
        trie.store(get(), "/a/{other}", 2),
        Err(RouterError::DuplicateRoute { .. })
    ));
}

#[test]
fn test_later_template_renames_tokens() {
    let mut trie = PathTrie::new();
    trie.store(get(), "/a/{id}", 1).unwrap();
    trie.store(RouteMethod::Verb(Method::PUT), "/a/{key}", 2).unwrap();
    let found = trie.resolve(&Method::GET, "/a/x").unwrap();
    assert_eq!(found.token("key"), Some("x"));
    assert_eq!(found.token("id"), None);
}

#[test]
fn test_two_variables_bind_in_order() {
    let trie = trie(&[(get(), "/v1/{tenant}/items/{itemId}", "item")]);
    let found = trie.resolve(&Method::GET, "/v1/acme/items/7").unwrap();
    let names: Vec<&str> = found.tokens.iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(names, vec!["tenant", "itemId"]);
    assert_eq!(found.token("tenant"), Some("acme"));
    assert_eq!(found.token("itemId"), Some("7"));
}

#[test]
fn test_empty_segment_binds_none() {
    let trie = trie(&[(get(), "/resource/{id}/sub", "sub")]);
    let found = trie.resolve(&Method::GET, "/resource//sub").unwrap();
    assert_eq!(found.value, Some(&"sub"));
    assert_eq!(found.tokens.len(), 1);
    assert_eq!(found.tokens[0].1, None);
    assert_eq!(found.tokens_map().get("id"), Some(&None));
}

#[test]
fn test_tokens_are_percent_decoded() {
    let trie = trie(&[(get(), "/files/{name}", "file")]);
    let found = trie.resolve(&Method::GET, "/files/a%20b%2Fc").unwrap();
    assert_eq!(found.token("name"), Some("a b/c"));

    let malformed = trie.resolve(&Method::GET, "/files/bad%E0%A4%A").unwrap();
    assert_eq!(malformed.token("name"), Some("bad%E0%A4%A"));

    let bad_escape = trie.resolve(&Method::GET, "/files/a%20%zz").unwrap();
    assert_eq!(bad_escape.token("name"), Some("a%20%zz"));
}

#[test]
fn test_greedy_swallows_remainder() {
    let trie = trie(&[
        (get(), "/accounts/{id}/{proxy+}", "greedy"),
        (get(), "/accounts/{id}/domains", "domains"),
    ]);

    let domains = trie.resolve(&Method::GET, "/accounts/1/domains").unwrap();
    assert_eq!(domains.value, Some(&"domains"));

    let deep = trie.resolve(&Method::GET, "/accounts/1/a/b/c").unwrap();
    assert_eq!(deep.value, Some(&"greedy"));
    assert_eq!(deep.token("id"), Some("1"));
    assert_eq!(deep.token("proxy"), Some("a/b/c"));

    let one = trie.resolve(&Method::GET, "/accounts/1/settings").unwrap();
    assert_eq!(one.token("proxy"), Some("settings"));
}

#[test]
fn test_greedy_stops_at_missing_literal() {
    let trie = trie(&[
        (get(), "/accounts/{id}/{proxy+}", "greedy"),
        (get(), "/accounts/{id}/domains/{domain}", "domain"),
    ]);
    // "domains" is a literal child, so the walk descends and finds the deeper route
    let found = trie.resolve(&Method::GET, "/accounts/1/domains/example.com").unwrap();
    assert_eq!(found.value, Some(&"domain"));
    assert_eq!(found.token("domain"), Some("example.com"));
}

#[test]
fn test_top_level_proxy() {
    let trie = trie(&[(RouteMethod::Any, "/{proxy+}", "proxy")]);
    let found = trie.resolve(&Method::DELETE, "/anything/at/all").unwrap();
    assert_eq!(found.value, Some(&"proxy"));
    assert_eq!(found.token("proxy"), Some("anything/at/all"));
}

#[test]
fn test_any_fallback_and_method_listing() {
    let trie = trie(&[
        (get(), "/pets/{id}", "get"),
        (RouteMethod::Verb(Method::DELETE), "/pets/{id}", "delete"),
        (RouteMethod::Any, "/pets/{id}", "any"),
    ]);
    assert_eq!(trie.resolve(&Method::GET, "/pets/1").unwrap().value, Some(&"get"));
    assert_eq!(trie.resolve(&Method::DELETE, "/pets/1").unwrap().value, Some(&"delete"));

    let fallback = trie.resolve(&Method::PATCH, "/pets/1").unwrap();
    assert_eq!(fallback.value, Some(&"any"));
    assert_eq!(fallback.methods, vec![Method::GET, Method::DELETE]);
}

#[test]
fn test_method_miss_reports_node() {
    let trie = trie(&[(get(), "/pets", "list")]);
    let miss = trie.resolve(&Method::POST, "/pets").unwrap();
    assert_eq!(miss.value, None);
    assert_eq!(miss.methods, vec![Method::GET]);
}

#[test]
fn test_intermediate_node_is_not_a_match() {
    let trie = trie(&[(get(), "/a/b/c", "deep")]);
    assert!(trie.resolve(&Method::GET, "/a/b").is_none());
    assert!(trie.resolve(&Method::GET, "/a/b/c/d").is_none());
}

#[test]
fn test_literal_star_is_not_a_wildcard() {
    let trie = trie(&[(get(), "/glob/*", "star"), (get(), "/glob/{name}", "var")]);
    assert_eq!(trie.resolve(&Method::GET, "/glob/*").unwrap().value, Some(&"star"));
    assert_eq!(trie.resolve(&Method::GET, "/glob/x").unwrap().value, Some(&"var"));
}

#[test]
fn test_proto_like_segments_are_ordinary() {
    let trie = trie(&[(get(), "/__proto__/{id}", "proto")]);
    let found = trie.resolve(&Method::GET, "/__proto__/constructor").unwrap();
    assert_eq!(found.value, Some(&"proto"));
    assert_eq!(found.token("id"), Some("constructor"));
    assert!(trie.resolve(&Method::GET, "/constructor/x").is_none());
}

#[test]
fn test_route_method_parse() {
    assert_eq!("any".parse::<RouteMethod>().unwrap(), RouteMethod::Any);
    assert_eq!("get".parse::<RouteMethod>().unwrap(), get());
    assert_eq!(RouteMethod::Any.to_string(), "ANY");
    assert!(matches!(
        "".parse::<RouteMethod>(),
        Err(RouterError::InvalidMethod { .. })
    ));
}
