//! # Router Module
//!
//! Path matching for gateway events.
//!
//! ## Overview
//!
//! Routes are templates such as `/users/{id}` or `/files/{path+}` registered
//! per HTTP method (or `ANY`). They are stored in a [`PathTrie`], one path
//! segment per level, and resolved in time proportional to the number of
//! request segments, independent of how many routes are registered.
//!
//! - literal segments beat variables at every level
//! - `{name}` binds one segment, `{name+}` binds the rest of the path
//! - `ANY` answers any verb that has no handler of its own at the same node
//! - captured values are percent-decoded; empty captures bind `None`
//!
//! ## Example
//!
//! ```rust
//! use faas_router::router::{RouteMethod, RouteOptions, Router};
//! use http::Method;
//!
//! let mut router: Router<&str> = Router::default();
//! router
//!     .add(RouteMethod::Verb(Method::GET), "/pets/{id}", RouteOptions::default(), "get_pet")
//!     .unwrap();
//!
//! let found = router.route(&Method::GET, "/pets/123").unwrap();
//! assert_eq!(found.value.map(|e| e.handler), Some("get_pet"));
//! assert_eq!(found.token("id"), Some("123"));
//! ```

mod core;
mod template;
mod trie;
#[cfg(test)]
mod tests;

pub use self::core::{RouteEntry, RouteMatch, RouteOptions, Router};
pub use self::template::{
    decode_segment, normalize_template, split_path, RouteTemplate, Segment, SegmentVec,
    MAX_INLINE_SEGMENTS,
};
pub use self::trie::{PathTrie, ResolvedRoute, RouteMethod, TokenVec, MAX_INLINE_PARAMS};
