//! Route template parsing and path splitting.
//!
//! Templates and request paths are split the same way so that a template
//! stored at registration time lines up segment-for-segment with the request
//! paths resolved against it:
//!
//! - a single leading `/` is ignored
//! - a single trailing empty segment is ignored (`/items/` == `/items`)
//! - the root path (`/` or the empty string) is the single empty segment `""`
//!
//! Interior empty segments (`/resource//sub`) are kept; when bound to a
//! variable they resolve to `None`.

use std::borrow::Cow;
use std::fmt;

use smallvec::SmallVec;

use crate::error::RouterError;

/// Most templates and request paths have at most this many segments.
pub const MAX_INLINE_SEGMENTS: usize = 16;

/// Stack-allocated list of borrowed path segments.
pub type SegmentVec<'a> = SmallVec<[&'a str; MAX_INLINE_SEGMENTS]>;

/// One parsed segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches the request segment verbatim.
    Literal(String),
    /// `{name}`: binds exactly one request segment.
    Variable(String),
    /// `{name+}`: binds the rest of the request path. Always the last segment.
    Greedy(String),
}

impl Segment {
    /// Variable name bound by this segment, if any.
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Variable(name) | Segment::Greedy(name) => Some(name),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(s) => f.write_str(s),
            Segment::Variable(name) => write!(f, "{{{name}}}"),
            Segment::Greedy(name) => write!(f, "{{{name}+}}"),
        }
    }
}

/// A parsed route template such as `/v1/users/{userId}/files/{path+}`.
///
/// Invariant: at most one [`Segment::Greedy`], and only in last position.
/// Segments written after a greedy segment are dropped while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template string.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidTemplate`] when a variable segment has an
    /// empty name (`{}` or `{+}`).
    pub fn parse(template: &str) -> Result<Self, RouterError> {
        let raw = split_path(template);
        let mut segments = Vec::with_capacity(raw.len());

        for (idx, token) in raw.iter().enumerate() {
            let segment = parse_segment(token).ok_or_else(|| RouterError::InvalidTemplate {
                template: template.to_string(),
                reason: format!("segment {} has an empty variable name", idx + 1),
            })?;
            let greedy = matches!(segment, Segment::Greedy(_));
            segments.push(segment);
            if greedy {
                if idx + 1 < raw.len() {
                    tracing::warn!(
                        template = %template,
                        ignored_segments = raw.len() - idx - 1,
                        "Segments after a greedy variable are ignored"
                    );
                }
                break;
            }
        }

        Ok(Self { segments })
    }

    /// Parsed segments in path order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable names in the order they appear in the template.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(Segment::variable_name)
            .map(str::to_string)
            .collect()
    }

    /// Whether the template ends in a greedy segment.
    #[must_use]
    pub fn is_greedy(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Greedy(_)))
    }

    /// Match this template alone against a request path.
    ///
    /// Returns the variable bindings in template order, decoded the same way
    /// as trie captures, or `None` if the path does not fit the template.
    #[must_use]
    pub fn bind(&self, path: &str) -> Option<Vec<(&str, Option<String>)>> {
        let parts = split_path(path);
        let mut bindings = Vec::new();

        for (idx, segment) in self.segments.iter().enumerate() {
            let raw = match segment {
                Segment::Greedy(_) => parts.get(idx..).map(|rest| rest.join("/")),
                _ => parts.get(idx).map(|part| (*part).to_string()),
            }?;
            match segment {
                Segment::Literal(text) if *text != raw => return None,
                Segment::Literal(_) => {}
                Segment::Variable(name) | Segment::Greedy(name) => {
                    let value = (!raw.is_empty()).then(|| decode_segment(&raw).into_owned());
                    bindings.push((name.as_str(), value));
                }
            }
        }

        (self.is_greedy() || parts.len() == self.segments.len()).then_some(bindings)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Parse one raw template token. Returns `None` for an empty variable name.
fn parse_segment(token: &str) -> Option<Segment> {
    let inner = match token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        Some(inner) => inner,
        None => return Some(Segment::Literal(token.to_string())),
    };

    match inner.strip_suffix('+') {
        Some("") => None,
        Some(name) => Some(Segment::Greedy(name.to_string())),
        None if inner.is_empty() => None,
        None => Some(Segment::Variable(inner.to_string())),
    }
}

/// Split a template or request path into segments.
#[must_use]
pub fn split_path(path: &str) -> SegmentVec<'_> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let mut segments: SegmentVec<'_> = path.split('/').collect();
    if segments.len() > 1 && segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

/// Percent-decode a path segment, falling back to the raw text when the
/// encoding is malformed.
///
/// Malformed means a `%` not followed by two hex digits anywhere in the
/// segment, or escapes that decode to invalid UTF-8. Either way the whole
/// segment is returned untouched.
#[must_use]
pub fn decode_segment(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }
    if !has_valid_escapes(raw) {
        return Cow::Borrowed(raw);
    }
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(raw),
    }
}

fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let escape = bytes.get(idx + 1..idx + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }
    true
}

/// Normalize a registration template to always start with `/`.
#[must_use]
pub fn normalize_template(template: &str) -> Cow<'_, str> {
    if template.starts_with('/') {
        Cow::Borrowed(template)
    } else {
        Cow::Owned(format!("/{template}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_root_and_trailing_slash() {
        assert_eq!(split_path("/").as_slice(), &[""]);
        assert_eq!(split_path("").as_slice(), &[""]);
        assert_eq!(split_path("/items").as_slice(), &["items"]);
        assert_eq!(split_path("/items/").as_slice(), &["items"]);
        assert_eq!(split_path("items").as_slice(), &["items"]);
    }

    #[test]
    fn test_split_keeps_interior_empty_segments() {
        assert_eq!(split_path("/resource//sub").as_slice(), &["resource", "", "sub"]);
        assert_eq!(split_path("/resource//").as_slice(), &["resource", ""]);
    }

    #[test]
    fn test_parse_segments() {
        let template = RouteTemplate::parse("/resource/{id}/files/{path+}").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("resource".into()),
                Segment::Variable("id".into()),
                Segment::Literal("files".into()),
                Segment::Greedy("path".into()),
            ]
        );
        assert!(template.is_greedy());
        assert_eq!(template.variable_names(), vec!["id", "path"]);
        assert_eq!(template.to_string(), "/resource/{id}/files/{path+}");
    }

    #[test]
    fn test_segments_after_greedy_are_dropped() {
        let template = RouteTemplate::parse("/a/{rest+}/b/c").unwrap();
        assert_eq!(template.segments().len(), 2);
        assert!(template.is_greedy());
    }

    #[test]
    fn test_empty_variable_name_rejected() {
        assert!(matches!(
            RouteTemplate::parse("/a/{}"),
            Err(RouterError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/a/{+}"),
            Err(RouterError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_unbalanced_braces_are_literal() {
        let template = RouteTemplate::parse("/{open/close}").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("{open".into()),
                Segment::Literal("close}".into())
            ]
        );
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("plain"), "plain");
        assert_eq!(decode_segment("a%20b%2Fc"), "a b/c");
        assert_eq!(decode_segment("bad%E0%A4%A"), "bad%E0%A4%A");
    }

    #[test]
    fn test_decode_segment_malformed_escape_keeps_raw() {
        assert_eq!(decode_segment("a%20%zz"), "a%20%zz");
        assert_eq!(decode_segment("a%20b%2"), "a%20b%2");
        assert_eq!(decode_segment("trailing%"), "trailing%");
        assert_eq!(decode_segment("%FF"), "%FF");
        assert_eq!(decode_segment("%e2%9c%93"), "\u{2713}");
    }

    #[test]
    fn test_bind_against_path() {
        let proxy = RouteTemplate::parse("/{proxy+}").unwrap();
        assert_eq!(
            proxy.bind("/pets/x%20y"),
            Some(vec![("proxy", Some("pets/x y".to_string()))])
        );
        assert_eq!(proxy.bind("/"), Some(vec![("proxy", None)]));

        let scoped = RouteTemplate::parse("/v1/{id}").unwrap();
        assert_eq!(scoped.bind("/v1/7"), Some(vec![("id", Some("7".to_string()))]));
        assert_eq!(scoped.bind("/v2/7"), None);
        assert_eq!(scoped.bind("/v1/7/extra"), None);
        assert_eq!(scoped.bind("/v1"), None);
    }

    #[test]
    fn test_normalize_template() {
        assert_eq!(normalize_template("items"), "/items");
        assert_eq!(normalize_template("/items"), "/items");
    }
}
