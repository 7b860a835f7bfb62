//! Segment trie for HTTP route resolution.
//!
//! Routes are stored one path segment per level. Each node has two kinds of
//! outgoing edges:
//!
//! - **literal** children keyed by the exact segment text
//! - at most one **wildcard** child shared by every `{name}` / `{name+}`
//!   template segment at that depth
//!
//! The wildcard edge is a separate field rather than a reserved map key, so no
//! request segment (not even a literal `*`) can collide with it.
//!
//! ## Resolution
//!
//! At every level the literal child wins. When no literal child matches and the
//! current node ends a greedy template, the walk stops there and the greedy
//! variable swallows the rest of the path. Otherwise the wildcard child is
//! taken and the segment is captured.
//!
//! The walk never backtracks: once a literal branch is chosen, a dead end
//! deeper down does not retry the sibling wildcard branch. Given
//! `/route/explicit/x` and `/route/{var}/y`, the path `/route/explicit/y`
//! does not resolve.
//!
//! ## Example
//!
//! ```rust
//! use faas_router::router::{PathTrie, RouteMethod};
//! use http::Method;
//!
//! let mut trie = PathTrie::new();
//! trie.store(RouteMethod::Verb(Method::GET), "/users/{id}", "get_user").unwrap();
//! trie.store(RouteMethod::Any, "/users/{id}", "any_user").unwrap();
//!
//! let found = trie.resolve(&Method::GET, "/users/42").unwrap();
//! assert_eq!(found.value, Some(&"get_user"));
//! assert_eq!(found.token("id"), Some("42"));
//!
//! let fallback = trie.resolve(&Method::PUT, "/users/42").unwrap();
//! assert_eq!(fallback.value, Some(&"any_user"));
//! assert_eq!(fallback.methods, vec![Method::GET]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;

use super::template::{decode_segment, split_path, RouteTemplate, Segment};
use crate::error::RouterError;

/// Maximum number of path variables before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path variable bindings in template order.
///
/// Names are shared with the trie (`Arc<str>`). A value is `None` when the
/// captured request segment was empty.
pub type TokenVec = SmallVec<[(Arc<str>, Option<String>); MAX_INLINE_PARAMS]>;

/// Method key of a stored route: a concrete HTTP verb or the synthetic `ANY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// Matches any verb not registered explicitly at the same node.
    Any,
    /// A concrete HTTP verb.
    Verb(Method),
}

impl RouteMethod {
    /// The concrete verb, or `None` for `ANY`.
    #[must_use]
    pub fn verb(&self) -> Option<&Method> {
        match self {
            RouteMethod::Any => None,
            RouteMethod::Verb(m) => Some(m),
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Verb(method)
    }
}

impl FromStr for RouteMethod {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ANY") {
            return Ok(RouteMethod::Any);
        }
        let upper = s.to_ascii_uppercase();
        Method::from_bytes(upper.as_bytes())
            .map(RouteMethod::Verb)
            .map_err(|_| RouterError::InvalidMethod {
                method: s.to_string(),
            })
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Any => f.write_str("ANY"),
            RouteMethod::Verb(m) => f.write_str(m.as_str()),
        }
    }
}

/// Data carried by a node that ends at least one template.
#[derive(Debug, Clone)]
struct Terminal<V> {
    /// Handlers in registration order, unique per method.
    methods: SmallVec<[(RouteMethod, V); 4]>,
    /// Variable names bound along the path from the root, by position.
    token_names: Vec<Arc<str>>,
    /// The last token swallows the remainder of the request path.
    greedy: bool,
}

#[derive(Debug, Clone)]
struct TrieNode<V> {
    literals: HashMap<Box<str>, TrieNode<V>>,
    wildcard: Option<Box<TrieNode<V>>>,
    terminal: Option<Terminal<V>>,
}

impl<V> TrieNode<V> {
    fn new() -> Self {
        Self {
            literals: HashMap::new(),
            wildcard: None,
            terminal: None,
        }
    }

    fn is_greedy(&self) -> bool {
        self.terminal.as_ref().is_some_and(|t| t.greedy)
    }

    fn child_mut(&mut self, segment: &Segment) -> &mut TrieNode<V> {
        match segment {
            Segment::Literal(text) => self
                .literals
                .entry(Box::from(text.as_str()))
                .or_insert_with(TrieNode::new),
            Segment::Variable(_) | Segment::Greedy(_) => {
                &mut **self.wildcard.get_or_insert_with(|| Box::new(TrieNode::new()))
            }
        }
    }
}

/// Result of [`PathTrie::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute<'a, V> {
    /// Handler for the requested method, falling back to `ANY`.
    ///
    /// `None` means the path exists but neither the method nor `ANY` is
    /// registered there.
    pub value: Option<&'a V>,
    /// Verbs registered at the matched node, excluding `ANY`, in
    /// registration order.
    pub methods: Vec<Method>,
    /// Path variable bindings.
    pub tokens: TokenVec,
}

impl<V> ResolvedRoute<'_, V> {
    /// Value bound to a path variable. Empty captures return `None`.
    ///
    /// Uses "last write wins" when a name appears more than once.
    #[must_use]
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Convert the bindings into an owned map.
    #[must_use]
    pub fn tokens_map(&self) -> HashMap<String, Option<String>> {
        self.tokens
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Segment trie mapping `(method, template)` pairs to values.
///
/// Built once at startup through [`PathTrie::store`]; lookups through
/// [`PathTrie::resolve`] take `&self` and never mutate, so a fully built trie
/// can be shared across threads without locking.
#[derive(Debug, Clone)]
pub struct PathTrie<V> {
    root: TrieNode<V>,
    len: usize,
}

impl<V> Default for PathTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PathTrie<V> {
    /// Create an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            len: 0,
        }
    }

    /// Number of stored `(method, template)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Parse `template` and store `value` under `method`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidTemplate`] if the template does not parse
    /// - [`RouterError::DuplicateRoute`] if `method` is already stored for
    ///   the same template
    pub fn store(
        &mut self,
        method: RouteMethod,
        template: &str,
        value: V,
    ) -> Result<&mut Self, RouterError> {
        let parsed = RouteTemplate::parse(template)?;
        self.store_template(method, &parsed, value)
    }

    /// Store `value` under `method` for an already parsed template.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateRoute`] if `method` is already stored
    /// at the template's terminal node.
    pub fn store_template(
        &mut self,
        method: RouteMethod,
        template: &RouteTemplate,
        value: V,
    ) -> Result<&mut Self, RouterError> {
        let mut node = &mut self.root;
        for segment in template.segments() {
            node = node.child_mut(segment);
        }

        let token_names: Vec<Arc<str>> = template
            .variable_names()
            .into_iter()
            .map(Arc::from)
            .collect();
        let greedy = template.is_greedy();

        let terminal = node.terminal.get_or_insert_with(|| Terminal {
            methods: SmallVec::new(),
            token_names: token_names.clone(),
            greedy,
        });

        if terminal.methods.iter().any(|(m, _)| *m == method) {
            return Err(RouterError::DuplicateRoute {
                method: method.to_string(),
                template: template.to_string(),
            });
        }

        if terminal.token_names != token_names {
            tracing::warn!(
                template = %template,
                method = %method,
                previous = ?terminal.token_names,
                "Variable names differ from an earlier template at the same node; using the latest"
            );
            terminal.token_names = token_names;
        }
        // A node stays greedy once any template ending there is greedy.
        terminal.greedy |= greedy;
        terminal.methods.push((method, value));
        self.len += 1;

        Ok(self)
    }

    /// Resolve a request path for `method`.
    ///
    /// Returns `None` when no node matches the path or the matched node ends
    /// no template. When the node exists but has neither `method` nor `ANY`,
    /// the result carries `value: None` and the registered methods so the
    /// caller can tell a missing path from an unsupported method.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Option<ResolvedRoute<'_, V>> {
        let segments = split_path(path);
        let mut node = &self.root;
        let mut captures: SmallVec<[usize; MAX_INLINE_PARAMS]> = SmallVec::new();

        for (idx, segment) in segments.iter().enumerate() {
            if let Some(child) = node.literals.get(*segment) {
                node = child;
                continue;
            }
            if node.is_greedy() {
                break;
            }
            match node.wildcard.as_deref() {
                Some(child) => {
                    captures.push(idx);
                    node = child;
                }
                None => return None,
            }
        }

        let terminal = node.terminal.as_ref()?;

        let last = terminal.token_names.len().saturating_sub(1);
        let tokens: TokenVec = terminal
            .token_names
            .iter()
            .enumerate()
            .map(|(pos, name)| {
                let value = captures.get(pos).and_then(|&idx| {
                    let raw = if terminal.greedy && pos == last {
                        segments[idx..].join("/")
                    } else {
                        segments[idx].to_string()
                    };
                    if raw.is_empty() {
                        None
                    } else {
                        Some(decode_segment(&raw).into_owned())
                    }
                });
                (Arc::clone(name), value)
            })
            .collect();

        let mut exact = None;
        let mut any = None;
        let mut methods = Vec::with_capacity(terminal.methods.len());
        for (key, value) in &terminal.methods {
            match key {
                RouteMethod::Any => any = Some(value),
                RouteMethod::Verb(m) => {
                    if m == method {
                        exact = Some(value);
                    }
                    methods.push(m.clone());
                }
            }
        }

        Some(ResolvedRoute {
            value: exact.or(any),
            methods,
            tokens,
        })
    }
}
