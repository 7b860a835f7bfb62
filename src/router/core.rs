//! Route table on top of [`PathTrie`].
//!
//! [`Router`] owns the trie plus a flat list of registered routes, logs every
//! registration and lookup, and answers catch-all queries for the dispatcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::template::{normalize_template, RouteTemplate};
use super::trie::{PathTrie, ResolvedRoute, RouteMethod, TokenVec};
use crate::error::RouterError;

/// Lookups slower than this are logged at WARN.
const SLOW_MATCH: Duration = Duration::from_millis(1);

/// Per-route settings supplied at registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteOptions {
    /// Hand the body to the handler without JSON parsing.
    pub raw_body: bool,
    /// Free-form metadata, passed through to the handler untouched.
    pub metadata: Map<String, Value>,
}

impl RouteOptions {
    #[must_use]
    pub fn raw_body() -> Self {
        Self {
            raw_body: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One registered `(method, template)` pair.
#[derive(Debug)]
pub struct RouteEntry<H> {
    pub method: RouteMethod,
    /// Normalized template (always starts with `/`)
    pub template: Arc<str>,
    pub options: Arc<RouteOptions>,
    pub handler: H,
}

/// Lookup result: the matched entry (if any) with path bindings.
pub type RouteMatch<'a, H> = ResolvedRoute<'a, Arc<RouteEntry<H>>>;

/// Route registry backed by a segment trie.
pub struct Router<H> {
    trie: PathTrie<Arc<RouteEntry<H>>>,
    routes: Vec<Arc<RouteEntry<H>>>,
    catch_all: String,
    /// `None` when the configured catch-all does not parse.
    catch_all_parsed: Option<RouteTemplate>,
    /// Entries registered under the catch-all template, any spelling.
    catch_all_routes: Vec<Arc<RouteEntry<H>>>,
}

impl<H> Router<H> {
    /// Empty router whose fallback route is `catch_all`.
    #[must_use]
    pub fn new(catch_all: &str) -> Self {
        let catch_all = normalize_template(catch_all).into_owned();
        let catch_all_parsed = match RouteTemplate::parse(&catch_all) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(catch_all = %catch_all, error = %err, "Catch-all template ignored");
                None
            }
        };
        Self {
            trie: PathTrie::new(),
            routes: Vec::new(),
            catch_all,
            catch_all_parsed,
            catch_all_routes: Vec::new(),
        }
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Catch-all template this router falls back to.
    #[must_use]
    pub fn catch_all_template(&self) -> &str {
        &self.catch_all
    }

    /// Register a handler.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable template or a duplicate `(method, template)`.
    pub fn add(
        &mut self,
        method: RouteMethod,
        template: &str,
        options: RouteOptions,
        handler: H,
    ) -> Result<&mut Self, RouterError> {
        let template = normalize_template(template);
        let parsed = RouteTemplate::parse(&template)?;
        let entry = Arc::new(RouteEntry {
            method: method.clone(),
            template: Arc::from(template.as_ref()),
            options: Arc::new(options),
            handler,
        });

        if let Err(err) = self
            .trie
            .store_template(method.clone(), &parsed, Arc::clone(&entry))
        {
            warn!(method = %method, template = %template, error = %err, "Route registration rejected");
            return Err(err);
        }

        info!(
            method = %method,
            template = %template,
            variables = ?parsed.variable_names(),
            greedy = parsed.is_greedy(),
            routes_count = self.routes.len() + 1,
            "Route registered"
        );
        if self.catch_all_parsed.as_ref() == Some(&parsed) {
            self.catch_all_routes.push(Arc::clone(&entry));
        }
        self.routes.push(entry);
        Ok(self)
    }

    /// Resolve a request.
    ///
    /// `None` means no node matched. A match whose `value` is `None` means
    /// the path exists but the method does not.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, H>> {
        debug!(method = %method, path = %path, "Route match attempt");

        let match_start = Instant::now();
        let result = self.trie.resolve(method, path);
        let duration_us = match_start.elapsed().as_micros();

        match &result {
            Some(found) => match found.value {
                Some(entry) => {
                    if match_start.elapsed() > SLOW_MATCH {
                        warn!(
                            method = %method,
                            path = %path,
                            route_pattern = %entry.template,
                            path_params = ?found.tokens,
                            duration_us,
                            "Slow route matching detected"
                        );
                    } else {
                        info!(
                            method = %method,
                            path = %path,
                            route_pattern = %entry.template,
                            route_method = %entry.method,
                            path_params = ?found.tokens,
                            duration_us,
                            "Route matched"
                        );
                    }
                }
                None => warn!(
                    method = %method,
                    path = %path,
                    defined_methods = ?found.methods,
                    duration_us,
                    "Path matched but method is not registered"
                ),
            },
            None => warn!(method = %method, path = %path, duration_us, "No route matched"),
        }

        result
    }

    /// Catch-all entry for `method`, falling back to the catch-all `ANY`.
    #[must_use]
    pub fn catch_all(&self, method: &Method) -> Option<&Arc<RouteEntry<H>>> {
        let mut any = None;
        for entry in &self.catch_all_routes {
            match &entry.method {
                RouteMethod::Verb(m) if m == method => return Some(entry),
                RouteMethod::Any => any = Some(entry),
                RouteMethod::Verb(_) => {}
            }
        }
        any
    }

    /// Catch-all entry for `method` plus the catch-all's own bindings
    /// against `path`.
    ///
    /// The bindings are empty when `path` does not fit the catch-all
    /// template (a scoped catch-all such as `/api/{rest+}` hit by `/other`).
    #[must_use]
    pub fn fallback(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(&Arc<RouteEntry<H>>, TokenVec)> {
        let entry = self.catch_all(method)?;
        let tokens = self
            .catch_all_parsed
            .as_ref()
            .and_then(|template| template.bind(path))
            .map(|bindings| {
                bindings
                    .into_iter()
                    .map(|(name, value)| (Arc::from(name), value))
                    .collect()
            })
            .unwrap_or_default();
        info!(
            method = %method,
            path = %path,
            catch_all = %entry.template,
            "Falling back to catch-all route"
        );
        Some((entry, tokens))
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteEntry<H>> {
        self.routes.iter().map(AsRef::as_ref)
    }

    /// `METHOD /template` for every registered route.
    #[must_use]
    pub fn route_templates(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|e| format!("{} {}", e.method, e.template))
            .collect()
    }

    /// Print the route table to stdout.
    pub fn dump_routes(&self) {
        println!(
            "[routes] count={} catch_all={}",
            self.routes.len(),
            self.catch_all
        );
        for entry in &self.routes {
            println!("[route] {} {}", entry.method, entry.template);
        }
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new(crate::runtime_config::DEFAULT_CATCH_ALL)
    }
}
