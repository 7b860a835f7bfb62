//! Dispatcher core: registration API and the per-invocation lifecycle.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{DispatchError, HandlerError, RouterError};
use crate::event::{EventKind, HttpEvent, InvocationContext, RequestBody};
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::response::{Envelope, Response};
use crate::router::{RouteEntry, RouteMethod, RouteOptions, Router, TokenVec};
use crate::runtime_config::RuntimeConfig;

/// Future returned by a route handler.
pub type HandlerFuture = BoxFuture<'static, Result<Response, HandlerError>>;

/// Type-erased route handler.
pub type Handler = Arc<dyn Fn(HandlerRequest) -> HandlerFuture + Send + Sync>;

/// Future returned by the authorizer and the scheduled / batch hooks.
pub type HookFuture = BoxFuture<'static, anyhow::Result<Value>>;

type EventHook = Arc<dyn Fn(Value, InvocationContext) -> HookFuture + Send + Sync>;
type AuthorizerFn = Arc<dyn Fn(AuthorizationRequest) -> HookFuture + Send + Sync>;

/// Route metadata handed to the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    /// Template of the route that handles the request
    pub template: Arc<str>,
    /// Options given at registration
    pub options: Arc<RouteOptions>,
    /// Verbs registered at the matched path (excluding `ANY`), in
    /// registration order. For catch-all fallbacks these are the verbs of the
    /// path that originally matched, or empty when no path matched.
    pub defined_methods: Vec<Method>,
}

/// Request passed to a route handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Correlation id: the `x-request-id` header if it is a ULID, else fresh
    pub request_id: RequestId,
    pub method: Method,
    /// Routing path (stage prefix removed)
    pub path: String,
    /// Path variables bound by the matched template. A catch-all fallback
    /// keeps the variables of the path that originally matched, followed by
    /// the catch-all's own variables (`proxy` for `/{proxy+}`).
    pub path_params: TokenVec,
    pub query: HashMap<String, String>,
    pub multi_value_query: HashMap<String, Vec<String>>,
    /// Header names are lower-case
    pub headers: HashMap<String, String>,
    pub cookies: Vec<String>,
    pub body: RequestBody,
    pub stage_variables: HashMap<String, String>,
    pub request_context: Value,
    pub route: RouteInfo,
    pub context: InvocationContext,
    /// The event as received
    pub event: Arc<Value>,
}

impl HandlerRequest {
    /// Get a path parameter by name. Empty captures return `None`.
    ///
    /// Uses "last write wins" semantics when a name repeats.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .and_then(|(_, v)| v.as_deref())
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Convert path_params to a map.
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, Option<String>> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// Fails if the body is not JSON or does not match `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> anyhow::Result<T> {
        self.body.parse()
    }

    /// Id reported to clients in unexpected-error responses.
    #[must_use]
    pub fn error_id(&self) -> String {
        self.context
            .aws_request_id
            .clone()
            .unwrap_or_else(|| self.request_id.to_string())
    }
}

/// Input of the authorizer hook.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Upper-cased method of the request being authorized
    pub method: String,
    /// Path of the request being authorized, stage prefix removed
    pub path: String,
    pub context: InvocationContext,
    /// The authorizer event as received
    pub event: Value,
}

/// Result of [`Dispatcher::handle`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// Response envelope for an HTTP event
    Http(Envelope),
    /// Policy document returned by the authorizer
    Policy(Value),
    /// Whatever the scheduled or batch hook returned
    Passthrough(Value),
}

impl Output {
    /// The envelope, if this is an HTTP result.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Output::Http(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Serialize into the JSON value returned to the invoking runtime.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Output::Http(envelope) => serde_json::to_value(envelope).unwrap_or(Value::Null),
            Output::Policy(value) | Output::Passthrough(value) => value,
        }
    }
}

macro_rules! verb_methods {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// Fails on an unparsable template or a duplicate registration.
            pub fn $name<F, Fut>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouterError>
            where
                F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
            {
                self.register($method, template, RouteOptions::default(), handler)
            }
        )*
    };
}

/// Routes gateway events to registered handlers.
///
/// Built once at startup, then shared read-only across invocations:
///
/// ```rust
/// use faas_router::dispatcher::Dispatcher;
/// use faas_router::response::Response;
/// use serde_json::json;
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .get("/pets/{id}", |req| async move {
///         Ok(Response::new(json!({ "id": req.get_path_param("id") })))
///     })
///     .unwrap();
/// ```
pub struct Dispatcher {
    router: Router<Handler>,
    middlewares: Vec<Arc<dyn Middleware>>,
    authorizer: Option<AuthorizerFn>,
    on_schedule: EventHook,
    on_event: EventHook,
    config: RuntimeConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Dispatcher configured from `FAAS_ROUTER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        let noop: EventHook = Arc::new(noop_hook);
        Dispatcher {
            router: Router::new(&config.catch_all),
            middlewares: Vec::new(),
            authorizer: None,
            on_schedule: Arc::clone(&noop),
            on_event: noop,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The underlying route table.
    #[must_use]
    pub fn router(&self) -> &Router<Handler> {
        &self.router
    }

    /// Register a route handler.
    ///
    /// Templates without a leading `/` get one.
    ///
    /// # Errors
    ///
    /// - [`RouterError::DuplicateRoute`] if `(method, template)` is taken
    /// - [`RouterError::InvalidTemplate`] if the template does not parse
    pub fn register<F, Fut>(
        &mut self,
        method: RouteMethod,
        template: &str,
        options: RouteOptions,
        handler: F,
    ) -> Result<&mut Self, RouterError>
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| handler(req).boxed());
        self.router.add(method, template, options, handler)?;
        Ok(self)
    }

    verb_methods! {
        /// Register a `GET` handler.
        get => RouteMethod::Verb(Method::GET);
        /// Register a `HEAD` handler.
        head => RouteMethod::Verb(Method::HEAD);
        /// Register a `POST` handler.
        post => RouteMethod::Verb(Method::POST);
        /// Register a `PUT` handler.
        put => RouteMethod::Verb(Method::PUT);
        /// Register a `PATCH` handler.
        patch => RouteMethod::Verb(Method::PATCH);
        /// Register a `DELETE` handler.
        delete => RouteMethod::Verb(Method::DELETE);
        /// Register an `OPTIONS` handler.
        options => RouteMethod::Verb(Method::OPTIONS);
        /// Register a handler for every verb without its own handler.
        any => RouteMethod::Any;
    }

    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(mw);
        self
    }

    /// Set the function that answers authorizer events.
    pub fn set_authorizer<F, Fut>(&mut self, authorizer: F) -> &mut Self
    where
        F: Fn(AuthorizationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.authorizer = Some(Arc::new(move |req| authorizer(req).boxed()));
        self
    }

    /// Set the hook for scheduled events. Defaults to returning `null`.
    pub fn on_schedule<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.on_schedule = Arc::new(move |event, ctx| hook(event, ctx).boxed());
        self
    }

    /// Set the hook for batch (queue / stream) events. Defaults to returning
    /// `null`.
    pub fn on_event<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.on_event = Arc::new(move |event, ctx| hook(event, ctx).boxed());
        self
    }

    /// Process one invocation.
    ///
    /// HTTP events always produce an envelope, including for missing routes
    /// and handler failures.
    ///
    /// # Errors
    ///
    /// Authorizer, scheduled and batch failures are returned unchanged, as
    /// are events of unknown shape.
    pub async fn handle(
        &self,
        event: Value,
        ctx: InvocationContext,
    ) -> Result<Output, DispatchError> {
        let kind = EventKind::classify(&event);
        debug!(
            kind = kind.as_str(),
            aws_request_id = ?ctx.aws_request_id,
            "Dispatch start"
        );

        let result = match kind {
            EventKind::Scheduled => guarded(async { (self.on_schedule)(event, ctx).await })
                .await
                .map(Output::Passthrough)
                .map_err(DispatchError::Scheduled),
            EventKind::Batch => guarded(async { (self.on_event)(event, ctx).await })
                .await
                .map(Output::Passthrough)
                .map_err(DispatchError::Batch),
            EventKind::Authorizer => self.authorize(event, ctx).await.map(Output::Policy),
            EventKind::Http => Ok(Output::Http(self.handle_http(event, ctx).await)),
            EventKind::Unrecognized => Err(DispatchError::UnrecognizedEvent),
        };

        if let Err(err) = &result {
            warn!(kind = kind.as_str(), error = %err, "Dispatch failed");
        }
        result
    }

    async fn authorize(
        &self,
        event: Value,
        ctx: InvocationContext,
    ) -> Result<Value, DispatchError> {
        let Some(authorizer) = &self.authorizer else {
            error!("No authorizer function defined");
            return Err(DispatchError::MissingAuthorizer);
        };

        let http = HttpEvent::from_event(&event, self.config.strip_stage);
        let request = AuthorizationRequest {
            method: http.method,
            path: http.path,
            context: ctx,
            event,
        };

        match guarded(async { authorizer(request).await }).await {
            Ok(policy) => {
                info!(policy = %policy, "PolicyResult Success");
                Ok(policy)
            }
            Err(err) => {
                warn!(error = %err, "PolicyResult Failure");
                Err(DispatchError::Authorizer(err))
            }
        }
    }

    async fn handle_http(&self, event: Value, ctx: InvocationContext) -> Envelope {
        let started = Instant::now();
        let http = HttpEvent::from_event(&event, self.config.strip_stage);

        let Ok(method) = Method::from_bytes(http.method.as_bytes()) else {
            warn!(method = %http.method, path = %http.path, "Unusable request method");
            return self.finish(Response::no_route(&http.method, &http.path), started);
        };

        let (entry, path_params, defined_methods) = match self.router.route(&method, &http.path) {
            Some(found) => match found.value {
                Some(entry) => (Arc::clone(entry), found.tokens, found.methods),
                None => match self.router.fallback(&method, &http.path) {
                    Some((entry, extra)) => {
                        let mut tokens = found.tokens;
                        tokens.extend(extra);
                        (Arc::clone(entry), tokens, found.methods)
                    }
                    None => {
                        return self.finish(Response::no_route(&http.method, &http.path), started)
                    }
                },
            },
            None => match self.router.fallback(&method, &http.path) {
                Some((entry, tokens)) => (Arc::clone(entry), tokens, Vec::new()),
                None => {
                    return self.finish(Response::no_route(&http.method, &http.path), started)
                }
            },
        };

        let body = RequestBody::decode(
            http.body.as_deref(),
            http.is_base64_encoded,
            entry.options.raw_body,
        );
        let request = HandlerRequest {
            request_id: RequestId::parse_or_new(http.header("x-request-id")),
            method,
            path: http.path,
            path_params,
            query: http.query,
            multi_value_query: http.multi_value_query,
            headers: http.headers,
            cookies: http.cookies,
            body,
            stage_variables: http.stage_variables,
            request_context: http.request_context,
            route: RouteInfo {
                template: Arc::clone(&entry.template),
                options: Arc::clone(&entry.options),
                defined_methods,
            },
            context: ctx,
            event: Arc::new(event),
        };

        let response = self.invoke(&entry, request).await;
        self.finish(response, started)
    }

    /// Run middleware and the handler, turning every failure into a response.
    async fn invoke(&self, entry: &RouteEntry<Handler>, mut req: HandlerRequest) -> Response {
        for (idx, mw) in self.middlewares.iter().enumerate() {
            if let Err(err) = mw.before(&mut req) {
                debug!(
                    request_id = %req.request_id,
                    middleware_idx = idx,
                    "Middleware rejected request"
                );
                return self.recover(Some(&req), err, &req.error_id());
            }
        }

        let error_id = req.error_id();
        let request_id = req.request_id;
        let snapshot = (!self.middlewares.is_empty()).then(|| req.clone());

        debug!(
            request_id = %request_id,
            route = %entry.template,
            "Handler execution start"
        );
        let handler_start = Instant::now();
        let handler = &entry.handler;
        let outcome = AssertUnwindSafe(async move { handler(req).await })
            .catch_unwind()
            .await;
        let latency = handler_start.elapsed();

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let panic_message = panic_message(panic.as_ref());
                error!(
                    request_id = %request_id,
                    route = %entry.template,
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                Err(HandlerError::msg(format!("handler panicked: {panic_message}")))
            }
        };

        match result {
            Ok(mut res) => {
                if let Some(req) = &snapshot {
                    for mw in &self.middlewares {
                        mw.after(req, &mut res, latency);
                    }
                }
                debug!(
                    request_id = %request_id,
                    status = res.status_code(),
                    execution_time_ms = latency.as_millis() as u64,
                    "Handler execution complete"
                );
                res
            }
            Err(err) => self.recover(snapshot.as_ref(), err, &error_id),
        }
    }

    fn recover(
        &self,
        req: Option<&HandlerRequest>,
        mut err: HandlerError,
        error_id: &str,
    ) -> Response {
        if let Some(req) = req {
            for mw in &self.middlewares {
                match mw.on_error(req, err) {
                    Ok(next) => err = next,
                    Err(hook_err) => {
                        error!(
                            code = "ErrorHookFailure",
                            error_id = %error_id,
                            error = %format!("{hook_err:#}"),
                            "Error hook failed"
                        );
                        return Response::unexpected_error(error_id);
                    }
                }
            }
        }

        match err {
            HandlerError::Response(res) => res,
            HandlerError::Unexpected(e) => {
                error!(
                    code = "UnexpectedHandlerError",
                    error_id = %error_id,
                    error = %format!("{e:#}"),
                    "Unexpected error in handler"
                );
                Response::unexpected_error(error_id)
            }
        }
    }

    fn finish(&self, response: Response, started: Instant) -> Envelope {
        let envelope = response.into_envelope(self.config.cors);
        info!(
            status = envelope.status_code,
            latency_ms = started.elapsed().as_millis() as u64,
            "Dispatch complete"
        );
        envelope
    }
}

fn noop_hook(_event: Value, _ctx: InvocationContext) -> HookFuture {
    futures::future::ready(Ok(Value::Null)).boxed()
}

/// Await a hook, converting a panic into an error.
async fn guarded<T, F>(fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!("hook panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
