//! # faas-router
//!
//! **faas-router** routes function-as-a-service invocations to handlers. One
//! function can serve a whole HTTP API plus its authorizer, scheduled and
//! batch triggers: every event enters through [`Dispatcher::handle`], which
//! works out what kind of event it is and where it should go.
//!
//! ## Architecture
//!
//! - **[`router`]** - Segment trie mapping `(method, template)` pairs to handlers
//! - **[`dispatcher`]** - Event classification, handler invocation, error recovery
//! - **[`event`]** - Gateway event normalization and body decoding
//! - **[`response`]** - Handler responses and the envelope sent back to the gateway
//! - **[`middleware`]** - Hooks around every routed request
//! - **[`error`]** - Registration, handler and dispatch errors
//! - **[`runtime_config`]** - Environment-driven behavior switches
//! - **[`logging`]** - Structured `tracing` setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Runtime as Function runtime
//!     participant Dispatcher
//!     participant Router
//!     participant Middleware
//!     participant Handler
//!
//!     Runtime->>Dispatcher: handle(event, context)
//!     Dispatcher->>Dispatcher: classify event
//!     Dispatcher->>Router: route(method, path)
//!     alt path or method not matched
//!         Router-->>Dispatcher: None / methods, tokens
//!         Dispatcher->>Router: fallback(method, path)
//!         opt no catch-all registered
//!             Dispatcher-->>Runtime: 500 No handler defined
//!         end
//!     end
//!     Dispatcher->>Middleware: before(request)
//!     Dispatcher->>Handler: handler(request).await
//!     Handler-->>Dispatcher: Result<Response, HandlerError>
//!     Dispatcher->>Middleware: after / on_error
//!     Dispatcher-->>Runtime: Envelope
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use faas_router::dispatcher::Dispatcher;
//! use faas_router::event::InvocationContext;
//! use faas_router::response::Response;
//! use serde_json::json;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut app = Dispatcher::new();
//! app.get("/users/{id}", |req| async move {
//!     Ok(Response::new(json!({ "user": req.get_path_param("id") })))
//! })?;
//!
//! let event = json!({ "httpMethod": "GET", "path": "/users/42" });
//! let output = app.handle(event, InvocationContext::default()).await?;
//! assert_eq!(output.envelope().map(|e| e.status_code), Some(200));
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Every step logs through `tracing`. Call [`logging::init_logging`] once at
//! startup to install a JSON subscriber configured from `FAAS_ROUTER_LOG_*`
//! environment variables.

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod router;
pub mod runtime_config;

pub use dispatcher::{Dispatcher, HandlerRequest, Output, RouteOptions};
pub use error::{DispatchError, HandlerError, RouterError};
pub use event::InvocationContext;
pub use response::{Body, Envelope, Response};
pub use router::{PathTrie, RouteMethod};
