//! # Dispatcher Module
//!
//! Entry point for every function invocation. The dispatcher classifies the
//! inbound event and hands it to the matching hook:
//!
//! | Event | Recognized by | Result |
//! |---|---|---|
//! | scheduled | `source == "aws.events"` | return value of [`Dispatcher::on_schedule`] |
//! | batch | `Records` or `messages` | return value of [`Dispatcher::on_event`] |
//! | authorizer | `type == "REQUEST"` with `methodArn` / `routeArn` | policy from [`Dispatcher::set_authorizer`] |
//! | HTTP | `path` or `rawPath` | response [`Envelope`](crate::response::Envelope) |
//!
//! ## Request Flow
//!
//! 1. The HTTP event is normalized ([`HttpEvent`](crate::event::HttpEvent))
//! 2. The router resolves method and path
//! 3. When the path or the method does not match, the catch-all route
//!    (`/{proxy+}` by default) is tried
//! 4. Middleware `before` hooks run, then the handler, then `after` hooks
//! 5. The response is converted into an envelope
//!
//! ## Error Handling
//!
//! - No matching route and no catch-all: 500 `No handler defined for method and resource.`
//! - Handler returns `HandlerError::Response`: that response, unchanged
//! - Handler returns `HandlerError::Unexpected` or panics: logged, then an
//!   opaque 500 carrying an `errorId`
//! - A middleware error hook fails: the same opaque 500, logged separately

mod core;

pub use self::core::{
    AuthorizationRequest, Dispatcher, Handler, HandlerFuture, HandlerRequest, HookFuture, Output,
    RouteInfo,
};
pub use crate::router::RouteOptions;
