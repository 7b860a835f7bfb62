//! Error types for route registration, handler execution and event dispatch.

use std::fmt;

use crate::response::Response;

/// Route registration failure. These are startup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The same method was registered twice for the same template.
    DuplicateRoute {
        /// Method name (`GET`, `ANY`, ...)
        method: String,
        /// Normalized template
        template: String,
    },
    /// The template could not be parsed.
    InvalidTemplate {
        /// Template as given at registration
        template: String,
        /// What is wrong with it
        reason: String,
    },
    /// The method token is not a valid HTTP method.
    InvalidMethod {
        /// Method as given at registration
        method: String,
    },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::DuplicateRoute { method, template } => {
                write!(f, "Path already exists: {method} {template}")
            }
            RouterError::InvalidTemplate { template, reason } => {
                write!(f, "Invalid route template '{template}': {reason}")
            }
            RouterError::InvalidMethod { method } => {
                write!(f, "Invalid HTTP method '{method}'")
            }
        }
    }
}

impl std::error::Error for RouterError {}

/// Failure returned by a route handler or a middleware request hook.
///
/// Does not implement `std::error::Error`, so any error type converts into it
/// with `?`.
pub enum HandlerError {
    /// A complete response raised as an error. Returned to the caller as-is.
    Response(Response),
    /// Anything else. Logged and replaced with an opaque 500 envelope.
    Unexpected(anyhow::Error),
}

impl HandlerError {
    /// Wrap an `anyhow::Error` (or anything convertible into one).
    pub fn unexpected(err: impl Into<anyhow::Error>) -> Self {
        HandlerError::Unexpected(err.into())
    }

    /// Raise a plain message as an unexpected error.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        HandlerError::Unexpected(anyhow::Error::msg(message))
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        HandlerError::Unexpected(anyhow::Error::new(err))
    }
}

impl From<Response> for HandlerError {
    fn from(response: Response) -> Self {
        HandlerError::Response(response)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Response(r) => f.debug_tuple("Response").field(r).finish(),
            HandlerError::Unexpected(e) => f.debug_tuple("Unexpected").field(e).finish(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Response(r) => {
                write!(f, "handler returned error response ({})", r.status_code())
            }
            HandlerError::Unexpected(e) => write!(f, "{e:#}"),
        }
    }
}

/// Failure of [`Dispatcher::handle`](crate::dispatcher::Dispatcher::handle).
///
/// HTTP route failures never show up here; they become response envelopes.
#[derive(Debug)]
pub enum DispatchError {
    /// An authorization event arrived but no authorizer is registered.
    MissingAuthorizer,
    /// The authorizer rejected or failed. Passed through unmodified.
    Authorizer(anyhow::Error),
    /// The scheduled-event hook failed.
    Scheduled(anyhow::Error),
    /// The batch-event hook failed.
    Batch(anyhow::Error),
    /// The event matches none of the recognized shapes.
    UnrecognizedEvent,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::MissingAuthorizer => f.write_str("Authorizer Undefined"),
            DispatchError::Authorizer(e) => write!(f, "authorizer failed: {e:#}"),
            DispatchError::Scheduled(e) => write!(f, "scheduled handler failed: {e:#}"),
            DispatchError::Batch(e) => write!(f, "event handler failed: {e:#}"),
            DispatchError::UnrecognizedEvent => f.write_str("no handler matches event shape"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Authorizer(e) | DispatchError::Scheduled(e) | DispatchError::Batch(e) => {
                Some(&**e)
            }
            _ => None,
        }
    }
}
