use std::time::Duration;

use crate::dispatcher::HandlerRequest;
use crate::error::HandlerError;
use crate::response::Response;

/// Hooks around every routed HTTP request.
///
/// Registered middleware run in registration order for all three hooks.
pub trait Middleware: Send + Sync {
    /// Inspect or rewrite the request before the handler runs.
    ///
    /// Returning `Err` skips the handler; the error goes through
    /// [`Middleware::on_error`] like a handler failure. Use
    /// `HandlerError::Response` to short-circuit with a ready response.
    fn before(&self, _req: &mut HandlerRequest) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Inspect or rewrite the handler's response.
    fn after(&self, _req: &HandlerRequest, _res: &mut Response, _latency: Duration) {}

    /// Inspect or replace a handler failure.
    ///
    /// # Errors
    ///
    /// An `Err` here means the hook itself failed; the dispatcher answers
    /// with the generic unexpected-error envelope.
    fn on_error(&self, _req: &HandlerRequest, err: HandlerError) -> anyhow::Result<HandlerError> {
        Ok(err)
    }
}
