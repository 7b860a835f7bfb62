use std::time::Duration;

use tracing::{info, warn};

use super::Middleware;
use crate::dispatcher::HandlerRequest;
use crate::error::HandlerError;
use crate::response::Response;

/// Logs the start, outcome and latency of every routed request.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &mut HandlerRequest) -> Result<(), HandlerError> {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = %req.route.template,
            "Request started"
        );
        Ok(())
    }

    fn after(&self, req: &HandlerRequest, res: &mut Response, latency: Duration) {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = %req.route.template,
            status = res.status_code(),
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );
    }

    fn on_error(&self, req: &HandlerRequest, err: HandlerError) -> anyhow::Result<HandlerError> {
        warn!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = %req.route.template,
            error = %err,
            "Request failed"
        );
        Ok(err)
    }
}
