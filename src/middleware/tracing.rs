use std::time::Instant;

use tracing::{error, field, info, info_span};

use super::Decorator;
use crate::dispatcher::{Handler, HandlerRequest, HandlerResult};

/// Opens a `request` span around the rest of the chain and records the
/// outcome on it
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFilter;

impl Decorator for TracingFilter {
    fn apply(&self, req: &mut HandlerRequest, next: &dyn Handler) -> HandlerResult {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = req.route_pattern.as_deref().unwrap_or(""),
            status = field::Empty,
            latency_us = field::Empty,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let result = next.handle(req);

        let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        span.record("latency_us", latency_us);
        match &result {
            Ok(res) => {
                span.record("status", res.status);
                info!(status = res.status, latency_us, "Request handled");
            }
            Err(failure) => {
                span.record("status", failure.status());
                error!(
                    status = failure.status(),
                    error = %failure,
                    latency_us,
                    "Request failed"
                );
            }
        }
        result
    }
}
