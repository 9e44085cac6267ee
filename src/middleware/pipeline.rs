//! Composition of filters around a terminal handler.
//!
//! `before` and `around` filters nest onion-style with the first registered
//! outermost. `after` filters run once the onion returns, in registration
//! order, on both the success and the failure path. A panic inside the onion
//! is a 500 failure and reaches the `after` filters like any other.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::core::{AfterFilter, BeforeFilter, Decorator, FailureAction, Filter};
use super::phase::RequestPhase;
use crate::dispatcher::{Handler, HandlerRequest, HandlerResult, SharedHandler};
use crate::error::HandlerFailure;

/// Compose `filters` (in registration order) around `terminal`
pub fn build_chain(filters: &[Filter], terminal: SharedHandler) -> Chain {
    let mut layers: Vec<Arc<dyn Decorator>> = Vec::new();
    let mut afters: Vec<Arc<dyn AfterFilter>> = Vec::new();
    for filter in filters {
        match filter {
            Filter::Before(b) => layers.push(Arc::new(BeforeLayer(Arc::clone(b)))),
            Filter::Around(d) => layers.push(Arc::clone(d)),
            Filter::After(a) => afters.push(Arc::clone(a)),
        }
    }

    let mut inner: Arc<dyn Handler> = Arc::new(Terminal(terminal));
    for decorator in layers.into_iter().rev() {
        inner = Arc::new(Layer {
            decorator,
            next: inner,
        });
    }
    Chain { inner, afters }
}

/// A composed handler ready to invoke
///
/// Drives the request through `IN_FILTERS`, `IN_HANDLER` and `IN_AFTER`,
/// leaving it in `COMMITTED` on success or `FAILED` on failure.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<dyn Handler>,
    afters: Vec<Arc<dyn AfterFilter>>,
}

impl Chain {
    #[must_use]
    pub fn after_count(&self) -> usize {
        self.afters.len()
    }

    fn run_afters(&self, req: &mut HandlerRequest, result: HandlerResult) -> HandlerResult {
        let mut result = result;
        for (idx, after) in self.afters.iter().enumerate() {
            result = match result {
                Ok(res) => after.on_success(req, res),
                Err(mut failure) => match after.on_failure(req, &failure) {
                    Ok(FailureAction::Propagate) => Err(failure),
                    Ok(FailureAction::Replace(res)) => {
                        debug!(
                            request_id = %req.request_id,
                            after_idx = idx,
                            status = failure.status(),
                            "Failure replaced by after filter"
                        );
                        Ok(res)
                    }
                    Err(secondary) => {
                        warn!(
                            request_id = %req.request_id,
                            after_idx = idx,
                            error = %secondary,
                            "Failure handler failed; recorded as suppressed"
                        );
                        failure.add_suppressed(secondary);
                        Err(failure)
                    }
                },
            };
        }
        result
    }
}

impl Handler for Chain {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult {
        req.advance(RequestPhase::InFilters)?;
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.inner.handle(req)))
            .unwrap_or_else(|payload| {
                let failure = HandlerFailure::from_panic(payload.as_ref());
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    error = %failure,
                    "Handler panicked"
                );
                Err(failure)
            });
        req.advance(RequestPhase::InAfter)?;
        let result = self.run_afters(req, result);
        let phase = if result.is_ok() {
            RequestPhase::Committed
        } else {
            RequestPhase::Failed
        };
        req.advance(phase)?;
        result
    }
}

struct Layer {
    decorator: Arc<dyn Decorator>,
    next: Arc<dyn Handler>,
}

impl Handler for Layer {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult {
        self.decorator.apply(req, self.next.as_ref())
    }
}

struct BeforeLayer(Arc<dyn BeforeFilter>);

impl Decorator for BeforeLayer {
    fn apply(&self, req: &mut HandlerRequest, next: &dyn Handler) -> HandlerResult {
        match self.0.before(req)? {
            Some(early) => {
                debug!(
                    request_id = %req.request_id,
                    status = early.status,
                    "Filter returned early response"
                );
                Ok(early)
            }
            None => next.handle(req),
        }
    }
}

struct Terminal(SharedHandler);

impl Handler for Terminal {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult {
        // around filters may invoke `next` more than once
        if req.phase() != RequestPhase::InHandler {
            req.advance(RequestPhase::InHandler)?;
        }
        self.0.handle(req)
    }
}
