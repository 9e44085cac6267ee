use std::fmt;
use std::sync::Arc;

use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse, HandlerResult};
use crate::error::HandlerFailure;

/// Runs ahead of the handler; returning a response short-circuits the chain
pub trait BeforeFilter: Send + Sync {
    fn before(&self, req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerFailure>;
}

impl<F> BeforeFilter for F
where
    F: Fn(&mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerFailure> + Send + Sync,
{
    fn before(&self, req: &mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerFailure> {
        self(req)
    }
}

/// Wraps the rest of the chain; `next` is everything registered after it
/// plus the terminal handler
pub trait Decorator: Send + Sync {
    fn apply(&self, req: &mut HandlerRequest, next: &dyn Handler) -> HandlerResult;
}

impl<F> Decorator for F
where
    F: Fn(&mut HandlerRequest, &dyn Handler) -> HandlerResult + Send + Sync,
{
    fn apply(&self, req: &mut HandlerRequest, next: &dyn Handler) -> HandlerResult {
        self(req, next)
    }
}

/// What an after filter decided to do about a failure
#[derive(Debug)]
pub enum FailureAction {
    /// Leave the failure in place for the next after filter and the translator
    Propagate,
    /// Reset and replace: the failure is dropped and this response is used
    Replace(HandlerResponse),
}

/// Runs after the terminal handler, in registration order
///
/// On success each filter receives the previous filter's response. On
/// failure each filter may observe it; a filter returning `Err` from
/// `on_failure` has that error recorded as suppressed on the original.
pub trait AfterFilter: Send + Sync {
    fn on_success(&self, _req: &mut HandlerRequest, res: HandlerResponse) -> HandlerResult {
        Ok(res)
    }

    fn on_failure(
        &self,
        _req: &mut HandlerRequest,
        _failure: &HandlerFailure,
    ) -> Result<FailureAction, HandlerFailure> {
        Ok(FailureAction::Propagate)
    }
}

/// Adapter turning a response-transforming closure into an [`AfterFilter`]
pub struct AfterFn<F>(pub F);

impl<F> AfterFilter for AfterFn<F>
where
    F: Fn(&mut HandlerRequest, HandlerResponse) -> HandlerResult + Send + Sync,
{
    fn on_success(&self, req: &mut HandlerRequest, res: HandlerResponse) -> HandlerResult {
        (self.0)(req, res)
    }
}

/// Adapter turning a failure-observing closure into an [`AfterFilter`]
pub struct OnFailureFn<F>(pub F);

impl<F> AfterFilter for OnFailureFn<F>
where
    F: Fn(&mut HandlerRequest, &HandlerFailure) -> Result<FailureAction, HandlerFailure>
        + Send
        + Sync,
{
    fn on_failure(
        &self,
        req: &mut HandlerRequest,
        failure: &HandlerFailure,
    ) -> Result<FailureAction, HandlerFailure> {
        (self.0)(req, failure)
    }
}

/// A registered filter
#[derive(Clone)]
pub enum Filter {
    Before(Arc<dyn BeforeFilter>),
    Around(Arc<dyn Decorator>),
    After(Arc<dyn AfterFilter>),
}

impl Filter {
    pub fn before<B: BeforeFilter + 'static>(filter: B) -> Self {
        Filter::Before(Arc::new(filter))
    }

    pub fn around<D: Decorator + 'static>(filter: D) -> Self {
        Filter::Around(Arc::new(filter))
    }

    pub fn after<A: AfterFilter + 'static>(filter: A) -> Self {
        Filter::After(Arc::new(filter))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::Before(_) => "before",
            Filter::Around(_) => "around",
            Filter::After(_) => "after",
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter::{}", self.kind())
    }
}
