//! # Middleware Module
//!
//! Filters that wrap a matched route's handler, and the per-request phase
//! state machine they drive.
//!
//! ## Filter kinds
//!
//! - [`BeforeFilter`] runs ahead of the handler and may short-circuit with a
//!   response.
//! - [`Decorator`] (`around`) receives the rest of the chain as `next`.
//! - [`AfterFilter`] runs after the handler, transforming the response or
//!   reacting to a failure.
//!
//! ## Ordering
//!
//! Given `before` filters `F1, F2` and `after` filters `A1, A2`, a successful
//! request executes `F1, F2, handler, A1, A2`. `before`/`around` filters nest
//! first-registered-outermost; `after` filters run in registration order.
//!
//! A failure skips the remaining `before` filters and the handler. Every
//! `after` filter then sees it through `on_failure`, in order, before the
//! error translator renders it. A failure-handler that fails itself is
//! recorded as suppressed on the original failure.
//!
//! ## Built-in filters
//!
//! - [`CorsFilter`] answers preflight requests and stages CORS headers.
//! - [`TracingFilter`] opens a `request` span around the chain.

mod core;
mod cors;
mod phase;
mod pipeline;
mod tracing;
#[cfg(test)]
mod tests;

pub use core::{AfterFilter, AfterFn, BeforeFilter, Decorator, FailureAction, Filter, OnFailureFn};
pub use cors::{
    build_route_cors_map, CorsConfigError, CorsFilter, CorsFilterBuilder, OriginValidation,
    RouteCorsConfig, RouteCorsPolicy, CORS_ATTRIBUTE,
};
pub use phase::{CommittedResponse, PhaseError, RequestPhase};
pub use pipeline::{build_chain, Chain};
pub use tracing::TracingFilter;
