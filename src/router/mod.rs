//! # Router Module
//!
//! Route registration and request matching.
//!
//! ## Overview
//!
//! Application code registers routes on a [`RouterBuilder`] during startup.
//! [`RouterBuilder::build`] freezes the registry into an immutable
//! [`Router`] that request tasks share without locks.
//!
//! ## Matching
//!
//! For a request `(method, path)` the router:
//!
//! 1. Collects every filter route whose pattern matches `path` (honoring its
//!    exclusions), in registration order. Filters never terminate matching.
//! 2. Walks terminal routes registered for `method`. When several match, the
//!    most specific pattern wins; equal specificity goes to the first
//!    registered.
//! 3. If only other methods match, returns
//!    [`MatchResult::MethodNotAllowed`] with the deduplicated methods in
//!    registration order (the `Allow` header of a 405).
//! 4. Otherwise returns [`MatchResult::NotFound`].
//!
//! `GET` routes answer `HEAD` unless an explicit `HEAD` route matches. With
//! `synthesize_options` enabled, `OPTIONS` on a known path is answered with
//! `Allow` unless the application registered `OPTIONS` itself.
//!
//! ## Composition
//!
//! [`RouterBuilder::mount`] rewrites a child builder's declarations under a
//! prefix at registration time. [`RouterBuilder::on`] tags registrations
//! with environments; `build` keeps only those matching
//! [`RouterConfig::environment`](crate::runtime_config::RouterConfig).
//!
//! ## Example
//!
//! ```rust
//! use switchyard::dispatcher::HandlerResponse;
//! use switchyard::router::{RouteOptions, RouterBuilder};
//! use http::Method;
//!
//! let mut builder = RouterBuilder::new();
//! builder
//!     .route(
//!         Method::GET,
//!         "/users/{id:[0-9]+}",
//!         |_req| Ok(HandlerResponse::empty(204)),
//!         RouteOptions::new().name("user"),
//!     )
//!     .unwrap();
//! let router = builder.build().unwrap();
//!
//! assert_eq!(router.url_for("user", &[("id", "42")]).unwrap(), "/users/42");
//! ```

mod core;
mod registry;
mod route;

pub(crate) use core::join_methods;
pub use core::{Endpoint, MatchResult, RouteMatch, Router};
pub use registry::RouterBuilder;
pub use route::{FilterRoute, Route, RouteError, RouteHandle, RouteOptions};
