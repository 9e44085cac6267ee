//! # Dispatcher Module
//!
//! Request/response model, the handler type, and the transport-facing
//! [`Dispatcher`].
//!
//! ## Overview
//!
//! A transport (event-loop or thread-pool HTTP server, outside this crate)
//! hands the dispatcher a method, a raw path, the request headers and an
//! optional decoded body. The dispatcher:
//!
//! 1. Matches the request against the immutable [`Router`](crate::router::Router)
//! 2. Binds path variables, route name and attributes onto a
//!    [`HandlerRequest`]
//! 3. Negotiates `Content-Type` (415) and `Accept` (406)
//! 4. Runs the composed filter chain and handler
//! 5. Translates failures through an
//!    [`ErrorTranslator`](crate::error::ErrorTranslator)
//! 6. Returns a [`CommittedResponse`](crate::middleware::CommittedResponse)
//!
//! ## Handlers
//!
//! Any `Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync` is a
//! [`Handler`]:
//!
//! ```rust
//! use switchyard::dispatcher::{Dispatcher, HandlerResponse, HeaderVec};
//! use switchyard::router::RouterBuilder;
//! use http::Method;
//!
//! let mut builder = RouterBuilder::new();
//! builder
//!     .get("/pets/{id}", |req| {
//!         let id = req.get_path_param("id").unwrap_or_default().to_string();
//!         Ok(HandlerResponse::json(200, serde_json::json!({ "id": id })))
//!     })
//!     .unwrap();
//! let dispatcher = Dispatcher::new(builder.build().unwrap());
//!
//! let res = dispatcher.dispatch(Method::GET, "/pets/7", HeaderVec::new(), None);
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body()["id"], "7");
//! ```
//!
//! ## Error Handling
//!
//! - Unknown paths become 404, known paths with the wrong method 405 with
//!   `Allow`
//! - Handler failures keep their status; panics are caught and become 500
//! - Headers staged before a failure are dropped when
//!   `reset_headers_on_error` is set
//!
//! ## Concurrency
//!
//! Dispatch never blocks and shares nothing mutable between requests except
//! the parsed-header cache, which is a pure memo.

mod core;
mod dispatch;

pub use core::{
    collect_headers, handler, Handler, HandlerRequest, HandlerResponse, HandlerResult,
    HeaderLookup, HeaderVec, SharedHandler, MAX_INLINE_HEADERS,
};
pub use dispatch::{is_preflight, Dispatcher, FORWARDED_HEADERS};
