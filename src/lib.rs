//! # Switchyard
//!
//! **Switchyard** is the request-routing and content-negotiation core of an
//! HTTP framework: it compiles route declarations, matches requests to
//! handlers in a deterministic order, negotiates media types per RFC 7231,
//! and runs handlers inside a filter pipeline. Transports (HTTP listeners,
//! event loops, thread pools) stay outside; they call into the
//! [`Dispatcher`](dispatcher::Dispatcher) with `(method, path, headers)` and
//! write back the committed response.
//!
//! ## Architecture
//!
//! - **[`pattern`]** - Path pattern compiler: literals, `{name}` and
//!   `{name:regex}` variables, `*` wildcards, `**` globs, `*name` catch-alls,
//!   inline groups such as `*-*.js`, specificity scoring and reverse routing
//! - **[`media`]** - Media type model with wildcards and quality values
//! - **[`negotiation`]** - `Accept`/`Content-Type` negotiation, capability-set
//!   checks for CORS and a parsed-header cache
//! - **[`router`]** - Registration builder and the immutable route table
//! - **[`middleware`]** - `before`/`around`/`after` filters, the per-request
//!   phase state machine, CORS and tracing filters
//! - **[`dispatcher`]** - Request/response model, handler type and the
//!   transport-facing dispatcher
//! - **[`error`]** - [`HandlerFailure`](error::HandlerFailure) and the error
//!   translation collaborator
//! - **[`runtime_config`]** - Router options from the environment or
//!   YAML/TOML files
//! - **[`otel`]** - Logging initialization
//! - **[`ids`]** - ULID request ids
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant D as Dispatcher
//!     participant R as Router
//!     participant N as Negotiator
//!     participant C as Filter chain
//!     participant E as ErrorTranslator
//!
//!     T->>D: dispatch(method, path, headers, body)
//!     D->>R: match_route(method, path)
//!     alt NotFound / MethodNotAllowed
//!         D->>E: translate(404 / 405)
//!     else Matched
//!         D->>N: select_consumes / select_produces
//!         alt 415 / 406
//!             D->>E: translate
//!         else negotiated
//!             D->>C: before/around filters, handler, after filters
//!             C-->>D: response or HandlerFailure
//!             D->>E: translate (on failure)
//!         end
//!     end
//!     D-->>T: CommittedResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use switchyard::dispatcher::{Dispatcher, HandlerResponse, HeaderVec};
//! use switchyard::media::MediaType;
//! use switchyard::router::{RouteOptions, RouterBuilder};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let mut builder = RouterBuilder::new();
//! builder
//!     .route(
//!         Method::GET,
//!         "/pets/{id:[0-9]+}",
//!         |req| {
//!             let id = req.get_path_param("id").unwrap_or_default().to_string();
//!             Ok(HandlerResponse::json(200, serde_json::json!({ "id": id })))
//!         },
//!         RouteOptions::new().produces([MediaType::JSON]).name("pet"),
//!     )
//!     .unwrap();
//! let dispatcher = Dispatcher::new(builder.build().unwrap());
//!
//! let mut headers = HeaderVec::new();
//! headers.push((Arc::from("accept"), "application/json".to_string()));
//! let res = dispatcher.dispatch(Method::GET, "/pets/12", headers, None);
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.header("content-type"), Some("application/json"));
//!
//! let res = dispatcher.dispatch(Method::DELETE, "/pets/12", HeaderVec::new(), None);
//! assert_eq!(res.status(), 405);
//! assert_eq!(res.header("allow"), Some("GET, HEAD"));
//! ```
//!
//! ## Concurrency
//!
//! The route table, compiled patterns and media types are immutable once
//! [`RouterBuilder::build`](router::RouterBuilder::build) returns. Each
//! request owns its context; the parsed-header cache is the only shared
//! mutable state and is a pure memo of header parsing. Nothing blocks.
//!
//! ## Configuration
//!
//! See [`runtime_config`] for `SWITCHYARD_*` variables and file formats, and
//! [`otel`] for logging.

pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod media;
pub mod middleware;
pub mod negotiation;
pub mod otel;
pub mod pattern;
pub mod router;
pub mod runtime_config;

pub use dispatcher::{Dispatcher, HandlerRequest, HandlerResponse, HandlerResult};
pub use error::{ErrorTranslator, HandlerFailure};
pub use media::MediaType;
pub use router::{MatchResult, Router, RouterBuilder};
pub use runtime_config::RouterConfig;
