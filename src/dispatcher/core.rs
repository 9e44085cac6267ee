//! Request, response and handler types - hot path for request dispatch.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::HandlerFailure;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::media::MediaType;
use crate::middleware::{PhaseError, RequestPhase};
use crate::pattern::ParamVec;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
///
/// Header names are `Arc<str>` so repeated names such as `content-type` are
/// shared; values are per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Outcome of a handler, a filter or a whole chain
pub type HandlerResult = Result<HandlerResponse, HandlerFailure>;

/// Header lookup supplied by the transport: `(name) -> value|null`
///
/// Implementations must compare names case-insensitively.
pub trait HeaderLookup {
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderLookup for HeaderVec {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl HeaderLookup for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl HeaderLookup for http::HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Copy the headers a lookup knows about into a [`HeaderVec`]
pub fn collect_headers<'a, I>(names: I, lookup: &dyn HeaderLookup) -> HeaderVec
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            lookup
                .header(name)
                .map(|value| (Arc::from(name), value.to_string()))
        })
        .collect()
}

/// Per-request context handed to filters and handlers
///
/// Owned by the task processing the request; nothing in it is shared with
/// other requests. Filters may stage response headers and attributes that
/// later stages observe.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Raw request path as received
    pub path: String,
    /// Declaration of the matched route, e.g. `/users/{id}`
    pub route_pattern: Option<String>,
    /// Name of the matched route, if it was registered with one
    pub route_name: Option<String>,
    /// Path variables in declaration order (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// Request headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    pub body: Option<Value>,
    /// Route attributes, extended by filters
    pub attributes: HashMap<String, Value>,
    /// Media type chosen by produces negotiation
    pub response_type: Option<MediaType>,
    /// Media type chosen by consumes negotiation
    pub request_type: Option<MediaType>,
    /// Methods whose routes structurally match `path`, for `Allow`
    pub route_methods: Vec<Method>,
    /// Headers staged for the response; cleared on failure when configured
    pub response_headers: HeaderVec,
    phase: RequestPhase,
}

impl HandlerRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderVec) -> Self {
        let request_id = RequestId::from_header(headers.header(REQUEST_ID_HEADER));
        Self {
            request_id,
            method,
            path: path.into(),
            route_pattern: None,
            route_name: None,
            path_params: ParamVec::new(),
            headers,
            body: None,
            attributes: HashMap::new(),
            response_type: None,
            request_type: None,
            route_methods: Vec::new(),
            response_headers: HeaderVec::new(),
            phase: RequestPhase::Pending,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: for `/org/{id}/user/*rest` style
    /// captures sharing a name across mounted prefixes, the deepest wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.header(name)
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    #[must_use]
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Move the request to `next`, rejecting illegal transitions
    pub fn advance(&mut self, next: RequestPhase) -> Result<(), PhaseError> {
        self.phase = self.phase.advance(next)?;
        Ok(())
    }

    /// Stage a response header; rejected once the response is committed
    pub fn stage_header(&mut self, name: &str, value: String) -> Result<(), PhaseError> {
        if self.phase == RequestPhase::Committed {
            return Err(PhaseError::Committed {
                write: "header",
                name: name.to_string(),
            });
        }
        self.response_headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.response_headers.push((Arc::from(name), value));
        Ok(())
    }

    #[must_use]
    pub fn staged_header(&self, name: &str) -> Option<&str> {
        self.response_headers.header(name)
    }

    /// Convert path_params to a map
    /// Note: This allocates - use get_path_param() in hot paths
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced by a handler, a short-circuiting filter, or the error
/// translator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Plain text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/plain".to_string()));
        Self {
            status,
            headers,
            body: Value::String(body.into()),
        }
    }

    /// Empty-bodied response with only a status
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Value::Null)
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.header(name)
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Add a header unless one with that name is already present
    pub fn set_header_if_absent(&mut self, name: &str, value: String) {
        if self.get_header(name).is_none() {
            self.headers.push((Arc::from(name), value));
        }
    }
}

/// A terminal request handler
///
/// Closures of the shape `Fn(&mut HandlerRequest) -> HandlerResult` are
/// handlers. Handlers must be shareable across request threads.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync,
{
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult {
        self(req)
    }
}

/// Shared handler reference stored in routes
pub type SharedHandler = Arc<dyn Handler>;

/// Box a closure into a [`SharedHandler`]
pub fn handler<F>(f: F) -> SharedHandler
where
    F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}
