use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::core::{collect_headers, Handler, HandlerRequest, HandlerResponse, HeaderLookup, HeaderVec};
use crate::error::{DefaultErrorTranslator, ErrorTranslator, HandlerFailure};
use crate::ids::REQUEST_ID_HEADER;
use crate::middleware::{CommittedResponse, RequestPhase};
use crate::negotiation::Negotiator;
use crate::router::{Endpoint, MatchResult, RouteMatch, Router};

/// Headers [`Dispatcher::dispatch_lookup`] copies out of a transport lookup
pub const FORWARDED_HEADERS: [&str; 8] = [
    "accept",
    "content-type",
    "origin",
    "host",
    "authorization",
    "access-control-request-method",
    "access-control-request-headers",
    REQUEST_ID_HEADER,
];

/// Transport-facing entry point: match, negotiate, run the chain, translate
/// failures, commit
///
/// Cheap to clone and safe to share across request threads; every request
/// owns its own [`HandlerRequest`].
///
/// | Outcome | Status |
/// |---|---|
/// | no route for the path | 404 |
/// | path known, method not | 405 with `Allow` |
/// | `Accept` not satisfiable | 406 |
/// | `Content-Type` not consumed | 415 |
/// | handler or filter failure | the failure's status |
/// | handler panic | 500 |
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    negotiator: Arc<Negotiator>,
    translator: Arc<dyn ErrorTranslator>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.routes().len())
            .field("negotiator", &self.negotiator)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher with the default negotiating error renderer
    #[must_use]
    pub fn new(router: Router) -> Self {
        let negotiator = Arc::new(Negotiator::new(router.config().negotiation_cache_capacity));
        let translator = Arc::new(DefaultErrorTranslator::new(Arc::clone(&negotiator)));
        Self {
            router: Arc::new(router),
            negotiator,
            translator,
        }
    }

    /// Replace the error translator
    #[must_use]
    pub fn with_translator<T: ErrorTranslator + 'static>(mut self, translator: T) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    /// Match only; no handler runs
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> MatchResult {
        self.router.match_route(method, path)
    }

    /// Dispatch with headers read through a transport lookup
    ///
    /// Only [`FORWARDED_HEADERS`] are copied; transports that need handlers
    /// to see more should build a [`HeaderVec`] and call
    /// [`dispatch`](Self::dispatch).
    pub fn dispatch_lookup(
        &self,
        method: Method,
        path: &str,
        headers: &dyn HeaderLookup,
        body: Option<Value>,
    ) -> CommittedResponse {
        let headers = collect_headers(FORWARDED_HEADERS, headers);
        self.dispatch(method, path, headers, body)
    }

    /// Process one request to a committed response
    ///
    /// Never panics on behalf of user code: handler panics become 500
    /// failures rendered by the error translator.
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        headers: HeaderVec,
        body: Option<Value>,
    ) -> CommittedResponse {
        let mut req = HandlerRequest::new(method, path, headers).with_body(body);
        let preflight = is_preflight(&req);
        let synthesize = preflight || self.router.config().synthesize_options;

        let route_match = match self.router.match_route_with(&req.method, &req.path, synthesize) {
            MatchResult::Matched(m) => m,
            MatchResult::NotFound => {
                let failure = HandlerFailure::not_found(format!("no route for {}", req.path));
                return self.fail(&mut req, &failure);
            }
            MatchResult::MethodNotAllowed(allow) => {
                let failure = HandlerFailure::new(
                    405,
                    format!("method {} not allowed for {}", req.method, req.path),
                );
                let allow_header = crate::router::join_methods(&allow);
                req.route_methods = allow;
                let mut res = self.render_failure(&mut req, &failure);
                res.set_header("allow", allow_header);
                return commit(&mut req, res);
            }
        };

        self.bind(&mut req, &route_match);

        if route_match.route().is_some() && !preflight {
            if let Err(failure) = self.negotiate(&mut req, &route_match) {
                return self.fail(&mut req, &failure);
            }
        }

        let chain = route_match.chain();
        let result = panic::catch_unwind(AssertUnwindSafe(|| chain.handle(&mut req)))
            .unwrap_or_else(|payload| {
                let failure = HandlerFailure::from_panic(payload.as_ref());
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    error = %failure,
                    "Filter chain panicked"
                );
                Err(failure)
            });

        match result {
            Ok(res) => {
                let res = finish_success(&req, res);
                commit(&mut req, res)
            }
            Err(failure) => self.fail(&mut req, &failure),
        }
    }

    /// Copy match results onto the request context
    fn bind(&self, req: &mut HandlerRequest, route_match: &RouteMatch) {
        req.path_params = route_match.path_params.clone();
        req.route_pattern = route_match.pattern().map(str::to_string);
        match route_match.route() {
            Some(route) => {
                req.route_name = route.name().map(str::to_string);
                req.attributes.extend(
                    route
                        .attributes()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
                req.route_methods = self.router.allowed_methods(&req.path);
            }
            None => {
                if let Endpoint::Options { allow, .. } = &route_match.endpoint {
                    req.route_methods = allow.clone();
                }
                // synthesized OPTIONS sees the attributes of every route on
                // the path; the first route to declare a key wins
                let on_path: Vec<_> = self
                    .router
                    .routes()
                    .iter()
                    .filter(|r| r.matches(&req.path).is_some())
                    .collect();
                for route in on_path {
                    for (key, value) in route.attributes() {
                        req.attributes
                            .entry(key.clone())
                            .or_insert_with(|| value.clone());
                    }
                }
            }
        }
    }

    /// Consumes (only when a body type is declared), then produces
    fn negotiate(&self, req: &mut HandlerRequest, route_match: &RouteMatch) -> Result<(), HandlerFailure> {
        let Some(route) = route_match.route() else {
            return Ok(());
        };

        let content_type = req.get_header("content-type").map(str::to_string);
        if let Some(content_type) = content_type {
            match self.negotiator.select_consumes(&content_type, route.consumes()) {
                Ok(media) => req.request_type = Some(media),
                Err(e) => {
                    debug!(
                        request_id = %req.request_id,
                        route = %route.pattern(),
                        content_type = %content_type,
                        "Negotiation failed"
                    );
                    return Err(e.into());
                }
            }
        }

        let selected = self
            .negotiator
            .select_produces(req.get_header("accept"), route.produces());
        match selected {
            Ok(media) => {
                req.response_type = Some(media);
                Ok(())
            }
            Err(e) => {
                debug!(
                    request_id = %req.request_id,
                    route = %route.pattern(),
                    accept = req.get_header("accept").unwrap_or(""),
                    "Negotiation failed"
                );
                Err(e.into())
            }
        }
    }

    fn fail(&self, req: &mut HandlerRequest, failure: &HandlerFailure) -> CommittedResponse {
        let res = self.render_failure(req, failure);
        commit(req, res)
    }

    /// Move the request to `FAILED` and let the translator render it
    fn render_failure(&self, req: &mut HandlerRequest, failure: &HandlerFailure) -> HandlerResponse {
        if req.phase() != RequestPhase::Failed {
            if let Err(e) = req.advance(RequestPhase::Failed) {
                warn!(request_id = %req.request_id, error = %e, "Could not mark request failed");
            }
        }

        if failure.status() >= 500 {
            error!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                status = failure.status(),
                error = %failure,
                cause = ?failure.cause(),
                suppressed = failure.suppressed().len(),
                "Handler failed"
            );
        } else {
            debug!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                status = failure.status(),
                error = %failure,
                "Request rejected"
            );
        }

        if self.router.config().reset_headers_on_error {
            req.response_headers.clear();
        }
        let mut res = self.translator.translate(req, failure);
        for (name, value) in &req.response_headers {
            res.set_header_if_absent(name, value.clone());
        }
        res
    }
}

/// Merge staged headers and the negotiated content type
fn finish_success(req: &HandlerRequest, mut res: HandlerResponse) -> HandlerResponse {
    for (name, value) in &req.response_headers {
        res.set_header_if_absent(name, value.clone());
    }
    if let Some(media) = req.response_type.as_ref().filter(|m| m.is_concrete()) {
        res.set_header_if_absent("content-type", media.to_string());
    }
    res
}

fn commit(req: &mut HandlerRequest, res: HandlerResponse) -> CommittedResponse {
    if req.phase() != RequestPhase::Committed {
        if let Err(e) = req.advance(RequestPhase::Committed) {
            warn!(request_id = %req.request_id, error = %e, "Committing from unexpected phase");
        }
    }
    debug!(
        request_id = %req.request_id,
        status = res.status,
        "Response committed"
    );
    CommittedResponse::new(res)
}

/// `OPTIONS` carrying both `Origin` and `Access-Control-Request-Method`
#[must_use]
pub fn is_preflight(req: &HandlerRequest) -> bool {
    req.method == Method::OPTIONS
        && req.get_header("origin").is_some()
        && req.get_header("access-control-request-method").is_some()
}
