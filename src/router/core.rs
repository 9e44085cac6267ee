//! Router core module - hot path for request matching.
//!
//! Matching walks the immutable route table built by
//! [`RouterBuilder`](super::RouterBuilder). Nothing here mutates shared state;
//! every match result is owned by the calling request.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use super::route::{FilterRoute, Route, RouteError};
use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse, HandlerResult, SharedHandler};
use crate::middleware::{build_chain, Chain, Filter};
use crate::pattern::ParamVec;
use crate::runtime_config::RouterConfig;

/// Outcome of matching a method and path against the route table
#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched(RouteMatch),
    /// The path matches routes for other methods only; deduplicated, in
    /// registration order
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl MatchResult {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }

    /// The matched route, if any
    #[must_use]
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            MatchResult::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// What a successful match invokes
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// A user-registered terminal route
    Route(Arc<Route>),
    /// Synthesized `OPTIONS` responder answering with `Allow`
    Options {
        allow: Vec<Method>,
        /// Declaration of the first route whose pattern matched the path
        pattern: Option<String>,
    },
}

/// Result of successfully matching a request to an endpoint
///
/// Carries the extracted path variables and every filter route that applies
/// to the request, in registration order.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub endpoint: Endpoint,
    /// Raw variable values in declaration order
    pub path_params: ParamVec,
    pub filters: Vec<Arc<FilterRoute>>,
}

impl RouteMatch {
    /// The matched user route; `None` for a synthesized `OPTIONS` response
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        match &self.endpoint {
            Endpoint::Route(route) => Some(route),
            Endpoint::Options { .. } => None,
        }
    }

    #[must_use]
    pub fn is_synthetic_options(&self) -> bool {
        matches!(self.endpoint, Endpoint::Options { .. })
    }

    /// Source declaration of the matched pattern
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match &self.endpoint {
            Endpoint::Route(route) => Some(route.pattern().source()),
            Endpoint::Options { pattern, .. } => pattern.as_deref(),
        }
    }

    /// Last occurrence wins for repeated names
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Compose the applicable filters around the endpoint
    #[must_use]
    pub fn chain(&self) -> Chain {
        let filters: Vec<Filter> = self.filters.iter().map(|f| f.filter().clone()).collect();
        let terminal: SharedHandler = match &self.endpoint {
            Endpoint::Route(route) => Arc::clone(route.handler()),
            Endpoint::Options { allow, .. } => Arc::new(OptionsResponder {
                allow: join_methods(allow),
            }),
        };
        build_chain(&filters, terminal)
    }
}

struct OptionsResponder {
    allow: String,
}

impl Handler for OptionsResponder {
    fn handle(&self, _req: &mut HandlerRequest) -> HandlerResult {
        let mut res = HandlerResponse::empty(200);
        res.set_header("allow", self.allow.clone());
        Ok(res)
    }
}

/// Immutable route table
///
/// Built once by [`RouterBuilder::build`](super::RouterBuilder::build) and
/// shared read-only across request tasks.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    filters: Vec<Arc<FilterRoute>>,
    names: HashMap<String, usize>,
    config: RouterConfig,
}

impl Router {
    pub(crate) fn from_parts(
        routes: Vec<Arc<Route>>,
        filters: Vec<Arc<FilterRoute>>,
        names: HashMap<String, usize>,
        config: RouterConfig,
    ) -> Self {
        Self {
            routes,
            filters,
            names,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Terminal routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Filter routes in registration order
    #[must_use]
    pub fn filters(&self) -> &[Arc<FilterRoute>] {
        &self.filters
    }

    /// Terminal routes registered for `method`, in registration order
    pub fn routes_for<'a>(&'a self, method: &'a Method) -> impl Iterator<Item = &'a Arc<Route>> {
        self.routes.iter().filter(move |r| r.method() == method)
    }

    #[must_use]
    pub fn route_by_name(&self, name: &str) -> Option<&Arc<Route>> {
        self.names.get(name).and_then(|&idx| self.routes.get(idx))
    }

    /// Reverse routing: expand the named route's pattern with `params`
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        let route = self
            .route_by_name(name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        Ok(route.pattern().expand(params)?)
    }

    /// Methods with a structurally matching route for `path`, deduplicated
    /// in registration order
    ///
    /// `HEAD` follows `GET` when only `GET` is registered. `OPTIONS` is
    /// appended when synthesized responses are enabled.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.allowed_methods_with(path, self.config.synthesize_options)
    }

    fn allowed_methods_with(&self, path: &str, synthesize: bool) -> Vec<Method> {
        let mut allow: Vec<Method> = Vec::new();
        for route in &self.routes {
            if allow.contains(route.method()) || route.matches(path).is_none() {
                continue;
            }
            allow.push(route.method().clone());
        }
        if let Some(pos) = allow.iter().position(|m| *m == Method::GET) {
            if !allow.contains(&Method::HEAD) {
                allow.insert(pos + 1, Method::HEAD);
            }
        }
        if synthesize && !allow.is_empty() && !allow.contains(&Method::OPTIONS) {
            allow.push(Method::OPTIONS);
        }
        allow
    }

    /// Match using the configured `synthesize_options` setting
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> MatchResult {
        self.match_route_with(method, path, self.config.synthesize_options)
    }

    /// Match, forcing synthesized `OPTIONS` on or off
    #[must_use]
    pub fn match_route_with(&self, method: &Method, path: &str, synthesize: bool) -> MatchResult {
        let mut served_as_get = false;
        let found = match self.best_route(method, path) {
            None if *method == Method::HEAD => {
                served_as_get = true;
                self.best_route(&Method::GET, path)
            }
            found => found,
        };

        // a HEAD answered by a GET route also runs the GET-scoped filters
        let filters: Vec<Arc<FilterRoute>> = self
            .filters
            .iter()
            .filter(|f| {
                f.applies(method, path) || (served_as_get && f.applies(&Method::GET, path))
            })
            .cloned()
            .collect();

        if let Some((route, path_params)) = found {
            debug!(
                method = %method,
                path = %path,
                route = %route.pattern(),
                filters = filters.len(),
                "Route matched"
            );
            return MatchResult::Matched(RouteMatch {
                endpoint: Endpoint::Route(Arc::clone(route)),
                path_params,
                filters,
            });
        }

        let allow = self.allowed_methods_with(path, synthesize);
        if allow.is_empty() {
            debug!(method = %method, path = %path, "No route matched");
            return MatchResult::NotFound;
        }

        if synthesize && *method == Method::OPTIONS {
            let first = self.routes.iter().find_map(|r| {
                let params = r.matches(path)?;
                Some((r.pattern().source().to_string(), params))
            });
            let (pattern, path_params) = match first {
                Some((pattern, params)) => (Some(pattern), params),
                None => (None, ParamVec::new()),
            };
            debug!(path = %path, allow = ?allow, "Synthesized OPTIONS");
            return MatchResult::Matched(RouteMatch {
                endpoint: Endpoint::Options { allow, pattern },
                path_params,
                filters,
            });
        }

        debug!(method = %method, path = %path, allow = ?allow, "Method not allowed");
        MatchResult::MethodNotAllowed(allow)
    }

    /// Highest specificity wins; ties go to the first registered
    fn best_route(&self, method: &Method, path: &str) -> Option<(&Arc<Route>, ParamVec)> {
        let mut best: Option<(&Arc<Route>, ParamVec)> = None;
        for route in self.routes.iter().filter(|r| r.method() == method) {
            let Some(params) = route.matches(path) else {
                continue;
            };
            let better = best.as_ref().map_or(true, |(current, _)| {
                route.pattern().specificity() > current.pattern().specificity()
            });
            if better {
                best = Some((route, params));
            }
        }
        best
    }

    /// Log the route table, one event per route
    pub fn dump_routes(&self) {
        info!(
            routes_count = self.routes.len(),
            filters_count = self.filters.len(),
            environment = %self.config.environment,
            "Route table"
        );
        for route in &self.routes {
            info!(
                method = %route.method(),
                route = %route.pattern(),
                name = route.name().unwrap_or(""),
                produces = ?route.produces(),
                consumes = ?route.consumes(),
                "Route"
            );
        }
        for filter in &self.filters {
            info!(
                method = filter.method().map_or("*", Method::as_str),
                route = %filter.pattern(),
                kind = filter.filter().kind(),
                "Filter"
            );
        }
    }
}

pub(crate) fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
