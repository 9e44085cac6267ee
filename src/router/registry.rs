use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use super::core::Router;
use super::route::{FilterRoute, Route, RouteError, RouteHandle, RouteOptions};
use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse, HandlerResult, SharedHandler};
use crate::error::HandlerFailure;
use crate::media::MediaType;
use crate::middleware::{AfterFilter, AfterFn, Filter};
use crate::pattern::{join_declarations, PathPattern};
use crate::runtime_config::RouterConfig;

/// Registration-time builder producing one immutable [`Router`]
///
/// Patterns are compiled as they are registered, so a malformed declaration
/// fails the registration call. Routes and filters keep registration order,
/// including routes added through [`mount`](Self::mount) and
/// [`on`](Self::on) blocks.
///
/// ```rust
/// use switchyard::dispatcher::HandlerResponse;
/// use switchyard::router::{MatchResult, RouterBuilder};
/// use http::Method;
///
/// let mut builder = RouterBuilder::new();
/// builder
///     .get("/pets/{id}", |req| {
///         let id = req.get_path_param("id").unwrap_or_default().to_string();
///         Ok(HandlerResponse::json(200, serde_json::json!({ "id": id })))
///     })
///     .unwrap();
/// let router = builder.build().unwrap();
///
/// assert!(matches!(router.match_route(&Method::GET, "/pets/7"), MatchResult::Matched(_)));
/// assert!(matches!(router.match_route(&Method::POST, "/pets/7"), MatchResult::MethodNotAllowed(_)));
/// ```
pub struct RouterBuilder {
    config: RouterConfig,
    routes: Vec<Route>,
    filters: Vec<FilterRoute>,
    env_scope: Option<Vec<String>>,
    next_id: usize,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    /// A builder using the default [`RouterConfig`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            filters: Vec::new(),
            env_scope: None,
            next_id: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn compile(&self, declaration: &str) -> Result<PathPattern, RouteError> {
        Ok(PathPattern::compile_with(declaration, self.config.normalize_path)?)
    }

    /// Register a terminal route
    pub fn route<H>(
        &mut self,
        method: Method,
        declaration: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<RouteHandle, RouteError>
    where
        H: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route_handler(method, declaration, Arc::new(handler), options)
    }

    /// Register a terminal route with an already shared handler
    pub fn route_handler(
        &mut self,
        method: Method,
        declaration: &str,
        handler: SharedHandler,
        options: RouteOptions,
    ) -> Result<RouteHandle, RouteError> {
        let pattern = self.compile(declaration)?;
        let excludes = options
            .excludes
            .iter()
            .map(|e| self.compile(e))
            .collect::<Result<Vec<_>, _>>()?;
        let produces = non_empty(options.produces);
        let consumes = non_empty(options.consumes);

        let id = self.next_id;
        self.next_id += 1;
        debug!(
            method = %method,
            route = %declaration,
            name = ?options.name,
            "Route registered"
        );
        self.routes.push(Route {
            id,
            method,
            pattern,
            produces,
            consumes,
            handler,
            name: options.name,
            attributes: options.attributes,
            excludes,
            environments: self.env_scope.clone(),
        });
        Ok(RouteHandle { id })
    }

    pub fn get<H>(&mut self, declaration: &str, handler: H) -> Result<RouteHandle, RouteError>
    where
        H: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::GET, declaration, handler, RouteOptions::default())
    }

    pub fn post<H>(&mut self, declaration: &str, handler: H) -> Result<RouteHandle, RouteError>
    where
        H: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::POST, declaration, handler, RouteOptions::default())
    }

    pub fn put<H>(&mut self, declaration: &str, handler: H) -> Result<RouteHandle, RouteError>
    where
        H: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PUT, declaration, handler, RouteOptions::default())
    }

    pub fn delete<H>(&mut self, declaration: &str, handler: H) -> Result<RouteHandle, RouteError>
    where
        H: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::DELETE, declaration, handler, RouteOptions::default())
    }

    pub fn patch<H>(&mut self, declaration: &str, handler: H) -> Result<RouteHandle, RouteError>
    where
        H: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PATCH, declaration, handler, RouteOptions::default())
    }

    /// Register a filter for `method` (`None` = every method) on paths
    /// matching `declaration`
    pub fn filter(
        &mut self,
        method: Option<Method>,
        declaration: &str,
        filter: Filter,
    ) -> Result<(), RouteError> {
        let pattern = self.compile(declaration)?;
        debug!(route = %declaration, kind = filter.kind(), "Filter registered");
        self.filters.push(FilterRoute {
            method,
            pattern,
            excludes: Vec::new(),
            filter,
            environments: self.env_scope.clone(),
        });
        Ok(())
    }

    /// Like [`filter`](Self::filter), skipping paths that match any of
    /// `excludes`
    pub fn filter_excluding(
        &mut self,
        method: Option<Method>,
        declaration: &str,
        excludes: &[&str],
        filter: Filter,
    ) -> Result<(), RouteError> {
        let excludes = excludes
            .iter()
            .map(|e| self.compile(e))
            .collect::<Result<Vec<_>, _>>()?;
        self.filter(method, declaration, filter)?;
        if let Some(last) = self.filters.last_mut() {
            last.excludes = excludes;
        }
        Ok(())
    }

    /// `before` filter for every method
    pub fn before<F>(&mut self, declaration: &str, filter: F) -> Result<(), RouteError>
    where
        F: Fn(&mut HandlerRequest) -> Result<Option<HandlerResponse>, HandlerFailure>
            + Send
            + Sync
            + 'static,
    {
        self.filter(None, declaration, Filter::Before(Arc::new(filter)))
    }

    /// `around` filter for every method
    pub fn around<F>(&mut self, declaration: &str, filter: F) -> Result<(), RouteError>
    where
        F: Fn(&mut HandlerRequest, &dyn Handler) -> HandlerResult + Send + Sync + 'static,
    {
        self.filter(None, declaration, Filter::Around(Arc::new(filter)))
    }

    /// `after` filter transforming successful responses, for every method
    pub fn after<F>(&mut self, declaration: &str, filter: F) -> Result<(), RouteError>
    where
        F: Fn(&mut HandlerRequest, HandlerResponse) -> HandlerResult + Send + Sync + 'static,
    {
        self.filter(None, declaration, Filter::After(Arc::new(AfterFn(filter))))
    }

    /// `after` filter with failure handling, for every method
    pub fn after_filter<A>(&mut self, declaration: &str, filter: A) -> Result<(), RouteError>
    where
        A: AfterFilter + 'static,
    {
        self.filter(None, declaration, Filter::After(Arc::new(filter)))
    }

    /// Append every route and filter of `child` under `prefix`
    ///
    /// Child declarations are rewritten and recompiled here, so dispatch
    /// never pays for composition. Handles returned by the child builder do
    /// not identify the mounted copies.
    pub fn mount(&mut self, prefix: &str, child: RouterBuilder) -> Result<(), RouteError> {
        let count = child.routes.len();
        for route in child.routes {
            let pattern = self.compile(&join_declarations(prefix, route.pattern.source()))?;
            let excludes = route
                .excludes
                .iter()
                .map(|e| self.compile(&join_declarations(prefix, e.source())))
                .collect::<Result<Vec<_>, _>>()?;
            let id = self.next_id;
            self.next_id += 1;
            self.routes.push(Route {
                id,
                pattern,
                excludes,
                environments: merge_envs(self.env_scope.as_deref(), route.environments),
                ..route
            });
        }
        for filter in child.filters {
            let pattern = self.compile(&join_declarations(prefix, filter.pattern.source()))?;
            let excludes = filter
                .excludes
                .iter()
                .map(|e| self.compile(&join_declarations(prefix, e.source())))
                .collect::<Result<Vec<_>, _>>()?;
            self.filters.push(FilterRoute {
                pattern,
                excludes,
                environments: merge_envs(self.env_scope.as_deref(), filter.environments),
                ..filter
            });
        }
        debug!(prefix = %prefix, routes = count, "Router mounted");
        Ok(())
    }

    /// Register routes that exist only when the configured environment is
    /// one of `envs`
    ///
    /// Blocks nest; a nested block keeps the environments common to both.
    pub fn on<F>(&mut self, envs: &[&str], register: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut RouterBuilder) -> Result<(), RouteError>,
    {
        let scope: Vec<String> = envs.iter().map(|e| e.to_string()).collect();
        let previous = self.env_scope.take();
        self.env_scope = merge_envs(previous.as_deref(), Some(scope));
        let result = register(self);
        self.env_scope = previous;
        result
    }

    /// Freeze the registry into an immutable [`Router`]
    ///
    /// Routes and filters tagged for other environments are dropped. Route
    /// names must be unique among the routes that remain.
    pub fn build(self) -> Result<Router, RouteError> {
        let environment = self.config.environment.clone();
        let active = |envs: &Option<Vec<String>>| {
            envs.as_ref()
                .map_or(true, |list| list.iter().any(|e| e.eq_ignore_ascii_case(&environment)))
        };

        let registered = self.routes.len();
        let routes: Vec<Arc<Route>> = self
            .routes
            .into_iter()
            .filter(|r| active(&r.environments))
            .map(Arc::new)
            .collect();
        let filters: Vec<Arc<FilterRoute>> = self
            .filters
            .into_iter()
            .filter(|f| active(&f.environments))
            .map(Arc::new)
            .collect();

        let mut names = HashMap::new();
        for (idx, route) in routes.iter().enumerate() {
            if let Some(name) = &route.name {
                if names.insert(name.clone(), idx).is_some() {
                    return Err(RouteError::DuplicateName(name.clone()));
                }
            }
        }

        let routes_summary: Vec<String> = routes.iter().take(10).map(|r| r.to_string()).collect();
        info!(
            routes_count = routes.len(),
            filters_count = filters.len(),
            skipped_by_environment = registered - routes.len(),
            environment = %environment,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Router::from_parts(routes, filters, names, self.config))
    }
}

fn non_empty(types: Vec<MediaType>) -> Vec<MediaType> {
    if types.is_empty() {
        vec![MediaType::ALL]
    } else {
        types
    }
}

/// Effective environments of a registration made inside `outer`
fn merge_envs(outer: Option<&[String]>, inner: Option<Vec<String>>) -> Option<Vec<String>> {
    match (outer, inner) {
        (None, inner) => inner,
        (Some(outer), None) => Some(outer.to_vec()),
        (Some(outer), Some(inner)) => Some(
            inner
                .into_iter()
                .filter(|e| outer.iter().any(|o| o.eq_ignore_ascii_case(e)))
                .collect(),
        ),
    }
}
