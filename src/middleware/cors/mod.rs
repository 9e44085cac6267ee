mod builder;
mod error;
mod route_config;

pub use builder::CorsFilterBuilder;
pub use error::CorsConfigError;
pub use route_config::{build_route_cors_map, RouteCorsConfig, RouteCorsPolicy, CORS_ATTRIBUTE};

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Decorator, PhaseError};
use crate::dispatcher::{is_preflight, Handler, HandlerRequest, HandlerResponse, HandlerResult, HeaderVec};
use crate::negotiation::{negotiate_capabilities, parse_capability_list};
use crate::router::join_methods;

/// CORS (Cross-Origin Resource Sharing) filter
///
/// Registered as an `around` filter, usually on `*`. Preflight requests
/// (`OPTIONS` carrying `Access-Control-Request-Method`) are answered here
/// without reaching a user handler:
///
/// - origin not allowed: `403`, no `Access-Control-Allow-*` headers
/// - requested method or headers outside the allowed sets: `403`
/// - otherwise `200` with the `Access-Control-Allow-*` headers and an
///   `Allow` header listing the methods routed for the path
///
/// The method and header checks are a capability negotiation: exact,
/// case-insensitive, unordered set containment. Whether a route exists for
/// the requested method does not matter.
///
/// Route policies come from [`CorsFilterBuilder::route_policies`] or, for
/// routes not listed there, from the route's `cors` attribute.
///
/// For actual cross-origin requests the CORS headers are staged on the
/// request before the rest of the chain runs. Same-origin requests pass
/// through untouched. Every response produced here carries `Vary: Origin`.
///
/// # Credentials
///
/// Wildcard origins cannot be combined with credentials; the builder rejects
/// that configuration.
pub struct CorsFilter {
    pub(crate) origin_validation: OriginValidation,
    pub(crate) defaults: RouteCorsConfig,
    /// Route-specific policies keyed by route declaration
    pub(crate) route_policies: HashMap<String, RouteCorsPolicy>,
}

/// Origin validation strategy
#[derive(Clone)]
pub enum OriginValidation {
    Exact(Vec<String>),
    /// Allow all origins
    Wildcard,
    Regex(Vec<Regex>),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl std::fmt::Debug for OriginValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginValidation::Exact(origins) => f.debug_tuple("Exact").field(origins).finish(),
            OriginValidation::Wildcard => write!(f, "Wildcard"),
            OriginValidation::Regex(patterns) => f
                .debug_tuple("Regex")
                .field(&patterns.iter().map(Regex::as_str).collect::<Vec<_>>())
                .finish(),
            OriginValidation::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

impl OriginValidation {
    fn is_allowed(&self, origin: &str) -> bool {
        match self {
            OriginValidation::Exact(origins) => origins.iter().any(|o| o == origin),
            OriginValidation::Wildcard => true,
            OriginValidation::Regex(patterns) => patterns.iter().any(|re| re.is_match(origin)),
            OriginValidation::Custom(validator) => validator(origin),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, OriginValidation::Wildcard)
    }
}

impl CorsFilter {
    /// Permissive configuration for development: every origin, common
    /// methods, no credentials
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            origin_validation: OriginValidation::Wildcard,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn origin_validation(&self) -> &OriginValidation {
        &self.origin_validation
    }

    /// Settings used for routes without their own policy
    #[must_use]
    pub fn defaults(&self) -> &RouteCorsConfig {
        &self.defaults
    }

    /// Settings in force for the matched route; `None` when CORS is disabled
    ///
    /// Policies registered through the builder take precedence over a `cors`
    /// attribute carried on the request.
    fn settings_for<'a>(&'a self, req: &HandlerRequest) -> Option<Cow<'a, RouteCorsConfig>> {
        let route = req.route_pattern.as_deref().unwrap_or_default();
        let policy = match self.route_policies.get(route) {
            Some(policy) => Cow::Borrowed(policy),
            None => match RouteCorsPolicy::from_attribute(route, req.attribute(CORS_ATTRIBUTE)) {
                Ok(policy) => Cow::Owned(policy),
                Err(e) => {
                    warn!(route = %route, error = %e, "Ignoring invalid route CORS policy");
                    Cow::Owned(RouteCorsPolicy::Inherit)
                }
            },
        };
        let settings = match policy {
            Cow::Borrowed(RouteCorsPolicy::Disabled) | Cow::Owned(RouteCorsPolicy::Disabled) => {
                return None
            }
            Cow::Borrowed(RouteCorsPolicy::Custom(c)) => Cow::Borrowed(c),
            Cow::Owned(RouteCorsPolicy::Custom(c)) => Cow::Owned(c),
            Cow::Borrowed(RouteCorsPolicy::Inherit) | Cow::Owned(RouteCorsPolicy::Inherit) => {
                Cow::Borrowed(&self.defaults)
            }
        };
        Some(settings)
    }

    /// Credentials are never sent alongside a wildcard origin
    fn credentials(&self, settings: &RouteCorsConfig) -> bool {
        settings.allow_credentials && !self.origin_validation.is_wildcard()
    }

    /// The value for `Access-Control-Allow-Origin`, if the origin is allowed
    fn validate_origin(&self, origin: &str) -> Option<String> {
        if !self.origin_validation.is_allowed(origin) {
            return None;
        }
        if self.origin_validation.is_wildcard() {
            Some("*".to_string())
        } else {
            Some(origin.to_string())
        }
    }

    /// Same-origin requests carry an `Origin` whose host matches `Host`
    fn is_same_origin(&self, req: &HandlerRequest, origin: &str) -> bool {
        let Some(host) = req.get_header("host") else {
            return false;
        };
        let Some((_, origin_host_port)) = origin.split_once("://") else {
            return false;
        };
        let origin_host = origin_host_port
            .split(':')
            .next()
            .unwrap_or(origin_host_port);
        host.eq_ignore_ascii_case(origin_host) || host.eq_ignore_ascii_case(origin_host_port)
    }

    fn preflight(&self, req: &HandlerRequest, origin: &str, settings: &RouteCorsConfig) -> HandlerResponse {
        let Some(allowed_origin) = self.validate_origin(origin) else {
            warn!(origin = %origin, path = %req.path, "CORS preflight: origin not allowed");
            return forbidden();
        };

        let requested_method = req
            .get_header("access-control-request-method")
            .unwrap_or_default()
            .trim();
        if let Err(e) = negotiate_capabilities([requested_method], settings.allowed_methods.as_slice()) {
            warn!(
                method = %requested_method,
                path = %req.path,
                error = %e,
                "CORS preflight: method not allowed"
            );
            return forbidden();
        }

        if let Some(requested_headers) = req.get_header("access-control-request-headers") {
            let requested = parse_capability_list(requested_headers);
            if let Err(e) = negotiate_capabilities(requested, settings.allowed_headers.as_slice()) {
                warn!(path = %req.path, error = %e, "CORS preflight: header not allowed");
                return forbidden();
            }
        }

        let mut headers = HeaderVec::new();
        headers.push((Arc::from("access-control-allow-origin"), allowed_origin));
        headers.push((
            Arc::from("access-control-allow-methods"),
            join_methods(&settings.allowed_methods),
        ));
        headers.push((
            Arc::from("access-control-allow-headers"),
            settings.allowed_headers.join(", "),
        ));
        if self.credentials(settings) {
            headers.push((
                Arc::from("access-control-allow-credentials"),
                "true".to_string(),
            ));
        }
        if let Some(age) = settings.max_age {
            headers.push((Arc::from("access-control-max-age"), age.to_string()));
        }
        if !req.route_methods.is_empty() {
            headers.push((Arc::from("allow"), join_methods(&req.route_methods)));
        }
        headers.push((Arc::from("vary"), "Origin".to_string()));

        debug!(origin = %origin, path = %req.path, "CORS preflight accepted");
        HandlerResponse::new(200, headers, Value::Null)
    }

    fn stage_actual(
        &self,
        req: &mut HandlerRequest,
        allowed_origin: String,
        settings: &RouteCorsConfig,
    ) -> Result<(), PhaseError> {
        req.stage_header("access-control-allow-origin", allowed_origin)?;
        if self.credentials(settings) {
            req.stage_header("access-control-allow-credentials", "true".to_string())?;
        }
        if !settings.expose_headers.is_empty() {
            req.stage_header(
                "access-control-expose-headers",
                settings.expose_headers.join(", "),
            )?;
        }
        req.stage_header("vary", "Origin".to_string())
    }
}

impl Default for CorsFilter {
    /// Secure default: no origins allowed until configured
    fn default() -> Self {
        Self {
            origin_validation: OriginValidation::Exact(vec![]),
            defaults: RouteCorsConfig::default(),
            route_policies: HashMap::new(),
        }
    }
}

impl Decorator for CorsFilter {
    fn apply(&self, req: &mut HandlerRequest, next: &dyn Handler) -> HandlerResult {
        let Some(origin) = req.get_header("origin").map(str::to_string) else {
            return next.handle(req);
        };
        let Some(settings) = self.settings_for(req) else {
            debug!(path = %req.path, "CORS disabled for route");
            return next.handle(req);
        };

        if is_preflight(req) {
            return Ok(self.preflight(req, &origin, &settings));
        }

        if self.is_same_origin(req, &origin) {
            debug!(origin = %origin, "CORS: same-origin request, skipping CORS headers");
            return next.handle(req);
        }

        let Some(allowed_origin) = self.validate_origin(&origin) else {
            warn!(origin = %origin, path = %req.path, "CORS: origin not allowed");
            return Ok(forbidden());
        };
        self.stage_actual(req, allowed_origin, &settings)?;
        next.handle(req)
    }
}

fn forbidden() -> HandlerResponse {
    let mut res = HandlerResponse::empty(403);
    res.set_header("vary", "Origin".to_string());
    res
}
