use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use regex::Regex;

use super::{CorsConfigError, CorsFilter, OriginValidation, RouteCorsConfig, RouteCorsPolicy};

/// Builder for [`CorsFilter`] with a fluent API
///
/// ```rust
/// use switchyard::middleware::CorsFilterBuilder;
/// use http::Method;
///
/// let cors = CorsFilterBuilder::new()
///     .allowed_origins(&["https://example.com", "https://api.example.com"])
///     .allowed_methods(&[Method::GET, Method::POST])
///     .allowed_headers(&["Content-Type", "X-Custom-Header"])
///     .allow_credentials(true)
///     .expose_headers(&["X-Total-Count"])
///     .max_age(3600)
///     .build()
///     .unwrap();
/// ```
pub struct CorsFilterBuilder {
    allowed_origins: Vec<String>,
    origin_patterns: Vec<String>,
    origin_validator: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
    route_policies: HashMap<String, RouteCorsPolicy>,
}

impl CorsFilterBuilder {
    /// A builder with secure defaults: no origins, `Content-Type` and
    /// `Authorization` headers, `GET, POST, PUT, DELETE, OPTIONS`, no
    /// credentials, no preflight caching
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed_origins: vec![],
            origin_patterns: vec![],
            origin_validator: None,
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_credentials: false,
            expose_headers: vec![],
            max_age: None,
            route_policies: HashMap::new(),
        }
    }

    /// Exact origins; `&["*"]` allows every origin
    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.allowed_origins = origins.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Regex origin patterns, e.g. `^https://.*\.example\.com$`
    #[must_use]
    pub fn origin_patterns(mut self, patterns: &[&str]) -> Self {
        self.origin_patterns = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Custom origin predicate; takes precedence over exact origins and patterns
    #[must_use]
    pub fn origin_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.origin_validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.allowed_methods = methods.to_vec();
        self
    }

    /// Allowed request headers; `&["*"]` allows all
    #[must_use]
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    #[must_use]
    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.expose_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Preflight cache duration in seconds
    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Route-specific policies keyed by route declaration, usually from
    /// [`build_route_cors_map`](super::build_route_cors_map)
    #[must_use]
    pub fn route_policies(mut self, policies: HashMap<String, RouteCorsPolicy>) -> Self {
        self.route_policies = policies;
        self
    }

    /// Validate the configuration and build the filter
    pub fn build(self) -> Result<CorsFilter, CorsConfigError> {
        let origin_validation = if let Some(validator) = self.origin_validator {
            OriginValidation::Custom(validator)
        } else if self.allowed_origins.iter().any(|o| o == "*") {
            OriginValidation::Wildcard
        } else if !self.origin_patterns.is_empty() {
            let patterns = self
                .origin_patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| CorsConfigError::InvalidOriginPattern {
                        pattern: p.clone(),
                        message: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            OriginValidation::Regex(patterns)
        } else {
            OriginValidation::Exact(self.allowed_origins)
        };

        let any_credentials = self.allow_credentials
            || self.route_policies.values().any(|p| {
                matches!(p, RouteCorsPolicy::Custom(c) if c.allow_credentials)
            });
        if any_credentials {
            match &origin_validation {
                OriginValidation::Wildcard => return Err(CorsConfigError::WildcardWithCredentials),
                OriginValidation::Exact(origins) if origins.is_empty() => {
                    return Err(CorsConfigError::EmptyOriginsWithCredentials)
                }
                _ => {}
            }
        }

        Ok(CorsFilter {
            origin_validation,
            defaults: RouteCorsConfig {
                allowed_headers: self.allowed_headers,
                allowed_methods: self.allowed_methods,
                allow_credentials: self.allow_credentials,
                expose_headers: self.expose_headers,
                max_age: self.max_age,
            },
            route_policies: self.route_policies,
        })
    }
}

impl Default for CorsFilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
