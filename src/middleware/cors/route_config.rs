use std::collections::HashMap;

use http::Method;
use serde_json::Value;

use super::CorsConfigError;
use crate::router::Router;

/// Route attribute carrying a route-specific CORS policy
pub const CORS_ATTRIBUTE: &str = "cors";

/// Route-specific CORS policy taken from the `cors` route attribute
///
/// - `Inherit`: use the filter's global configuration (default)
/// - `Disabled`: no CORS handling for this route
/// - `Custom`: route-specific methods, headers, credentials and caching
#[derive(Debug, Clone, PartialEq)]
pub enum RouteCorsPolicy {
    Inherit,
    Disabled,
    Custom(RouteCorsConfig),
}

/// Route-level override of the global CORS settings
///
/// Origins are never set per route; they always come from the filter's
/// global origin validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCorsConfig {
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allow_credentials: bool,
    pub expose_headers: Vec<String>,
    pub max_age: Option<u32>,
}

impl Default for RouteCorsConfig {
    fn default() -> Self {
        Self {
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
        }
    }
}

impl RouteCorsPolicy {
    /// Read a policy from a `cors` attribute value
    ///
    /// - missing or `"inherit"` -> `Inherit`
    /// - `false` -> `Disabled`
    /// - object with `allowedHeaders`, `allowedMethods`, `allowCredentials`,
    ///   `exposeHeaders`, `maxAge` -> `Custom`
    pub fn from_attribute(route: &str, value: Option<&Value>) -> Result<Self, CorsConfigError> {
        let value = match value {
            None => return Ok(RouteCorsPolicy::Inherit),
            Some(v) => v,
        };
        if value.as_bool() == Some(false) {
            return Ok(RouteCorsPolicy::Disabled);
        }
        if value.as_str() == Some("inherit") {
            return Ok(RouteCorsPolicy::Inherit);
        }
        let Some(obj) = value.as_object() else {
            return Err(CorsConfigError::InvalidRoutePolicy {
                route: route.to_string(),
                message: format!("unsupported cors attribute {value}"),
            });
        };

        let mut config = RouteCorsConfig::default();
        if let Some(headers) = obj.get("allowedHeaders") {
            config.allowed_headers = string_list(route, "allowedHeaders", headers)?;
        }
        if let Some(methods) = obj.get("allowedMethods") {
            config.allowed_methods = string_list(route, "allowedMethods", methods)?
                .into_iter()
                .map(|m| {
                    m.parse::<Method>()
                        .map_err(|_| CorsConfigError::InvalidMethod { method: m })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(creds) = obj.get("allowCredentials").and_then(Value::as_bool) {
            config.allow_credentials = creds;
        }
        if let Some(expose) = obj.get("exposeHeaders") {
            config.expose_headers = string_list(route, "exposeHeaders", expose)?;
        }
        if let Some(age) = obj.get("maxAge").and_then(Value::as_u64) {
            config.max_age = Some(u32::try_from(age).unwrap_or(u32::MAX));
        }
        Ok(RouteCorsPolicy::Custom(config))
    }
}

fn string_list(route: &str, key: &str, value: &Value) -> Result<Vec<String>, CorsConfigError> {
    let invalid = || CorsConfigError::InvalidRoutePolicy {
        route: route.to_string(),
        message: format!("'{key}' must be an array of strings"),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

/// Collect route-specific CORS policies from the routing table
///
/// Keyed by route declaration, so every method registered on a path shares
/// one policy; the first route declaring one wins. `Inherit` entries are not
/// stored. Called once at startup.
pub fn build_route_cors_map(
    router: &Router,
) -> Result<HashMap<String, RouteCorsPolicy>, CorsConfigError> {
    let mut map = HashMap::new();
    for route in router.routes() {
        let declaration = route.pattern().source();
        if map.contains_key(declaration) {
            continue;
        }
        match RouteCorsPolicy::from_attribute(declaration, route.attribute(CORS_ATTRIBUTE))? {
            RouteCorsPolicy::Inherit => {}
            policy => {
                map.insert(declaration.to_string(), policy);
            }
        }
    }
    Ok(map)
}
