use thiserror::Error;

/// CORS configuration error
///
/// Returned by `CorsFilterBuilder::build()` and by route policy extraction
/// when the configuration violates CORS requirements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be used with credentials
    #[error(
        "CORS configuration error: Cannot use wildcard origin (*) with credentials. \
         When allow_credentials is true, you must specify exact origins."
    )]
    WildcardWithCredentials,
    /// When credentials are allowed at least one origin must be listed
    #[error(
        "CORS configuration error: Cannot use credentials with empty origins list. \
         When allow_credentials is true, at least one origin must be specified."
    )]
    EmptyOriginsWithCredentials,
    #[error("CORS configuration error: Invalid origin pattern '{pattern}': {message}")]
    InvalidOriginPattern { pattern: String, message: String },
    #[error("CORS configuration error: Invalid method '{method}'")]
    InvalidMethod { method: String },
    #[error("CORS configuration error: route '{route}': {message}")]
    InvalidRoutePolicy { route: String, message: String },
}
