use std::collections::HashMap;
use std::fmt;

use http::Method;
use serde_json::Value;
use thiserror::Error;

use crate::dispatcher::SharedHandler;
use crate::media::MediaType;
use crate::middleware::Filter;
use crate::pattern::{ParamVec, PathPattern, PatternError};

/// Registration failure; aborts router construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("route name '{0}' is registered more than once")]
    DuplicateName(String),
    #[error("no route named '{0}'")]
    UnknownName(String),
}

/// Opaque reference to a registered route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHandle {
    pub(crate) id: usize,
}

impl RouteHandle {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Optional registration settings for a terminal route
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub(crate) produces: Vec<MediaType>,
    pub(crate) consumes: Vec<MediaType>,
    pub(crate) name: Option<String>,
    pub(crate) attributes: HashMap<String, Value>,
    pub(crate) excludes: Vec<String>,
}

impl RouteOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Media types the route can produce, in preference order
    #[must_use]
    pub fn produces<I: IntoIterator<Item = MediaType>>(mut self, types: I) -> Self {
        self.produces = types.into_iter().collect();
        self
    }

    /// Media types the route accepts as request bodies
    #[must_use]
    pub fn consumes<I: IntoIterator<Item = MediaType>>(mut self, types: I) -> Self {
        self.consumes = types.into_iter().collect();
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// A sub-pattern; paths matching it fall through this route
    #[must_use]
    pub fn exclude(mut self, declaration: impl Into<String>) -> Self {
        self.excludes.push(declaration.into());
        self
    }
}

/// A terminal route: method, compiled pattern, declared media types and
/// handler
///
/// Owned by the [`Router`](super::Router); immutable once built.
#[derive(Clone)]
pub struct Route {
    pub(crate) id: usize,
    pub(crate) method: Method,
    pub(crate) pattern: PathPattern,
    pub(crate) produces: Vec<MediaType>,
    pub(crate) consumes: Vec<MediaType>,
    pub(crate) handler: SharedHandler,
    pub(crate) name: Option<String>,
    pub(crate) attributes: HashMap<String, Value>,
    pub(crate) excludes: Vec<PathPattern>,
    /// Environments this route is registered for; `None` means all
    pub(crate) environments: Option<Vec<String>>,
}

impl Route {
    #[must_use]
    pub fn handle(&self) -> RouteHandle {
        RouteHandle { id: self.id }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Declared produced types; never empty (defaults to `*/*`)
    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    /// Declared consumed types; never empty (defaults to `*/*`)
    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    #[must_use]
    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn excludes(&self) -> &[PathPattern] {
        &self.excludes
    }

    #[must_use]
    pub fn environments(&self) -> Option<&[String]> {
        self.environments.as_deref()
    }

    /// Structural match honoring exclusions
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let params = self.pattern.matches(path)?;
        if self.excludes.iter().any(|e| e.is_match(path)) {
            return None;
        }
        Some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.source())
            .field("name", &self.name)
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

/// A non-terminal filter route
///
/// Filters whose pattern matches a request accumulate, in registration
/// order, into the handler chain of whatever terminal route matches.
#[derive(Debug, Clone)]
pub struct FilterRoute {
    /// `None` applies to every method
    pub(crate) method: Option<Method>,
    pub(crate) pattern: PathPattern,
    pub(crate) excludes: Vec<PathPattern>,
    pub(crate) filter: Filter,
    pub(crate) environments: Option<Vec<String>>,
}

impl FilterRoute {
    #[must_use]
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub fn applies(&self, method: &Method, path: &str) -> bool {
        if self.method.as_ref().is_some_and(|m| m != method) {
            return false;
        }
        self.pattern.is_match(path) && !self.excludes.iter().any(|e| e.is_match(path))
    }
}
