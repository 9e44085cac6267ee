//! # Path Pattern Module
//!
//! Compiles textual route declarations into segment matchers with a
//! specificity score.
//!
//! ## Syntax
//!
//! | Segment | Meaning |
//! |---|---|
//! | `users` | literal, matched exactly |
//! | `{id}` | variable, matches one segment |
//! | `{id:[0-9]+}` | variable constrained by a regex over the whole segment |
//! | `*` | wildcard, matches one segment without capturing |
//! | `*rest` | named catch-all, captures the remaining path; last segment only |
//! | `**` | glob star, matches zero or more segments; last segment only |
//! | `*-*.js`, `{name}.{ext}` | composite segment; bare `*` groups capture positionally as `0`, `1`, ... |
//!
//! A declaration consisting of just `*` is the catch-all filter pattern and
//! is equivalent to `/**`.
//!
//! ## Empty segments
//!
//! By default empty segments are kept: `/a//b` only matches the request path
//! `/a//b`. When compiled with `normalize = true`, empty segments are dropped
//! from the pattern and from every request path it is matched against.
//!
//! ## Specificity
//!
//! [`Specificity`] orders patterns that match the same request: more literal
//! segments first, then regex variables, then plain variables, then
//! wildcards, and a pattern without a trailing glob outranks one with.
//!
//! ```rust
//! use switchyard::pattern::PathPattern;
//!
//! let literal = PathPattern::compile("/a/b").unwrap();
//! let variable = PathPattern::compile("/a/{x}").unwrap();
//! assert!(literal.specificity() > variable.specificity());
//!
//! let params = variable.matches("/a/B").unwrap();
//! assert_eq!(params[0].1, "B");
//! ```

mod core;
mod error;
#[cfg(test)]
mod tests;

pub use core::{
    compile, join_declarations, substitute, CompositePart, CompositeSegment, ParamVec, PathPattern,
    Segment, Specificity, MAX_INLINE_PARAMS,
};
pub use error::PatternError;
