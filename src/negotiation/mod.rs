//! # Content Negotiation Module
//!
//! Resolves what a client accepts or sends against what a route declares it
//! produces or consumes.
//!
//! ## Algorithm
//!
//! 1. The header is parsed into an ordered list of [`MediaType`] candidates,
//!    each carrying a quality value (default `1.0`).
//! 2. Candidates are ranked by descending quality, then descending
//!    specificity (`type/subtype` > `type/*` > `*/*`). The sort is stable so
//!    exact ties keep header order.
//! 3. For each candidate, the route's declared types are tested in
//!    declaration order. The first compatible pair wins.
//! 4. A candidate with `q=0` is never selected, and it also vetoes the route
//!    types it names when a broader wildcard candidate would otherwise pick
//!    them.
//!
//! The same "requested set vs allowed set" shape is used by CORS preflight
//! for `Access-Control-Request-Method` and `Access-Control-Request-Headers`,
//! see [`negotiate_capabilities`]. There the comparison is exact,
//! case-insensitive and unordered set containment rather than MIME matching.
//!
//! ## Caching
//!
//! [`Negotiator`] optionally memoises parsed header strings in a bounded
//! [`HeaderCache`]. The cache is a pure function of the raw header value, so
//! consulting it never changes a negotiation outcome.
//!
//! [`MediaType`]: crate::media::MediaType

mod cache;
mod core;
#[cfg(test)]
mod tests;

pub use cache::HeaderCache;
pub use core::{
    negotiate_capabilities, parse_capability_list, rank_candidates, select_consumes,
    select_produces, CapabilityError, NegotiationError, Negotiator,
};
