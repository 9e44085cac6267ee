use std::cmp::Ordering;
use std::sync::Arc;

use http::StatusCode;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

use super::HeaderCache;
use crate::media::MediaType;

/// Negotiation failure kinds surfaced to the transport as 406 / 415
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("none of the acceptable media types [{accept}] is produced; available: [{produces}]")]
    NotAcceptable { accept: String, produces: String },
    #[error("content type '{content_type}' is not supported; supported: [{consumes}]")]
    UnsupportedMediaType {
        content_type: String,
        consumes: String,
    },
}

impl NegotiationError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            NegotiationError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            NegotiationError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

/// A requested capability that the allowed set does not contain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not in the allowed set")]
pub struct CapabilityError(pub String);

/// Order `Accept` candidates by descending quality, then descending
/// specificity. Stable, so equal candidates keep header order.
#[must_use]
pub fn rank_candidates(candidates: &[MediaType]) -> Vec<&MediaType> {
    let mut ranked: Vec<&MediaType> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.quality()
            .partial_cmp(&a.quality())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.specificity().cmp(&a.specificity()))
    });
    ranked
}

/// Pick the media type to produce for the given `Accept` candidates
///
/// An empty candidate list behaves like `*/*`; an empty `produces` list
/// behaves like `[*/*]`. The returned type is the more specific member of the
/// winning pair, with quality reset to `1.0`.
pub fn select_produces(
    accept: &[MediaType],
    produces: &[MediaType],
) -> Result<MediaType, NegotiationError> {
    let default_accept = [MediaType::ALL];
    let default_produces = [MediaType::ALL];
    let accept = if accept.is_empty() {
        &default_accept[..]
    } else {
        accept
    };
    let produces = if produces.is_empty() {
        &default_produces[..]
    } else {
        produces
    };

    let excluded: Vec<&MediaType> = accept.iter().filter(|m| m.quality() <= 0.0).collect();

    for candidate in rank_candidates(accept) {
        if candidate.quality() <= 0.0 {
            // ranked by quality, nothing selectable follows
            break;
        }
        for declared in produces {
            if !candidate.is_compatible(declared) {
                continue;
            }
            let vetoed = excluded.iter().any(|ex| {
                ex.is_compatible(declared) && ex.specificity() > candidate.specificity()
            });
            if vetoed {
                continue;
            }
            return Ok(declared.more_specific(candidate).without_quality());
        }
    }

    Err(NegotiationError::NotAcceptable {
        accept: join(accept),
        produces: join(produces),
    })
}

/// Check a request `Content-Type` against the route's consumed types
///
/// Declared types are tested in declaration order; the first compatible one
/// wins. The returned type is the more specific member of the pair.
pub fn select_consumes(
    content_type: &MediaType,
    consumes: &[MediaType],
) -> Result<MediaType, NegotiationError> {
    if consumes.is_empty() {
        return Ok(content_type.without_quality());
    }
    consumes
        .iter()
        .find(|declared| declared.is_compatible(content_type))
        .map(|declared| declared.more_specific(content_type).without_quality())
        .ok_or_else(|| NegotiationError::UnsupportedMediaType {
            content_type: content_type.to_string(),
            consumes: join(consumes),
        })
}

/// Split a comma separated capability header (`GET, PUT` / `x-a, x-b`)
#[must_use]
pub fn parse_capability_list(header: &str) -> Vec<&str> {
    header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Exact, case-insensitive, unordered set containment of `requested` in
/// `allowed`. An allowed entry of `*` admits everything.
pub fn negotiate_capabilities<'a, I, S>(requested: I, allowed: &[S]) -> Result<(), CapabilityError>
where
    I: IntoIterator<Item = &'a str>,
    S: AsRef<str>,
{
    let allow_all = allowed.iter().any(|a| a.as_ref() == "*");
    if allow_all {
        return Ok(());
    }
    for item in requested {
        if !allowed.iter().any(|a| a.as_ref().eq_ignore_ascii_case(item)) {
            return Err(CapabilityError(item.to_string()));
        }
    }
    Ok(())
}

fn join(types: &[MediaType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

static ACCEPT_ALL: Lazy<Arc<[MediaType]>> = Lazy::new(|| Arc::from(vec![MediaType::ALL]));

/// Header-aware front end for [`select_produces`] / [`select_consumes`]
///
/// Owns the optional parsed-header cache. Shared read-only across requests.
#[derive(Debug, Default)]
pub struct Negotiator {
    cache: Option<HeaderCache>,
}

impl Negotiator {
    /// A negotiator whose cache holds at most `cache_capacity` header strings;
    /// `0` disables caching
    #[must_use]
    pub fn new(cache_capacity: usize) -> Self {
        let cache = (cache_capacity > 0).then(|| HeaderCache::new(cache_capacity));
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> Option<&HeaderCache> {
        self.cache.as_ref()
    }

    /// Parsed `Accept` candidates; a missing header or one without any valid
    /// entry yields `[*/*]`
    #[must_use]
    pub fn accepted(&self, accept: Option<&str>) -> Arc<[MediaType]> {
        let parsed = match accept {
            Some(raw) if !raw.trim().is_empty() => self.parse(raw),
            _ => return Arc::clone(&ACCEPT_ALL),
        };
        if parsed.is_empty() {
            Arc::clone(&ACCEPT_ALL)
        } else {
            parsed
        }
    }

    pub fn select_produces(
        &self,
        accept: Option<&str>,
        produces: &[MediaType],
    ) -> Result<MediaType, NegotiationError> {
        let candidates = self.accepted(accept);
        let result = select_produces(&candidates, produces);
        if let Err(e) = &result {
            debug!(accept = ?accept, error = %e, "Produces negotiation failed");
        }
        result
    }

    pub fn select_consumes(
        &self,
        content_type: &str,
        consumes: &[MediaType],
    ) -> Result<MediaType, NegotiationError> {
        let parsed = self.parse(content_type);
        let media = match parsed.as_ref() {
            [single] => single,
            _ => {
                debug!(content_type = %content_type, "Malformed Content-Type header");
                return Err(NegotiationError::UnsupportedMediaType {
                    content_type: content_type.to_string(),
                    consumes: join(consumes),
                });
            }
        };
        select_consumes(media, consumes)
    }

    fn parse(&self, raw: &str) -> Arc<[MediaType]> {
        match &self.cache {
            Some(cache) => cache.get_or_parse(raw),
            None => Arc::from(MediaType::parse_list(raw)),
        }
    }
}
