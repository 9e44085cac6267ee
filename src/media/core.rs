use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

/// Error produced when a media type string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaTypeError {
    #[error("empty media type")]
    Empty,
    #[error("media type '{0}' has no subtype")]
    MissingSubtype(String),
    #[error("media type '{0}' pairs a wildcard type with a concrete subtype")]
    WildcardType(String),
    #[error("media type '{0}' contains an invalid token")]
    InvalidToken(String),
    #[error("media type '{media_type}' has malformed parameter '{parameter}'")]
    InvalidParameter {
        media_type: String,
        parameter: String,
    },
    #[error("media type '{media_type}' has quality '{value}' outside [0, 1]")]
    InvalidQuality { media_type: String, value: String },
}

/// A parsed MIME type with wildcard and quality support
///
/// Type, subtype and parameter keys are stored lowercased. The `q` parameter
/// is lifted out of the parameter list into [`MediaType::quality`]; every
/// other parameter keeps its declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    kind: Cow<'static, str>,
    subtype: Cow<'static, str>,
    params: Vec<(String, String)>,
    quality: f32,
}

const WILDCARD: &str = "*";

impl MediaType {
    /// `*/*`
    pub const ALL: MediaType = MediaType::from_static("*", "*");
    pub const JSON: MediaType = MediaType::from_static("application", "json");
    pub const XML: MediaType = MediaType::from_static("application", "xml");
    pub const HTML: MediaType = MediaType::from_static("text", "html");
    pub const TEXT: MediaType = MediaType::from_static("text", "plain");
    pub const FORM_URLENCODED: MediaType =
        MediaType::from_static("application", "x-www-form-urlencoded");
    pub const MULTIPART_FORM: MediaType = MediaType::from_static("multipart", "form-data");
    pub const OCTET_STREAM: MediaType = MediaType::from_static("application", "octet-stream");

    const fn from_static(kind: &'static str, subtype: &'static str) -> Self {
        Self {
            kind: Cow::Borrowed(kind),
            subtype: Cow::Borrowed(subtype),
            params: Vec::new(),
            quality: 1.0,
        }
    }

    /// Parse a single media type such as `text/html;charset=utf-8;q=0.8`
    ///
    /// A bare `*` is accepted as shorthand for `*/*`.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let mut parts = split_unquoted(input, ';').into_iter();
        let essence = parts.next().map(str::trim).unwrap_or_default();

        let (kind, subtype) = if essence == WILDCARD {
            (WILDCARD, WILDCARD)
        } else {
            let (kind, subtype) = essence
                .split_once('/')
                .ok_or_else(|| MediaTypeError::MissingSubtype(input.to_string()))?;
            (kind.trim(), subtype.trim())
        };

        if kind.is_empty() || subtype.is_empty() {
            return Err(MediaTypeError::MissingSubtype(input.to_string()));
        }
        if !is_token(kind) || !is_token(subtype) {
            return Err(MediaTypeError::InvalidToken(input.to_string()));
        }
        if kind == WILDCARD && subtype != WILDCARD {
            return Err(MediaTypeError::WildcardType(input.to_string()));
        }

        let mut params = Vec::new();
        let mut quality = 1.0_f32;
        for raw in parts {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (key, value) =
                raw.split_once('=')
                    .ok_or_else(|| MediaTypeError::InvalidParameter {
                        media_type: input.to_string(),
                        parameter: raw.to_string(),
                    })?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"');
            if key.is_empty() || !is_token(&key) {
                return Err(MediaTypeError::InvalidParameter {
                    media_type: input.to_string(),
                    parameter: raw.to_string(),
                });
            }
            if key == "q" {
                quality = parse_quality(value).ok_or_else(|| MediaTypeError::InvalidQuality {
                    media_type: input.to_string(),
                    value: value.to_string(),
                })?;
            } else {
                params.push((key, value.to_string()));
            }
        }

        Ok(Self {
            kind: Cow::Owned(kind.to_ascii_lowercase()),
            subtype: Cow::Owned(subtype.to_ascii_lowercase()),
            params,
            quality,
        })
    }

    /// Parse a comma separated header value (`Accept`) into its entries
    ///
    /// Entries that fail to parse are skipped. Declaration order is kept.
    #[must_use]
    pub fn parse_list(header: &str) -> Vec<MediaType> {
        split_unquoted(header, ',')
            .into_iter()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match MediaType::parse(entry) {
                Ok(media) => Some(media),
                Err(e) => {
                    debug!(entry = %entry, error = %e, "Skipping malformed media range");
                    None
                }
            })
            .collect()
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Quality value in `[0, 1]`
    #[must_use]
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Non-`q` parameters in declaration order
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Look up a parameter by case-insensitive key
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// `type/subtype` without parameters
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.kind == WILDCARD
    }

    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD
    }

    /// Neither type nor subtype is a wildcard
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Specificity rank: `*/*` = 0, `type/*` = 1, `type/subtype` = 2,
    /// `type/subtype;param=..` = 3
    #[must_use]
    pub fn specificity(&self) -> u8 {
        if self.is_wildcard_type() {
            0
        } else if self.is_wildcard_subtype() {
            1
        } else if self.params.is_empty() {
            2
        } else {
            3
        }
    }

    /// Two media types are compatible when their types are equal or either is
    /// `*`, and likewise for their subtypes. Parameters and quality are ignored.
    #[must_use]
    pub fn is_compatible(&self, other: &MediaType) -> bool {
        let kind = self.is_wildcard_type() || other.is_wildcard_type() || self.kind == other.kind;
        let subtype = self.is_wildcard_subtype()
            || other.is_wildcard_subtype()
            || self.subtype == other.subtype;
        kind && subtype
    }

    /// Same type and subtype, ignoring parameters and quality
    #[must_use]
    pub fn same_essence(&self, other: &MediaType) -> bool {
        self.kind == other.kind && self.subtype == other.subtype
    }

    /// Copy of this media type with quality reset to `1.0`
    #[must_use]
    pub fn without_quality(&self) -> MediaType {
        MediaType {
            quality: 1.0,
            ..self.clone()
        }
    }

    /// Whichever of the two is more specific, `self` on ties
    #[must_use]
    pub fn more_specific<'a>(&'a self, other: &'a MediaType) -> &'a MediaType {
        if other.specificity() > self.specificity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, ";{key}={value}")?;
        }
        if self.quality < 1.0 {
            write!(f, ";q={}", self.quality)?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaType::parse(s)
    }
}

fn parse_quality(value: &str) -> Option<f32> {
    let q: f32 = value.parse().ok()?;
    if q.is_finite() && (0.0..=1.0).contains(&q) {
        Some(q)
    } else {
        None
    }
}

fn is_token(s: &str) -> bool {
    s == WILDCARD
        || s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(b, b'!' | b'#' | b'$' | b'&' | b'-' | b'^' | b'_' | b'.' | b'+')
        })
}

/// Split on `sep` outside of double-quoted strings
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                out.push(&input[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&input[start..]);
    out
}
