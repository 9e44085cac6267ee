//! Pattern compiler and matcher - hot path for request routing.
//!
//! Compilation happens once at registration time. Matching splits the request
//! path on `/` into a stack buffer and walks the segment list without
//! backtracking: globs and catch-alls are terminal, so the first mismatch is
//! final.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;

use super::PatternError;

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., /users/{id}/posts/{post_id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the compiled pattern, so extracting
/// a value costs one atomic increment for the name plus the value copy.
/// Insertion order is declaration order.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

const MAX_INLINE_SEGMENTS: usize = 16;

/// One piece of a composite segment such as `*-*.js` or `{name}.{ext}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositePart {
    Literal(String),
    Group {
        name: Arc<str>,
        regex: Option<String>,
    },
}

/// A segment mixing literal text with capture groups, compiled to one regex
#[derive(Debug, Clone)]
pub struct CompositeSegment {
    source: String,
    parts: Vec<CompositePart>,
    regex: Regex,
    /// Regex group name per capturing part, in part order
    group_keys: Vec<String>,
}

impl CompositeSegment {
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn parts(&self) -> &[CompositePart] {
        &self.parts
    }

    fn group_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.parts.iter().filter_map(|p| match p {
            CompositePart::Group { name, .. } => Some(name),
            CompositePart::Literal(_) => None,
        })
    }

    fn capture(&self, segment: &str, params: &mut ParamVec) -> bool {
        let Some(caps) = self.regex.captures(segment) else {
            return false;
        };
        for (name, key) in self.group_names().zip(&self.group_keys) {
            let value = caps.name(key).map(|m| m.as_str()).unwrap_or_default();
            params.push((Arc::clone(name), value.to_string()));
        }
        true
    }
}

impl PartialEq for CompositeSegment {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.parts == other.parts
    }
}

/// A compiled path segment
#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Variable {
        name: Arc<str>,
        regex: Option<Regex>,
    },
    /// Exactly one segment, not captured
    Wildcard,
    Composite(CompositeSegment),
    /// Remaining path captured under a name
    CatchAll(Arc<str>),
    /// Zero or more segments
    GlobStar,
}

impl Segment {
    fn is_terminal(&self) -> bool {
        matches!(self, Segment::CatchAll(_) | Segment::GlobStar)
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (
                Segment::Variable { name: a, regex: ra },
                Segment::Variable { name: b, regex: rb },
            ) => a == b && ra.as_ref().map(Regex::as_str) == rb.as_ref().map(Regex::as_str),
            (Segment::Wildcard, Segment::Wildcard) | (Segment::GlobStar, Segment::GlobStar) => {
                true
            }
            (Segment::Composite(a), Segment::Composite(b)) => a == b,
            (Segment::CatchAll(a), Segment::CatchAll(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Variable { name, regex: None } => write!(f, "{{{name}}}"),
            Segment::Variable {
                name,
                regex: Some(re),
            } => {
                // stored anchored as ^(?:..)$
                let raw = re.as_str();
                let inner = raw
                    .strip_prefix("^(?:")
                    .and_then(|s| s.strip_suffix(")$"))
                    .unwrap_or(raw);
                write!(f, "{{{name}:{inner}}}")
            }
            Segment::Wildcard => f.write_str("*"),
            Segment::Composite(c) => f.write_str(&c.source),
            Segment::CatchAll(name) => write!(f, "*{name}"),
            Segment::GlobStar => f.write_str("**"),
        }
    }
}

/// Specificity score used to break ties between patterns matching the same
/// request. Greater is more specific.
///
/// Compared lexicographically: literal count, regex variable count, plain
/// variable count, wildcard count (all higher-wins), then absence of a
/// trailing glob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Specificity {
    pub literals: u16,
    pub regex_vars: u16,
    pub plain_vars: u16,
    pub wildcards: u16,
    pub has_glob: bool,
}

impl Specificity {
    fn of(segments: &[Segment]) -> Self {
        let mut score = Specificity::default();
        for segment in segments {
            match segment {
                Segment::Literal(_) => score.literals += 1,
                Segment::Variable { regex: Some(_), .. } | Segment::Composite(_) => {
                    score.regex_vars += 1
                }
                Segment::Variable { regex: None, .. } => score.plain_vars += 1,
                Segment::Wildcard => score.wildcards += 1,
                Segment::CatchAll(_) | Segment::GlobStar => score.has_glob = true,
            }
        }
        score
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.literals
            .cmp(&other.literals)
            .then(self.regex_vars.cmp(&other.regex_vars))
            .then(self.plain_vars.cmp(&other.plain_vars))
            .then(self.wildcards.cmp(&other.wildcards))
            .then(other.has_glob.cmp(&self.has_glob))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A compiled route declaration
///
/// Immutable after compilation and cheap to share behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    specificity: Specificity,
    normalize: bool,
}

/// Compile a declaration with the default (preserving) empty-segment policy
pub fn compile(declaration: &str) -> Result<PathPattern, PatternError> {
    PathPattern::compile(declaration)
}

impl PathPattern {
    /// Compile a declaration, keeping empty segments literally
    pub fn compile(declaration: &str) -> Result<Self, PatternError> {
        Self::compile_with(declaration, false)
    }

    /// Compile a declaration; with `normalize` empty segments are dropped
    pub fn compile_with(declaration: &str, normalize: bool) -> Result<Self, PatternError> {
        let source = declaration.to_string();

        if declaration == "*" {
            return Ok(Self::from_segments(source, vec![Segment::GlobStar], normalize));
        }

        let (body, offset) = match declaration.strip_prefix('/') {
            Some(rest) => (rest, 1),
            None => (declaration, 0),
        };

        let tokens = tokenize(declaration, body, offset)?;
        let mut segments = Vec::with_capacity(tokens.len());
        let mut positional = 0usize;
        for token in tokens {
            if normalize && token.is_empty() {
                continue;
            }
            segments.push(compile_segment(declaration, token, &mut positional)?);
        }

        validate(declaration, &segments)?;
        Ok(Self::from_segments(source, segments, normalize))
    }

    fn from_segments(source: String, segments: Vec<Segment>, normalize: bool) -> Self {
        let specificity = Specificity::of(&segments);
        Self {
            source,
            segments,
            specificity,
            normalize,
        }
    }

    /// The declaration this pattern was compiled from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.normalize
    }

    /// Names of all capturing variables in declaration order
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Variable { name, .. } | Segment::CatchAll(name) => names.push(name.as_ref()),
                Segment::Composite(c) => names.extend(c.group_names().map(AsRef::as_ref)),
                _ => {}
            }
        }
        names
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.matches(path).is_some()
    }

    /// Match a raw request path, returning the extracted variables
    ///
    /// Values are the raw segment text (no percent-decoding or conversion).
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let rest = path.strip_prefix('/')?;
        let mut parts: SmallVec<[&str; MAX_INLINE_SEGMENTS]> = rest.split('/').collect();
        if self.normalize {
            parts.retain(|p| !p.is_empty());
        }

        let mut params = ParamVec::new();
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::GlobStar => return Some(params),
                Segment::CatchAll(name) => {
                    let remaining = parts.get(idx..).map(|r| r.join("/")).unwrap_or_default();
                    params.push((Arc::clone(name), remaining));
                    return Some(params);
                }
                _ => {}
            }

            let part = *parts.get(idx)?;
            let matched = match segment {
                Segment::Literal(text) => text == part,
                Segment::Variable { name, regex } => {
                    // an empty segment only binds when the variable's regex allows it
                    let ok = regex.as_ref().map_or(!part.is_empty(), |re| re.is_match(part));
                    if ok {
                        params.push((Arc::clone(name), part.to_string()));
                    }
                    ok
                }
                Segment::Wildcard => !part.is_empty(),
                Segment::Composite(c) => c.capture(part, &mut params),
                Segment::CatchAll(_) | Segment::GlobStar => true,
            };
            if !matched {
                return None;
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Build a concrete path from this pattern (reverse routing)
    ///
    /// Every variable and catch-all needs a value; regex constrained variables
    /// validate theirs. A trailing `**` expands to nothing. Plain wildcards
    /// cannot be expanded.
    pub fn expand(&self, values: &[(&str, &str)]) -> Result<String, PatternError> {
        let mut out: Vec<String> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push(text.clone()),
                Segment::Variable { name, regex } => {
                    let value = self.lookup(values, name)?;
                    let valid = regex.as_ref().map_or(!value.is_empty(), |re| re.is_match(value));
                    if !valid {
                        return Err(PatternError::InvalidValue {
                            pattern: self.source.clone(),
                            name: name.to_string(),
                            value: value.to_string(),
                        });
                    }
                    out.push(value.to_string());
                }
                Segment::Composite(c) => {
                    let mut piece = String::new();
                    for part in &c.parts {
                        match part {
                            CompositePart::Literal(text) => piece.push_str(text),
                            CompositePart::Group { name, .. } => piece.push_str(self.lookup(values, name)?),
                        }
                    }
                    if !c.regex.is_match(&piece) {
                        return Err(PatternError::InvalidValue {
                            pattern: self.source.clone(),
                            name: c.source.clone(),
                            value: piece,
                        });
                    }
                    out.push(piece);
                }
                Segment::CatchAll(name) => {
                    let value = self.lookup(values, name)?;
                    if !value.is_empty() {
                        out.push(value.to_string());
                    }
                }
                Segment::GlobStar => {}
                Segment::Wildcard => {
                    return Err(PatternError::NotExpandable {
                        pattern: self.source.clone(),
                        segment: segment.to_string(),
                    })
                }
            }
        }
        Ok(format!("/{}", out.join("/")))
    }

    fn lookup<'v>(&self, values: &[(&str, &'v str)], name: &str) -> Result<&'v str, PatternError> {
        values
            .iter()
            .rev()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| PatternError::MissingVariable {
                pattern: self.source.clone(),
                name: name.to_string(),
            })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Join a mount prefix and a child declaration into one declaration
///
/// `("/api", "/users")` -> `/api/users`, `("/api", "/")` -> `/api`,
/// `("/api", "*")` -> `/api/**`, `("/", "/users")` -> `/users`.
#[must_use]
pub fn join_declarations(prefix: &str, child: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return if child.starts_with('/') || child == "*" {
            child.to_string()
        } else {
            format!("/{child}")
        };
    }
    let prefix = if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    };
    match child {
        "" | "/" => prefix,
        "*" => format!("{prefix}/**"),
        c if c.starts_with('/') => format!("{prefix}{c}"),
        c => format!("{prefix}/{c}"),
    }
}

/// Replace `{key}` references in `template` with captured values
///
/// Used to remap requests onto asset paths, e.g. a match of `/js/*-*.js`
/// against `/js/app-v2.js` substituted into `/static/{1}/{0}.js` yields
/// `/static/v2/app.js`. Unknown references are left untouched.
#[must_use]
pub fn substitute(template: &str, params: &ParamVec) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match params.iter().rfind(|(k, _)| k.as_ref() == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Split the declaration body on `/` outside of braces
fn tokenize<'a>(
    pattern: &str,
    body: &'a str,
    offset: usize,
) -> Result<Vec<&'a str>, PatternError> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut open_at = 0usize;
    let mut start = 0usize;
    for (idx, ch) in body.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    open_at = idx;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(PatternError::UnbalancedBrace {
                        pattern: pattern.to_string(),
                        position: idx + offset,
                    });
                }
                depth -= 1;
            }
            '/' if depth == 0 => {
                tokens.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(PatternError::UnterminatedBrace {
            pattern: pattern.to_string(),
            position: open_at + offset,
        });
    }
    tokens.push(&body[start..]);
    Ok(tokens)
}

fn compile_segment(
    pattern: &str,
    token: &str,
    positional: &mut usize,
) -> Result<Segment, PatternError> {
    match token {
        "**" => return Ok(Segment::GlobStar),
        "*" => return Ok(Segment::Wildcard),
        _ => {}
    }

    if let Some(name) = token.strip_prefix('*') {
        if is_identifier(name) {
            return Ok(Segment::CatchAll(Arc::from(name)));
        }
    }

    if token.starts_with('{') && closing_brace(token, 0) == Some(token.len() - 1) {
        let inner = &token[1..token.len() - 1];
        let (name, regex) = split_variable(pattern, inner)?;
        let regex = regex
            .map(|re| compile_regex(pattern, name, &format!("^(?:{re})$")))
            .transpose()?;
        return Ok(Segment::Variable {
            name: Arc::from(name),
            regex,
        });
    }

    if token.contains('*') || token.contains('{') {
        return compile_composite(pattern, token, positional).map(Segment::Composite);
    }

    Ok(Segment::Literal(token.to_string()))
}

fn compile_composite(
    pattern: &str,
    token: &str,
    positional: &mut usize,
) -> Result<CompositeSegment, PatternError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut idx = 0usize;
    while idx < token.len() {
        let rest = &token[idx..];
        if rest.starts_with('*') {
            flush_literal(&mut parts, &mut literal);
            parts.push(CompositePart::Group {
                name: Arc::from(positional.to_string()),
                regex: None,
            });
            *positional += 1;
            idx += 1;
        } else if rest.starts_with('{') {
            flush_literal(&mut parts, &mut literal);
            let close = closing_brace(token, idx).ok_or_else(|| PatternError::UnterminatedBrace {
                pattern: pattern.to_string(),
                position: idx,
            })?;
            let (name, regex) = split_variable(pattern, &token[idx + 1..close])?;
            parts.push(CompositePart::Group {
                name: Arc::from(name),
                regex: regex.map(str::to_string),
            });
            idx = close + 1;
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            literal.push(ch);
            idx += ch.len_utf8();
        }
    }
    flush_literal(&mut parts, &mut literal);

    let mut expr = String::from("^");
    let mut group_keys = Vec::new();
    for part in &parts {
        match part {
            CompositePart::Literal(text) => expr.push_str(&regex::escape(text)),
            CompositePart::Group { regex, .. } => {
                let key = format!("g{}", group_keys.len());
                let body = regex.as_deref().unwrap_or(".+?");
                expr.push_str("(?P<");
                expr.push_str(&key);
                expr.push('>');
                expr.push_str(body);
                expr.push(')');
                group_keys.push(key);
            }
        }
    }
    expr.push('$');

    let regex = compile_regex(pattern, token, &expr)?;
    Ok(CompositeSegment {
        source: token.to_string(),
        parts,
        regex,
        group_keys,
    })
}

fn flush_literal(parts: &mut Vec<CompositePart>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(CompositePart::Literal(std::mem::take(literal)));
    }
}

/// Index of the `}` closing the `{` at `open`
fn closing_brace(token: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in token[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_variable<'a>(
    pattern: &str,
    inner: &'a str,
) -> Result<(&'a str, Option<&'a str>), PatternError> {
    let (name, regex) = match inner.split_once(':') {
        Some((name, regex)) => (name.trim(), Some(regex)),
        None => (inner.trim(), None),
    };
    if !is_identifier(name) {
        return Err(PatternError::InvalidVariableName {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }
    Ok((name, regex))
}

fn compile_regex(pattern: &str, variable: &str, expr: &str) -> Result<Regex, PatternError> {
    Regex::new(expr).map_err(|e| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        variable: variable.to_string(),
        message: e.to_string(),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate(pattern: &str, segments: &[Segment]) -> Result<(), PatternError> {
    let last = segments.len().saturating_sub(1);
    let mut seen: Vec<&str> = Vec::new();
    for (idx, segment) in segments.iter().enumerate() {
        if segment.is_terminal() && idx != last {
            return Err(PatternError::NonTerminalGlob {
                pattern: pattern.to_string(),
                segment: segment.to_string(),
            });
        }
        let names: Vec<&str> = match segment {
            Segment::Variable { name, .. } | Segment::CatchAll(name) => vec![name.as_ref()],
            Segment::Composite(c) => c.group_names().map(AsRef::as_ref).collect(),
            _ => Vec::new(),
        };
        for name in names {
            if seen.contains(&name) {
                return Err(PatternError::DuplicateVariable {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
            seen.push(name);
        }
    }
    Ok(())
}
