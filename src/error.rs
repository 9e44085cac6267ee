//! Failure type for user code and the error translation collaborator.
//!
//! Pattern errors abort startup; everything else here is local to a single
//! request. [`HandlerFailure`] is what handlers and filters return, and an
//! [`ErrorTranslator`] turns a failure into a rendered response whose format
//! is negotiated against the request's `Accept` header.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::dispatcher::{HandlerRequest, HandlerResponse, HeaderVec};
use crate::media::MediaType;
use crate::middleware::PhaseError;
use crate::negotiation::{NegotiationError, Negotiator};

/// A failure escaping a handler or a filter
///
/// Carries the status the translator should render, a message, an optional
/// underlying error, and failures raised by failure-handlers while reacting
/// to this one.
#[derive(Debug)]
pub struct HandlerFailure {
    status: u16,
    message: String,
    source: Option<anyhow::Error>,
    suppressed: Vec<HandlerFailure>,
}

impl HandlerFailure {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
            suppressed: Vec::new(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Build a 500 failure from a caught panic payload
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::internal(format!("handler panicked: {detail}"))
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// Failures raised while other handlers reacted to this one, in order
    #[must_use]
    pub fn suppressed(&self) -> &[HandlerFailure] {
        &self.suppressed
    }

    pub fn add_suppressed(&mut self, failure: HandlerFailure) {
        self.suppressed.push(failure);
    }

    /// Standard reason phrase for the status, if it has one
    #[must_use]
    pub fn reason(&self) -> &'static str {
        http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)?;
        if !self.suppressed.is_empty() {
            write!(f, " ({} suppressed)", self.suppressed.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for HandlerFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| {
            let inner: &(dyn std::error::Error + 'static) = e.as_ref();
            inner
        })
    }
}

impl From<anyhow::Error> for HandlerFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string()).with_source(err)
    }
}

impl From<PhaseError> for HandlerFailure {
    fn from(err: PhaseError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<NegotiationError> for HandlerFailure {
    fn from(err: NegotiationError) -> Self {
        Self::new(err.status().as_u16(), err.to_string())
    }
}

/// Maps a failure to a status code and a rendered body
///
/// Invoked synchronously on the task that detected the failure.
pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, req: &HandlerRequest, failure: &HandlerFailure) -> HandlerResponse;
}

impl<F> ErrorTranslator for F
where
    F: Fn(&HandlerRequest, &HandlerFailure) -> HandlerResponse + Send + Sync,
{
    fn translate(&self, req: &HandlerRequest, failure: &HandlerFailure) -> HandlerResponse {
        self(req, failure)
    }
}

const RENDERABLE: [MediaType; 3] = [MediaType::JSON, MediaType::HTML, MediaType::TEXT];

/// Renders failures as JSON, HTML or plain text according to `Accept`
///
/// When the client accepts none of those, JSON is used anyway: an error body
/// is always written.
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorTranslator {
    negotiator: Arc<Negotiator>,
}

impl DefaultErrorTranslator {
    #[must_use]
    pub fn new(negotiator: Arc<Negotiator>) -> Self {
        Self { negotiator }
    }
}

impl ErrorTranslator for DefaultErrorTranslator {
    fn translate(&self, req: &HandlerRequest, failure: &HandlerFailure) -> HandlerResponse {
        let format = self
            .negotiator
            .select_produces(req.get_header("accept"), &RENDERABLE)
            .unwrap_or_else(|_| MediaType::JSON);
        debug!(
            request_id = %req.request_id,
            status = failure.status(),
            format = %format,
            "Rendering error response"
        );

        let status = failure.status();
        let reason = failure.reason();
        let (content_type, body) = if format.same_essence(&MediaType::HTML) {
            let html = format!(
                "<!doctype html><html><head><title>{status} {reason}</title></head>\
                 <body><h1>{status} {reason}</h1><p>{}</p></body></html>",
                escape_html(failure.message())
            );
            ("text/html", Value::String(html))
        } else if format.same_essence(&MediaType::TEXT) {
            (
                "text/plain",
                Value::String(format!("{status} {reason}: {}", failure.message())),
            )
        } else {
            (
                "application/json",
                json!({
                    "status": status,
                    "message": failure.message(),
                    "reason": reason,
                }),
            )
        };

        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), content_type.to_string()));
        HandlerResponse::new(status, headers, body)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
