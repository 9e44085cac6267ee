use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::dispatcher::{HandlerResponse, HeaderVec};

/// Per-request lifecycle
///
/// `Pending -> InFilters -> InHandler -> InAfter -> {Committed | Failed}`.
/// A short-circuiting filter skips `InHandler`. `Failed` goes to error
/// translation, whose rendered response is then committed. `Committed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
    Pending,
    InFilters,
    InHandler,
    InAfter,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("illegal request phase transition {from} -> {to}")]
    IllegalTransition { from: RequestPhase, to: RequestPhase },
    #[error("response already committed; rejected {write} write '{name}'")]
    Committed { write: &'static str, name: String },
}

impl RequestPhase {
    /// Validate a transition, returning the new phase
    pub fn advance(self, to: RequestPhase) -> Result<RequestPhase, PhaseError> {
        use RequestPhase::*;
        let allowed = matches!(
            (self, to),
            (Pending, InFilters)
                | (InFilters, InHandler)
                | (InFilters, InAfter)
                | (InHandler, InAfter)
                | (InAfter, Committed)
                | (InAfter, Failed)
                | (Pending, Failed)
                | (InFilters, Failed)
                | (InHandler, Failed)
                | (Pending, Committed)
                | (Failed, Committed)
        );
        if allowed {
            Ok(to)
        } else {
            Err(PhaseError::IllegalTransition { from: self, to })
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestPhase::Committed)
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestPhase::Pending => "PENDING",
            RequestPhase::InFilters => "IN_FILTERS",
            RequestPhase::InHandler => "IN_HANDLER",
            RequestPhase::InAfter => "IN_AFTER",
            RequestPhase::Committed => "COMMITTED",
            RequestPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// A response handed to the transport
///
/// Read-only: once committed nothing in the router can alter it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedResponse {
    inner: HandlerResponse,
}

impl CommittedResponse {
    pub(crate) fn new(inner: HandlerResponse) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.inner.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.get_header(name)
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.inner.body
    }

    #[must_use]
    pub fn into_inner(self) -> HandlerResponse {
        self.inner
    }
}
