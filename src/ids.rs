use std::fmt;

use ulid::Ulid;

/// Header carrying a caller-supplied request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id attached to every log event of one dispatch
///
/// A ULID, so ids sort by arrival time in logs. Callers that already
/// assigned one upstream keep it.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    /// The inbound `x-request-id` when it holds a ULID, otherwise a fresh id
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Ulid::from_string(v.trim()).ok())
            .map_or_else(|| Self(Ulid::new()), Self)
    }

    #[must_use]
    pub fn ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_is_kept() {
        let upstream = Ulid::new().to_string();
        assert_eq!(RequestId::from_header(Some(&upstream)).to_string(), upstream);
        let padded = format!(" {upstream} ");
        assert_eq!(RequestId::from_header(Some(&padded)).to_string(), upstream);
    }

    #[test]
    fn test_foreign_ids_are_replaced() {
        let minted = RequestId::from_header(Some("req-1234"));
        assert_eq!(minted.to_string().len(), 26);
        assert_ne!(minted, RequestId::from_header(None));
    }
}
