use super::*;
use crate::media::MediaType;

fn list(s: &str) -> Vec<MediaType> {
    MediaType::parse_list(s)
}

#[test]
fn test_rank_by_quality_then_specificity() {
    let accept = list("*/*;q=0.5, text/*, text/html, application/json;q=0.5");
    let ranked: Vec<String> = rank_candidates(&accept)
        .into_iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        ranked,
        vec![
            "text/html",
            "text/*",
            "application/json;q=0.5",
            "*/*;q=0.5"
        ]
    );
}

#[test]
fn test_incoming_quality_beats_route_order() {
    let accept = list("text/html,application/json;q=0.9");
    let produces = [MediaType::JSON, MediaType::HTML];
    assert_eq!(select_produces(&accept, &produces).unwrap(), MediaType::HTML);
}

#[test]
fn test_route_order_breaks_equal_quality() {
    let accept = list("*/*");
    let produces = [MediaType::JSON, MediaType::HTML];
    assert_eq!(select_produces(&accept, &produces).unwrap(), MediaType::JSON);
}

#[test]
fn test_wildcard_route_returns_candidate() {
    let accept = list("text/plain");
    let selected = select_produces(&accept, &[MediaType::ALL]).unwrap();
    assert_eq!(selected, MediaType::TEXT);
}

#[test]
fn test_not_acceptable() {
    let err = select_produces(&list("application/xml"), &[MediaType::JSON]).unwrap_err();
    assert!(matches!(err, NegotiationError::NotAcceptable { .. }));
    assert_eq!(err.status(), http::StatusCode::NOT_ACCEPTABLE);
}

#[test]
fn test_zero_quality_is_never_selected() {
    let accept = list("application/json;q=0");
    assert!(select_produces(&accept, &[MediaType::JSON]).is_err());
}

#[test]
fn test_zero_quality_vetoes_wildcard_pick() {
    let accept = list("*/*, application/json;q=0");
    let selected = select_produces(&accept, &[MediaType::JSON, MediaType::HTML]).unwrap();
    assert_eq!(selected, MediaType::HTML);
}

#[test]
fn test_empty_inputs_default_to_all() {
    assert_eq!(select_produces(&[], &[]).unwrap(), MediaType::ALL);
    assert_eq!(select_produces(&[], &[MediaType::JSON]).unwrap(), MediaType::JSON);
}

#[test]
fn test_consumes_first_compatible_declared_type() {
    let content = MediaType::parse("application/json; charset=utf-8").unwrap();
    let consumes = [MediaType::parse("text/*").unwrap(), MediaType::JSON];
    let selected = select_consumes(&content, &consumes).unwrap();
    assert!(selected.same_essence(&MediaType::JSON));
}

#[test]
fn test_consumes_unsupported() {
    let content = MediaType::parse("text/plain").unwrap();
    let err = select_consumes(&content, &[MediaType::JSON]).unwrap_err();
    assert_eq!(err.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[test]
fn test_capabilities_set_containment() {
    let allowed = ["GET", "POST", "Content-Type"];
    assert!(negotiate_capabilities(["get", "content-type"], &allowed).is_ok());
    assert_eq!(
        negotiate_capabilities(["PUT"], &allowed),
        Err(CapabilityError("PUT".to_string()))
    );
    assert!(negotiate_capabilities(["X-Anything"], &["*"]).is_ok());
    assert!(negotiate_capabilities(std::iter::empty::<&str>(), &allowed).is_ok());
}

#[test]
fn test_parse_capability_list() {
    assert_eq!(
        parse_capability_list(" x-a ,X-B,, "),
        vec!["x-a", "X-B"]
    );
}

#[test]
fn test_negotiator_cache_is_transparent() {
    let cached = Negotiator::new(8);
    let uncached = Negotiator::new(0);
    let produces = [MediaType::JSON, MediaType::HTML];
    let header = Some("text/html;q=0.4, application/json;q=0.8");
    for _ in 0..3 {
        assert_eq!(
            cached.select_produces(header, &produces),
            uncached.select_produces(header, &produces)
        );
    }
    assert_eq!(cached.cache().map(HeaderCache::len), Some(1));
    assert!(uncached.cache().is_none());
}

#[test]
fn test_cache_respects_capacity() {
    let cache = HeaderCache::new(2);
    for header in ["text/html", "application/json", "text/plain", "text/css"] {
        assert_eq!(cache.get_or_parse(header).len(), 1);
    }
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_negotiator_missing_or_garbage_accept_is_all() {
    let n = Negotiator::new(4);
    assert_eq!(n.accepted(None).as_ref(), &[MediaType::ALL]);
    assert_eq!(n.accepted(Some("garbage")).as_ref(), &[MediaType::ALL]);
}

#[test]
fn test_negotiator_malformed_content_type() {
    let n = Negotiator::new(4);
    let err = n.select_consumes("not a type", &[MediaType::JSON]).unwrap_err();
    assert!(matches!(err, NegotiationError::UnsupportedMediaType { .. }));
}
