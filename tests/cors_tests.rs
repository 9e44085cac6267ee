//! CORS handling end to end: preflight answers and actual-request headers
//!
//! # Test Coverage
//!
//! - Preflight method/header checks are capability negotiations, independent
//!   of which routes exist
//! - Preflight `Allow` lists the routed methods
//! - Actual cross-origin requests carry the staged CORS headers
//! - Route policies from the `cors` attribute
//! - Staged CORS headers and error responses

mod common;

use common::{get, handler_of, headers, labelled};
use http::Method;
use serde_json::json;
use switchyard::dispatcher::{Dispatcher, HandlerResponse};
use switchyard::error::HandlerFailure;
use switchyard::middleware::{
    build_route_cors_map, CorsFilterBuilder, Filter, CORS_ATTRIBUTE,
};
use switchyard::router::{RouteOptions, RouterBuilder};
use switchyard::RouterConfig;

const ORIGIN: &str = "https://app.example.com";

fn cors_router(config: RouterConfig) -> RouterBuilder {
    let cors = CorsFilterBuilder::new()
        .allowed_origins(&[ORIGIN])
        .allowed_methods(&[Method::GET, Method::POST])
        .allowed_headers(&["Content-Type", "X-Request-Id"])
        .expose_headers(&["X-Total-Count"])
        .allow_credentials(true)
        .max_age(3600)
        .build()
        .unwrap();

    let mut builder = RouterBuilder::with_config(config);
    builder.filter(None, "*", Filter::around(cors)).unwrap();
    builder.get("/pets", labelled("list")).unwrap();
    builder.post("/pets", labelled("create")).unwrap();
    builder.put("/pets/{id}", labelled("replace")).unwrap();
    builder
        .get("/pets/{id}/fail", |_req| Err(HandlerFailure::internal("boom")))
        .unwrap();
    builder
        .route(
            Method::GET,
            "/internal",
            labelled("internal"),
            RouteOptions::new().attribute(CORS_ATTRIBUTE, json!(false)),
        )
        .unwrap();
    builder
        .route(
            Method::PATCH,
            "/notes/{id}",
            labelled("notes"),
            RouteOptions::new().attribute(CORS_ATTRIBUTE, json!({ "allowedMethods": ["PATCH"] })),
        )
        .unwrap();
    builder
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(cors_router(RouterConfig::default()).build().unwrap())
}

fn preflight(dispatcher: &Dispatcher, path: &str, method: &str) -> switchyard::middleware::CommittedResponse {
    dispatcher.dispatch(
        Method::OPTIONS,
        path,
        headers(&[
            ("origin", ORIGIN),
            ("access-control-request-method", method),
        ]),
        None,
    )
}

#[test]
fn test_preflight_allowed_method() {
    let dispatcher = dispatcher();
    let res = preflight(&dispatcher, "/pets", "POST");

    assert_eq!(res.status(), 200);
    assert_eq!(res.header("access-control-allow-origin"), Some(ORIGIN));
    assert_eq!(res.header("access-control-allow-methods"), Some("GET, POST"));
    assert_eq!(
        res.header("access-control-allow-headers"),
        Some("Content-Type, X-Request-Id")
    );
    assert_eq!(res.header("access-control-allow-credentials"), Some("true"));
    assert_eq!(res.header("access-control-max-age"), Some("3600"));
    assert_eq!(res.header("allow"), Some("GET, HEAD, POST, OPTIONS"));
    assert_eq!(res.header("vary"), Some("Origin"));
}

#[test]
fn test_preflight_put_rejected_even_though_route_exists() {
    let dispatcher = dispatcher();
    let res = preflight(&dispatcher, "/pets/7", "PUT");

    assert_eq!(res.status(), 403);
    assert!(res.header("access-control-allow-origin").is_none());
    assert!(res.header("access-control-allow-methods").is_none());
}

#[test]
fn test_preflight_without_matching_route_method() {
    let dispatcher = dispatcher();
    // no POST route for /pets/{id}, but POST is in the CORS allowed set
    let res = preflight(&dispatcher, "/pets/7", "POST");
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("allow"), Some("PUT, OPTIONS"));
}

#[test]
fn test_preflight_rejects_unlisted_header() {
    let dispatcher = dispatcher();
    let res = dispatcher.dispatch(
        Method::OPTIONS,
        "/pets",
        headers(&[
            ("origin", ORIGIN),
            ("access-control-request-method", "GET"),
            ("access-control-request-headers", "x-request-id, x-debug"),
        ]),
        None,
    );
    assert_eq!(res.status(), 403);
}

#[test]
fn test_preflight_unknown_origin() {
    let dispatcher = dispatcher();
    let res = dispatcher.dispatch(
        Method::OPTIONS,
        "/pets",
        headers(&[
            ("origin", "https://evil.example"),
            ("access-control-request-method", "GET"),
        ]),
        None,
    );
    assert_eq!(res.status(), 403);
    assert!(res.header("access-control-allow-origin").is_none());
}

#[test]
fn test_actual_request_carries_cors_headers() {
    let dispatcher = dispatcher();
    let res = get(&dispatcher, "/pets", &[("origin", ORIGIN)]);

    assert_eq!(res.status(), 200);
    assert_eq!(handler_of(&res), "list");
    assert_eq!(res.header("access-control-allow-origin"), Some(ORIGIN));
    assert_eq!(res.header("access-control-allow-credentials"), Some("true"));
    assert_eq!(res.header("access-control-expose-headers"), Some("X-Total-Count"));
    assert_eq!(res.header("vary"), Some("Origin"));
}

#[test]
fn test_actual_request_from_unknown_origin() {
    let dispatcher = dispatcher();
    let res = get(&dispatcher, "/pets", &[("origin", "https://evil.example")]);
    assert_eq!(res.status(), 403);
}

#[test]
fn test_plain_options_without_cors_headers_is_405() {
    let dispatcher = dispatcher();
    let res = dispatcher.dispatch(Method::OPTIONS, "/pets", headers(&[("origin", ORIGIN)]), None);
    assert_eq!(res.status(), 405);
}

#[test]
fn test_disabled_route_gets_no_cors_headers() {
    let dispatcher = dispatcher();
    let res = get(&dispatcher, "/internal", &[("origin", ORIGIN)]);
    assert_eq!(res.status(), 200);
    assert!(res.header("access-control-allow-origin").is_none());
}

#[test]
fn test_route_policy_overrides_methods() {
    let dispatcher = dispatcher();
    let res = preflight(&dispatcher, "/notes/1", "PATCH");
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("access-control-allow-methods"), Some("PATCH"));
}

#[test]
fn test_policies_from_route_table() {
    let router = cors_router(RouterConfig::default()).build().unwrap();
    let map = build_route_cors_map(&router).unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.contains_key("/internal"));
    assert!(map.contains_key("/notes/{id}"));
}

#[test]
fn test_failed_request_drops_cors_headers_by_default() {
    let dispatcher = dispatcher();
    let res = get(&dispatcher, "/pets/1/fail", &[("origin", ORIGIN)]);
    assert_eq!(res.status(), 500);
    assert!(res.header("access-control-allow-origin").is_none());
}

#[test]
fn test_failed_request_keeps_cors_headers_when_configured() {
    let config = RouterConfig {
        reset_headers_on_error: false,
        ..RouterConfig::default()
    };
    let dispatcher = Dispatcher::new(cors_router(config).build().unwrap());
    let res = get(&dispatcher, "/pets/1/fail", &[("origin", ORIGIN)]);
    assert_eq!(res.status(), 500);
    assert_eq!(res.header("access-control-allow-origin"), Some(ORIGIN));
}

#[test]
fn test_handler_headers_win_over_staged() {
    let cors = CorsFilterBuilder::new()
        .allowed_origins(&[ORIGIN])
        .build()
        .unwrap();
    let mut builder = RouterBuilder::new();
    builder.filter(None, "*", Filter::around(cors)).unwrap();
    builder
        .get("/custom", |_req| {
            let mut res = HandlerResponse::empty(200);
            res.set_header("vary", "Accept".to_string());
            Ok(res)
        })
        .unwrap();
    let dispatcher = Dispatcher::new(builder.build().unwrap());

    let res = get(&dispatcher, "/custom", &[("origin", ORIGIN)]);
    assert_eq!(res.header("vary"), Some("Accept"));
    assert_eq!(res.header("access-control-allow-origin"), Some(ORIGIN));
}
