#![allow(dead_code)]

use std::sync::Arc;

use http::Method;
use serde_json::json;
use switchyard::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse, HandlerResult, HeaderVec};
use switchyard::middleware::CommittedResponse;
use switchyard::router::{MatchResult, RouteMatch};

/// Build a header list from `(name, value)` pairs
pub fn headers(pairs: &[(&str, &str)]) -> HeaderVec {
    pairs
        .iter()
        .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
        .collect()
}

/// Handler answering 200 with `{"handler": label}`
pub fn labelled(label: &'static str) -> impl Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync {
    move |_req| Ok(HandlerResponse::json(200, json!({ "handler": label })))
}

pub fn expect_match(result: MatchResult) -> RouteMatch {
    match result {
        MatchResult::Matched(m) => m,
        other => panic!("expected a match, got {other:?}"),
    }
}

/// Which labelled handler produced a response
pub fn handler_of(res: &CommittedResponse) -> &str {
    res.body()["handler"].as_str().unwrap_or("")
}

pub fn get(dispatcher: &Dispatcher, path: &str, pairs: &[(&str, &str)]) -> CommittedResponse {
    dispatcher.dispatch(Method::GET, path, headers(pairs), None)
}
