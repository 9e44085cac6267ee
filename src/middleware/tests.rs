use std::sync::{Arc, Mutex};

use http::Method;
use serde_json::json;

use super::*;
use crate::dispatcher::{handler, Handler, HandlerRequest, HandlerResponse, HandlerResult, HeaderVec};
use crate::error::HandlerFailure;

type Log = Arc<Mutex<Vec<String>>>;

fn request() -> HandlerRequest {
    HandlerRequest::new(Method::GET, "/things", HeaderVec::new())
}

fn logging_before(log: &Log, label: &'static str) -> Filter {
    let log = Arc::clone(log);
    Filter::before(
        move |_req: &mut HandlerRequest| -> Result<Option<HandlerResponse>, HandlerFailure> {
            log.lock().unwrap().push(label.to_string());
            Ok(None)
        },
    )
}

fn logging_after(log: &Log, label: &'static str) -> Filter {
    let log = Arc::clone(log);
    Filter::after(AfterFn(
        move |_req: &mut HandlerRequest, res: HandlerResponse| -> HandlerResult {
            log.lock().unwrap().push(label.to_string());
            Ok(res)
        },
    ))
}

fn logging_handler(log: &Log) -> crate::dispatcher::SharedHandler {
    let log = Arc::clone(log);
    handler(move |req| {
        assert_eq!(req.phase(), RequestPhase::InHandler);
        log.lock().unwrap().push("handler".to_string());
        Ok(HandlerResponse::text(200, "ok"))
    })
}

struct Recorder {
    log: Log,
    replace_with: Option<u16>,
    fail_on_failure: bool,
}

impl AfterFilter for Recorder {
    fn on_failure(
        &self,
        _req: &mut HandlerRequest,
        failure: &HandlerFailure,
    ) -> Result<FailureAction, HandlerFailure> {
        self.log
            .lock()
            .unwrap()
            .push(format!("saw {}", failure.status()));
        if self.fail_on_failure {
            return Err(HandlerFailure::internal("recorder broke"));
        }
        Ok(match self.replace_with {
            Some(status) => FailureAction::Replace(HandlerResponse::text(status, "recovered")),
            None => FailureAction::Propagate,
        })
    }
}

#[test]
fn test_execution_order_before_handler_after() {
    let log: Log = Arc::default();
    let filters = vec![
        logging_before(&log, "F1"),
        logging_after(&log, "A1"),
        logging_before(&log, "F2"),
        logging_after(&log, "A2"),
    ];
    let chain = build_chain(&filters, logging_handler(&log));
    assert_eq!(chain.after_count(), 2);

    let mut req = request();
    let res = chain.handle(&mut req).unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(*log.lock().unwrap(), vec!["F1", "F2", "handler", "A1", "A2"]);
    assert_eq!(req.phase(), RequestPhase::Committed);
}

#[test]
fn test_after_filters_compose_results() {
    let filters = vec![
        Filter::after(AfterFn(
            |_req: &mut HandlerRequest, mut res: HandlerResponse| -> HandlerResult {
                res.set_header("x-first", "1".to_string());
                Ok(res)
            },
        )),
        Filter::after(AfterFn(
            |_req: &mut HandlerRequest, res: HandlerResponse| -> HandlerResult {
                let seen = res.get_header("x-first").unwrap_or("missing").to_string();
                Ok(HandlerResponse::json(res.status, json!({ "seen": seen })))
            },
        )),
    ];
    let chain = build_chain(&filters, handler(|_req| Ok(HandlerResponse::empty(201))));
    let res = chain.handle(&mut request()).unwrap();
    assert_eq!(res.status, 201);
    assert_eq!(res.body, json!({ "seen": "1" }));
}

#[test]
fn test_before_short_circuit_skips_rest() {
    let log: Log = Arc::default();
    let gate = Filter::before(
        |_req: &mut HandlerRequest| -> Result<Option<HandlerResponse>, HandlerFailure> {
            Ok(Some(HandlerResponse::text(401, "denied")))
        },
    );
    let filters = vec![
        logging_before(&log, "F1"),
        gate,
        logging_before(&log, "F3"),
        logging_after(&log, "A1"),
    ];
    let chain = build_chain(&filters, logging_handler(&log));

    let mut req = request();
    let res = chain.handle(&mut req).unwrap();
    assert_eq!(res.status, 401);
    assert_eq!(*log.lock().unwrap(), vec!["F1", "A1"]);
    assert_eq!(req.phase(), RequestPhase::Committed);
}

#[test]
fn test_failure_reaches_every_after_filter_in_order() {
    let log: Log = Arc::default();
    let failing = Filter::before(
        |_req: &mut HandlerRequest| -> Result<Option<HandlerResponse>, HandlerFailure> {
            Err(HandlerFailure::bad_request("bad input"))
        },
    );
    let filters = vec![
        failing,
        Filter::after(Recorder {
            log: Arc::clone(&log),
            replace_with: None,
            fail_on_failure: false,
        }),
        Filter::after(Recorder {
            log: Arc::clone(&log),
            replace_with: None,
            fail_on_failure: false,
        }),
    ];
    let chain = build_chain(&filters, logging_handler(&log));

    let mut req = request();
    let failure = chain.handle(&mut req).unwrap_err();
    assert_eq!(failure.status(), 400);
    assert_eq!(*log.lock().unwrap(), vec!["saw 400", "saw 400"]);
    assert_eq!(req.phase(), RequestPhase::Failed);
}

#[test]
fn test_failing_failure_handler_is_suppressed() {
    let log: Log = Arc::default();
    let filters = vec![
        Filter::after(Recorder {
            log: Arc::clone(&log),
            replace_with: None,
            fail_on_failure: true,
        }),
        Filter::after(Recorder {
            log: Arc::clone(&log),
            replace_with: None,
            fail_on_failure: false,
        }),
    ];
    let chain = build_chain(
        &filters,
        handler(|_req| Err(HandlerFailure::not_found("no such thing"))),
    );

    let failure = chain.handle(&mut request()).unwrap_err();
    assert_eq!(failure.status(), 404);
    assert_eq!(failure.message(), "no such thing");
    assert_eq!(failure.suppressed().len(), 1);
    assert_eq!(failure.suppressed()[0].message(), "recorder broke");
    assert_eq!(*log.lock().unwrap(), vec!["saw 404", "saw 404"]);
}

#[test]
fn test_replace_resets_failure() {
    let log: Log = Arc::default();
    let filters = vec![
        Filter::after(Recorder {
            log: Arc::clone(&log),
            replace_with: Some(503),
            fail_on_failure: false,
        }),
        logging_after(&log, "A2"),
    ];
    let chain = build_chain(
        &filters,
        handler(|_req| Err(HandlerFailure::internal("boom"))),
    );

    let mut req = request();
    let res = chain.handle(&mut req).unwrap();
    assert_eq!(res.status, 503);
    assert_eq!(*log.lock().unwrap(), vec!["saw 500", "A2"]);
    assert_eq!(req.phase(), RequestPhase::Committed);
}

#[test]
fn test_around_wraps_first_registered_outermost() {
    let log: Log = Arc::default();
    let around = |label: &'static str| {
        let log = Arc::clone(&log);
        Filter::around(
            move |req: &mut HandlerRequest, next: &dyn Handler| -> HandlerResult {
                log.lock().unwrap().push(format!("{label} in"));
                let res = next.handle(req);
                log.lock().unwrap().push(format!("{label} out"));
                res
            },
        )
    };
    let filters = vec![around("outer"), around("inner")];
    let chain = build_chain(&filters, logging_handler(&log));

    chain.handle(&mut request()).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer in", "inner in", "handler", "inner out", "outer out"]
    );
}

#[test]
fn test_around_may_retry_next() {
    let attempts = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&attempts);
    let retry = Filter::around(
        |req: &mut HandlerRequest, next: &dyn Handler| -> HandlerResult {
            match next.handle(req) {
                Ok(res) => Ok(res),
                Err(_) => next.handle(req),
            }
        },
    );
    let chain = build_chain(
        &[retry],
        handler(move |_req| {
            let mut n = counter.lock().unwrap();
            *n += 1;
            if *n == 1 {
                Err(HandlerFailure::internal("transient"))
            } else {
                Ok(HandlerResponse::empty(204))
            }
        }),
    );

    let res = chain.handle(&mut request()).unwrap();
    assert_eq!(res.status, 204);
    assert_eq!(*attempts.lock().unwrap(), 2);
}

#[test]
fn test_phase_transitions() {
    use RequestPhase::*;
    assert_eq!(Pending.advance(InFilters), Ok(InFilters));
    assert_eq!(InFilters.advance(InAfter), Ok(InAfter));
    assert_eq!(InAfter.advance(Failed), Ok(Failed));
    assert_eq!(Failed.advance(Committed), Ok(Committed));
    assert!(Committed.is_terminal());

    assert_eq!(
        Committed.advance(InFilters),
        Err(PhaseError::IllegalTransition {
            from: Committed,
            to: InFilters
        })
    );
    assert!(InHandler.advance(InFilters).is_err());
    assert!(Pending.advance(InHandler).is_err());
    assert_eq!(InAfter.to_string(), "IN_AFTER");
}

#[test]
fn test_writes_rejected_after_commit() {
    let mut req = request();
    req.stage_header("x-early", "1".to_string()).unwrap();
    req.advance(RequestPhase::Committed).unwrap();

    let err = req.stage_header("x-late", "2".to_string()).unwrap_err();
    assert!(matches!(err, PhaseError::Committed { .. }));
    assert_eq!(req.staged_header("x-early"), Some("1"));
    assert_eq!(req.staged_header("x-late"), None);
}

#[test]
fn test_on_failure_fn_adapter() {
    let filters = vec![Filter::after(OnFailureFn(
        |_req: &mut HandlerRequest, failure: &HandlerFailure| -> Result<FailureAction, HandlerFailure> {
            if failure.status() == 404 {
                Ok(FailureAction::Replace(HandlerResponse::text(200, "fallback")))
            } else {
                Ok(FailureAction::Propagate)
            }
        },
    ))];
    let chain = build_chain(
        &filters,
        handler(|_req| Err(HandlerFailure::not_found("gone"))),
    );
    let res = chain.handle(&mut request()).unwrap();
    assert_eq!(res.body, json!("fallback"));
}

#[test]
fn test_tracing_filter_passes_result_through() {
    let chain = build_chain(
        &[Filter::around(TracingFilter)],
        handler(|_req| Ok(HandlerResponse::empty(202))),
    );
    assert_eq!(chain.handle(&mut request()).unwrap().status, 202);

    let chain = build_chain(
        &[Filter::around(TracingFilter)],
        handler(|_req| Err(HandlerFailure::forbidden("nope"))),
    );
    assert_eq!(chain.handle(&mut request()).unwrap_err().status(), 403);
}

#[test]
fn test_panicking_handler_reaches_failure_handlers() {
    let log = Log::default();
    let filters = vec![
        logging_before(&log, "F1"),
        Filter::after(Recorder {
            log: Arc::clone(&log),
            replace_with: None,
            fail_on_failure: false,
        }),
    ];
    let chain = build_chain(&filters, handler(|_req| panic!("kaboom")));
    let mut req = request();
    let failure = chain.handle(&mut req).unwrap_err();

    assert_eq!(failure.status(), 500);
    assert!(failure.message().contains("kaboom"));
    assert_eq!(*log.lock().unwrap(), vec!["F1", "saw 500"]);
    assert_eq!(req.phase(), RequestPhase::Failed);
}
