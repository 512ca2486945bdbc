use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use futures::executor::block_on;

use crate::{
    adapter::{FunctionService, InboundService},
    error::BridgeError,
};

fn service() -> FunctionService {
    FunctionService::new()
        .function("upper", |args| {
            Ok(args.into_iter().map(|arg| arg.to_uppercase()).collect())
        })
        .suspending_function("later", |args| async move {
            Ok::<Vec<String>, BridgeError>(args.into_iter().rev().collect())
        })
}

#[test]
fn dispatches_by_name() {
    let service = service();
    assert_eq!(service.function_names(), vec!["later", "upper"]);
    assert_eq!(
        service.call("upper", vec![String::from("hi")]),
        Ok(vec![String::from("HI")])
    );
}

#[test]
fn unknown_function_leaves_service_blank() {
    let service = service();
    assert_eq!(
        service.call("missing", Vec::new()),
        Err(BridgeError::unknown_method("missing"))
    );
    assert!(matches!(
        service.call_suspending("missing", Vec::new()),
        Err(BridgeError::UnknownMethod { .. })
    ));
}

#[test]
fn suspending_function_only_suspends() {
    let service = service();
    assert_eq!(
        service.call("later", Vec::new()),
        Err(BridgeError::unknown_method("later"))
    );
    let future = service
        .call_suspending("later", vec![String::from("a"), String::from("b")])
        .unwrap();
    assert_eq!(block_on(future), Ok(vec![String::from("b"), String::from("a")]));
}

#[test]
fn sync_function_through_suspending_call() {
    let service = service();
    let future = service
        .call_suspending("upper", vec![String::from("x")])
        .unwrap();
    assert_eq!(block_on(future), Ok(vec![String::from("X")]));
}

#[test]
fn close_hook_runs_per_close() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let service = FunctionService::new().on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    service.close();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
