use futures::executor::block_on;

use crate::{
    endpoint::{Resolution, SuspendCoordinator, SuspensionState},
    error::BridgeError,
};

#[test]
fn callback_names_are_prefixed_and_unique() {
    let coordinator = SuspendCoordinator::new("host");
    let first = coordinator.issue("echo").unwrap();
    let second = coordinator.issue("echo").unwrap();
    assert_eq!(first.callback_name(), "host/echo/0");
    assert_eq!(second.callback_name(), "host/echo/1");
    assert_eq!(coordinator.outstanding(), 2);
}

#[test]
fn issued_then_awaiting_then_resolved() {
    let coordinator = SuspendCoordinator::new("host");
    let call = coordinator.issue("echo").unwrap();
    let name = call.callback_name().to_string();

    assert_eq!(coordinator.state(&name), Some(SuspensionState::Issued));
    assert!(coordinator.mark_awaiting(&name));
    assert_eq!(coordinator.state(&name), Some(SuspensionState::AwaitingCallback));

    assert_eq!(
        coordinator.resume(&name, Ok(vec![String::from("done")])),
        Some(Resolution::Resolved)
    );
    assert_eq!(coordinator.state(&name), None);
    assert_eq!(block_on(call), Ok(vec![String::from("done")]));
}

#[test]
fn second_resume_finds_nothing() {
    let coordinator = SuspendCoordinator::new("host");
    let call = coordinator.issue("echo").unwrap();
    let name = call.callback_name().to_string();

    let error = BridgeError::application("Boom", "exploded");
    assert_eq!(coordinator.resume(&name, Err(error.clone())), Some(Resolution::Rejected));
    assert_eq!(coordinator.resume(&name, Ok(Vec::new())), None);
    assert!(!coordinator.mark_awaiting(&name));
    assert_eq!(block_on(call), Err(error));
}

#[test]
fn named_callbacks_are_not_reused_while_outstanding() {
    let coordinator = SuspendCoordinator::new("host");
    let call = coordinator.issue_named("cb-1", "echoAsync").unwrap().unwrap();
    assert!(coordinator.issue_named("cb-1", "echoAsync").unwrap().is_none());

    coordinator.resume("cb-1", Ok(Vec::new()));
    assert!(coordinator.issue_named("cb-1", "echoAsync").unwrap().is_some());
    assert_eq!(block_on(call), Ok(Vec::new()));
}

#[test]
fn cancel_instance_only_touches_that_instance() {
    let coordinator = SuspendCoordinator::new("guest");
    let a = coordinator.issue("a").unwrap();
    let b = coordinator.issue("b").unwrap();
    let a2 = coordinator.issue("a").unwrap();

    let mut cancelled = coordinator.cancel_instance("a");
    cancelled.sort();
    assert_eq!(cancelled, vec!["guest/a/0", "guest/a/2"]);
    assert_eq!(coordinator.outstanding(), 1);

    assert_eq!(block_on(a), Err(BridgeError::Cancelled(String::from("guest/a/0"))));
    assert_eq!(block_on(a2), Err(BridgeError::Cancelled(String::from("guest/a/2"))));

    assert_eq!(coordinator.cancel_all(), vec!["guest/b/1"]);
    assert_eq!(block_on(b), Err(BridgeError::Cancelled(String::from("guest/b/1"))));
    assert_eq!(coordinator.outstanding(), 0);
}

#[test]
fn abandoned_suspension_reads_as_cancelled() {
    let coordinator = SuspendCoordinator::new("host");
    let call = coordinator.issue("echo").unwrap();
    let name = call.callback_name().to_string();
    coordinator.abandon(&name);
    assert!(!coordinator.cancel(&name));
    assert_eq!(block_on(call), Err(BridgeError::Cancelled(name)));
}

#[test]
fn cancel_all_refuses_later_issues() {
    let coordinator = SuspendCoordinator::new("host");
    let call = coordinator.issue("echo").unwrap();
    assert_eq!(coordinator.cancel_all(), vec!["host/echo/0"]);
    assert_eq!(block_on(call), Err(BridgeError::Cancelled(String::from("host/echo/0"))));

    assert_eq!(coordinator.issue("echo").err(), Some(BridgeError::ChannelClosed));
    assert_eq!(
        coordinator.issue_named("cb-1", "echo").err(),
        Some(BridgeError::ChannelClosed)
    );
    assert_eq!(coordinator.outstanding(), 0);
}
