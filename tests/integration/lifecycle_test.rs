// tests/integration/lifecycle_test.rs

//! Drives the session lifecycle callbacks the way a transport would, against
//! in-memory sessions.

use super::test_helpers::*;
use bytes::Bytes;
use echo_server::core::protocol::{EchoHeader, HEARTBEAT_CMD, Inbound};
use echo_server::core::{Dispatch, EchoError, SessionListener};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const IDLE: Duration = Duration::from_secs(5);

// ===== Admission =====

#[tokio::test]
async fn test_open_admits_until_limit_then_rejects() {
    init_tracing();
    let lifecycle = standard_lifecycle(1, IDLE);
    let a = MockSession::new("a");
    let b = MockSession::new("b");

    assert_ok!(lifecycle.on_open(&handle(1, &a)));
    let err = assert_err!(lifecycle.on_open(&handle(2, &b)));
    assert_eq!(err, EchoError::TooManySessions);

    let registry = lifecycle.registry();
    assert!(registry.contains(1));
    assert!(!registry.contains(2));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_slot_is_freed_by_close() {
    let lifecycle = standard_lifecycle(1, IDLE);
    let a = MockSession::new("a");
    let c = MockSession::new("c");

    lifecycle.on_open(&handle(1, &a)).unwrap();
    lifecycle.on_close(&handle(1, &a));
    assert!(lifecycle.registry().is_empty());

    assert_ok!(lifecycle.on_open(&handle(3, &c)));
    assert_eq!(lifecycle.registry().len(), 1);
}

#[tokio::test]
async fn test_slot_is_freed_by_error() {
    let lifecycle = standard_lifecycle(1, IDLE);
    let a = MockSession::new("a");
    let b = MockSession::new("b");

    lifecycle.on_open(&handle(1, &a)).unwrap();
    lifecycle.on_error(&handle(1, &a), &EchoError::Protocol("bad magic".into()));
    assert!(lifecycle.registry().is_empty());

    assert_ok!(lifecycle.on_open(&handle(2, &b)));
}

#[tokio::test]
async fn test_rejected_session_is_not_closed_by_core() {
    let lifecycle = standard_lifecycle(1, IDLE);
    let a = MockSession::new("a");
    let b = MockSession::new("b");

    lifecycle.on_open(&handle(1, &a)).unwrap();
    assert!(lifecycle.on_open(&handle(2, &b)).is_err());
    assert_eq!(b.close_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_respect_limit() {
    const MAX: usize = 5;
    let lifecycle = Arc::new(standard_lifecycle(MAX, IDLE));

    let mut tasks = Vec::new();
    for id in 0..50u64 {
        let lifecycle = lifecycle.clone();
        tasks.push(tokio::spawn(async move {
            let session = MockSession::new("concurrent");
            lifecycle.on_open(&handle(id, &session))
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(EchoError::TooManySessions) => rejected += 1,
            Err(e) => panic!("unexpected admission error: {e}"),
        }
    }
    assert_eq!(accepted, MAX);
    assert_eq!(rejected, 50 - MAX);
    assert_eq!(lifecycle.registry().len(), MAX);
}

// ===== Dispatch =====

#[tokio::test]
async fn test_message_runs_registered_handler() {
    let handler = ScriptedHandler::new();
    let lifecycle = lifecycle_with(10, IDLE, handler.clone());
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();

    let outcome = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(echo_package("hello")))
        .await;

    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(handler.calls(), 1);
    let written = a.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].body, Bytes::from_static(b"hello"));
    assert_eq!(lifecycle.registry().failure_count(1), Some(0));
}

#[tokio::test]
async fn test_unknown_command_is_discarded() {
    let handler = ScriptedHandler::new();
    let lifecycle = lifecycle_with(10, IDLE, handler.clone());
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();

    let mut package = echo_package("who am i");
    package.header.command = 99;
    let outcome = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(package))
        .await;

    assert_eq!(outcome, Dispatch::UnknownCommand(99));
    assert_eq!(handler.calls(), 0);
    assert!(a.written().is_empty());
    assert_eq!(lifecycle.registry().failure_count(1), Some(0));
    assert!(lifecycle.registry().contains(1));
}

#[tokio::test]
async fn test_malformed_input_is_discarded() {
    let handler = ScriptedHandler::new();
    let lifecycle = lifecycle_with(10, IDLE, handler.clone());
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();

    let inbound = Inbound::Malformed {
        header: EchoHeader {
            command: 1,
            sequence: 4,
            ..EchoHeader::default()
        },
        reason: "invalid utf-8".into(),
    };
    let outcome = lifecycle.on_message(&handle(1, &a), inbound).await;

    assert_eq!(outcome, Dispatch::Malformed);
    assert_eq!(handler.calls(), 0);
    assert!(a.written().is_empty());
    assert_eq!(lifecycle.registry().failure_count(1), Some(0));
}

#[tokio::test]
async fn test_handler_failure_counts_only_for_that_session() {
    let handler = ScriptedHandler::failing();
    let lifecycle = lifecycle_with(10, IDLE, handler.clone());
    let a = MockSession::new("a");
    let b = MockSession::new("b");
    lifecycle.on_open(&handle(1, &a)).unwrap();
    lifecycle.on_open(&handle(2, &b)).unwrap();

    let first = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(echo_package("x")))
        .await;
    let second = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(echo_package("y")))
        .await;

    assert_eq!(first, Dispatch::Failed { failures: Some(1) });
    assert_eq!(second, Dispatch::Failed { failures: Some(2) });
    assert_eq!(lifecycle.registry().failure_count(1), Some(2));
    assert_eq!(lifecycle.registry().failure_count(2), Some(0));
    // Failures never evict.
    assert!(lifecycle.registry().contains(1));
    assert_eq!(a.close_calls(), 0);
}

#[tokio::test]
async fn test_empty_echo_is_handled_and_replied() {
    let lifecycle = standard_lifecycle(10, IDLE);
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();

    let outcome = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(echo_package("")))
        .await;

    assert_eq!(outcome, Dispatch::Handled);
    let written = a.written();
    assert_eq!(written.len(), 1);
    assert!(written[0].body.is_empty());
    assert_eq!(lifecycle.registry().failure_count(1), Some(0));
}

#[tokio::test]
async fn test_failed_reply_write_counts_as_failure() {
    let lifecycle = standard_lifecycle(10, IDLE);
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();
    a.fail_writes(true);

    let outcome = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(echo_package("lost")))
        .await;

    assert_eq!(outcome, Dispatch::Failed { failures: Some(1) });
    assert!(a.written().is_empty());
}

#[tokio::test]
async fn test_failure_after_session_left_registry() {
    let handler = ScriptedHandler::failing();
    let lifecycle = lifecycle_with(10, IDLE, handler.clone());
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();
    lifecycle.on_close(&handle(1, &a));

    let outcome = lifecycle
        .on_message(&handle(1, &a), Inbound::Package(echo_package("late")))
        .await;

    assert_eq!(outcome, Dispatch::Failed { failures: None });
    assert!(lifecycle.registry().is_empty());
}

#[tokio::test]
async fn test_standard_table_echo_and_heartbeat() {
    let lifecycle = standard_lifecycle(10, IDLE);
    let a = MockSession::new("a");
    lifecycle.on_open(&handle(1, &a)).unwrap();

    let echo = echo_package("ping me").with_sequence(11);
    let heartbeat = echo_server::core::protocol::EchoPackage::new(HEARTBEAT_CMD, Bytes::new())
        .with_sequence(12);

    assert_eq!(
        lifecycle
            .on_message(&handle(1, &a), Inbound::Package(echo.clone()))
            .await,
        Dispatch::Handled
    );
    assert_eq!(
        lifecycle
            .on_message(&handle(1, &a), Inbound::Package(heartbeat))
            .await,
        Dispatch::Handled
    );

    let written = a.written();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0], echo);
    assert_eq!(written[1].header.command, HEARTBEAT_CMD);
    assert_eq!(written[1].header.sequence, 12);
    assert!(written[1].body.is_empty());
}

// ===== Termination =====

#[tokio::test]
async fn test_close_after_error_is_noop() {
    let lifecycle = standard_lifecycle(10, IDLE);
    let a = MockSession::new("a");
    let b = MockSession::new("b");
    lifecycle.on_open(&handle(1, &a)).unwrap();
    lifecycle.on_open(&handle(2, &b)).unwrap();

    lifecycle.on_error(&handle(1, &a), &EchoError::SessionClosed);
    lifecycle.on_close(&handle(1, &a));

    assert!(!lifecycle.registry().contains(1));
    assert!(lifecycle.registry().contains(2));
    assert_eq!(lifecycle.registry().len(), 1);
}

#[tokio::test]
async fn test_close_for_unknown_session_is_noop() {
    let lifecycle = standard_lifecycle(10, IDLE);
    let a = MockSession::new("a");
    let stranger = MockSession::new("stranger");
    lifecycle.on_open(&handle(1, &a)).unwrap();

    lifecycle.on_close(&handle(77, &stranger));
    lifecycle.on_error(&handle(78, &stranger), &EchoError::SessionClosed);

    assert_eq!(lifecycle.registry().len(), 1);
    assert_eq!(stranger.close_calls(), 0);
}
