//! Request/response scenarios driven step by step.
//!
//! These tests pin down exactly what each `step` does, so protocol tests
//! built on the pump can assert between individual exchanges.

use bytes::Bytes;
use iosim::{PumpConfig, PumpError, Side, connect, with_connected_pair};
use iosim_harness::{Chatter, Failing, HarnessError, LineEcho, Recorder, init_test_tracing};

#[test]
fn ping_pong_takes_two_steps() {
    init_test_tracing();
    let (client, server, mut pump) =
        connect(Recorder::new(), LineEcho::new(), PumpConfig::default()).expect("connect");

    client.borrow().send(b"PING\r\n").expect("send");

    // PING reaches the server; PONG is queued but not yet delivered
    assert!(pump.step(false).expect("step 1"));
    assert_eq!(server.borrow().lines(), &[Bytes::from_static(b"PING")]);
    assert!(client.borrow().received().is_empty());

    assert!(pump.step(false).expect("step 2"));
    assert_eq!(client.borrow().received(), b"PONG\r\n");

    assert!(!pump.step(false).expect("step 3"));
}

#[test]
fn greeting_delivered_by_connect() {
    init_test_tracing();
    let (client, _server, mut pump) =
        connect(Recorder::new(), LineEcho::with_greeting(b"+OK ready\r\n"), PumpConfig::default())
            .expect("connect");

    assert_eq!(client.borrow().received(), b"+OK ready\r\n");
    assert!(!pump.flush(false).expect("flush"));
}

#[test]
fn flush_is_idempotent_at_quiescence() {
    init_test_tracing();
    let (client, server, mut pump) =
        connect(Recorder::new(), LineEcho::new(), PumpConfig::default()).expect("connect");

    client.borrow().send(b"one\r\ntwo\r\n").expect("send");
    assert!(pump.flush(false).expect("first flush"));

    let received = client.borrow().received().to_vec();
    let lines = server.borrow().lines().len();

    assert!(!pump.flush(false).expect("second flush"));
    assert!(!pump.flush(true).expect("third flush"));
    assert_eq!(client.borrow().received(), received.as_slice());
    assert_eq!(server.borrow().lines().len(), lines);
    assert!(pump.is_quiescent());
}

#[test]
fn pipelined_requests_answered_in_order() {
    init_test_tracing();
    let (client, server, mut pump) =
        connect(Recorder::new(), LineEcho::new(), PumpConfig::default()).expect("connect");

    client.borrow().send(b"PING\r\nfirst\r\n").expect("send");
    client.borrow().send(b"second\r\nPING\r\n").expect("send");

    assert!(pump.flush(false).expect("flush"));
    assert_eq!(client.borrow().received(), b"PONG\r\nfirst\r\nsecond\r\nPONG\r\n");
    assert_eq!(server.borrow().lines().len(), 4);
}

#[test]
fn writes_between_steps_arrive_as_separate_chunks() {
    init_test_tracing();
    let (client, server, mut pump) =
        connect(Recorder::new(), Recorder::new(), PumpConfig::default()).expect("connect");

    client.borrow().send(b"abc").expect("send");
    client.borrow().send(b"def").expect("send");
    assert!(pump.step(false).expect("step"));

    client.borrow().send(b"ghi").expect("send");
    assert!(pump.step(false).expect("step"));

    // Writes made before a step are coalesced into one delivery
    assert_eq!(server.borrow().chunks(), 2);
    assert_eq!(server.borrow().received(), b"abcdefghi");
}

#[test]
fn runaway_ping_pong_hits_ceiling() {
    init_test_tracing();
    let (client, server, mut pump) =
        connect(Chatter::new(), Chatter::new(), PumpConfig::default()).expect("connect");

    pump.client_transport().write(b"start\r\n");
    let err = pump.flush(false).expect_err("never quiesces");

    assert!(matches!(err, PumpError::NoQuiescence { iterations: 1000 }));
    assert_eq!(server.borrow().deliveries() + client.borrow().deliveries(), 1000);
}

#[test]
fn ceiling_is_configurable() {
    init_test_tracing();
    let config = PumpConfig::default().with_max_flush_iterations(10);
    let (_client, _server, mut pump) =
        connect(Chatter::new(), Chatter::new(), config).expect("connect");

    pump.server_transport().write(b"start\r\n");
    let err = pump.flush(false).expect_err("never quiesces");
    assert!(matches!(err, PumpError::NoQuiescence { iterations: 10 }));
}

#[test]
fn runaway_greeting_fails_connect() {
    init_test_tracing();
    let Err(err) = connect(Chatter::opening(), Chatter::new(), PumpConfig::default()) else {
        panic!("chatter pair must not settle");
    };
    assert!(matches!(err, PumpError::NoQuiescence { .. }));
}

#[test]
fn endpoint_error_propagates_with_side() {
    init_test_tracing();
    let (client, _server, mut pump) =
        connect(Recorder::new(), Failing::new(), PumpConfig::default()).expect("connect");

    client.borrow().send(b"bad input").expect("send");
    let err = pump.step(false).expect_err("server rejects");

    assert_eq!(err.side(), Some(Side::Server));
    let PumpError::Endpoint { source, .. } = &err else {
        panic!("expected endpoint error, got {err}");
    };
    assert_eq!(
        source.downcast_ref::<HarnessError>(),
        Some(&HarnessError::Rejected { line: "bad input".to_string() })
    );
}

#[test]
fn failing_client_reported_as_client() {
    init_test_tracing();
    let (_client, server, mut pump) =
        connect(Failing::new(), Recorder::new(), PumpConfig::default()).expect("connect");

    server.borrow().send(b"hello").expect("send");
    let err = pump.flush(false).expect_err("client rejects");
    assert_eq!(err.side(), Some(Side::Client));
}

#[test]
fn scoped_pair_runs_body_and_tears_down() {
    init_test_tracing();
    let mut transports = None;

    let lines = with_connected_pair(
        Recorder::new(),
        LineEcho::with_greeting(b"hi\r\n"),
        PumpConfig::default(),
        |client, server, pump| {
            assert_eq!(client.borrow().received(), b"hi\r\n");

            client.borrow().send(b"PING\r\n").map_err(|e| PumpError::endpoint(Side::Client, e))?;
            pump.flush(false)?;
            transports = Some((pump.client_transport().clone(), pump.server_transport().clone()));

            Ok::<_, PumpError>(server.borrow().lines().len())
        },
    )
    .expect("scoped body");

    assert_eq!(lines, 1);
    let (client_transport, server_transport) = transports.expect("body ran");
    assert!(client_transport.is_output_closed());
    assert!(server_transport.is_output_closed());
}

#[test]
fn failing_endpoint_inside_scope_still_tears_down() {
    init_test_tracing();
    let mut transport = None;

    let result = with_connected_pair(
        Failing::new(),
        Recorder::new(),
        PumpConfig::default(),
        |_client, server, pump| {
            transport = Some(pump.client_transport().clone());
            server.borrow().send(b"boom").map_err(|e| PumpError::endpoint(Side::Server, e))?;
            pump.flush(false)?;
            Ok::<_, PumpError>(())
        },
    );

    assert_eq!(result.expect_err("client rejects").side(), Some(Side::Client));
    assert!(transport.expect("body ran").is_output_closed());
}
