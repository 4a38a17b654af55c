//! Controller failover: rotation, subscription replay, message settlement.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bytes::BytesMut;
use risq::{Client, Config, ConnId, Consume, Effect, Endpoint, Priority, Request};
use risq_wire::{encode, opcode};

fn expect_connect(client: &mut Client) -> (ConnId, Endpoint, Duration) {
    match client.poll_effect() {
        Some(Effect::Connect {
            conn,
            endpoint,
            delay,
        }) => (conn, endpoint, delay),
        other => panic!("expected Connect effect, got {other:?}"),
    }
}

fn expect_send(client: &mut Client, conn: ConnId) -> Vec<u8> {
    match client.poll_effect() {
        Some(Effect::Send { conn: c, bytes }) => {
            assert_eq!(c, conn);
            bytes.to_vec()
        }
        other => panic!("expected Send effect, got {other:?}"),
    }
}

fn drain(client: &mut Client) {
    while client.poll_effect().is_some() {}
}

fn consuming_ack(qid: u16, queue: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode::put_cmd(&mut buf, opcode::CLEAR);
    encode::put_u16(&mut buf, opcode::QUEUE_ID, qid);
    encode::put_str8(&mut buf, opcode::QUEUE, queue).unwrap();
    encode::put_cmd(&mut buf, opcode::CONSUMING);
    buf.to_vec()
}

fn inbound_request(id: u32, queue: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode::put_cmd(&mut buf, opcode::CLEAR);
    encode::put_u32(&mut buf, opcode::ID, id);
    encode::put_str8(&mut buf, opcode::QUEUE, queue).unwrap();
    encode::put_str32(&mut buf, opcode::PAYLOAD, payload);
    encode::put_cmd(&mut buf, opcode::REQUEST);
    buf.to_vec()
}

#[test]
fn refused_connect_rotates_to_next_controller() {
    let mut client = Client::default();
    client.add_controller("10.0.0.1:13555").unwrap();
    client.add_controller("10.0.0.2:13555").unwrap();

    let (conn_a, endpoint_a, _) = expect_connect(&mut client);
    assert_eq!(endpoint_a.to_string(), "10.0.0.1:13555");

    client.handle_connect_failed(conn_a);

    // The failed head moved to the tail and its alternate is attempted,
    // with no user-visible error anywhere.
    let (conn_b, endpoint_b, delay) = expect_connect(&mut client);
    assert_ne!(conn_b, conn_a);
    assert_eq!(endpoint_b.to_string(), "10.0.0.2:13555");
    assert_eq!(delay, Duration::ZERO);

    let order: Vec<String> = client.controllers().map(|e| e.to_string()).collect();
    assert_eq!(order, vec!["10.0.0.2:13555", "10.0.0.1:13555"]);
}

#[test]
fn exhausted_list_retries_with_backoff() {
    let cfg = Config::default()
        .with_reconnect_ivl(Duration::from_millis(100))
        .with_reconnect_ivl_max(Duration::from_secs(1));
    let mut client = Client::new(cfg);
    client.add_controller("10.0.0.1:13555").unwrap();

    let (conn, _, delay) = expect_connect(&mut client);
    assert_eq!(delay, Duration::ZERO);
    client.handle_connect_failed(conn);

    let (conn, _, delay) = expect_connect(&mut client);
    assert_eq!(delay, Duration::from_millis(100));
    client.handle_connect_failed(conn);

    let (conn, _, delay) = expect_connect(&mut client);
    assert_eq!(delay, Duration::from_millis(200));
    client.handle_connect_failed(conn);
}

#[test]
fn lost_connection_drops_and_replays_subscriptions() {
    let accepted: Rc<RefCell<Vec<(String, u16)>>> = Rc::new(RefCell::new(Vec::new()));
    let dropped: Rc<RefCell<Vec<(String, u16)>>> = Rc::new(RefCell::new(Vec::new()));
    let accepted2 = Rc::clone(&accepted);
    let dropped2 = Rc::clone(&dropped);

    let mut client = Client::default();
    client.add_controller("10.0.0.1:13555").unwrap();
    client.add_controller("10.0.0.2:13555").unwrap();

    let (conn_a, _, _) = expect_connect(&mut client);
    client.handle_connected(conn_a);
    client
        .consume(
            Consume::new("q1")
                .max(5)
                .on_accepted(move |_outbox, queue, qid| {
                    accepted2.borrow_mut().push((queue.to_string(), qid));
                })
                .on_dropped(move |_outbox, queue, qid| {
                    dropped2.borrow_mut().push((queue.to_string(), qid));
                }),
            |_, _| {},
        )
        .unwrap();
    let announce_a = expect_send(&mut client, conn_a);

    client.handle_bytes(conn_a, &consuming_ack(5, b"q1"));
    assert_eq!(accepted.borrow().as_slice(), &[("q1".to_string(), 5)]);

    // The acknowledged subscription dies with its connection...
    client.handle_closed(conn_a);
    assert_eq!(dropped.borrow().as_slice(), &[("q1".to_string(), 5)]);

    // ...and is announced verbatim to the replacement controller.
    let (conn_b, endpoint_b, _) = expect_connect(&mut client);
    assert_eq!(endpoint_b.to_string(), "10.0.0.2:13555");
    client.handle_connected(conn_b);
    let announce_b = expect_send(&mut client, conn_b);
    assert_eq!(announce_b, announce_a);

    // A fresh CONSUMING on the new connection is accepted again.
    client.handle_bytes(conn_b, &consuming_ack(9, b"q1"));
    assert_eq!(accepted.borrow().len(), 2);
    assert_eq!(accepted.borrow()[1], ("q1".to_string(), 9));
}

#[test]
fn emitted_request_fails_when_its_connection_dies() {
    let failed: Rc<RefCell<Vec<u16>>> = Rc::new(RefCell::new(Vec::new()));
    let failed2 = Rc::clone(&failed);

    let mut client = Client::default();
    client.add_controller("10.0.0.1:13555").unwrap();
    client.add_controller("10.0.0.2:13555").unwrap();
    let (conn_a, _, _) = expect_connect(&mut client);
    client.handle_connected(conn_a);

    client
        .send(
            Request::new("w", "job"),
            None,
            Some(Box::new(move |_outbox, id| {
                failed2.borrow_mut().push(id.as_u16());
            })),
        )
        .unwrap();
    drain(&mut client);
    assert_eq!(client.in_flight(), 1);

    // Transport loss: failover never retries an emitted request.
    client.handle_closed(conn_a);
    assert_eq!(failed.borrow().as_slice(), &[0]);
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn remote_closing_prepares_replacement_while_old_socket_drains() {
    let retained: Rc<RefCell<Option<risq::MessageId>>> = Rc::new(RefCell::new(None));
    let retained2 = Rc::clone(&retained);

    let mut client = Client::default();
    client.add_controller("10.0.0.1:13555").unwrap();
    client.add_controller("10.0.0.2:13555").unwrap();
    let (conn_a, _, _) = expect_connect(&mut client);
    client.handle_connected(conn_a);
    client
        .consume(
            Consume::new("q1").priority(Priority::High),
            move |_outbox, delivery| {
                *retained2.borrow_mut() = Some(delivery.id());
            },
        )
        .unwrap();
    drain(&mut client);

    // An in-flight delivery is retained when CLOSING arrives.
    client.handle_bytes(conn_a, &inbound_request(11, b"q1", b"work"));
    let id = retained.borrow().expect("delivery reached the handler");
    drain(&mut client);

    client.handle_bytes(conn_a, &[opcode::CLOSING]);

    // A replacement connect starts immediately; the old connection is
    // rotated out of the head slot but keeps its socket.
    let (conn_b, endpoint_b, _) = expect_connect(&mut client);
    assert_eq!(endpoint_b.to_string(), "10.0.0.2:13555");
    let order: Vec<String> = client.controllers().map(|e| e.to_string()).collect();
    assert_eq!(order, vec!["10.0.0.2:13555", "10.0.0.1:13555"]);

    // New work waits for the replacement...
    client.send(Request::new("w", "new job"), None, None).unwrap();
    assert!(matches!(client.poll_effect(), None));

    // ...while the retained reply still goes out on the draining socket.
    client.reply(id, "done").unwrap();
    let reply_bytes = expect_send(&mut client, conn_a);
    assert_eq!(*reply_bytes.first().unwrap(), opcode::CLEAR);
    assert!(reply_bytes.ends_with(&[opcode::REPLY]));

    // Activation of the replacement flushes the queued request and replays
    // the subscription.
    client.handle_connected(conn_b);
    let sent = expect_send(&mut client, conn_b);
    assert!(sent.ends_with(&[opcode::REQUEST]));
    assert!(sent
        .windows(2)
        .any(|w| w == [opcode::CONSUME, opcode::CLEAR]));
}

#[test]
fn protocol_violation_drops_only_the_connection() {
    let mut client = Client::default();
    client.add_controller("10.0.0.1:13555").unwrap();
    client.add_controller("10.0.0.2:13555").unwrap();
    let (conn_a, _, _) = expect_connect(&mut client);
    client.handle_connected(conn_a);
    drain(&mut client);

    // SERVER-FULL is not a client-bound verb; the connection dies, the
    // client survives and fails over.
    client.handle_bytes(conn_a, &[opcode::SERVER_FULL]);

    match client.poll_effect() {
        Some(Effect::Close { conn }) => assert_eq!(conn, conn_a),
        other => panic!("expected Close effect, got {other:?}"),
    }
    let (_, endpoint_b, _) = expect_connect(&mut client);
    assert_eq!(endpoint_b.to_string(), "10.0.0.2:13555");
}
