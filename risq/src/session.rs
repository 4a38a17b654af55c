//! Per-connection protocol session.
//!
//! A `Session` exists only while its connection is active. It owns the
//! receive buffer, the RISP decoder and the parameter accumulator, and
//! turns raw socket bytes into validated [`Verb`]s. Setter commands are
//! absorbed into the accumulator; verb commands check their parameter
//! requirements and come out carrying the consumed values.
//!
//! A violation ends the event batch with [`SessionEvent::Error`]; commands
//! decoded earlier in the same read still take effect, as they already had
//! left the wire.
//!
//! The session knows nothing about subscriptions, the message table or
//! other connections — interpreting a verb is the client's job.

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use tracing::trace;

use risq_wire::{Decoder, Op};

use crate::accum::Accumulator;
use crate::error::ProtocolError;

/// A validated protocol verb with its consumed parameters.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Verb {
    Ping,
    Pong,
    Consuming {
        qid: u16,
        queue: Bytes,
    },
    Request {
        id: u32,
        target: Target,
        payload: Bytes,
        noreply: bool,
    },
    Delivered {
        id: u32,
    },
    Reply {
        id: u32,
        payload: Bytes,
    },
    Closing,
}

/// How an inbound REQUEST names its queue.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Target {
    Qid(u16),
    Name(Bytes),
}

#[derive(Debug)]
pub(crate) enum SessionEvent {
    Verb(Verb),
    /// Fatal for the connection; always the last event of a batch.
    Error(ProtocolError),
}

pub(crate) type EventBatch = SmallVec<[SessionEvent; 4]>;

#[derive(Debug)]
pub(crate) struct Session {
    decoder: Decoder,
    recv: BytesMut,
    accum: Accumulator,
}

impl Session {
    pub(crate) fn new(max_payload: usize) -> Self {
        Self {
            decoder: Decoder::new().with_max_str(max_payload),
            recv: BytesMut::new(),
            accum: Accumulator::new(),
        }
    }

    /// Feed a socket read into the session.
    ///
    /// Decodes every complete command in arrival order; a partial trailing
    /// command is carried over to the next call.
    pub(crate) fn on_bytes(&mut self, chunk: &[u8]) -> EventBatch {
        self.recv.extend_from_slice(chunk);

        let mut events = EventBatch::new();
        loop {
            match self.decoder.decode(&mut self.recv) {
                Ok(Some(op)) => match self.apply(op) {
                    Ok(Some(verb)) => events.push(SessionEvent::Verb(verb)),
                    Ok(None) => {}
                    Err(violation) => {
                        events.push(SessionEvent::Error(violation));
                        break;
                    }
                },
                Ok(None) => break,
                Err(wire) => {
                    events.push(SessionEvent::Error(wire.into()));
                    break;
                }
            }
        }
        events
    }

    fn apply(&mut self, op: Op) -> Result<Option<Verb>, ProtocolError> {
        let verb = match op {
            // Parameter setters.
            Op::Id(v) => {
                self.accum.set_id(v)?;
                None
            }
            Op::QueueId(v) => {
                self.accum.set_queue_id(v)?;
                None
            }
            Op::Timeout(v) => {
                self.accum.set_timeout(v);
                None
            }
            Op::Priority(v) => {
                self.accum.set_priority(v);
                None
            }
            Op::Queue(name) => {
                self.accum.set_queue(name);
                None
            }
            Op::Payload(data) => {
                self.accum.set_payload(data);
                None
            }
            Op::NoReply => {
                self.accum.set_noreply();
                None
            }
            Op::Clear => {
                self.accum.clear();
                None
            }

            // Verbs.
            Op::Ping => Some(Verb::Ping),
            Op::Pong => Some(Verb::Pong),
            Op::Closing => Some(Verb::Closing),
            Op::Consuming => Some(self.verb_consuming()?),
            Op::Request => Some(self.verb_request()?),
            Op::Delivered => Some(Verb::Delivered {
                id: require(self.accum.id(), "DELIVERED", "ID")?,
            }),
            Op::Reply => Some(Verb::Reply {
                id: require(self.accum.id(), "REPLY", "ID")?,
                payload: require(self.accum.take_payload(), "REPLY", "PAYLOAD")?,
            }),

            // A controller never sends these to a client.
            Op::Broadcast => return Err(ProtocolError::Unsupported("BROADCAST")),
            Op::ServerFull => return Err(ProtocolError::Unsupported("SERVER-FULL")),

            // Client-to-controller commands; ignore like unknown opcodes.
            Op::Consume | Op::Exclusive | Op::Max(_) | Op::Undelivered => {
                trace!(?op, "ignoring client-bound command from peer");
                None
            }
        };
        Ok(verb)
    }

    fn verb_consuming(&mut self) -> Result<Verb, ProtocolError> {
        let qid = require(self.accum.queue_id(), "CONSUMING", "QUEUE-ID")?;
        let queue = require(self.accum.take_queue(), "CONSUMING", "QUEUE")?;
        Ok(Verb::Consuming { qid, queue })
    }

    fn verb_request(&mut self) -> Result<Verb, ProtocolError> {
        let id = require(self.accum.id(), "REQUEST", "ID")?;
        let target = match (self.accum.queue_id(), self.accum.queue_set()) {
            (Some(_), true) => return Err(ProtocolError::AmbiguousQueue),
            (Some(qid), false) => Target::Qid(qid),
            (None, true) => Target::Name(self.accum.take_queue().unwrap_or_default()),
            (None, false) => {
                return Err(ProtocolError::MissingParameter {
                    verb: "REQUEST",
                    param: "QUEUE or QUEUE-ID",
                })
            }
        };
        let payload = require(self.accum.take_payload(), "REQUEST", "PAYLOAD")?;
        Ok(Verb::Request {
            id,
            target,
            payload,
            noreply: self.accum.noreply(),
        })
    }
}

fn require<T>(
    value: Option<T>,
    verb: &'static str,
    param: &'static str,
) -> Result<T, ProtocolError> {
    value.ok_or(ProtocolError::MissingParameter { verb, param })
}

#[cfg(test)]
mod tests {
    use super::*;
    use risq_wire::{encode, opcode};

    fn session() -> Session {
        Session::new(1024 * 1024)
    }

    /// Unwrap a batch that must contain verbs only.
    fn verbs(events: EventBatch) -> Vec<Verb> {
        events
            .into_iter()
            .map(|event| match event {
                SessionEvent::Verb(verb) => verb,
                SessionEvent::Error(violation) => panic!("unexpected violation: {violation}"),
            })
            .collect()
    }

    fn request_bytes(id: u32, queue: &[u8], payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode::put_cmd(&mut buf, opcode::CLEAR);
        encode::put_u32(&mut buf, opcode::ID, id);
        encode::put_str8(&mut buf, opcode::QUEUE, queue).unwrap();
        encode::put_str32(&mut buf, opcode::PAYLOAD, payload);
        encode::put_cmd(&mut buf, opcode::REQUEST);
        buf
    }

    #[test]
    fn request_with_queue_name() {
        let mut s = session();
        let got = verbs(s.on_bytes(&request_bytes(7, b"q1", b"hi")));
        assert_eq!(
            got,
            vec![Verb::Request {
                id: 7,
                target: Target::Name(Bytes::from_static(b"q1")),
                payload: Bytes::from_static(b"hi"),
                noreply: false,
            }]
        );
    }

    #[test]
    fn request_missing_payload_is_violation() {
        let mut buf = BytesMut::new();
        encode::put_cmd(&mut buf, opcode::CLEAR);
        encode::put_u32(&mut buf, opcode::ID, 7);
        encode::put_str8(&mut buf, opcode::QUEUE, b"q1").unwrap();
        encode::put_cmd(&mut buf, opcode::REQUEST);

        let mut s = session();
        let events = s.on_bytes(&buf);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Error(ProtocolError::MissingParameter {
                verb: "REQUEST",
                param: "PAYLOAD",
            }))
        ));
    }

    #[test]
    fn request_with_both_queue_forms_is_violation() {
        let mut buf = BytesMut::new();
        encode::put_cmd(&mut buf, opcode::CLEAR);
        encode::put_u32(&mut buf, opcode::ID, 7);
        encode::put_u16(&mut buf, opcode::QUEUE_ID, 3);
        encode::put_str8(&mut buf, opcode::QUEUE, b"q1").unwrap();
        encode::put_str32(&mut buf, opcode::PAYLOAD, b"x");
        encode::put_cmd(&mut buf, opcode::REQUEST);

        let mut s = session();
        let events = s.on_bytes(&buf);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Error(ProtocolError::AmbiguousQueue))
        ));
    }

    #[test]
    fn payload_moves_out_on_request() {
        // Two REQUESTs back to back; the second re-sends the queue name but
        // not the payload, and must fail even though no CLEAR intervened.
        let mut buf = request_bytes(1, b"q1", b"one");
        encode::put_str8(&mut buf, opcode::QUEUE, b"q1").unwrap();
        encode::put_cmd(&mut buf, opcode::REQUEST);

        let mut s = session();
        let events = s.on_bytes(&buf);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Verb(Verb::Request { .. })));
        assert!(matches!(
            events[1],
            SessionEvent::Error(ProtocolError::MissingParameter {
                verb: "REQUEST",
                param: "PAYLOAD",
            })
        ));
    }

    #[test]
    fn consuming_requires_qid_and_name() {
        let mut buf = BytesMut::new();
        encode::put_cmd(&mut buf, opcode::CLEAR);
        encode::put_u16(&mut buf, opcode::QUEUE_ID, 42);
        encode::put_str8(&mut buf, opcode::QUEUE, b"q1").unwrap();
        encode::put_cmd(&mut buf, opcode::CONSUMING);

        let mut s = session();
        let got = verbs(s.on_bytes(&buf));
        assert_eq!(
            got,
            vec![Verb::Consuming {
                qid: 42,
                queue: Bytes::from_static(b"q1"),
            }]
        );

        let mut missing = BytesMut::new();
        encode::put_cmd(&mut missing, opcode::CLEAR);
        encode::put_u16(&mut missing, opcode::QUEUE_ID, 42);
        encode::put_cmd(&mut missing, opcode::CONSUMING);
        let events = s.on_bytes(&missing);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Error(ProtocolError::MissingParameter {
                verb: "CONSUMING",
                param: "QUEUE",
            }))
        ));
    }

    #[test]
    fn inbound_broadcast_is_unsupported() {
        let mut s = session();
        let events = s.on_bytes(&[opcode::BROADCAST]);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Error(ProtocolError::Unsupported("BROADCAST")))
        ));
    }

    #[test]
    fn partial_command_carries_over() {
        let full = request_bytes(9, b"q", b"payload");
        let mut s = session();

        let split = full.len() - 3;
        assert!(s.on_bytes(&full[..split]).is_empty());
        let got = verbs(s.on_bytes(&full[split..]));
        assert_eq!(got.len(), 1);
    }
}
