//! Controller connection records.
//!
//! A `Connection` is bookkeeping only — the client decides transitions and
//! the embedding driver performs the actual socket work. The record owns
//! the connection's outbound byte queue and, while active, its protocol
//! session.

use bytes::BytesMut;

use risq_wire::{encode, opcode};

use crate::endpoint::Endpoint;
use crate::reconnect::Backoff;
use crate::session::Session;
use crate::subscription::Subscription;
use crate::table::Message;

/// Stable identifier of a connection, unique for the client's lifetime.
/// Survives list rotation, which reorders connections freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub(crate) u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Socket lifecycle stage. The `closing`/`shutdown` overlays live in
/// separate flags because either can combine with `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnState {
    /// No socket.
    Idle,
    /// Non-blocking connect in progress.
    Connecting,
    /// Handshake complete, traffic flows.
    Active,
}

pub(crate) struct Connection {
    pub(crate) id: ConnId,
    pub(crate) endpoint: Endpoint,
    pub(crate) state: ConnState,
    /// Orderly close underway (peer CLOSING or local shutdown); the socket
    /// may keep draining in-flight work.
    pub(crate) closing: bool,
    /// User-requested teardown; never reconnect this entry.
    pub(crate) shutdown: bool,
    /// Protocol session; `Some` iff `state == Active`.
    pub(crate) session: Option<Session>,
    /// Bytes awaiting transmission, FIFO.
    pub(crate) outbuf: BytesMut,
    pub(crate) backoff: Backoff,
}

impl Connection {
    pub(crate) fn new(id: ConnId, endpoint: Endpoint, backoff: Backoff) -> Self {
        Self {
            id,
            endpoint,
            state: ConnState::Idle,
            closing: false,
            shutdown: false,
            session: None,
            outbuf: BytesMut::new(),
            backoff,
        }
    }

    /// Eligible to carry newly submitted work.
    pub(crate) fn accepts_work(&self) -> bool {
        self.state == ConnState::Active && !self.closing && !self.shutdown
    }

    /// Eligible for a fresh connect attempt (head position is checked by
    /// the caller).
    pub(crate) fn connectable(&self) -> bool {
        self.state == ConnState::Idle && !self.closing && !self.shutdown
    }

    // ---- command emission -------------------------------------------------
    //
    // Helpers append complete command sequences to `outbuf`; the client
    // surfaces the bytes as a Send effect at the end of the dispatch.

    /// `CLEAR, [EXCLUSIVE], QUEUE, MAX, PRIORITY, CONSUME`
    pub(crate) fn push_consume(&mut self, sub: &Subscription) {
        encode::put_cmd(&mut self.outbuf, opcode::CLEAR);
        if sub.exclusive {
            encode::put_cmd(&mut self.outbuf, opcode::EXCLUSIVE);
        }
        encode::put_str8(&mut self.outbuf, opcode::QUEUE, sub.queue.as_bytes())
            .expect("queue names are validated to fit 255 bytes");
        encode::put_u16(&mut self.outbuf, opcode::MAX, sub.max);
        encode::put_u16(&mut self.outbuf, opcode::PRIORITY, sub.priority.as_u16());
        encode::put_cmd(&mut self.outbuf, opcode::CONSUME);
    }

    /// `CLEAR, ID, DELIVERED`
    pub(crate) fn push_delivered(&mut self, id: u32) {
        encode::put_cmd(&mut self.outbuf, opcode::CLEAR);
        encode::put_u32(&mut self.outbuf, opcode::ID, id);
        encode::put_cmd(&mut self.outbuf, opcode::DELIVERED);
    }

    /// `CLEAR, ID, UNDELIVERED`
    pub(crate) fn push_undelivered(&mut self, id: u32) {
        encode::put_cmd(&mut self.outbuf, opcode::CLEAR);
        encode::put_u32(&mut self.outbuf, opcode::ID, id);
        encode::put_cmd(&mut self.outbuf, opcode::UNDELIVERED);
    }

    /// `CLEAR, ID, QUEUE, PAYLOAD, [NOREPLY], (BROADCAST | REQUEST)`
    pub(crate) fn push_request(&mut self, msg: &Message) {
        let queue = msg.queue.as_deref().unwrap_or_default();
        encode::put_cmd(&mut self.outbuf, opcode::CLEAR);
        encode::put_u32(&mut self.outbuf, opcode::ID, u32::from(msg.id.as_u16()));
        encode::put_str8(&mut self.outbuf, opcode::QUEUE, queue.as_bytes())
            .expect("queue names are validated to fit 255 bytes");
        encode::put_str32(&mut self.outbuf, opcode::PAYLOAD, &msg.data);
        if msg.noreply {
            encode::put_cmd(&mut self.outbuf, opcode::NOREPLY);
        }
        if msg.broadcast {
            encode::put_cmd(&mut self.outbuf, opcode::BROADCAST);
        } else {
            encode::put_cmd(&mut self.outbuf, opcode::REQUEST);
        }
    }

    /// `CLEAR, ID, [PAYLOAD], REPLY` — an empty reply omits the payload.
    pub(crate) fn push_reply(&mut self, src_id: u32, payload: &[u8]) {
        encode::put_cmd(&mut self.outbuf, opcode::CLEAR);
        encode::put_u32(&mut self.outbuf, opcode::ID, src_id);
        if !payload.is_empty() {
            encode::put_str32(&mut self.outbuf, opcode::PAYLOAD, payload);
        }
        encode::put_cmd(&mut self.outbuf, opcode::REPLY);
    }

    /// `PONG`
    pub(crate) fn push_pong(&mut self) {
        encode::put_cmd(&mut self.outbuf, opcode::PONG);
    }

    /// `CLOSING`
    pub(crate) fn push_closing(&mut self) {
        encode::put_cmd(&mut self.outbuf, opcode::CLOSING);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("closing", &self.closing)
            .field("shutdown", &self.shutdown)
            .field("outbuf_len", &self.outbuf.len())
            .finish_non_exhaustive()
    }
}
