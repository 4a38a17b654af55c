//! The sans-IO queue client.
//!
//! `Client` holds the whole protocol state — the ordered controller list,
//! the subscription list, the message table — and never touches a socket.
//! An embedding driver performs the I/O it is told to do through
//! [`Effect`]s and feeds socket outcomes back in through the `handle_*`
//! methods. The bundled [`Driver`](crate::driver::Driver) does exactly
//! that on compio; a custom reactor can do the same.
//!
//! Failover model: the controller list is kept in arrival order and only
//! the head is ever connected to. Whenever a connection is lost (refused,
//! dropped, protocol violation, peer CLOSING) it rotates to the tail and
//! the new head is attempted. Subscriptions are re-announced on every
//! activation. Transport trouble is never surfaced as an error — the only
//! failure surface is the per-message and per-subscription callbacks.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, trace, warn};

use crate::config::Config;
use crate::conn::{ConnId, ConnState, Connection};
use crate::endpoint::Endpoint;
use crate::error::{Error, ProtocolError};
use crate::message::{
    Delivery, FailHandler, Outbox, OutboxOp, Reply, ReplyHandler, Request,
};
use crate::reconnect::Backoff;
use crate::session::{Session, SessionEvent, Target, Verb};
use crate::subscription::{Consume, Subscription};
use crate::table::{MessageId, MessageTable, MsgState};

/// I/O the embedding driver must perform on the client's behalf.
#[derive(Debug)]
pub enum Effect {
    /// Open a TCP connection to `endpoint` after `delay`, then report
    /// `handle_connected` or `handle_connect_failed`.
    Connect {
        conn: ConnId,
        endpoint: Endpoint,
        delay: Duration,
    },
    /// Write `bytes` to the connection, in order, before any later effect
    /// for the same connection.
    Send { conn: ConnId, bytes: Bytes },
    /// Close the connection's socket. No further events are expected for it.
    Close { conn: ConnId },
    /// Shutdown drain is complete; the driver can stop.
    Finished,
}

/// Why a connection is being torn down; decides backoff accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// The connect attempt itself failed.
    ConnectFailed,
    /// An established connection died or misbehaved.
    Transport,
    /// We are tearing it down on purpose.
    Local,
}

pub struct Client {
    pub(crate) cfg: Config,
    conns: VecDeque<Connection>,
    subs: Vec<Subscription>,
    table: MessageTable,
    /// Outbound messages accepted while no connection could carry them,
    /// in id-assignment order.
    pending: VecDeque<MessageId>,
    effects: VecDeque<Effect>,
    next_conn: u64,
    shutdown: bool,
    finished: bool,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Client {
    #[must_use]
    pub fn new(cfg: Config) -> Self {
        let table = MessageTable::new(cfg.initial_messages);
        Self {
            cfg,
            conns: VecDeque::new(),
            subs: Vec::new(),
            table,
            pending: VecDeque::new(),
            effects: VecDeque::new(),
            next_conn: 0,
            shutdown: false,
            finished: false,
        }
    }

    // ---- public operations ----------------------------------------------

    /// Register a controller at the tail of the failover list. The first
    /// controller is connected immediately.
    pub fn add_controller(&mut self, host: &str) -> Result<(), Error> {
        if self.shutdown {
            return Err(Error::ShuttingDown);
        }
        let endpoint = Endpoint::parse(host)?;
        let id = ConnId(self.next_conn);
        self.next_conn += 1;
        self.conns
            .push_back(Connection::new(id, endpoint, Backoff::new(&self.cfg)));
        debug!(%id, %endpoint, "controller added");
        self.maybe_connect();
        Ok(())
    }

    /// Subscribe to a queue. A second registration for the same queue name
    /// is a no-op. The announce goes out immediately when the head
    /// connection can carry it, and is replayed on every activation.
    pub fn consume(
        &mut self,
        consume: Consume,
        handler: impl FnMut(&mut Outbox, &mut Delivery) + 'static,
    ) -> Result<(), Error> {
        if self.shutdown {
            return Err(Error::ShuttingDown);
        }
        check_queue_name(&consume.queue)?;
        if self.subs.iter().any(|s| s.queue == consume.queue) {
            debug!(queue = %consume.queue, "already consuming");
            return Ok(());
        }

        self.subs.push(Subscription::new(consume, Box::new(handler)));
        let sub = self.subs.last().expect("subscription just pushed");
        if let Some(head) = self.conns.front_mut() {
            if head.accepts_work() {
                head.push_consume(sub);
            }
        }
        self.flush_outbufs();
        Ok(())
    }

    /// Submit an outbound request. The message is emitted on the head
    /// connection when one is active, and queued for the next activation
    /// otherwise. The returned id stays valid until the message clears.
    pub fn send(
        &mut self,
        req: Request,
        on_reply: Option<ReplyHandler>,
        on_fail: Option<FailHandler>,
    ) -> Result<MessageId, Error> {
        if self.shutdown {
            return Err(Error::ShuttingDown);
        }
        check_queue_name(&req.queue)?;
        if req.payload.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let used = self.table.used();
        let Some(msg) = self.table.alloc(None) else {
            return Err(Error::TableFull(used));
        };
        msg.queue = Some(req.queue);
        msg.data = req.payload;
        msg.noreply = req.noreply;
        msg.broadcast = req.broadcast;
        msg.on_reply = on_reply;
        msg.on_fail = on_fail;
        let id = msg.id;

        let carrier = match self.conns.front() {
            Some(head) if head.accepts_work() => Some(head.id),
            _ => None,
        };
        match carrier {
            Some(head_id) => {
                let msg = self.table.get(id).expect("message just allocated");
                let head = self.conns.front_mut().expect("head connection present");
                head.push_request(msg);
                self.table
                    .get_mut(id)
                    .expect("message just allocated")
                    .sent_on = Some(head_id);
            }
            None => {
                trace!(%id, "no active connection, queueing request");
                self.pending.push_back(id);
            }
        }
        self.flush_outbufs();
        Ok(id)
    }

    /// Reply to a delivery that a handler retained. Emitted on the
    /// connection the request arrived on; the message clears afterwards.
    pub fn reply(&mut self, id: MessageId, payload: impl Into<Bytes>) -> Result<(), Error> {
        self.reply_bytes(id, payload.into())
    }

    fn reply_bytes(&mut self, id: MessageId, payload: Bytes) -> Result<(), Error> {
        let Some(msg) = self.table.get(id) else {
            return Err(Error::UnknownMessage(id.as_u16()));
        };
        let Some(cid) = msg.conn else {
            return Err(Error::BadReplyState {
                id: id.as_u16(),
                reason: "it is an outbound request",
            });
        };
        if !matches!(msg.state, MsgState::Delivering | MsgState::Delivered) {
            return Err(Error::BadReplyState {
                id: id.as_u16(),
                reason: "it is not awaiting a reply",
            });
        }
        let src_id = msg.src_id.expect("inbound messages carry a source id");

        let Some(pos) = self.conn_pos(cid) else {
            return Err(Error::BadReplyState {
                id: id.as_u16(),
                reason: "its connection is gone",
            });
        };
        self.conns[pos].push_reply(src_id, &payload);

        let msg = self.table.clear(id).expect("looked up above");
        self.table.recycle(msg);
        self.flush_outbufs();
        self.check_finished();
        Ok(())
    }

    /// Begin orderly shutdown: send CLOSING everywhere, refuse new work,
    /// drain in-flight messages, then close. Never-sent queued requests
    /// fail immediately through their fail handlers.
    pub fn shutdown(&mut self) {
        if self.shutdown {
            return;
        }
        debug!(in_flight = self.table.used(), "shutdown requested");
        self.shutdown = true;

        while let Some(id) = self.pending.pop_front() {
            self.fail_message(id);
        }

        // Transitions rotate the list, so restart the scan after each one
        // rather than trusting an iterator; already-marked entries are
        // skipped on the next pass.
        'restart: loop {
            for i in 0..self.conns.len() {
                if self.conns[i].shutdown {
                    continue;
                }
                self.conns[i].shutdown = true;
                match self.conns[i].state {
                    ConnState::Connecting => {
                        let cid = self.conns[i].id;
                        self.effects.push_back(Effect::Close { conn: cid });
                        self.conn_closed(i, CloseReason::Local);
                        continue 'restart;
                    }
                    ConnState::Active => {
                        if !self.conns[i].closing {
                            self.conns[i].push_closing();
                            self.conns[i].closing = true;
                        }
                    }
                    ConnState::Idle => {}
                }
            }
            break;
        }

        self.flush_outbufs();
        self.check_finished();
    }

    // ---- introspection ----------------------------------------------------

    /// Messages currently in flight (inbound and outbound).
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.table.used()
    }

    /// True once shutdown has fully drained and every socket is released.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Controller endpoints in current failover order, head first.
    pub fn controllers(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.conns.iter().map(|c| c.endpoint)
    }

    // ---- driver surface ---------------------------------------------------

    /// Next piece of I/O the driver must perform, if any.
    pub fn poll_effect(&mut self) -> Option<Effect> {
        self.effects.pop_front()
    }

    /// The connect requested for `conn` completed.
    pub fn handle_connected(&mut self, cid: ConnId) {
        let Some(pos) = self.conn_pos(cid) else {
            return;
        };
        if self.conns[pos].state != ConnState::Connecting {
            debug!(%cid, "stale connected event ignored");
            return;
        }

        let conn = &mut self.conns[pos];
        conn.state = ConnState::Active;
        conn.session = Some(Session::new(self.cfg.max_payload));
        conn.backoff.reset();
        debug!(%cid, endpoint = %conn.endpoint, "connection active");

        // Re-announce every subscription to the fresh controller.
        for sub in &self.subs {
            self.conns[pos].push_consume(sub);
        }

        // Flush requests that were accepted while nothing could carry them.
        let queued: Vec<MessageId> = self.pending.drain(..).collect();
        for id in queued {
            let Some(msg) = self.table.get(id) else {
                continue;
            };
            self.conns[pos].push_request(msg);
            self.table
                .get_mut(id)
                .expect("looked up above")
                .sent_on = Some(cid);
        }

        self.flush_outbufs();
    }

    /// The connect requested for `conn` failed.
    pub fn handle_connect_failed(&mut self, cid: ConnId) {
        let Some(pos) = self.conn_pos(cid) else {
            return;
        };
        if self.conns[pos].state != ConnState::Connecting {
            debug!(%cid, "stale connect failure ignored");
            return;
        }
        debug!(%cid, endpoint = %self.conns[pos].endpoint, "connect failed");
        self.conn_closed(pos, CloseReason::ConnectFailed);
        self.check_finished();
    }

    /// Bytes arrived on an active connection.
    pub fn handle_bytes(&mut self, cid: ConnId, chunk: &[u8]) {
        let Some(pos) = self.conn_pos(cid) else {
            return;
        };
        let events = match self.conns[pos].session.as_mut() {
            Some(session) => session.on_bytes(chunk),
            None => {
                debug!(%cid, "bytes for a connection without a session ignored");
                return;
            }
        };

        for event in events {
            // Dispatch can rotate or even drop the connection.
            if self.conn_pos(cid).is_none() {
                break;
            }
            match event {
                SessionEvent::Verb(verb) => {
                    if let Err(violation) = self.dispatch(cid, verb) {
                        self.protocol_violation(cid, &violation);
                        break;
                    }
                }
                SessionEvent::Error(violation) => {
                    self.protocol_violation(cid, &violation);
                    break;
                }
            }
        }

        self.flush_outbufs();
        self.check_finished();
    }

    /// The connection's socket died: read or write returned zero or a hard
    /// error. Never called for sockets the client asked to close.
    pub fn handle_closed(&mut self, cid: ConnId) {
        let Some(pos) = self.conn_pos(cid) else {
            return;
        };
        if self.conns[pos].state == ConnState::Idle {
            return;
        }
        debug!(%cid, endpoint = %self.conns[pos].endpoint, "connection lost");
        self.conn_closed(pos, CloseReason::Transport);
        self.check_finished();
    }

    // ---- verb dispatch ----------------------------------------------------

    fn dispatch(&mut self, cid: ConnId, verb: Verb) -> Result<(), ProtocolError> {
        match verb {
            Verb::Ping => {
                let pos = self.conn_pos(cid).expect("checked by caller");
                self.conns[pos].push_pong();
                Ok(())
            }
            Verb::Pong => {
                trace!(%cid, "pong");
                Ok(())
            }
            Verb::Consuming { qid, queue } => self.on_consuming(cid, qid, &queue),
            Verb::Request {
                id,
                target,
                payload,
                noreply,
            } => self.on_request(cid, id, &target, payload, noreply),
            Verb::Delivered { id } => self.on_delivered(id),
            Verb::Reply { id, payload } => self.on_reply(id, payload),
            Verb::Closing => {
                self.on_remote_closing(cid);
                Ok(())
            }
        }
    }

    fn on_consuming(&mut self, cid: ConnId, qid: u16, queue: &[u8]) -> Result<(), ProtocolError> {
        let Some(i) = self.subs.iter().position(|s| s.queue.as_bytes() == queue) else {
            debug!(%cid, queue = %String::from_utf8_lossy(queue), "CONSUMING for an unknown queue");
            return Ok(());
        };
        let sub = &mut self.subs[i];
        if sub.qid != 0 {
            return Err(ProtocolError::DuplicateConsuming {
                queue: sub.queue.clone(),
                qid: sub.qid,
            });
        }
        sub.qid = qid;
        sub.qid_conn = Some(cid);
        debug!(%cid, queue = %sub.queue, qid, "subscription acknowledged");

        let mut outbox = Outbox::new();
        if let Some(cb) = sub.on_accepted.as_mut() {
            cb(&mut outbox, &sub.queue, qid);
        }
        self.process_outbox(outbox);
        Ok(())
    }

    fn on_request(
        &mut self,
        cid: ConnId,
        src_id: u32,
        target: &Target,
        payload: Bytes,
        noreply: bool,
    ) -> Result<(), ProtocolError> {
        let pos = self.conn_pos(cid).expect("checked by caller");

        let Some(si) = self.subs.iter().position(|s| s.matches(target)) else {
            debug!(%cid, src_id, "request for a queue we do not consume");
            self.conns[pos].push_undelivered(src_id);
            return Ok(());
        };

        let Some(msg) = self.table.alloc(Some(cid)) else {
            warn!(%cid, src_id, "message table exhausted, refusing request");
            self.conns[pos].push_undelivered(src_id);
            return Ok(());
        };
        msg.src_id = Some(src_id);
        msg.noreply = noreply;
        msg.state = MsgState::Delivering;
        let id = msg.id;

        self.conns[pos].push_delivered(src_id);

        let mut delivery = Delivery::new(id, payload, noreply);
        let mut outbox = Outbox::new();
        (self.subs[si].handler)(&mut outbox, &mut delivery);

        if noreply {
            let msg = self.table.clear(id).expect("allocated above");
            self.table.recycle(msg);
        } else if let Some(reply) = delivery.take_reply() {
            // Replied from inside the handler.
            self.conns[pos].push_reply(src_id, &reply);
            let msg = self.table.clear(id).expect("allocated above");
            self.table.recycle(msg);
        } else {
            // Handler kept it; the application replies later by id.
            let msg = self.table.get_mut(id).expect("allocated above");
            msg.state = MsgState::Delivered;
            msg.data = delivery.take_payload();
        }

        self.process_outbox(outbox);
        Ok(())
    }

    fn on_delivered(&mut self, wire_id: u32) -> Result<(), ProtocolError> {
        let Some(msg) = self.table.get_mut_wire(wire_id) else {
            return Err(ProtocolError::BadMessageRef {
                verb: "DELIVERED",
                id: wire_id,
                found: "not in flight",
            });
        };
        if !msg.is_outbound() {
            return Err(ProtocolError::BadMessageRef {
                verb: "DELIVERED",
                id: wire_id,
                found: "an inbound request",
            });
        }
        if msg.sent_on.is_none() {
            return Err(ProtocolError::BadMessageRef {
                verb: "DELIVERED",
                id: wire_id,
                found: "never emitted",
            });
        }
        if msg.state != MsgState::New {
            return Err(ProtocolError::BadMessageRef {
                verb: "DELIVERED",
                id: wire_id,
                found: "already acknowledged",
            });
        }

        if msg.noreply {
            // Nothing further will reference it; reclaim the id now.
            let id = msg.id;
            let msg = self.table.clear(id).expect("looked up above");
            self.table.recycle(msg);
            self.check_finished();
        } else {
            msg.state = MsgState::Delivered;
        }
        Ok(())
    }

    fn on_reply(&mut self, wire_id: u32, payload: Bytes) -> Result<(), ProtocolError> {
        let found = match self.table.get_mut_wire(wire_id) {
            None => Some("not in flight"),
            Some(msg) if !msg.is_outbound() => Some("an inbound request"),
            Some(msg) if msg.state != MsgState::Delivered => Some("not marked delivered"),
            Some(_) => None,
        };
        if let Some(found) = found {
            return Err(ProtocolError::BadMessageRef {
                verb: "REPLY",
                id: wire_id,
                found,
            });
        }

        let msg = self.table.get_mut_wire(wire_id).expect("checked above");
        let id = msg.id;
        let mut msg = self.table.clear(id).expect("checked above");
        let handler = msg.on_reply.take();
        self.table.recycle(msg);

        let mut outbox = Outbox::new();
        if let Some(handler) = handler {
            handler(&mut outbox, Reply::new(payload));
        }
        self.process_outbox(outbox);
        self.check_finished();
        Ok(())
    }

    /// Peer announced an orderly close: it will feed us no new work but
    /// keeps serving what is in flight. Prepare a replacement immediately.
    fn on_remote_closing(&mut self, cid: ConnId) {
        let Some(pos) = self.conn_pos(cid) else {
            return;
        };
        if self.conns[pos].closing {
            debug!(%cid, "repeated CLOSING ignored");
            return;
        }
        debug!(%cid, endpoint = %self.conns[pos].endpoint, "controller is closing");
        self.conns[pos].closing = true;
        self.drop_conn_subscriptions(cid);

        // The draining connection no longer deserves the head slot; rotate
        // it out and start connecting its replacement.
        if self.conns.len() > 1 {
            if let Some(conn) = self.conns.remove(pos) {
                self.conns.push_back(conn);
            }
        }
        self.maybe_connect();
    }

    // ---- internals --------------------------------------------------------

    fn conn_pos(&self, cid: ConnId) -> Option<usize> {
        self.conns.iter().position(|c| c.id == cid)
    }

    /// Connect the head if it is eligible. Never touches any other entry.
    fn maybe_connect(&mut self) {
        if self.shutdown {
            return;
        }
        let Some(head) = self.conns.front_mut() else {
            return;
        };
        if !head.connectable() {
            return;
        }
        head.state = ConnState::Connecting;
        let delay = head.backoff.next_delay();
        debug!(id = %head.id, endpoint = %head.endpoint, ?delay, "connecting");
        self.effects.push_back(Effect::Connect {
            conn: head.id,
            endpoint: head.endpoint,
            delay,
        });
    }

    /// Common teardown for any way a connection ends: release the session,
    /// settle messages and subscriptions tied to it, rotate it to the tail
    /// and try the next head.
    fn conn_closed(&mut self, pos: usize, reason: CloseReason) {
        let cid = self.conns[pos].id;
        let was_active = self.conns[pos].state == ConnState::Active;

        let conn = &mut self.conns[pos];
        conn.session = None;
        conn.outbuf.clear();
        conn.state = ConnState::Idle;
        conn.closing = false;
        if reason == CloseReason::ConnectFailed {
            conn.backoff.failed();
        }

        if was_active {
            self.settle_conn_messages(cid);
            self.drop_conn_subscriptions(cid);
        }

        if self.conns.len() > 1 {
            if let Some(conn) = self.conns.remove(pos) {
                self.conns.push_back(conn);
            }
        }

        self.maybe_connect();
    }

    /// A protocol violation is fatal to its connection, nothing more.
    fn protocol_violation(&mut self, cid: ConnId, violation: &ProtocolError) {
        error!(%cid, %violation, "protocol violation, dropping connection");
        if let Some(pos) = self.conn_pos(cid) {
            self.effects.push_back(Effect::Close { conn: cid });
            self.conn_closed(pos, CloseReason::Transport);
        }
    }

    /// Settle every message tied to a connection that just went away:
    /// inbound requests can no longer be answered and are discarded;
    /// outbound requests emitted on it get their fail callback.
    fn settle_conn_messages(&mut self, cid: ConnId) {
        let ids: Vec<MessageId> = self.table.live_ids().collect();
        for id in ids {
            let Some(msg) = self.table.get(id) else {
                continue;
            };
            if msg.conn == Some(cid) {
                warn!(%id, "discarding undeliverable reply for a lost connection");
                let msg = self.table.clear(id).expect("live id");
                self.table.recycle(msg);
            } else if msg.is_outbound() && msg.sent_on == Some(cid) {
                self.fail_message(id);
            }
        }
    }

    /// Reset acknowledged subscriptions whose queue ids were assigned by
    /// this connection, firing their dropped callbacks. The subscriptions
    /// stay registered and replay on the next activation, which requires a
    /// zero qid.
    fn drop_conn_subscriptions(&mut self, cid: ConnId) {
        for i in 0..self.subs.len() {
            if self.subs[i].qid_conn != Some(cid) {
                continue;
            }
            let sub = &mut self.subs[i];
            let qid = sub.qid;
            sub.qid = 0;
            sub.qid_conn = None;
            debug!(queue = %sub.queue, qid, "subscription dropped with its connection");

            let mut outbox = Outbox::new();
            if let Some(cb) = sub.on_dropped.as_mut() {
                cb(&mut outbox, &sub.queue, qid);
            }
            self.process_outbox(outbox);
        }
    }

    /// Clear an outbound message and fire its fail callback.
    fn fail_message(&mut self, id: MessageId) {
        let Some(mut msg) = self.table.clear(id) else {
            return;
        };
        let handler = msg.on_fail.take();
        self.table.recycle(msg);

        let mut outbox = Outbox::new();
        if let Some(handler) = handler {
            handler(&mut outbox, id);
        }
        self.process_outbox(outbox);
    }

    /// Apply the operations callbacks queued on their outbox, in order.
    fn process_outbox(&mut self, outbox: Outbox) {
        for op in outbox.ops {
            match op {
                OutboxOp::Send {
                    req,
                    on_reply,
                    on_fail,
                } => {
                    if let Err(err) = self.send(req, on_reply, on_fail) {
                        error!(%err, "send from callback refused");
                    }
                }
                OutboxOp::Reply { id, payload } => {
                    if let Err(err) = self.reply_bytes(id, payload) {
                        error!(%err, "reply from callback refused");
                    }
                }
                OutboxOp::Shutdown => self.shutdown(),
            }
        }
    }

    /// Turn any bytes waiting in an active connection's outbuf into Send
    /// effects. Called at the end of every dispatch; the driver therefore
    /// only ever has writes outstanding while an outbuf was non-empty.
    fn flush_outbufs(&mut self) {
        for conn in &mut self.conns {
            if conn.state == ConnState::Active && !conn.outbuf.is_empty() {
                self.effects.push_back(Effect::Send {
                    conn: conn.id,
                    bytes: conn.outbuf.split().freeze(),
                });
            }
        }
    }

    /// During shutdown, close connections once nothing is draining through
    /// them any more, and report completion when the last one is gone.
    fn check_finished(&mut self) {
        if !self.shutdown || self.finished {
            return;
        }
        if !self.table.is_empty() {
            return;
        }

        'restart: loop {
            for i in 0..self.conns.len() {
                if self.conns[i].state == ConnState::Idle {
                    continue;
                }
                let cid = self.conns[i].id;
                // Let queued bytes (CLOSING, final replies) out first.
                self.flush_outbufs();
                self.effects.push_back(Effect::Close { conn: cid });
                self.conn_closed(i, CloseReason::Local);
                continue 'restart;
            }
            break;
        }

        if self.conns.iter().all(|c| c.state == ConnState::Idle) {
            debug!("shutdown drain complete");
            self.finished = true;
            self.effects.push_back(Effect::Finished);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if !self.table.is_empty() {
            warn!(
                in_flight = self.table.used(),
                "client dropped with messages still in flight"
            );
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("controllers", &self.conns.len())
            .field("subscriptions", &self.subs.len())
            .field("in_flight", &self.table.used())
            .field("pending", &self.pending.len())
            .field("shutdown", &self.shutdown)
            .field("finished", &self.finished)
            .finish()
    }
}

fn check_queue_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.len() > u8::MAX as usize {
        return Err(Error::QueueName(name.len()));
    }
    Ok(())
}
