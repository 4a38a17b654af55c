//! Message table and record pool.
//!
//! Every in-flight message — outbound requests awaiting DELIVERED/REPLY and
//! inbound requests awaiting the application's reply — lives in one dense
//! slab indexed by its id. Ids are small integers that double as the wire
//! `ID` parameter, so the slab is capped at the 16-bit id space.
//!
//! Allocation takes the cached free slot when one is known, falls back to a
//! linear scan, and grows the slab by a single slot otherwise. Cleared
//! records are recycled through a free pool rather than reallocated.

use bytes::Bytes;

use crate::conn::ConnId;
use crate::message::{FailHandler, ReplyHandler};

/// Identifier of an in-flight message, unique within one client until the
/// message clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub(crate) u16);

impl MessageId {
    /// Raw wire value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Rebuild an id from a raw value previously taken with
    /// [`as_u16`](Self::as_u16). Whether it still names a live message is
    /// checked wherever the id is used.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery state of an in-flight message. An inline reply from inside a
/// handler never needs a state of its own: the request dispatch drains it
/// and clears the message before anything else can observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MsgState {
    /// Freshly allocated; outbound: not yet acknowledged.
    New,
    /// Inbound: the subscription handler is running right now.
    Delivering,
    /// Inbound: handler returned without replying. Outbound: controller
    /// acknowledged delivery, reply pending.
    Delivered,
}

pub(crate) struct Message {
    pub(crate) id: MessageId,
    /// Peer-assigned id; set only for inbound requests.
    pub(crate) src_id: Option<u32>,
    /// Connection the request arrived on; `Some` iff inbound.
    pub(crate) conn: Option<ConnId>,
    /// Target queue; outbound only.
    pub(crate) queue: Option<String>,
    pub(crate) broadcast: bool,
    pub(crate) noreply: bool,
    /// Outbound: the connection the request was written to, once emitted.
    pub(crate) sent_on: Option<ConnId>,
    pub(crate) state: MsgState,
    pub(crate) data: Bytes,
    pub(crate) on_reply: Option<ReplyHandler>,
    pub(crate) on_fail: Option<FailHandler>,
}

impl Message {
    fn reset(&mut self, id: MessageId, conn: Option<ConnId>) {
        self.id = id;
        self.src_id = None;
        self.conn = conn;
        self.queue = None;
        self.broadcast = false;
        self.noreply = false;
        self.sent_on = None;
        self.state = MsgState::New;
        self.data = Bytes::new();
        self.on_reply = None;
        self.on_fail = None;
    }

    pub(crate) const fn is_outbound(&self) -> bool {
        self.conn.is_none()
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("src_id", &self.src_id)
            .field("conn", &self.conn)
            .field("queue", &self.queue)
            .field("state", &self.state)
            .field("sent_on", &self.sent_on)
            .field("noreply", &self.noreply)
            .field("broadcast", &self.broadcast)
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// Ceiling on live messages: ids must fit the wire's 16-bit `ID` value.
const MAX_MESSAGES: usize = 1 << 16;

pub(crate) struct MessageTable {
    slots: Vec<Option<Box<Message>>>,
    used: usize,
    /// A slot known to be free, if any; `None` means "scan".
    next: Option<usize>,
    pool: Vec<Box<Message>>,
}

impl MessageTable {
    pub(crate) fn new(initial: usize) -> Self {
        let initial = initial.min(MAX_MESSAGES);
        let mut slots = Vec::with_capacity(initial);
        slots.resize_with(initial, || None);
        Self {
            slots,
            used: 0,
            next: Some(0),
            pool: Vec::new(),
        }
    }

    pub(crate) const fn used(&self) -> usize {
        self.used
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Allocate a message record and place it in the first free slot.
    ///
    /// Returns `None` when the id space is exhausted.
    pub(crate) fn alloc(&mut self, conn: Option<ConnId>) -> Option<&mut Message> {
        let index = self.free_slot()?;
        let id = MessageId(index as u16);

        let mut msg = self.pool.pop().unwrap_or_else(|| {
            Box::new(Message {
                id,
                src_id: None,
                conn: None,
                queue: None,
                broadcast: false,
                noreply: false,
                sent_on: None,
                state: MsgState::New,
                data: Bytes::new(),
                on_reply: None,
                on_fail: None,
            })
        });
        msg.reset(id, conn);

        debug_assert!(self.slots[index].is_none());
        self.slots[index] = Some(msg);
        self.used += 1;
        self.slots[index].as_deref_mut()
    }

    fn free_slot(&mut self) -> Option<usize> {
        if self.used < self.slots.len() {
            if let Some(hint) = self.next.take() {
                if self.slots.get(hint).is_some_and(Option::is_none) {
                    return Some(hint);
                }
            }
            return self.slots.iter().position(Option::is_none);
        }
        if self.slots.len() >= MAX_MESSAGES {
            return None;
        }
        self.slots.push(None);
        Some(self.slots.len() - 1)
    }

    pub(crate) fn get(&self, id: MessageId) -> Option<&Message> {
        self.slots.get(id.index())?.as_deref()
    }

    pub(crate) fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.slots.get_mut(id.index())?.as_deref_mut()
    }

    /// Look up by a raw wire id, as referenced by DELIVERED/REPLY.
    pub(crate) fn get_mut_wire(&mut self, id: u32) -> Option<&mut Message> {
        let id = u16::try_from(id).ok()?;
        self.get_mut(MessageId(id))
    }

    /// Remove the message from its slot and remember the slot as free.
    ///
    /// The record is handed back so the caller can fire its callbacks and
    /// inspect its fields; it must then go back through [`recycle`].
    ///
    /// [`recycle`]: Self::recycle
    pub(crate) fn clear(&mut self, id: MessageId) -> Option<Box<Message>> {
        let slot = self.slots.get_mut(id.index())?;
        let msg = slot.take()?;
        debug_assert_eq!(msg.id, id);
        self.next = Some(id.index());
        self.used -= 1;
        Some(msg)
    }

    /// Return a cleared record to the free pool.
    pub(crate) fn recycle(&mut self, mut msg: Box<Message>) {
        msg.data = Bytes::new();
        msg.queue = None;
        msg.on_reply = None;
        msg.on_fail = None;
        self.pool.push(msg);
    }

    /// Ids of live messages, in slot order.
    pub(crate) fn live_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| MessageId(i as u16))
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let live = self.slots.iter().filter(|s| s.is_some()).count();
        assert_eq!(live, self.used);
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(msg) = slot {
                assert_eq!(msg.id.index(), i);
            }
        }
        if let Some(hint) = self.next {
            assert!(self.slots[hint].is_none());
        }
    }
}

impl std::fmt::Debug for MessageTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageTable")
            .field("capacity", &self.slots.len())
            .field("used", &self.used)
            .field("next", &self.next)
            .field("pooled", &self.pool.len())
            .finish()
    }
}
