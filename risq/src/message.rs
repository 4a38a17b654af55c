//! User-facing message types and callback context.
//!
//! Every user callback receives a [`&mut Outbox`](Outbox) as its first
//! argument. Callbacks run inside the client's dispatch, so they cannot
//! borrow the client itself; the outbox is the capability they get instead.
//! Operations queued on it are drained in order within the same dispatch,
//! which keeps message-id order equal to wire emission order.

use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::Error;
use crate::table::MessageId;

/// Handler invoked for each message delivered on a consumed queue.
pub type MessageHandler = Box<dyn FnMut(&mut Outbox, &mut Delivery)>;

/// Invoked when the controller acknowledges a CONSUME with a queue id.
pub type AcceptedHandler = Box<dyn FnMut(&mut Outbox, &str, u16)>;

/// Invoked when an acknowledged subscription loses its connection.
pub type DroppedHandler = Box<dyn FnMut(&mut Outbox, &str, u16)>;

/// Invoked with the reply to an outbound request.
pub type ReplyHandler = Box<dyn FnOnce(&mut Outbox, Reply)>;

/// Invoked when an outbound request can no longer be answered (its
/// connection died after emission, or shutdown discarded it unsent).
pub type FailHandler = Box<dyn FnOnce(&mut Outbox, MessageId)>;

/// An outbound request under construction.
///
/// ```
/// use risq::Request;
///
/// let req = Request::new("logs", "payload bytes").noreply();
/// ```
#[derive(Debug)]
pub struct Request {
    pub(crate) queue: String,
    pub(crate) payload: Bytes,
    pub(crate) noreply: bool,
    pub(crate) broadcast: bool,
}

impl Request {
    pub fn new(queue: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            queue: queue.into(),
            payload: payload.into(),
            noreply: false,
            broadcast: false,
        }
    }

    /// Fire-and-forget: no reply is expected and none will be delivered.
    #[must_use]
    pub fn noreply(mut self) -> Self {
        self.noreply = true;
        self
    }

    /// Deliver to every consumer of the queue instead of one.
    #[must_use]
    pub fn broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }
}

/// An inbound request handed to a subscription handler.
///
/// The handler may answer immediately with [`reply`](Self::reply), or
/// return without replying and answer later through
/// [`Client::reply`](crate::Client::reply) using [`id`](Self::id).
#[derive(Debug)]
pub struct Delivery {
    id: MessageId,
    payload: Bytes,
    noreply: bool,
    reply: Option<Bytes>,
}

impl Delivery {
    pub(crate) fn new(id: MessageId, payload: Bytes, noreply: bool) -> Self {
        Self {
            id,
            payload,
            noreply,
            reply: None,
        }
    }

    /// Id to reply with later if the handler does not reply inline.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True when the sender asked for no reply.
    #[must_use]
    pub const fn is_noreply(&self) -> bool {
        self.noreply
    }

    /// Answer this request. The reply may be empty.
    ///
    /// # Errors
    ///
    /// Refused if the request was sent noreply, or on a second reply; the
    /// first reply stands.
    pub fn reply(&mut self, payload: impl Into<Bytes>) -> Result<(), Error> {
        if self.noreply {
            return Err(Error::NoReplyExpected(self.id.as_u16()));
        }
        if self.reply.is_some() {
            return Err(Error::AlreadyReplied(self.id.as_u16()));
        }
        self.reply = Some(payload.into());
        Ok(())
    }

    pub(crate) fn take_reply(&mut self) -> Option<Bytes> {
        self.reply.take()
    }

    pub(crate) fn take_payload(&mut self) -> Bytes {
        std::mem::take(&mut self.payload)
    }
}

/// The reply to an outbound request.
#[derive(Debug)]
pub struct Reply {
    payload: Bytes,
}

impl Reply {
    pub(crate) const fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

pub(crate) enum OutboxOp {
    Send {
        req: Request,
        on_reply: Option<ReplyHandler>,
        on_fail: Option<FailHandler>,
    },
    Reply {
        id: MessageId,
        payload: Bytes,
    },
    Shutdown,
}

/// Deferred client operations available to callbacks.
///
/// Everything queued here is applied by the client as soon as the callback
/// returns, in queue order.
#[derive(Default)]
pub struct Outbox {
    pub(crate) ops: SmallVec<[OutboxOp; 2]>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue an outbound request, as [`Client::send`](crate::Client::send).
    pub fn send(&mut self, req: Request, on_reply: Option<ReplyHandler>, on_fail: Option<FailHandler>) {
        self.ops.push(OutboxOp::Send {
            req,
            on_reply,
            on_fail,
        });
    }

    /// Queue a reply to a previously retained delivery.
    pub fn reply(&mut self, id: MessageId, payload: impl Into<Bytes>) {
        self.ops.push(OutboxOp::Reply {
            id,
            payload: payload.into(),
        });
    }

    /// Ask the client to begin its orderly shutdown.
    pub fn shutdown(&mut self) {
        self.ops.push(OutboxOp::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_records_one_reply() {
        let mut d = Delivery::new(MessageId(3), Bytes::from_static(b"in"), false);
        assert_eq!(d.payload(), b"in");
        d.reply("out").unwrap();
        assert_eq!(d.take_reply(), Some(Bytes::from_static(b"out")));
        assert_eq!(d.take_reply(), None);
    }

    #[test]
    fn replying_to_noreply_is_refused() {
        let mut d = Delivery::new(MessageId(0), Bytes::new(), true);
        assert!(matches!(d.reply("nope"), Err(Error::NoReplyExpected(0))));
        assert_eq!(d.take_reply(), None);
    }

    #[test]
    fn double_reply_is_refused_and_first_stands() {
        let mut d = Delivery::new(MessageId(0), Bytes::new(), false);
        d.reply("one").unwrap();
        assert!(matches!(d.reply("two"), Err(Error::AlreadyReplied(0))));
        assert_eq!(d.take_reply(), Some(Bytes::from_static(b"one")));
    }
}
