//! Queue subscriptions.

use risq_wire::Priority;

use crate::message::{AcceptedHandler, DroppedHandler, MessageHandler};
use crate::session::Target;

/// Parameters of a consume registration, built fluently and passed to
/// [`Client::consume`](crate::Client::consume).
///
/// ```
/// use risq::{Consume, Priority};
///
/// let consume = Consume::new("orders")
///     .max(10)
///     .priority(Priority::Normal)
///     .exclusive()
///     .on_accepted(|_outbox, queue, qid| {
///         println!("consuming {queue} as qid {qid}");
///     });
/// ```
pub struct Consume {
    pub(crate) queue: String,
    pub(crate) max: u16,
    pub(crate) priority: Priority,
    pub(crate) exclusive: bool,
    pub(crate) on_accepted: Option<AcceptedHandler>,
    pub(crate) on_dropped: Option<DroppedHandler>,
}

impl Consume {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            max: 0,
            priority: Priority::default(),
            exclusive: false,
            on_accepted: None,
            on_dropped: None,
        }
    }

    /// Most messages the controller may hand this consumer at once.
    /// Zero means no limit.
    #[must_use]
    pub fn max(mut self, max: u16) -> Self {
        self.max = max;
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Request to be the queue's only consumer.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Callback for the controller's CONSUMING acknowledgement.
    #[must_use]
    pub fn on_accepted(mut self, f: impl FnMut(&mut crate::Outbox, &str, u16) + 'static) -> Self {
        self.on_accepted = Some(Box::new(f));
        self
    }

    /// Callback for losing an acknowledged subscription (the connection it
    /// was acknowledged on went away). The subscription itself survives and
    /// is re-announced on the next activation.
    #[must_use]
    pub fn on_dropped(mut self, f: impl FnMut(&mut crate::Outbox, &str, u16) + 'static) -> Self {
        self.on_dropped = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Consume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consume")
            .field("queue", &self.queue)
            .field("max", &self.max)
            .field("priority", &self.priority)
            .field("exclusive", &self.exclusive)
            .finish_non_exhaustive()
    }
}

/// A registered subscription. Lives until client teardown and is
/// re-announced to every newly activated connection.
pub(crate) struct Subscription {
    pub(crate) queue: String,
    /// Controller-assigned queue id; 0 until CONSUMING is received.
    pub(crate) qid: u16,
    /// Connection the queue id was assigned on; the id dies with it.
    pub(crate) qid_conn: Option<crate::conn::ConnId>,
    pub(crate) max: u16,
    pub(crate) priority: Priority,
    pub(crate) exclusive: bool,
    pub(crate) handler: MessageHandler,
    pub(crate) on_accepted: Option<AcceptedHandler>,
    pub(crate) on_dropped: Option<DroppedHandler>,
}

impl Subscription {
    pub(crate) fn new(consume: Consume, handler: MessageHandler) -> Self {
        Self {
            queue: consume.queue,
            qid: 0,
            qid_conn: None,
            max: consume.max,
            priority: consume.priority,
            exclusive: consume.exclusive,
            handler,
            on_accepted: consume.on_accepted,
            on_dropped: consume.on_dropped,
        }
    }

    /// Does an inbound REQUEST target address this subscription?
    pub(crate) fn matches(&self, target: &Target) -> bool {
        match target {
            Target::Qid(qid) => self.qid != 0 && self.qid == *qid,
            Target::Name(name) => self.queue.as_bytes() == &name[..],
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("queue", &self.queue)
            .field("qid", &self.qid)
            .field("max", &self.max)
            .field("priority", &self.priority)
            .field("exclusive", &self.exclusive)
            .finish_non_exhaustive()
    }
}
