//! Client error types.
//!
//! Two deliberately separate enums: [`Error`] covers API misuse and is
//! returned to the caller at entry; [`ProtocolError`] covers violations by
//! the peer and is fatal to the connection it happened on. Transport
//! failures belong to neither — they are absorbed by failover and never
//! surface as errors.

use thiserror::Error;

use crate::endpoint::EndpointError;

/// Errors returned by the public client API.
#[derive(Debug, Error)]
pub enum Error {
    /// The controller address could not be parsed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Queue names must be 1..=255 bytes on the wire.
    #[error("queue name of {0} bytes is not in 1..=255")]
    QueueName(usize),

    /// Outbound requests must carry a payload.
    #[error("request payload is empty")]
    EmptyPayload,

    /// The message table is at the 16-bit id ceiling.
    #[error("message table is full ({0} messages in flight)")]
    TableFull(usize),

    /// The message id does not name a live message.
    #[error("no message in flight with id {0}")]
    UnknownMessage(u16),

    /// The message exists but cannot be replied to in its current state.
    #[error("message {id} cannot be replied to: {reason}")]
    BadReplyState { id: u16, reason: &'static str },

    /// The sender marked the request noreply; there is nothing to answer.
    #[error("request {0} was sent noreply")]
    NoReplyExpected(u16),

    /// The delivery has already been answered.
    #[error("request {0} has already been replied to")]
    AlreadyReplied(u16),

    /// The client is shutting down and accepts no new work.
    #[error("client is shutting down")]
    ShuttingDown,
}

/// Peer protocol violations. Any of these drops the connection; failover
/// then proceeds as for a transport loss.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame-level violation from the decoder.
    #[error(transparent)]
    Wire(#[from] risq_wire::WireError),

    /// A verb fired without a parameter it requires.
    #[error("{verb} verb is missing its {param} parameter")]
    MissingParameter {
        verb: &'static str,
        param: &'static str,
    },

    /// REQUEST named both a queue id and a queue name.
    #[error("REQUEST carries both a queue id and a queue name")]
    AmbiguousQueue,

    /// A parameter value is outside its documented range.
    #[error("{param} value {value} is out of range")]
    ValueOutOfRange { param: &'static str, value: u32 },

    /// A verb the client never accepts inbound.
    #[error("unsupported inbound verb {0}")]
    Unsupported(&'static str),

    /// The peer referenced a message that does not exist or is in the
    /// wrong state for the verb.
    #[error("{verb} names message {id}, which is {found}")]
    BadMessageRef {
        verb: &'static str,
        id: u32,
        found: &'static str,
    },

    /// CONSUMING acknowledged a queue that already holds a queue id.
    #[error("CONSUMING for {queue:?} but the subscription already has qid {qid}")]
    DuplicateConsuming { queue: String, qid: u16 },
}
