//! Client for RISP message-queue controllers.
//!
//! A `risq` client connects to one of several redundant controllers,
//! consumes named queues through user handlers, sends requests that expect
//! replies, and fails over to the next controller when the active one goes
//! away. The protocol state machine is sans-IO: [`Client`] emits
//! [`Effect`]s describing the I/O it needs and consumes socket outcomes,
//! which makes the whole protocol — failover included — testable without a
//! socket. The bundled [`Driver`] runs a client on the compio runtime.
//!
//! Everything is single-threaded and cooperative: handlers run inside
//! client dispatch, must not block, and get an [`Outbox`] for the
//! operations they want to queue re-entrantly.
//!
//! ```no_run
//! use risq::{Client, Consume, Priority};
//!
//! let mut client = Client::default();
//! client.add_controller("10.0.0.5:13555")?;
//! client.add_controller("10.0.0.6:13555")?;
//!
//! client.consume(
//!     Consume::new("orders").max(10).priority(Priority::Normal),
//!     |_outbox, delivery| {
//!         let answer = delivery.payload().to_vec();
//!         delivery.reply(answer).unwrap();
//!     },
//! )?;
//! # Ok::<(), risq::Error>(())
//! ```

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod accum;
mod client;
mod config;
mod conn;
mod driver;
mod endpoint;
mod error;
mod message;
mod reconnect;
mod session;
mod subscription;
mod table;

pub use client::{Client, Effect};
pub use config::Config;
pub use conn::ConnId;
pub use driver::{Driver, Handle};
pub use endpoint::{Endpoint, EndpointError};
pub use error::{Error, ProtocolError};
pub use message::{
    AcceptedHandler, Delivery, DroppedHandler, FailHandler, MessageHandler, Outbox, Reply,
    ReplyHandler, Request,
};
pub use subscription::Consume;
pub use table::MessageId;

pub use risq_wire::Priority;
