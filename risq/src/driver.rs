//! compio-based I/O driver.
//!
//! The [`Client`] is sans-IO; this module is the bundled way to actually
//! run it. One task per controller socket moves bytes, and the driver task
//! owns the client and routes everything through a single event channel —
//! socket outcomes and [`Handle`] commands alike — so client dispatch stays
//! strictly serialized without locks.
//!
//! ```no_run
//! use risq::{Client, Consume, Driver};
//!
//! #[compio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::default();
//!     client.add_controller("127.0.0.1:13555")?;
//!     client.consume(Consume::new("work"), |_outbox, delivery| {
//!         delivery.reply(b"done".as_slice()).unwrap();
//!     })?;
//!
//!     let (driver, handle) = Driver::new(client);
//!     // A real application hands `handle` to its shutdown path.
//!     handle.shutdown();
//!     driver.run().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use flume::{Receiver, Sender};
use tracing::{debug, error, trace};

use compio::buf::BufResult;
use compio::io::{AsyncRead, AsyncWriteExt};
use compio::net::TcpStream;

use crate::client::{Client, Effect};
use crate::conn::ConnId;
use crate::message::{FailHandler, ReplyHandler, Request};
use crate::table::MessageId;

/// How long a socket task lingers in its read poll before checking for
/// queued writes again.
const WRITE_POLL: Duration = Duration::from_millis(5);

/// Commands accepted from outside the driver task.
enum Command {
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

/// Everything the driver task reacts to.
enum Event {
    Cmd(Command),
    Connected(ConnId),
    ConnectFailed(ConnId),
    Data(ConnId, Bytes),
    Closed(ConnId),
}

enum SocketCmd {
    Write(Bytes),
    Close,
}

/// Cloneable way to talk to a running [`Driver`].
///
/// Commands are applied by the driver task in submission order; outcomes
/// arrive through the callbacks registered with each operation.
#[derive(Clone)]
pub struct Handle {
    tx: Sender<Event>,
}

impl Handle {
    /// Submit an outbound request, as [`Client::send`].
    pub fn send(&self, req: Request, on_reply: Option<ReplyHandler>, on_fail: Option<FailHandler>) {
        let _ = self.tx.send(Event::Cmd(Command::Send {
            req,
            on_reply,
            on_fail,
        }));
    }

    /// Reply to a retained delivery, as [`Client::reply`].
    pub fn reply(&self, id: MessageId, payload: impl Into<Bytes>) {
        let _ = self.tx.send(Event::Cmd(Command::Reply {
            id,
            payload: payload.into(),
        }));
    }

    /// Begin orderly shutdown; [`Driver::run`] returns once drained.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Event::Cmd(Command::Shutdown));
    }
}

/// Runs a [`Client`] on the compio runtime.
pub struct Driver {
    client: Client,
    events: Receiver<Event>,
    events_tx: Sender<Event>,
    socks: HashMap<ConnId, Sender<SocketCmd>>,
    tasks: Vec<compio::runtime::Task<()>>,
}

impl Driver {
    /// Wrap a configured client. Controllers and subscriptions added to the
    /// client beforehand are acted on as soon as `run` starts.
    #[must_use]
    pub fn new(client: Client) -> (Self, Handle) {
        let (events_tx, events) = flume::unbounded();
        let handle = Handle {
            tx: events_tx.clone(),
        };
        (
            Self {
                client,
                events,
                events_tx,
                socks: HashMap::new(),
                tasks: Vec::new(),
            },
            handle,
        )
    }

    /// Drive the client until its shutdown drain completes. The client is
    /// handed back for inspection.
    pub async fn run(mut self) -> Client {
        loop {
            self.pump_effects();
            if self.client.is_finished() {
                break;
            }
            let Ok(event) = self.events.recv_async().await else {
                break;
            };
            self.apply(event);
        }
        debug!("driver finished");
        self.client
    }

    fn pump_effects(&mut self) {
        while let Some(effect) = self.client.poll_effect() {
            match effect {
                Effect::Connect {
                    conn,
                    endpoint,
                    delay,
                } => {
                    let (wtx, wrx) = flume::unbounded();
                    self.socks.insert(conn, wtx);
                    let task = socket_task(
                        conn,
                        endpoint.socket_addr(),
                        delay,
                        wrx,
                        self.events_tx.clone(),
                        self.client.cfg.read_chunk,
                    );
                    self.tasks.push(compio::runtime::spawn(task));
                }
                Effect::Send { conn, bytes } => {
                    if let Some(tx) = self.socks.get(&conn) {
                        let _ = tx.send(SocketCmd::Write(bytes));
                    }
                }
                Effect::Close { conn } => {
                    if let Some(tx) = self.socks.remove(&conn) {
                        let _ = tx.send(SocketCmd::Close);
                    }
                }
                Effect::Finished => {}
            }
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Cmd(Command::Send {
                req,
                on_reply,
                on_fail,
            }) => {
                if let Err(err) = self.client.send(req, on_reply, on_fail) {
                    error!(%err, "send refused");
                }
            }
            Event::Cmd(Command::Reply { id, payload }) => {
                if let Err(err) = self.client.reply(id, payload) {
                    error!(%err, "reply refused");
                }
            }
            Event::Cmd(Command::Shutdown) => self.client.shutdown(),
            Event::Connected(cid) => self.client.handle_connected(cid),
            Event::ConnectFailed(cid) => {
                self.socks.remove(&cid);
                self.client.handle_connect_failed(cid);
            }
            Event::Data(cid, bytes) => self.client.handle_bytes(cid, &bytes),
            Event::Closed(cid) => {
                self.socks.remove(&cid);
                self.client.handle_closed(cid);
            }
        }
    }
}

/// One controller socket: connect (after the backoff delay), then pump.
///
/// The pump alternates between draining queued writes and a bounded read
/// poll, the split-pump-in-one-task arrangement of the socket actor this
/// driver is modeled on.
async fn socket_task(
    cid: ConnId,
    addr: SocketAddr,
    delay: Duration,
    cmds: Receiver<SocketCmd>,
    events: Sender<Event>,
    read_chunk: usize,
) {
    if delay > Duration::ZERO {
        compio::time::sleep(delay).await;
    }

    let mut stream = match TcpStream::connect(addr).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(%cid, %addr, %err, "connect failed");
            let _ = events.send(Event::ConnectFailed(cid));
            return;
        }
    };
    let _ = events.send(Event::Connected(cid));

    loop {
        // Write pump: everything queued since the last pass.
        while let Ok(cmd) = cmds.try_recv() {
            match cmd {
                SocketCmd::Write(bytes) => {
                    trace!(%cid, len = bytes.len(), "writing");
                    let BufResult(res, _) = (&mut stream).write_all(bytes.to_vec()).await;
                    if let Err(err) = res {
                        debug!(%cid, %err, "write failed");
                        let _ = events.send(Event::Closed(cid));
                        return;
                    }
                }
                SocketCmd::Close => {
                    trace!(%cid, "closing socket");
                    return;
                }
            }
        }

        // Read pump, bounded so queued writes are not starved.
        let buf = Vec::with_capacity(read_chunk);
        match compio::time::timeout(WRITE_POLL, (&mut stream).read(buf)).await {
            Err(_elapsed) => {}
            Ok(BufResult(Ok(0), _)) => {
                debug!(%cid, "peer closed");
                let _ = events.send(Event::Closed(cid));
                return;
            }
            Ok(BufResult(Ok(n), buf)) => {
                trace!(%cid, len = n, "read");
                let _ = events.send(Event::Data(cid, Bytes::from(buf)));
            }
            Ok(BufResult(Err(err), _)) => {
                debug!(%cid, %err, "read failed");
                let _ = events.send(Event::Closed(cid));
                return;
            }
        }
    }
}
