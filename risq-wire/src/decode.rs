//! Incremental RISP decoder.
//!
//! The decoder pulls one complete command at a time out of a `BytesMut`
//! receive buffer. An incomplete trailing command is left in place, so the
//! caller simply appends the next read and decodes again.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tracing::trace;

use crate::opcode::{self, Shape};

/// Frame-level wire errors. Fatal to the stream they occur on.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("string argument of {len} bytes exceeds the cap of {max}")]
    StringTooLarge { len: usize, max: usize },
}

/// A decoded RISP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Clear,
    Ping,
    Pong,
    Request,
    Reply,
    Delivered,
    Undelivered,
    Broadcast,
    NoReply,
    Closing,
    Consume,
    Consuming,
    Exclusive,
    ServerFull,
    QueueId(u16),
    Timeout(u16),
    Priority(u16),
    Max(u16),
    Id(u32),
    Queue(Bytes),
    Payload(Bytes),
}

/// Stateful decoder over a segmentable byte stream.
///
/// Commands it does not recognize are skipped: the opcode band frames the
/// argument, so the byte count to discard is always known.
#[derive(Debug)]
pub struct Decoder {
    max_str: usize,
    commands: u64,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Default cap on string arguments (payloads, queue names).
pub const DEFAULT_MAX_STR: usize = 64 * 1024 * 1024;

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_str: DEFAULT_MAX_STR,
            commands: 0,
        }
    }

    /// Replace the string-argument size cap.
    #[must_use]
    pub fn with_max_str(mut self, max: usize) -> Self {
        self.max_str = max;
        self
    }

    /// Number of commands decoded so far, skipped ones included.
    #[must_use]
    pub const fn commands(&self) -> u64 {
        self.commands
    }

    /// Decode the next command from `src`.
    ///
    /// Returns:
    /// - `Ok(Some(op))` — one command consumed
    /// - `Ok(None)` — `src` holds no complete command; bytes left untouched
    /// - `Err` — unrecoverable framing violation
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Op>, WireError> {
        loop {
            let Some(&code) = src.first() else {
                return Ok(None);
            };

            let op = match Shape::of(code) {
                Shape::None => {
                    src.advance(1);
                    self.map_plain(code)
                }
                Shape::U16 => {
                    if src.len() < 3 {
                        return Ok(None);
                    }
                    src.advance(1);
                    let value = src.get_u16();
                    self.map_u16(code, value)
                }
                Shape::U32 => {
                    if src.len() < 5 {
                        return Ok(None);
                    }
                    src.advance(1);
                    let value = src.get_u32();
                    self.map_u32(code, value)
                }
                Shape::Str8 => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    let len = src[1] as usize;
                    if src.len() < 2 + len {
                        return Ok(None);
                    }
                    src.advance(2);
                    let data = src.split_to(len).freeze();
                    self.map_str(code, data)
                }
                Shape::Str32 => {
                    if src.len() < 5 {
                        return Ok(None);
                    }
                    let len = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
                    if len > self.max_str {
                        return Err(WireError::StringTooLarge {
                            len,
                            max: self.max_str,
                        });
                    }
                    if src.len() < 5 + len {
                        return Ok(None);
                    }
                    src.advance(5);
                    let data = src.split_to(len).freeze();
                    self.map_str(code, data)
                }
            };

            self.commands += 1;
            match op {
                Some(op) => return Ok(Some(op)),
                // Unrecognized but fully framed: skip and keep going.
                None => {
                    trace!(opcode = code, "skipping unknown command");
                }
            }
        }
    }

    fn map_plain(&self, code: u8) -> Option<Op> {
        Some(match code {
            opcode::CLEAR => Op::Clear,
            opcode::PING => Op::Ping,
            opcode::PONG => Op::Pong,
            opcode::REQUEST => Op::Request,
            opcode::REPLY => Op::Reply,
            opcode::DELIVERED => Op::Delivered,
            opcode::UNDELIVERED => Op::Undelivered,
            opcode::BROADCAST => Op::Broadcast,
            opcode::NOREPLY => Op::NoReply,
            opcode::CLOSING => Op::Closing,
            opcode::CONSUME => Op::Consume,
            opcode::CONSUMING => Op::Consuming,
            opcode::EXCLUSIVE => Op::Exclusive,
            opcode::SERVER_FULL => Op::ServerFull,
            _ => return None,
        })
    }

    fn map_u16(&self, code: u8, value: u16) -> Option<Op> {
        Some(match code {
            opcode::QUEUE_ID => Op::QueueId(value),
            opcode::TIMEOUT => Op::Timeout(value),
            opcode::PRIORITY => Op::Priority(value),
            opcode::MAX => Op::Max(value),
            _ => return None,
        })
    }

    fn map_u32(&self, code: u8, value: u32) -> Option<Op> {
        match code {
            opcode::ID => Some(Op::Id(value)),
            _ => None,
        }
    }

    fn map_str(&self, code: u8, data: Bytes) -> Option<Op> {
        match code {
            opcode::QUEUE => Some(Op::Queue(data)),
            opcode::PAYLOAD => Some(Op::Payload(data)),
            _ => None,
        }
    }
}
