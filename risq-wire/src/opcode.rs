//! RISP opcode table.
//!
//! Every command on the wire is a single opcode byte, optionally followed by
//! an argument whose framing is encoded in the opcode itself:
//!
//! | Range         | Argument                          |
//! |---------------|-----------------------------------|
//! | `0x00..=0x3F` | none                              |
//! | `0x40..=0x7F` | unsigned 16-bit integer, BE       |
//! | `0x80..=0xBF` | unsigned 32-bit integer, BE       |
//! | `0xC0..=0xDF` | byte string, 8-bit length prefix  |
//! | `0xE0..=0xFF` | byte string, 32-bit length prefix |
//!
//! Because the shape is self-describing, a decoder can always skip a command
//! it does not recognize.

/// Reset the receiver's parameter accumulator.
pub const CLEAR: u8 = 0x00;
/// Heartbeat probe; the receiver answers with [`PONG`].
pub const PING: u8 = 0x01;
/// Heartbeat answer.
pub const PONG: u8 = 0x02;
/// Deliver the accumulated message to a consumer.
pub const REQUEST: u8 = 0x03;
/// Return the accumulated payload as the reply to a request.
pub const REPLY: u8 = 0x04;
/// Acknowledge that a request reached a consumer.
pub const DELIVERED: u8 = 0x05;
/// Signal that a request could not be delivered.
pub const UNDELIVERED: u8 = 0x06;
/// Send the accumulated message to every consumer of the queue.
pub const BROADCAST: u8 = 0x07;
/// Mark the accumulated message as fire-and-forget.
pub const NOREPLY: u8 = 0x08;
/// Orderly close: no new work, in-flight work drains.
pub const CLOSING: u8 = 0x09;
/// Subscribe to the accumulated queue name.
pub const CONSUME: u8 = 0x0A;
/// Acknowledge a [`CONSUME`], carrying the assigned queue id.
pub const CONSUMING: u8 = 0x0B;
/// Modifier for [`CONSUME`]: sole consumer of the queue.
pub const EXCLUSIVE: u8 = 0x0C;
/// The server cannot accept the connection or request.
pub const SERVER_FULL: u8 = 0x0D;

/// 16-bit queue id assigned by the controller.
pub const QUEUE_ID: u8 = 0x40;
/// Per-request timeout, in seconds.
pub const TIMEOUT: u8 = 0x41;
/// Queue priority, one of the [`Priority`] values.
pub const PRIORITY: u8 = 0x42;
/// Maximum number of messages a consumer handles concurrently.
pub const MAX: u8 = 0x43;

/// Message id. Carried in the 32-bit band but constrained to 16 bits.
pub const ID: u8 = 0x80;

/// Queue name, shorter than 256 bytes.
pub const QUEUE: u8 = 0xC0;

/// Opaque message payload.
pub const PAYLOAD: u8 = 0xE0;

/// Argument framing of an opcode, derived from its top bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// No argument.
    None,
    /// Unsigned 16-bit big-endian integer.
    U16,
    /// Unsigned 32-bit big-endian integer.
    U32,
    /// Byte string with an 8-bit length prefix.
    Str8,
    /// Byte string with a 32-bit length prefix.
    Str32,
}

impl Shape {
    /// Shape of `opcode`, from the band it falls in.
    #[must_use]
    pub const fn of(opcode: u8) -> Self {
        match opcode >> 6 {
            0 => Self::None,
            1 => Self::U16,
            2 => Self::U32,
            _ => {
                if opcode & 0x20 == 0 {
                    Self::Str8
                } else {
                    Self::Str32
                }
            }
        }
    }
}

/// Queue priority values carried by the [`PRIORITY`] parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// No preference.
    None = 0,
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
}

impl Priority {
    /// Wire value of this priority.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_every_opcode() {
        assert_eq!(Shape::of(CLEAR), Shape::None);
        assert_eq!(Shape::of(SERVER_FULL), Shape::None);
        assert_eq!(Shape::of(0x3F), Shape::None);
        assert_eq!(Shape::of(QUEUE_ID), Shape::U16);
        assert_eq!(Shape::of(0x7F), Shape::U16);
        assert_eq!(Shape::of(ID), Shape::U32);
        assert_eq!(Shape::of(0xBF), Shape::U32);
        assert_eq!(Shape::of(QUEUE), Shape::Str8);
        assert_eq!(Shape::of(0xDF), Shape::Str8);
        assert_eq!(Shape::of(PAYLOAD), Shape::Str32);
        assert_eq!(Shape::of(0xFF), Shape::Str32);
    }

    #[test]
    fn priority_wire_values() {
        assert_eq!(Priority::None.as_u16(), 0);
        assert_eq!(Priority::Low.as_u16(), 1);
        assert_eq!(Priority::Normal.as_u16(), 2);
        assert_eq!(Priority::High.as_u16(), 3);
        assert_eq!(Priority::default(), Priority::Normal);
    }
}
