//! Command emitters.
//!
//! Each helper appends one fully framed command to the caller's buffer, so a
//! command sequence can be assembled without intermediate allocations. The
//! helpers debug-check that the opcode belongs to the band the argument
//! implies; mixing them up would produce an unparseable stream.

use bytes::{BufMut, BytesMut};

use crate::decode::WireError;
use crate::opcode::Shape;

/// Append a no-argument command.
pub fn put_cmd(buf: &mut BytesMut, opcode: u8) {
    debug_assert_eq!(Shape::of(opcode), Shape::None);
    buf.put_u8(opcode);
}

/// Append a command carrying a 16-bit integer.
pub fn put_u16(buf: &mut BytesMut, opcode: u8, value: u16) {
    debug_assert_eq!(Shape::of(opcode), Shape::U16);
    buf.put_u8(opcode);
    buf.put_u16(value);
}

/// Append a command carrying a 32-bit integer.
pub fn put_u32(buf: &mut BytesMut, opcode: u8, value: u32) {
    debug_assert_eq!(Shape::of(opcode), Shape::U32);
    buf.put_u8(opcode);
    buf.put_u32(value);
}

/// Append a command carrying a short byte string (8-bit length).
///
/// # Errors
///
/// Fails if `data` does not fit the 8-bit length prefix.
pub fn put_str8(buf: &mut BytesMut, opcode: u8, data: &[u8]) -> Result<(), WireError> {
    debug_assert_eq!(Shape::of(opcode), Shape::Str8);
    if data.len() > u8::MAX as usize {
        return Err(WireError::StringTooLarge {
            len: data.len(),
            max: u8::MAX as usize,
        });
    }
    buf.reserve(2 + data.len());
    buf.put_u8(opcode);
    buf.put_u8(data.len() as u8);
    buf.put_slice(data);
    Ok(())
}

/// Append a command carrying a long byte string (32-bit length).
pub fn put_str32(buf: &mut BytesMut, opcode: u8, data: &[u8]) {
    debug_assert_eq!(Shape::of(opcode), Shape::Str32);
    debug_assert!(data.len() <= u32::MAX as usize);
    buf.reserve(5 + data.len());
    buf.put_u8(opcode);
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode;

    #[test]
    fn exact_framing() {
        let mut buf = BytesMut::new();
        put_cmd(&mut buf, opcode::CLEAR);
        put_u16(&mut buf, opcode::PRIORITY, 2);
        put_u32(&mut buf, opcode::ID, 7);
        put_str8(&mut buf, opcode::QUEUE, b"q1").unwrap();
        put_str32(&mut buf, opcode::PAYLOAD, b"hi");

        let expected: &[u8] = &[
            0x00, // CLEAR
            0x42, 0x00, 0x02, // PRIORITY=2
            0x80, 0x00, 0x00, 0x00, 0x07, // ID=7
            0xC0, 0x02, b'q', b'1', // QUEUE="q1"
            0xE0, 0x00, 0x00, 0x00, 0x02, b'h', b'i', // PAYLOAD="hi"
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn short_string_rejects_oversize() {
        let mut buf = BytesMut::new();
        let long = vec![b'a'; 256];
        assert!(put_str8(&mut buf, opcode::QUEUE, &long).is_err());
        assert!(buf.is_empty());
    }
}
