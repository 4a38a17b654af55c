//! Per-connection parameter accumulator.
//!
//! RISP separates parameters from verbs: setters like `ID` or `PAYLOAD`
//! park a value here, and a later verb consumes whatever is parked. A field
//! being `Some` is exactly the "mask bit set" notion of the protocol —
//! there is no separate bitfield to keep in sync.
//!
//! Payload and queue name are handed out by move: once a verb takes them,
//! the field reads as unset until the peer sends the parameter again.

use bytes::Bytes;

use crate::error::ProtocolError;

#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    id: Option<u32>,
    queue_id: Option<u16>,
    timeout: Option<u16>,
    priority: Option<u16>,
    queue: Option<Bytes>,
    payload: Option<Bytes>,
    noreply: bool,
}

impl Accumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// CLEAR verb: forget every parameter and flag.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn set_id(&mut self, value: u32) -> Result<(), ProtocolError> {
        if value > u32::from(u16::MAX) {
            return Err(ProtocolError::ValueOutOfRange {
                param: "ID",
                value,
            });
        }
        self.id = Some(value);
        Ok(())
    }

    pub(crate) fn set_queue_id(&mut self, value: u16) -> Result<(), ProtocolError> {
        if value == 0 {
            return Err(ProtocolError::ValueOutOfRange {
                param: "QUEUE-ID",
                value: 0,
            });
        }
        self.queue_id = Some(value);
        Ok(())
    }

    pub(crate) fn set_timeout(&mut self, value: u16) {
        self.timeout = Some(value);
    }

    pub(crate) fn set_priority(&mut self, value: u16) {
        self.priority = Some(value);
    }

    pub(crate) fn set_queue(&mut self, name: Bytes) {
        self.queue = Some(name);
    }

    pub(crate) fn set_payload(&mut self, data: Bytes) {
        self.payload = Some(data);
    }

    pub(crate) fn set_noreply(&mut self) {
        self.noreply = true;
    }

    pub(crate) const fn id(&self) -> Option<u32> {
        self.id
    }

    pub(crate) const fn queue_id(&self) -> Option<u16> {
        self.queue_id
    }

    pub(crate) const fn noreply(&self) -> bool {
        self.noreply
    }

    pub(crate) fn queue_set(&self) -> bool {
        self.queue.is_some()
    }

    /// Take the queue name, leaving the field unset.
    pub(crate) fn take_queue(&mut self) -> Option<Bytes> {
        self.queue.take()
    }

    /// Take the payload, leaving the field unset.
    pub(crate) fn take_payload(&mut self) -> Option<Bytes> {
        self.payload.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_is_idempotent() {
        let mut acc = Accumulator::new();
        acc.set_id(9).unwrap();
        acc.set_queue(Bytes::from_static(b"q"));
        acc.set_payload(Bytes::from_static(b"p"));
        acc.set_noreply();

        acc.clear();
        let after_one = format!("{acc:?}");
        acc.clear();
        assert_eq!(after_one, format!("{acc:?}"));
        assert_eq!(acc.id(), None);
        assert!(!acc.noreply());
    }

    #[test]
    fn takes_move_ownership() {
        let mut acc = Accumulator::new();
        acc.set_payload(Bytes::from_static(b"data"));
        assert_eq!(acc.take_payload(), Some(Bytes::from_static(b"data")));
        assert_eq!(acc.take_payload(), None);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut acc = Accumulator::new();
        assert!(acc.set_id(0x1_0000).is_err());
        assert!(acc.set_queue_id(0).is_err());
        assert!(acc.set_id(0xFFFF).is_ok());
        assert!(acc.set_queue_id(1).is_ok());
    }
}
