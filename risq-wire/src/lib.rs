//! RISP wire format.
//!
//! RISP (Reduced Instruction Set Protocol) is the length-tagged binary
//! command stream spoken by queue controllers. This crate contains the
//! pieces that touch raw bytes and nothing else:
//! - the opcode table and argument bands (`opcode`)
//! - an incremental, resumable decoder (`decode`)
//! - framed command emitters (`encode`)
//!
//! Protocol *meaning* (parameter accumulation, verb dispatch, connection
//! state) lives in the `risq` crate on top of this one.

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod decode;
pub mod encode;
pub mod opcode;

pub use decode::{Decoder, Op, WireError};
pub use opcode::{Priority, Shape};
