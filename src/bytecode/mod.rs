//! JVM bytecode decoding for call-site extraction.
//!
//! The scanner never needs a full instruction model, only the call sites of a method body.
//! [`decode_calls`] walks a `Code` attribute instruction by instruction (using the length
//! table in [`decoder`]) and emits one [`CallInstruction`] per `invokevirtual`,
//! `invokespecial`, `invokestatic` and `invokeinterface`.
//!
//! `invokedynamic` sites carry no static owner. They are stepped over; the lambda bodies they
//! bind to are ordinary synthetic methods and are attributed back to their enclosing method by
//! [`crate::scanner`].

mod decoder;

pub use decoder::{decode_calls, instruction_length};

use strum::{Display, FromRepr};

/// The four static call instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum InvokeKind {
    /// `invokevirtual` (0xb6)
    InvokeVirtual = 0xb6,
    /// `invokespecial` (0xb7): constructors, private methods and `super.m()`
    InvokeSpecial = 0xb7,
    /// `invokestatic` (0xb8)
    InvokeStatic = 0xb8,
    /// `invokeinterface` (0xb9)
    InvokeInterface = 0xb9,
}

/// One call site inside a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallInstruction {
    /// Which invoke opcode
    pub kind: InvokeKind,
    /// Dotted name of the referenced owner type
    pub owner: String,
    /// Referenced method name
    pub name: String,
    /// Referenced method descriptor
    pub descriptor: String,
    /// Bytecode offset of the instruction
    pub offset: u32,
}
