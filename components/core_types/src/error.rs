//! Host-fatal error types.
//!
//! These errors indicate a VM or upstream-compiler bug (malformed bytecode,
//! an operand of the wrong category, an opcode with no handler). They are
//! never visible to guest code; the interpreter aborts when one surfaces.
//! Guest-visible failures travel through [`crate::VmResult`] instead.

use crate::value::ObjectRef;
use thiserror::Error;

/// Errors that abort the interpreter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    /// A code offset or operand fell outside the method's code buffer
    #[error("malformed bytecode at pc {pc}: {reason}")]
    MalformedBytecode {
        /// Offending program counter
        pc: usize,
        /// What went wrong
        reason: String,
    },

    /// No handler exists for this opcode
    #[error("unimplemented opcode 0x{opcode:02x} at pc {pc}")]
    UnimplementedOpcode {
        /// Raw opcode byte
        opcode: u8,
        /// Program counter of the instruction
        pc: usize,
    },

    /// An operand had a different category than the instruction expects
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected value kind
        expected: &'static str,
        /// Value kind actually found
        found: &'static str,
    },

    /// An operation needed a frame but the call stack was empty
    #[error("call stack is empty")]
    EmptyCallStack,

    /// A reference did not point at a live heap object of the expected shape
    #[error("invalid heap reference {0}")]
    InvalidReference(ObjectRef),

    /// A class the VM depends on could not be found
    #[error("missing class {0}")]
    MissingClass(String),

    /// A field or method descriptor could not be parsed
    #[error("invalid descriptor {0:?}")]
    InvalidDescriptor(String),

    /// A constant pool index was out of range or of the wrong kind
    #[error("invalid constant pool entry #{index}: {reason}")]
    InvalidConstant {
        /// Constant pool index
        index: u16,
        /// What went wrong
        reason: String,
    },
}
