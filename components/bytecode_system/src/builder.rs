//! Bytecode assembler.
//!
//! `CodeBuilder` emits raw instruction bytes the same way a compiler back-end
//! would, so hosts and tests can produce [`Code`] without a class-file parser.

use crate::code::{Code, ExceptionHandler};
use crate::opcode::Opcode;

/// Incrementally assembles a method body.
///
/// # Examples
///
/// ```
/// use bytecode_system::{CodeBuilder, Opcode};
///
/// let code = CodeBuilder::new()
///     .op(Opcode::Iconst2)
///     .op(Opcode::Iconst3)
///     .op(Opcode::Iadd)
///     .op(Opcode::Ireturn)
///     .build(2, 0);
///
/// assert_eq!(code.len(), 4);
/// assert_eq!(code.read_u8(2).unwrap(), Opcode::Iadd.byte());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    bytes: Vec<u8>,
    handlers: Vec<ExceptionHandler>,
}

impl CodeBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Current emission offset
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    /// Emit an opcode
    pub fn op(mut self, opcode: Opcode) -> Self {
        self.bytes.push(opcode.byte());
        self
    }

    /// Emit an unsigned byte operand
    pub fn u8(mut self, value: u8) -> Self {
        self.bytes.push(value);
        self
    }

    /// Emit a signed byte operand
    pub fn i8(mut self, value: i8) -> Self {
        self.bytes.push(value as u8);
        self
    }

    /// Emit a big-endian u16 operand
    pub fn u16(mut self, value: u16) -> Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Emit a big-endian i16 operand
    pub fn i16(mut self, value: i16) -> Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Emit a big-endian i32 operand
    pub fn i32(mut self, value: i32) -> Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Emit an opcode with a constant-pool index operand
    pub fn op_u16(self, opcode: Opcode, index: u16) -> Self {
        self.op(opcode).u16(index)
    }

    /// Emit a branch with a 16-bit offset relative to the branch itself
    pub fn branch(self, opcode: Opcode, offset: i16) -> Self {
        self.op(opcode).i16(offset)
    }

    /// Emit `count` `nop` instructions
    pub fn nops(mut self, count: usize) -> Self {
        self.bytes
            .extend(std::iter::repeat(Opcode::Nop.byte()).take(count));
        self
    }

    /// Zero-pad up to the next multiple of four (switch operand alignment)
    fn align(mut self) -> Self {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
        self
    }

    /// Emit a `tableswitch` covering `low..=low + offsets.len() - 1`.
    ///
    /// All offsets are relative to the start of the `tableswitch` instruction.
    pub fn tableswitch(self, default: i32, low: i32, offsets: &[i32]) -> Self {
        let high = low + offsets.len() as i32 - 1;
        let mut builder = self.op(Opcode::Tableswitch).align().i32(default).i32(low).i32(high);
        for offset in offsets {
            builder = builder.i32(*offset);
        }
        builder
    }

    /// Emit a `lookupswitch` with `(key, offset)` pairs
    pub fn lookupswitch(self, default: i32, pairs: &[(i32, i32)]) -> Self {
        let mut builder = self
            .op(Opcode::Lookupswitch)
            .align()
            .i32(default)
            .i32(pairs.len() as i32);
        for (key, offset) in pairs {
            builder = builder.i32(*key).i32(*offset);
        }
        builder
    }

    /// Overwrite a previously emitted 16-bit operand (back-patching)
    pub fn patch_i16(mut self, at: usize, value: i16) -> Self {
        if let Some(slot) = self.bytes.get_mut(at..at + 2) {
            slot.copy_from_slice(&value.to_be_bytes());
        }
        self
    }

    /// Register an exception handler
    pub fn handler(mut self, start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: Option<&str>) -> Self {
        self.handlers
            .push(ExceptionHandler::new(start_pc, end_pc, handler_pc, catch_type));
        self
    }

    /// Finish assembly
    pub fn build(self, max_stack: usize, max_locals: usize) -> Code {
        Code::new(self.bytes, max_stack, max_locals).with_exception_table(self.handlers)
    }
}
