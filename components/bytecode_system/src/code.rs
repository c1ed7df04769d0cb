//! Method code buffer and exception table.
//!
//! A [`Code`] is the byte-addressable instruction stream of one method along
//! with the bounds used to preallocate its frame. All multi-byte operands are
//! big-endian, as in the class-file format.

use core_types::VmError;

/// One entry of a method's exception table.
///
/// The protected range is `start_pc..end_pc` (end exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// First protected code offset
    pub start_pc: u16,
    /// First code offset after the protected range
    pub end_pc: u16,
    /// Offset of the handler code
    pub handler_pc: u16,
    /// Binary name of the caught class, `None` catches everything
    pub catch_type: Option<String>,
}

impl ExceptionHandler {
    /// Create a handler entry
    pub fn new(start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: Option<&str>) -> Self {
        Self {
            start_pc,
            end_pc,
            handler_pc,
            catch_type: catch_type.map(str::to_string),
        }
    }

    /// Check if `pc` lies in the protected range
    pub fn covers(&self, pc: usize) -> bool {
        (self.start_pc as usize) <= pc && pc < (self.end_pc as usize)
    }
}

/// Bytecode of a single method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    /// Raw instruction bytes
    bytes: Vec<u8>,
    /// Maximum operand-stack depth in slots
    pub max_stack: usize,
    /// Number of local variable slots
    pub max_locals: usize,
    /// Exception handlers, searched in order
    pub exception_table: Vec<ExceptionHandler>,
}

impl Code {
    /// Create a code buffer with no exception handlers
    pub fn new(bytes: Vec<u8>, max_stack: usize, max_locals: usize) -> Self {
        Self {
            bytes,
            max_stack,
            max_locals,
            exception_table: Vec::new(),
        }
    }

    /// Attach an exception table
    pub fn with_exception_table(mut self, table: Vec<ExceptionHandler>) -> Self {
        self.exception_table = table;
        self
    }

    /// Raw instruction bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the code in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the method has no instructions
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn slice<const N: usize>(&self, at: usize) -> Result<[u8; N], VmError> {
        self.bytes
            .get(at..at + N)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| VmError::MalformedBytecode {
                pc: at,
                reason: format!("read of {} bytes past end of {}-byte code", N, self.bytes.len()),
            })
    }

    /// Read an unsigned byte
    pub fn read_u8(&self, at: usize) -> Result<u8, VmError> {
        Ok(self.slice::<1>(at)?[0])
    }

    /// Read a signed byte
    pub fn read_i8(&self, at: usize) -> Result<i8, VmError> {
        Ok(self.slice::<1>(at)?[0] as i8)
    }

    /// Read an unsigned big-endian 16-bit value
    pub fn read_u16(&self, at: usize) -> Result<u16, VmError> {
        Ok(u16::from_be_bytes(self.slice::<2>(at)?))
    }

    /// Read a signed big-endian 16-bit value
    pub fn read_i16(&self, at: usize) -> Result<i16, VmError> {
        Ok(i16::from_be_bytes(self.slice::<2>(at)?))
    }

    /// Read a signed big-endian 32-bit value
    pub fn read_i32(&self, at: usize) -> Result<i32, VmError> {
        Ok(i32::from_be_bytes(self.slice::<4>(at)?))
    }

    /// Offset of the first switch operand for a switch instruction at `pc`.
    ///
    /// Padding brings the operand start to a multiple of four counted from the
    /// start of the code.
    pub fn switch_operands_start(pc: usize) -> usize {
        (pc + 1 + 3) & !3
    }
}

/// Compute the branch target `pc + offset`, failing if it leaves the code.
pub fn branch_target(code: &Code, pc: usize, offset: i32) -> Result<usize, VmError> {
    let target = pc as i64 + offset as i64;
    if target < 0 || target as usize >= code.len() {
        return Err(VmError::MalformedBytecode {
            pc,
            reason: format!("branch offset {} leaves the code", offset),
        });
    }
    Ok(target as usize)
}
