//! Bytecode system for the JVM execution engine
//!
//! This crate provides the instruction set definitions and the code-buffer
//! contract every method body is consumed through.
//!
//! # Features
//!
//! - Complete JVM opcode table with mnemonics and operand widths
//! - Byte-addressable [`Code`] buffers with big-endian operand readers
//! - Exception tables with end-exclusive protected ranges
//! - A [`CodeBuilder`] assembler for hosts and tests
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Code, CodeBuilder, Opcode};
//!
//! let code = CodeBuilder::new()
//!     .op(Opcode::Bipush)
//!     .i8(-5)
//!     .op(Opcode::Ireturn)
//!     .build(1, 0);
//!
//! assert_eq!(code.read_i8(1).unwrap(), -5);
//! assert_eq!(Opcode::from_byte(code.read_u8(2).unwrap()), Some(Opcode::Ireturn));
//! assert_eq!(Code::switch_operands_start(1), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod code;
pub mod opcode;

// Re-export main types at crate root
pub use builder::CodeBuilder;
pub use code::{branch_target, Code, ExceptionHandler};
pub use opcode::{atype, Opcode};
