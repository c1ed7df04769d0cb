//! Execution engine for JVM bytecode
//!
//! This crate runs verified class files on top of the class model and heap:
//! - Per-thread call stacks of interpreted, native and internal frames
//! - A 256-entry opcode dispatch table covering the whole instruction set
//! - Lazy constant resolution with deferred, re-executed instructions
//! - Virtual, interface, dynamic and method-handle invocation
//! - Reentrant monitors with cooperative hand-off between threads
//! - Host natives and intrinsics injected through registries
//!
//! # Example
//!
//! ```
//! use bytecode_system::{CodeBuilder, Opcode};
//! use class_model::{ClassDefinition, ACC_PUBLIC, ACC_STATIC};
//! use core_types::Value;
//! use interpreter::{RuntimeBuilder, Thread, ThreadStatus};
//!
//! let sum = CodeBuilder::new()
//!     .op(Opcode::Iconst2)
//!     .op(Opcode::Iconst3)
//!     .op(Opcode::Iadd)
//!     .op(Opcode::Ireturn)
//!     .build(2, 0);
//! let runtime = RuntimeBuilder::new()
//!     .class(ClassDefinition::new("demo/Sum").method("sum", "()I", ACC_PUBLIC | ACC_STATIC, Some(sum)))
//!     .build();
//!
//! let mut thread = Thread::new(runtime);
//! assert!(thread.start("demo/Sum", "sum", "()I", vec![]).unwrap().is_success());
//! assert_eq!(thread.run_to_completion().unwrap(), ThreadStatus::Terminated);
//! assert_eq!(thread.exit_value(), Some(Value::Int(5)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

#[macro_use]
mod macros;

pub mod config;
mod context;
pub mod dispatch;
pub mod frame;
pub mod instructions;
pub mod intrinsics;
pub mod invoke;
pub mod natives;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod thread;

// Re-export main types at crate root
pub use config::VmConfig;
pub use dispatch::{DispatchTable, Handler};
pub use frame::{Continuation, FrameBody, FrameKind, FrameOutcome, NativeMethod, StackFrame};
pub use registry::{IntrinsicRegistry, NativeRegistry};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{PoolOutcome, ThreadPool};
pub use thread::{Resume, Thread, ThreadStatus, UncaughtException};
