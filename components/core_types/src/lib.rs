//! Core JVM value types, descriptors and result channels.
//!
//! This crate provides the foundational types shared by every engine
//! component: the value representation, the tri-state resolution result,
//! host-fatal errors and descriptor parsing.
//!
//! # Overview
//!
//! - [`Value`] - Operand-stack, local, field and array element values
//! - [`VmResult`] - Success / error / defer result of resolution and stack operations
//! - [`ErrorResult`] - Exception class and message for a guest-visible failure
//! - [`VmError`] - Host-fatal errors that abort the interpreter
//! - [`JavaType`] / [`MethodDescriptor`] - Parsed descriptors
//!
//! # Examples
//!
//! ```
//! use core_types::{JavaType, MethodDescriptor, Value, VmResult};
//!
//! let desc = MethodDescriptor::parse("(JI)V").unwrap();
//! assert_eq!(desc.param_slots(), 3);
//! assert_eq!(desc.ret, JavaType::Void);
//!
//! let pending: VmResult<Value> = VmResult::Defer;
//! assert!(pending.is_defer());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod descriptor;
mod error;
mod result;
mod value;

pub use descriptor::{JavaType, MethodDescriptor};
pub use error::VmError;
pub use result::{ErrorResult, VmResult};
pub use value::{ObjectRef, ThreadId, Value};
