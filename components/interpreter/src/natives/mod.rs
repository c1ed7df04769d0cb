//! Built-in native methods.
//!
//! [`register_builtins`] binds the natives declared by the core skeleton
//! classes. Natives receive their arguments compact, one [`Value`] per
//! parameter with the receiver first, and finish by returning their frame.

mod invoke;
mod object;
mod system;
mod unsafe_memory;

use crate::registry::NativeRegistry;
use crate::thread::Thread;
use core_types::{ObjectRef, Value, VmError};

/// Bind every built-in native into `registry`
pub fn register_builtins(registry: &mut NativeRegistry) {
    object::register(registry);
    system::register(registry);
    unsafe_memory::register(registry);
    invoke::register(registry);
}

/// No-op `registerNatives`
fn register_natives(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    thread.return_frame(None)
}

fn arg(args: &[Value], index: usize) -> Result<Value, VmError> {
    args.get(index).copied().ok_or(VmError::TypeMismatch {
        expected: "argument",
        found: "nothing",
    })
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, VmError> {
    arg(args, index)?.as_int()
}

fn long_arg(args: &[Value], index: usize) -> Result<i64, VmError> {
    arg(args, index)?.as_long()
}

fn reference_arg(args: &[Value], index: usize) -> Result<Option<ObjectRef>, VmError> {
    arg(args, index)?.as_reference()
}

/// Receiver of an instance native; the invoke instructions reject null
fn receiver(args: &[Value]) -> Result<ObjectRef, VmError> {
    reference_arg(args, 0)?.ok_or(VmError::TypeMismatch {
        expected: "receiver",
        found: "null",
    })
}

fn return_bool(thread: &mut Thread, value: bool) -> Result<(), VmError> {
    thread.return_frame(Some(Value::Int(i32::from(value))))
}
