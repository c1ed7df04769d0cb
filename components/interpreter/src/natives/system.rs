//! `java/lang/System` natives.

use super::{int_arg, reference_arg, register_natives};
use crate::instructions::{array_failure, ARRAY_INDEX, NPE};
use crate::registry::NativeRegistry;
use crate::thread::Thread;
use core_types::{Value, VmError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

const SYSTEM: &str = "java/lang/System";
const ARRAY_STORE: &str = "java/lang/ArrayStoreException";

pub(super) fn register(registry: &mut NativeRegistry) {
    registry.register(SYSTEM, "registerNatives()V", register_natives);
    registry.register(SYSTEM, "arraycopy(Ljava/lang/Object;ILjava/lang/Object;II)V", arraycopy);
    registry.register(SYSTEM, "identityHashCode(Ljava/lang/Object;)I", identity_hash_code);
    registry.register(SYSTEM, "currentTimeMillis()J", current_time_millis);
    registry.register(SYSTEM, "nanoTime()J", nano_time);
}

/// `arraycopy(src, srcPos, dest, destPos, length)`.
///
/// The source range is read before anything is written, so overlapping
/// copies within one array behave like `memmove`. Reference elements are
/// stored without a per-element type check.
fn arraycopy(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (Some(src), Some(dest)) = (reference_arg(args, 0)?, reference_arg(args, 2)?) else {
        return thread.throw_new_exception(NPE, "Cannot copy to/from a null array.");
    };
    let (src_pos, dest_pos, length) = (int_arg(args, 1)?, int_arg(args, 3)?, int_arg(args, 4)?);

    let runtime = thread.runtime().clone();
    let checked = {
        let heap = runtime.heap();
        if !heap.is_array(src) || !heap.is_array(dest) {
            Err((ARRAY_STORE, "src and dest arguments must be of array type.".to_string()))
        } else {
            let (from, to) = (heap.array(src)?, heap.array(dest)?);
            let in_bounds = |pos: i32, len: usize| {
                pos >= 0 && length >= 0 && i64::from(pos) + i64::from(length) <= len as i64
            };
            if !from.storage().same_kind(to.storage()) {
                Err((
                    ARRAY_STORE,
                    format!(
                        "arraycopy: type mismatch: can not copy {}[] into {}[]",
                        from.storage().element_name(),
                        to.storage().element_name()
                    ),
                ))
            } else if !in_bounds(src_pos, from.len()) || !in_bounds(dest_pos, to.len()) {
                Err((ARRAY_INDEX, "Tried to write to an illegal index in an array.".to_string()))
            } else {
                Ok(())
            }
        }
    };
    if let Err((exception, message)) = checked {
        return thread.throw_new_exception(exception, &message);
    }

    let snapshot = {
        let heap = runtime.heap();
        let from = heap.array(src)?;
        (0..length).map(|i| from.get(i64::from(src_pos) + i64::from(i))).collect::<Result<Vec<_>, _>>()
    };
    let values = match snapshot {
        Ok(values) => values,
        Err(err) => return array_failure(thread, err),
    };
    trace!(src = %src, dest = %dest, length, "arraycopy");

    for (offset, value) in (0..).zip(values) {
        let stored = runtime
            .heap()
            .array_mut(dest)?
            .set(i64::from(dest_pos) + offset, value);
        if let Err(err) = stored {
            return array_failure(thread, err);
        }
    }
    thread.return_frame(None)
}

fn identity_hash_code(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let hash = reference_arg(args, 0)?.map_or(0, |object| object.0 as i32);
    thread.return_frame(Some(Value::Int(hash)))
}

fn current_time_millis(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64);
    thread.return_frame(Some(Value::Long(millis)))
}

/// Nanoseconds since the runtime was built
fn nano_time(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    let nanos = thread.runtime().uptime().as_nanos() as i64;
    thread.return_frame(Some(Value::Long(nanos)))
}
