//! `sun/misc/Unsafe` natives over the runtime's [`UnsafeHeap`].

use super::{arg, int_arg, long_arg, reference_arg, register_natives, return_bool};
use crate::registry::NativeRegistry;
use crate::thread::Thread;
use class_model::ClassData;
use core_types::{ObjectRef, Value, VmError};
use memory_manager::{UnsafeHeap, UnsafeHeapError};

const UNSAFE: &str = "sun/misc/Unsafe";
const ILLEGAL_ARGUMENT: &str = "java/lang/IllegalArgumentException";

pub(super) fn register(registry: &mut NativeRegistry) {
    registry.register(UNSAFE, "registerNatives()V", register_natives);
    registry.register(UNSAFE, "allocateMemory(J)J", allocate_memory);
    registry.register(UNSAFE, "freeMemory(J)V", free_memory);
    registry.register(UNSAFE, "putLong(JJ)V", put_long);
    registry.register(UNSAFE, "getLong(J)J", get_long);
    registry.register(UNSAFE, "putInt(JI)V", put_int);
    registry.register(UNSAFE, "getInt(J)I", get_int);
    registry.register(UNSAFE, "putByte(JB)V", put_byte);
    registry.register(UNSAFE, "getByte(J)B", get_byte);
    registry.register(UNSAFE, "addressSize()I", address_size);
    registry.register(UNSAFE, "arrayBaseOffset(Ljava/lang/Class;)I", array_base_offset);
    registry.register(UNSAFE, "arrayIndexScale(Ljava/lang/Class;)I", array_index_scale);
    registry.register(UNSAFE, "compareAndSwapInt(Ljava/lang/Object;JII)Z", compare_and_swap_int);
    registry.register(UNSAFE, "compareAndSwapLong(Ljava/lang/Object;JJJ)Z", compare_and_swap_long);
    registry.register(
        UNSAFE,
        "compareAndSwapObject(Ljava/lang/Object;JLjava/lang/Object;Ljava/lang/Object;)Z",
        compare_and_swap_object,
    );
    registry.register(UNSAFE, "shouldBeInitialized(Ljava/lang/Class;)Z", should_be_initialized);
}

/// Run `op` on the raw heap; a failure is thrown as `IllegalArgumentException`
/// and answers `None`
fn memory<T>(
    thread: &mut Thread,
    op: impl FnOnce(&mut UnsafeHeap) -> Result<T, UnsafeHeapError>,
) -> Result<Option<T>, VmError> {
    let result = op(&mut thread.runtime().unsafe_heap());
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            thread.throw_new_exception(ILLEGAL_ARGUMENT, &err.to_string())?;
            Ok(None)
        }
    }
}

fn allocate_memory(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let Ok(size) = usize::try_from(long_arg(args, 1)?) else {
        return thread.throw_new_exception(ILLEGAL_ARGUMENT, "negative allocation size");
    };
    let address = thread.runtime().unsafe_heap().allocate(size);
    thread.return_frame(Some(Value::Long(address)))
}

fn free_memory(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let address = long_arg(args, 1)?;
    if memory(thread, |heap| heap.free(address))?.is_some() {
        thread.return_frame(None)?;
    }
    Ok(())
}

fn put_long(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (address, value) = (long_arg(args, 1)?, long_arg(args, 2)?);
    if memory(thread, |heap| heap.write_i64(address, value))?.is_some() {
        thread.return_frame(None)?;
    }
    Ok(())
}

fn get_long(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let address = long_arg(args, 1)?;
    match memory(thread, |heap| heap.read_i64(address))? {
        Some(value) => thread.return_frame(Some(Value::Long(value))),
        None => Ok(()),
    }
}

fn put_int(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (address, value) = (long_arg(args, 1)?, int_arg(args, 2)?);
    if memory(thread, |heap| heap.write_i32(address, value))?.is_some() {
        thread.return_frame(None)?;
    }
    Ok(())
}

fn get_int(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let address = long_arg(args, 1)?;
    match memory(thread, |heap| heap.read_i32(address))? {
        Some(value) => thread.return_frame(Some(Value::Int(value))),
        None => Ok(()),
    }
}

fn put_byte(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (address, value) = (long_arg(args, 1)?, int_arg(args, 2)? as i8);
    if memory(thread, |heap| heap.write_i8(address, value))?.is_some() {
        thread.return_frame(None)?;
    }
    Ok(())
}

fn get_byte(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let address = long_arg(args, 1)?;
    match memory(thread, |heap| heap.read_i8(address))? {
        Some(value) => thread.return_frame(Some(Value::Int(i32::from(value)))),
        None => Ok(()),
    }
}

fn address_size(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    thread.return_frame(Some(Value::Int(4)))
}

fn array_base_offset(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    thread.return_frame(Some(Value::Int(0)))
}

/// Bytes per element of an array class, -1 for anything else
fn index_scale(class: &ClassData) -> i32 {
    if !class.is_array() {
        return -1;
    }
    match class.name().as_bytes().get(1) {
        Some(b'J' | b'D') => 8,
        Some(b'I' | b'F') => 4,
        Some(b'S' | b'C') => 2,
        Some(b'B' | b'Z') => 1,
        _ => 4,
    }
}

fn array_index_scale(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let scale = match reference_arg(args, 1)? {
        Some(mirror) => {
            let class = thread.runtime().class_of_mirror(mirror)?;
            index_scale(&class)
        }
        None => -1,
    };
    thread.return_frame(Some(Value::Int(scale)))
}

/// Atomically replace the slot at `offset` when it holds `expected`.
///
/// Object offsets are instance field layout positions; array offsets are
/// byte offsets divided by the element scale. `Err` carries the message of
/// an `IllegalArgumentException`.
fn swap_slot(
    thread: &Thread,
    target: ObjectRef,
    offset: i64,
    expected: Value,
    update: Value,
) -> Result<Result<bool, String>, VmError> {
    let mut heap = thread.runtime().heap();
    if heap.is_array(target) {
        let array = heap.array_mut(target)?;
        let scale = i64::from(index_scale(array.class()).max(1));
        let index = offset / scale;
        let current = match array.get(index) {
            Ok(current) => current,
            Err(err) => return Ok(Err(err.to_string())),
        };
        if current != expected {
            return Ok(Ok(false));
        }
        return Ok(array.set(index, update).map(|()| true).map_err(|err| err.to_string()));
    }
    let object = heap.object_mut(target)?;
    let key = usize::try_from(offset)
        .ok()
        .and_then(|slot| object.field_key_at(slot))
        .map(str::to_string);
    let Some(key) = key else {
        return Ok(Err(format!("Invalid offset: {}", offset)));
    };
    if object.get_field(&key) != Some(expected) {
        return Ok(Ok(false));
    }
    Ok(Ok(object.set_field(&key, update)))
}

fn compare_and_swap(thread: &mut Thread, args: &[Value], expected: Value, update: Value) -> Result<(), VmError> {
    let Some(target) = reference_arg(args, 1)? else {
        return thread.throw_new_exception("java/lang/NullPointerException", "compareAndSwap on null");
    };
    let offset = long_arg(args, 2)?;
    match swap_slot(thread, target, offset, expected, update)? {
        Ok(swapped) => return_bool(thread, swapped),
        Err(message) => thread.throw_new_exception(ILLEGAL_ARGUMENT, &message),
    }
}

fn compare_and_swap_int(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (expected, update) = (int_arg(args, 3)?, int_arg(args, 4)?);
    compare_and_swap(thread, args, Value::Int(expected), Value::Int(update))
}

fn compare_and_swap_long(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (expected, update) = (long_arg(args, 3)?, long_arg(args, 4)?);
    compare_and_swap(thread, args, Value::Long(expected), Value::Long(update))
}

fn compare_and_swap_object(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let (expected, update) = (arg(args, 3)?, arg(args, 4)?);
    compare_and_swap(thread, args, expected, update)
}

fn should_be_initialized(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let Some(mirror) = reference_arg(args, 1)? else {
        return thread.throw_new_exception("java/lang/NullPointerException", "class is null");
    };
    let class = thread.runtime().class_of_mirror(mirror)?;
    return_bool(thread, !class.is_initialized())
}
