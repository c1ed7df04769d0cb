//! `java/lang/Object`, `java/lang/Class` and `java/lang/String` natives.

use super::{long_arg, receiver, reference_arg, register_natives, return_bool};
use crate::instructions::dotted;
use crate::registry::NativeRegistry;
use crate::thread::{Thread, ThreadStatus};
use core_types::{Value, VmError};
use memory_manager::MonitorError;

const OBJECT: &str = "java/lang/Object";
const CLASS: &str = "java/lang/Class";
const ILLEGAL_MONITOR_STATE: &str = "java/lang/IllegalMonitorStateException";

pub(super) fn register(registry: &mut NativeRegistry) {
    registry.register(OBJECT, "registerNatives()V", register_natives);
    registry.register(OBJECT, "hashCode()I", hash_code);
    registry.register(OBJECT, "getClass()Ljava/lang/Class;", get_class);
    registry.register(OBJECT, "clone()Ljava/lang/Object;", clone);
    registry.register(OBJECT, "wait(J)V", wait);
    registry.register(OBJECT, "notify()V", notify);
    registry.register(OBJECT, "notifyAll()V", notify_all);

    registry.register(CLASS, "registerNatives()V", register_natives);
    registry.register(CLASS, "getName()Ljava/lang/String;", class_name);
    registry.register(CLASS, "isInterface()Z", is_interface);
    registry.register(CLASS, "isArray()Z", is_array);
    registry.register(CLASS, "isPrimitive()Z", is_primitive);
    registry.register(CLASS, "isInstance(Ljava/lang/Object;)Z", is_instance);

    registry.register("java/lang/String", "intern()Ljava/lang/String;", intern);
}

/// Identity hash: the heap index
fn hash_code(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let this = receiver(args)?;
    thread.return_frame(Some(Value::Int(this.0 as i32)))
}

fn get_class(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let this = receiver(args)?;
    let class = thread.runtime().heap().class_of(this)?;
    let mirror = thread.runtime().mirror(&class)?;
    thread.return_frame(Some(Value::object(mirror)))
}

/// Shallow copy; arrays are always cloneable, objects must implement
/// `java/lang/Cloneable`
fn clone(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let this = receiver(args)?;
    let runtime = thread.runtime().clone();
    let class = runtime.heap().class_of(this)?;
    let cloneable = runtime.load_class("java/lang/Cloneable")?;
    if !class.is_array() && !class.check_cast(&cloneable) {
        return thread.throw_new_exception("java/lang/CloneNotSupportedException", &dotted(class.name()));
    }
    let copy = {
        let mut heap = runtime.heap();
        if heap.is_array(this) {
            let array = heap.array(this)?.shallow_copy();
            heap.insert_array(array)
        } else {
            let object = heap.object(this)?.shallow_copy();
            heap.insert_object(object)
        }
    };
    thread.return_frame(Some(Value::object(copy)))
}

fn not_owner(thread: &mut Thread, err: MonitorError) -> Result<(), VmError> {
    thread.throw_new_exception(ILLEGAL_MONITOR_STATE, &err.to_string())
}

/// Release the monitor completely and park until notified and handed the
/// monitor back with the saved count. Timeouts are not tracked.
fn wait(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let this = receiver(args)?;
    let timeout = long_arg(args, 1)?;
    if timeout < 0 {
        return thread.throw_new_exception("java/lang/IllegalArgumentException", "timeout value is negative");
    }
    let id = thread.id();
    let released = thread.runtime().heap().monitor_mut(this)?.wait(id);
    match released {
        Ok(next) => {
            if let Some(next) = next {
                thread.runtime().post_wakeup(next);
            }
            let status = if timeout == 0 {
                ThreadStatus::Waiting
            } else {
                ThreadStatus::TimedWaiting
            };
            thread.park(status, Some(Box::new(|thread: &mut Thread| thread.return_frame(None))));
            Ok(())
        }
        Err(err) => not_owner(thread, err),
    }
}

fn notify(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let this = receiver(args)?;
    let id = thread.id();
    let notified = thread.runtime().heap().monitor_mut(this)?.notify(id);
    match notified {
        Ok(_) => thread.return_frame(None),
        Err(err) => not_owner(thread, err),
    }
}

fn notify_all(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let this = receiver(args)?;
    let id = thread.id();
    let notified = thread.runtime().heap().monitor_mut(this)?.notify_all(id);
    match notified {
        Ok(_) => thread.return_frame(None),
        Err(err) => not_owner(thread, err),
    }
}

fn class_name(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let class = thread.runtime().class_of_mirror(receiver(args)?)?;
    let name = thread.runtime().intern(&dotted(class.name()))?;
    thread.return_frame(Some(Value::object(name)))
}

fn is_interface(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let class = thread.runtime().class_of_mirror(receiver(args)?)?;
    return_bool(thread, class.is_interface())
}

fn is_array(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let class = thread.runtime().class_of_mirror(receiver(args)?)?;
    return_bool(thread, class.is_array())
}

fn is_primitive(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let class = thread.runtime().class_of_mirror(receiver(args)?)?;
    return_bool(thread, class.is_primitive())
}

fn is_instance(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let class = thread.runtime().class_of_mirror(receiver(args)?)?;
    let instance = match reference_arg(args, 1)? {
        Some(object) => thread.runtime().heap().class_of(object)?.check_cast(&class),
        None => false,
    };
    return_bool(thread, instance)
}

fn intern(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let canonical = thread.runtime().intern_object(receiver(args)?)?;
    thread.return_frame(Some(Value::object(canonical)))
}
