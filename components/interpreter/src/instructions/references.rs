//! Fields, allocation, type checks and monitors.

use super::{dotted, NPE};
use crate::thread::{Thread, ThreadStatus};
use bytecode_system::atype;
use class_model::{ClassData, FieldRef};
use core_types::{JavaType, Value, VmError, VmResult};
use memory_manager::EnterOutcome;
use std::sync::Arc;

const ICCE: &str = "java/lang/IncompatibleClassChangeError";
const ILLEGAL_ACCESS: &str = "java/lang/IllegalAccessError";

/// Narrow an `int` to the declared width of a sub-int field
fn coerce(field: &FieldRef, value: Value) -> Value {
    match (field.field.java_type(), value) {
        (JavaType::Boolean, Value::Int(v)) => Value::Int(v & 1),
        (JavaType::Byte, Value::Int(v)) => Value::Int(i32::from(v as i8)),
        (JavaType::Char, Value::Int(v)) => Value::Int(i32::from(v as u16)),
        (JavaType::Short, Value::Int(v)) => Value::Int(i32::from(v as i16)),
        _ => value,
    }
}

/// Access rules shared by the field instructions. Answers `false` once the
/// failure has been thrown.
fn check_access(t: &mut Thread, field: &FieldRef, is_static: bool, is_put: bool) -> Result<bool, VmError> {
    let access = field.field.access();
    if access.is_static() != is_static {
        let expected = if is_static { "static" } else { "non-static" };
        t.throw_new_exception(ICCE, &format!("Expected {} field {}", expected, field.key()))?;
        return Ok(false);
    }
    let current = t.current_method()?;
    if !current.class.can_access_member(&field.class, access) {
        t.throw_new_exception(
            ILLEGAL_ACCESS,
            &format!("{} cannot access field {}", dotted(current.class.name()), field.key()),
        )?;
        return Ok(false);
    }
    if is_put && access.is_final() {
        let initializer = if is_static { "<clinit>" } else { "<init>" };
        if current.class.name() != field.class.name() || current.method.name() != initializer {
            t.throw_new_exception(
                ILLEGAL_ACCESS,
                &format!("Update to final field {} attempted from a different method", field.key()),
            )?;
            return Ok(false);
        }
    }
    Ok(true)
}

fn pop_field_value(t: &mut Thread, field: &FieldRef) -> Result<VmResult<Value>, VmError> {
    if field.field.java_type().is_wide() {
        t.pop_stack64()
    } else {
        t.pop_stack()
    }
}

/// `getstatic`
pub fn getstatic(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let field = resolve_or_throw!(t, caller.resolve_field_at(index, t));
    if !check_access(t, &field, true, false)? {
        return Ok(());
    }
    resolve_or_throw!(t, t.initialize_class(&field.class)?);
    vm_try!(t.push_value(field.field.static_value())?);
    t.advance(3)
}

/// `putstatic`
pub fn putstatic(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let field = resolve_or_throw!(t, caller.resolve_field_at(index, t));
    if !check_access(t, &field, true, true)? {
        return Ok(());
    }
    resolve_or_throw!(t, t.initialize_class(&field.class)?);
    let value = vm_try!(pop_field_value(t, &field)?);
    field.field.set_static_value(coerce(&field, value));
    t.advance(3)
}

/// `getfield`
pub fn getfield(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let field = resolve_or_throw!(t, caller.resolve_field_at(index, t));
    if !check_access(t, &field, false, false)? {
        return Ok(());
    }
    let Some(object) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, &format!("Cannot read field \"{}\" of null", field.field.name()));
    };
    let key = field.key();
    let value = t.runtime().heap().object(object)?.get_field(&key);
    match value {
        Some(value) => {
            vm_try!(t.push_value(value)?);
            t.advance(3)
        }
        None => t.throw_new_exception("java/lang/NoSuchFieldError", &key),
    }
}

/// `putfield`
pub fn putfield(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let field = resolve_or_throw!(t, caller.resolve_field_at(index, t));
    if !check_access(t, &field, false, true)? {
        return Ok(());
    }
    let value = vm_try!(pop_field_value(t, &field)?);
    let Some(object) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, &format!("Cannot assign field \"{}\" of null", field.field.name()));
    };
    let key = field.key();
    let stored = t
        .runtime()
        .heap()
        .object_mut(object)?
        .set_field(&key, coerce(&field, value));
    if !stored {
        return t.throw_new_exception("java/lang/NoSuchFieldError", &key);
    }
    t.advance(3)
}

/// `new`
pub fn new(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let class = resolve_or_throw!(t, caller.resolve_class_at(index, t));
    if class.is_interface() || class.is_abstract() || class.is_array() {
        return t.throw_new_exception("java/lang/InstantiationError", &dotted(class.name()));
    }
    resolve_or_throw!(t, t.initialize_class(&class)?);
    let object = t.runtime().heap().allocate_object(class);
    vm_try!(t.push_stack(Value::object(object))?);
    t.advance(3)
}

/// Pop an array length, throwing `NegativeArraySizeException` when negative
pub(crate) fn pop_count(t: &mut Thread) -> Result<VmResult<usize>, VmError> {
    let count = match t.pop_int()? {
        VmResult::Success(count) => count,
        other => return Ok(other.map(|_| 0)),
    };
    match usize::try_from(count) {
        Ok(count) => Ok(VmResult::Success(count)),
        Err(_) => {
            t.throw_new_exception("java/lang/NegativeArraySizeException", &count.to_string())?;
            Ok(VmResult::error("java/lang/NegativeArraySizeException", count.to_string()))
        }
    }
}

fn allocate(t: &mut Thread, class: Arc<ClassData>, length: usize, width: usize) -> Result<(), VmError> {
    let array = t.runtime().heap().allocate_array(class, length)?;
    vm_try!(t.push_stack(Value::object(array))?);
    t.advance(width)
}

/// `newarray`
pub fn newarray(t: &mut Thread) -> Result<(), VmError> {
    let name = match t.operand_u8(1)? {
        atype::T_BOOLEAN => "[Z",
        atype::T_CHAR => "[C",
        atype::T_FLOAT => "[F",
        atype::T_DOUBLE => "[D",
        atype::T_BYTE => "[B",
        atype::T_SHORT => "[S",
        atype::T_INT => "[I",
        atype::T_LONG => "[J",
        other => {
            return Err(VmError::MalformedBytecode {
                pc: t.pc()?,
                reason: format!("unknown array type {}", other),
            })
        }
    };
    let length = vm_try!(pop_count(t)?);
    let class = t.runtime().load_class(name)?;
    allocate(t, class, length, 2)
}

/// Name of the array class whose elements are `component`
pub(crate) fn array_of(component: &ClassData) -> String {
    if component.is_array() {
        format!("[{}", component.name())
    } else {
        format!("[L{};", component.name())
    }
}

/// `anewarray`
pub fn anewarray(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let component = resolve_or_throw!(t, caller.resolve_class_at(index, t));
    let class = resolve_or_throw!(t, t.runtime().loader().load_class(&array_of(&component)));
    let length = vm_try!(pop_count(t)?);
    allocate(t, class, length, 3)
}

/// `arraylength`
pub fn arraylength(t: &mut Thread) -> Result<(), VmError> {
    let Some(array) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, "Cannot read the array length of null");
    };
    let length = t.runtime().heap().array(array)?.len();
    vm_try!(t.push_stack(Value::Int(length as i32))?);
    t.advance(1)
}

/// `checkcast`
pub fn checkcast(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let target = resolve_or_throw!(t, caller.resolve_class_at(index, t));
    let value = vm_try!(t.peek_stack(0)?).as_reference()?;
    if let Some(object) = value {
        let class = t.runtime().heap().class_of(object)?;
        if !class.check_cast(&target) {
            return t.throw_new_exception(
                "java/lang/ClassCastException",
                &format!(
                    "class {} cannot be cast to class {}",
                    dotted(class.name()),
                    dotted(target.name())
                ),
            );
        }
    }
    t.advance(3)
}

/// `instanceof`
pub fn instanceof(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let target = resolve_or_throw!(t, caller.resolve_class_at(index, t));
    let result = match vm_try!(t.pop_reference()?) {
        Some(object) => {
            let class = t.runtime().heap().class_of(object)?;
            i32::from(class.check_cast(&target))
        }
        None => 0,
    };
    vm_try!(t.push_stack(Value::Int(result))?);
    t.advance(3)
}

/// `monitorenter`; a contended monitor parks the thread until it is handed
/// over
pub fn monitorenter(t: &mut Thread) -> Result<(), VmError> {
    let Some(object) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, "Cannot enter synchronized block on null");
    };
    match t.enter_monitor(object)? {
        EnterOutcome::Acquired => t.advance(1),
        EnterOutcome::Blocked => {
            t.park(ThreadStatus::Blocked, Some(Box::new(|thread: &mut Thread| thread.advance(1))));
            Ok(())
        }
    }
}

/// `monitorexit`
pub fn monitorexit(t: &mut Thread) -> Result<(), VmError> {
    let Some(object) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, "Cannot exit synchronized block on null");
    };
    if let Err(err) = t.exit_monitor(object)? {
        return t.throw_new_exception("java/lang/IllegalMonitorStateException", &err.to_string());
    }
    t.advance(1)
}
