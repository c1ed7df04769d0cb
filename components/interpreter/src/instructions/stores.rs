//! Local variable and array element stores.

use super::{array_failure, dotted, Slot, NPE};
use crate::thread::Thread;
use bytecode_system::Opcode;
use core_types::{Value, VmError, VmResult};

/// Pop a value of `kind` into local `index`
pub(crate) fn store(t: &mut Thread, kind: Slot, index: usize) -> Result<VmResult<()>, VmError> {
    let popped = if kind.is_wide() {
        t.pop_stack64()?
    } else {
        t.pop_stack()?
    };
    let value = match popped {
        VmResult::Success(value) => kind.check(value)?,
        other => return Ok(other.map(|_| ())),
    };
    if kind.is_wide() {
        t.store_local64(index, value)?;
    } else {
        t.store_local(index, value)?;
    }
    Ok(VmResult::Success(()))
}

/// `istore`, `lstore`, `fstore`, `dstore`, `astore`
pub fn store_indexed(t: &mut Thread) -> Result<(), VmError> {
    let kind = Slot::from_group(t.opcode()? - Opcode::Istore.byte());
    let index = usize::from(t.operand_u8(1)?);
    vm_try!(store(t, kind, index)?);
    t.advance(2)
}

/// `istore_0` through `astore_3`
pub fn store_n(t: &mut Thread) -> Result<(), VmError> {
    let relative = t.opcode()? - Opcode::Istore0.byte();
    vm_try!(store(t, Slot::from_group(relative / 4), usize::from(relative % 4))?);
    t.advance(1)
}

/// `iastore` through `sastore`, except `aastore`
pub fn array_store(t: &mut Thread) -> Result<(), VmError> {
    let wide = matches!(Opcode::from_byte(t.opcode()?), Some(Opcode::Lastore | Opcode::Dastore));
    let value = if wide {
        vm_try!(t.pop_stack64()?)
    } else {
        vm_try!(t.pop_stack()?)
    };
    let index = vm_try!(t.pop_int()?);
    let Some(array) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, "Cannot store to a null array");
    };
    let stored = t.runtime().heap().array_mut(array)?.set(i64::from(index), value);
    match stored {
        Ok(()) => t.advance(1),
        Err(err) => array_failure(t, err),
    }
}

/// `aastore`: the element must be assignable to the component type
pub fn aastore(t: &mut Thread) -> Result<(), VmError> {
    let value = vm_try!(t.pop_reference()?);
    let index = vm_try!(t.pop_int()?);
    let Some(array) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, "Cannot store to a null array");
    };
    if let Some(element) = value {
        let (array_class, element_class) = {
            let heap = t.runtime().heap();
            (heap.class_of(array)?, heap.class_of(element)?)
        };
        let assignable = array_class
            .component()
            .map_or(false, |component| element_class.check_cast(component));
        if !assignable {
            return t.throw_new_exception(
                "java/lang/ArrayStoreException",
                &dotted(element_class.name()),
            );
        }
    }
    let stored = t
        .runtime()
        .heap()
        .array_mut(array)?
        .set(i64::from(index), Value::Reference(value));
    match stored {
        Ok(()) => t.advance(1),
        Err(err) => array_failure(t, err),
    }
}
