//! Local variable and array element loads.

use super::{array_failure, Slot, NPE};
use crate::thread::Thread;
use bytecode_system::Opcode;
use core_types::{VmError, VmResult};

/// Push local `index` as `kind`
pub(crate) fn load(t: &mut Thread, kind: Slot, index: usize) -> Result<VmResult<()>, VmError> {
    let value = kind.check(t.load_local(index)?)?;
    t.push_value(value)
}

/// `iload`, `lload`, `fload`, `dload`, `aload`
pub fn load_indexed(t: &mut Thread) -> Result<(), VmError> {
    let kind = Slot::from_group(t.opcode()? - Opcode::Iload.byte());
    let index = usize::from(t.operand_u8(1)?);
    vm_try!(load(t, kind, index)?);
    t.advance(2)
}

/// `iload_0` through `aload_3`
pub fn load_n(t: &mut Thread) -> Result<(), VmError> {
    let relative = t.opcode()? - Opcode::Iload0.byte();
    vm_try!(load(t, Slot::from_group(relative / 4), usize::from(relative % 4))?);
    t.advance(1)
}

/// `iaload` through `saload`
pub fn array_load(t: &mut Thread) -> Result<(), VmError> {
    let index = vm_try!(t.pop_int()?);
    let Some(array) = vm_try!(t.pop_reference()?) else {
        return t.throw_new_exception(NPE, "Cannot load from a null array");
    };
    let loaded = t.runtime().heap().array(array)?.get(i64::from(index));
    match loaded {
        Ok(value) => {
            vm_try!(t.push_value(value)?);
            t.advance(1)
        }
        Err(err) => array_failure(t, err),
    }
}
