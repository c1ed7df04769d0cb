//! Jumps, subroutines, switches, returns and `athrow`.

use super::{Slot, NPE};
use crate::thread::Thread;
use bytecode_system::{Code, Opcode};
use core_types::{Value, VmError};

/// `goto`
pub fn goto(t: &mut Thread) -> Result<(), VmError> {
    let offset = t.operand_i16(1)?;
    t.branch(i32::from(offset))
}

/// `jsr`
pub fn jsr(t: &mut Thread) -> Result<(), VmError> {
    let offset = t.operand_i16(1)?;
    let next = t.pc()? + 3;
    vm_try!(t.push_stack(Value::ReturnAddress(next))?);
    t.branch(i32::from(offset))
}

/// `ret`
pub fn ret(t: &mut Thread) -> Result<(), VmError> {
    let index = usize::from(t.operand_u8(1)?);
    let target = t.load_local(index)?.as_return_address()?;
    t.jump(target)
}

/// `tableswitch`
pub fn tableswitch(t: &mut Thread) -> Result<(), VmError> {
    let key = vm_try!(t.pop_int()?);
    let base = Code::switch_operands_start(t.pc()?);
    let code = t.code()?;
    let default = code.read_i32(base)?;
    let low = code.read_i32(base + 4)?;
    let high = code.read_i32(base + 8)?;
    let offset = if key < low || key > high {
        default
    } else {
        let slot = (i64::from(key) - i64::from(low)) as usize;
        code.read_i32(base + 12 + 4 * slot)?
    };
    t.branch(offset)
}

/// `lookupswitch`
pub fn lookupswitch(t: &mut Thread) -> Result<(), VmError> {
    let key = vm_try!(t.pop_int()?);
    let base = Code::switch_operands_start(t.pc()?);
    let code = t.code()?;
    let mut offset = code.read_i32(base)?;
    let pairs = code.read_i32(base + 4)?.max(0) as usize;
    for pair in 0..pairs {
        let at = base + 8 + 8 * pair;
        if code.read_i32(at)? == key {
            offset = code.read_i32(at + 4)?;
            break;
        }
    }
    t.branch(offset)
}

/// `ireturn`, `lreturn`, `freturn`, `dreturn`, `areturn`
pub fn value_return(t: &mut Thread) -> Result<(), VmError> {
    let kind = Slot::from_group(t.opcode()? - Opcode::Ireturn.byte());
    let popped = if kind.is_wide() {
        vm_try!(t.pop_stack64()?)
    } else {
        vm_try!(t.pop_stack()?)
    };
    let value = kind.check(popped)?;
    t.return_frame(Some(value))
}

/// `return`
pub fn void_return(t: &mut Thread) -> Result<(), VmError> {
    t.return_frame(None)
}

/// `athrow`
pub fn athrow(t: &mut Thread) -> Result<(), VmError> {
    match vm_try!(t.pop_reference()?) {
        Some(exception) => t.throw_exception(exception),
        None => t.throw_new_exception(NPE, "Cannot throw a null exception"),
    }
}
