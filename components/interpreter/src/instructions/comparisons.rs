//! Comparisons and conditional branches.

use crate::thread::Thread;
use bytecode_system::Opcode;
use core_types::{Value, VmError};
use num_traits::Float;
use std::cmp::Ordering;

/// Three-way float comparison; `nan` is the result when either side is NaN
fn fcmp<F: Float>(a: F, b: F, nan: i32) -> i32 {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None => nan,
    }
}

/// Condition selected by the offset of an opcode within its `eq..le` family
fn holds(condition: u8, ordering: Ordering) -> bool {
    match condition {
        0 => ordering == Ordering::Equal,
        1 => ordering != Ordering::Equal,
        2 => ordering == Ordering::Less,
        3 => ordering != Ordering::Less,
        4 => ordering == Ordering::Greater,
        _ => ordering != Ordering::Greater,
    }
}

/// Take the 16-bit branch when `taken`, else fall through
pub(crate) fn branch_if(t: &mut Thread, taken: bool) -> Result<(), VmError> {
    if taken {
        let offset = t.operand_i16(1)?;
        t.branch(i32::from(offset))
    } else {
        t.advance(3)
    }
}

/// `lcmp`
pub fn lcmp(t: &mut Thread) -> Result<(), VmError> {
    let b = vm_try!(t.pop_long()?);
    let a = vm_try!(t.pop_long()?);
    let result = match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    vm_try!(t.push_stack(Value::Int(result))?);
    t.advance(1)
}

/// `fcmpl`, `fcmpg`
pub fn fcmp_op(t: &mut Thread) -> Result<(), VmError> {
    let nan = if t.opcode()? == Opcode::Fcmpg.byte() { 1 } else { -1 };
    let b = vm_try!(t.pop_float()?);
    let a = vm_try!(t.pop_float()?);
    vm_try!(t.push_stack(Value::Int(fcmp(a, b, nan)))?);
    t.advance(1)
}

/// `dcmpl`, `dcmpg`
pub fn dcmp_op(t: &mut Thread) -> Result<(), VmError> {
    let nan = if t.opcode()? == Opcode::Dcmpg.byte() { 1 } else { -1 };
    let b = vm_try!(t.pop_double()?);
    let a = vm_try!(t.pop_double()?);
    vm_try!(t.push_stack(Value::Int(fcmp(a, b, nan)))?);
    t.advance(1)
}

/// `ifeq` through `ifle`
pub fn if_zero(t: &mut Thread) -> Result<(), VmError> {
    let condition = t.opcode()? - Opcode::Ifeq.byte();
    let value = vm_try!(t.pop_int()?);
    branch_if(t, holds(condition, value.cmp(&0)))
}

/// `if_icmpeq` through `if_icmple`
pub fn if_icmp(t: &mut Thread) -> Result<(), VmError> {
    let condition = t.opcode()? - Opcode::IfIcmpeq.byte();
    let b = vm_try!(t.pop_int()?);
    let a = vm_try!(t.pop_int()?);
    branch_if(t, holds(condition, a.cmp(&b)))
}

/// `if_acmpeq`, `if_acmpne`
pub fn if_acmp(t: &mut Thread) -> Result<(), VmError> {
    let equal_branches = t.opcode()? == Opcode::IfAcmpeq.byte();
    let b = vm_try!(t.pop_reference()?);
    let a = vm_try!(t.pop_reference()?);
    branch_if(t, (a == b) == equal_branches)
}

/// `ifnull`, `ifnonnull`
pub fn if_null(t: &mut Thread) -> Result<(), VmError> {
    let null_branches = t.opcode()? == Opcode::Ifnull.byte();
    let value = vm_try!(t.pop_reference()?);
    branch_if(t, value.is_none() == null_branches)
}
