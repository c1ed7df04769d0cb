//! Constant pushes and `ldc`.

use crate::thread::Thread;
use bytecode_system::Opcode;
use class_model::ResolvedConstant;
use core_types::{Value, VmError};

/// `nop`
pub fn nop(t: &mut Thread) -> Result<(), VmError> {
    t.advance(1)
}

/// `aconst_null`
pub fn aconst_null(t: &mut Thread) -> Result<(), VmError> {
    vm_try!(t.push_stack(Value::null())?);
    t.advance(1)
}

/// `iconst_m1` through `iconst_5`
pub fn iconst(t: &mut Thread) -> Result<(), VmError> {
    let value = i32::from(t.opcode()?) - i32::from(Opcode::Iconst0.byte());
    vm_try!(t.push_stack(Value::Int(value))?);
    t.advance(1)
}

/// `lconst_0`, `lconst_1`
pub fn lconst(t: &mut Thread) -> Result<(), VmError> {
    let value = i64::from(t.opcode()? - Opcode::Lconst0.byte());
    vm_try!(t.push_stack64(Value::Long(value))?);
    t.advance(1)
}

/// `fconst_0` through `fconst_2`
pub fn fconst(t: &mut Thread) -> Result<(), VmError> {
    let value = f32::from(t.opcode()? - Opcode::Fconst0.byte());
    vm_try!(t.push_stack(Value::Float(value))?);
    t.advance(1)
}

/// `dconst_0`, `dconst_1`
pub fn dconst(t: &mut Thread) -> Result<(), VmError> {
    let value = f64::from(t.opcode()? - Opcode::Dconst0.byte());
    vm_try!(t.push_stack64(Value::Double(value))?);
    t.advance(1)
}

/// `bipush`
pub fn bipush(t: &mut Thread) -> Result<(), VmError> {
    let value = i32::from(t.operand_i8(1)?);
    vm_try!(t.push_stack(Value::Int(value))?);
    t.advance(2)
}

/// `sipush`
pub fn sipush(t: &mut Thread) -> Result<(), VmError> {
    let value = i32::from(t.operand_i16(1)?);
    vm_try!(t.push_stack(Value::Int(value))?);
    t.advance(3)
}

/// `ldc`
pub fn ldc(t: &mut Thread) -> Result<(), VmError> {
    let index = u16::from(t.operand_u8(1)?);
    load_constant(t, index, 2)
}

/// `ldc_w` and `ldc2_w`
pub fn ldc_w(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    load_constant(t, index, 3)
}

fn load_constant(t: &mut Thread, index: u16, width: usize) -> Result<(), VmError> {
    let class = t.current_class()?;
    let value = match resolve_or_throw!(t, class.resolve_constant(index, t)) {
        ResolvedConstant::Int(v) => Value::Int(v),
        ResolvedConstant::Float(v) => Value::Float(v),
        ResolvedConstant::Long(v) => Value::Long(v),
        ResolvedConstant::Double(v) => Value::Double(v),
        ResolvedConstant::String(r) | ResolvedConstant::MethodType(r) | ResolvedConstant::MethodHandle(r) => {
            Value::object(r)
        }
        ResolvedConstant::Class(class) => Value::object(t.runtime().mirror(&class)?),
        other => {
            return Err(VmError::InvalidConstant {
                index,
                reason: format!("{:?} cannot be loaded", other),
            })
        }
    };
    vm_try!(t.push_value(value)?);
    t.advance(width)
}
