//! `wide`, `multianewarray`, `goto_w` and `jsr_w`.

use super::references::pop_count;
use super::{loads, math, stores, Slot};
use crate::runtime::Runtime;
use crate::thread::Thread;
use bytecode_system::Opcode;
use class_model::ClassData;
use core_types::{ObjectRef, Value, VmError};
use memory_manager::{ArrayStorage, JvmArray};
use std::sync::Arc;

/// `wide`: the modified instruction takes a 16-bit local index
pub fn wide(t: &mut Thread) -> Result<(), VmError> {
    let modified = t.operand_u8(1)?;
    let index = usize::from(t.operand_u16(2)?);
    let Some(op) = Opcode::from_byte(modified) else {
        return Err(VmError::UnimplementedOpcode {
            opcode: modified,
            pc: t.pc()? + 1,
        });
    };
    match op {
        Opcode::Iinc => {
            let delta = i32::from(t.operand_i16(4)?);
            math::increment(t, index, delta)?;
            t.advance(6)
        }
        Opcode::Iload | Opcode::Lload | Opcode::Fload | Opcode::Dload | Opcode::Aload => {
            vm_try!(loads::load(t, Slot::from_group(modified - Opcode::Iload.byte()), index)?);
            t.advance(4)
        }
        Opcode::Istore | Opcode::Lstore | Opcode::Fstore | Opcode::Dstore | Opcode::Astore => {
            vm_try!(stores::store(t, Slot::from_group(modified - Opcode::Istore.byte()), index)?);
            t.advance(4)
        }
        Opcode::Ret => {
            let target = t.load_local(index)?.as_return_address()?;
            t.jump(target)
        }
        other => Err(VmError::MalformedBytecode {
            pc: t.pc()?,
            reason: format!("wide cannot modify {}", other.mnemonic()),
        }),
    }
}

/// Build a `counts.len()`-dimensional array of `class`; dimensions past the
/// counts stay null
fn allocate_nested(runtime: &Runtime, class: Arc<ClassData>, counts: &[usize]) -> Result<ObjectRef, VmError> {
    let Some((&length, rest)) = counts.split_first() else {
        return Err(VmError::InvalidDescriptor(class.name().to_string()));
    };
    if rest.is_empty() {
        return runtime.heap().allocate_array(class, length);
    }
    let component = class
        .component()
        .cloned()
        .ok_or_else(|| VmError::InvalidDescriptor(class.name().to_string()))?;
    let children = (0..length)
        .map(|_| allocate_nested(runtime, component.clone(), rest).map(Some))
        .collect::<Result<Vec<_>, _>>()?;
    let array = JvmArray::with_storage(class, ArrayStorage::Reference(children));
    Ok(runtime.heap().insert_array(array))
}

/// `multianewarray`
pub fn multianewarray(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let dimensions = usize::from(t.operand_u8(3)?);
    if dimensions == 0 {
        return Err(VmError::MalformedBytecode {
            pc: t.pc()?,
            reason: "multianewarray with zero dimensions".to_string(),
        });
    }
    let caller = t.current_class()?;
    let class = resolve_or_throw!(t, caller.resolve_class_at(index, t));
    let mut counts = vec![0; dimensions];
    for count in counts.iter_mut().rev() {
        *count = vm_try!(pop_count(t)?);
    }
    let array = allocate_nested(t.runtime(), class, &counts)?;
    vm_try!(t.push_stack(Value::object(array))?);
    t.advance(4)
}

/// `goto_w`
pub fn goto_w(t: &mut Thread) -> Result<(), VmError> {
    let offset = t.operand_i32(1)?;
    t.branch(offset)
}

/// `jsr_w`
pub fn jsr_w(t: &mut Thread) -> Result<(), VmError> {
    let offset = t.operand_i32(1)?;
    let next = t.pc()? + 5;
    vm_try!(t.push_stack(Value::ReturnAddress(next))?);
    t.branch(offset)
}
