//! Opcode handlers.
//!
//! Every handler has the [`crate::dispatch::Handler`] shape: it reads its
//! operands relative to the current pc and either advances the pc, jumps,
//! invokes, returns or throws. A guest exception raised while popping or
//! pushing makes the handler return `Ok(())` immediately.

pub mod comparisons;
pub mod constants;
pub mod control;
pub mod conversions;
pub mod extended;
pub mod loads;
pub mod math;
pub mod references;
pub mod stack;
pub mod stores;

use crate::thread::Thread;
use core_types::{Value, VmError};
use memory_manager::ArrayError;

pub(crate) const NPE: &str = "java/lang/NullPointerException";
pub(crate) const ARRAY_INDEX: &str = "java/lang/ArrayIndexOutOfBoundsException";

/// Local variable kinds, in opcode table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl Slot {
    /// Kind for the `n`-th group of a load or store opcode family
    pub(crate) fn from_group(n: u8) -> Slot {
        match n {
            0 => Slot::Int,
            1 => Slot::Long,
            2 => Slot::Float,
            3 => Slot::Double,
            _ => Slot::Reference,
        }
    }

    /// Check `value` has this kind. References also admit return addresses
    /// because `astore` spills them.
    pub(crate) fn check(self, value: Value) -> Result<Value, VmError> {
        match self {
            Slot::Int => value.as_int().map(Value::Int),
            Slot::Long => value.as_long().map(Value::Long),
            Slot::Float => value.as_float().map(Value::Float),
            Slot::Double => value.as_double().map(Value::Double),
            Slot::Reference => match value {
                Value::ReturnAddress(_) => Ok(value),
                _ => value.as_reference().map(Value::Reference),
            },
        }
    }

    pub(crate) fn is_wide(self) -> bool {
        matches!(self, Slot::Long | Slot::Double)
    }
}

/// Turn an array access failure into a guest exception
pub(crate) fn array_failure(t: &mut Thread, err: ArrayError) -> Result<(), VmError> {
    match err {
        ArrayError::OutOfBounds { .. } => t.throw_new_exception(ARRAY_INDEX, &err.to_string()),
        ArrayError::Value(err) => Err(err),
    }
}

/// Internal class name as Java source spells it
pub(crate) fn dotted(name: &str) -> String {
    name.replace('/', ".")
}
