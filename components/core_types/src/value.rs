//! JVM value representation.
//!
//! This module provides the `Value` enum that every operand-stack slot,
//! local variable, field and array element is expressed in, plus the small
//! identifier newtypes used to reference heap objects and threads.

use crate::descriptor::JavaType;
use crate::error::VmError;
use std::fmt;

/// Identifier of a heap-allocated object or array.
///
/// Objects are referenced by ID for safety; the heap owns the storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub u32);

impl ObjectRef {
    /// Index of the object inside the heap arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Identifier of a logical JVM thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread-{}", self.0)
    }
}

/// Represents any JVM value.
///
/// `boolean`, `byte`, `char` and `short` are carried as [`Value::Int`] the way
/// the instruction set does. Long and double values occupy two slots on the
/// operand stack and in the locals; the same value is written to both slots.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let int = Value::Int(42);
/// let long = Value::Long(7);
///
/// assert_eq!(int.category(), 1);
/// assert_eq!(long.category(), 2);
/// assert!(Value::null().is_null());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 32-bit signed integer (also boolean, byte, char, short)
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// IEEE 754 single-precision float
    Float(f32),
    /// IEEE 754 double-precision float
    Double(f64),
    /// Object or array reference, `None` is `null`
    Reference(Option<ObjectRef>),
    /// Code offset pushed by `jsr`
    ReturnAddress(usize),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    /// The `null` reference
    pub fn null() -> Self {
        Value::Reference(None)
    }

    /// A non-null reference
    pub fn object(obj: ObjectRef) -> Self {
        Value::Reference(Some(obj))
    }

    /// Check if this is the `null` reference
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Reference(None))
    }

    /// Number of stack slots this value occupies
    pub fn category(&self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }

    /// Zero value for a field or array element of the given type
    pub fn default_for(ty: &JavaType) -> Self {
        match ty {
            JavaType::Long => Value::Long(0),
            JavaType::Float => Value::Float(0.0),
            JavaType::Double => Value::Double(0.0),
            JavaType::Reference(_) | JavaType::Array(_) => Value::null(),
            _ => Value::Int(0),
        }
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Reference(_) => "reference",
            Value::ReturnAddress(_) => "returnAddress",
        }
    }

    fn mismatch(&self, expected: &'static str) -> VmError {
        VmError::TypeMismatch {
            expected,
            found: self.kind_name(),
        }
    }

    /// Extract an int, failing on any other category
    pub fn as_int(&self) -> Result<i32, VmError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(other.mismatch("int")),
        }
    }

    /// Extract a long
    pub fn as_long(&self) -> Result<i64, VmError> {
        match self {
            Value::Long(v) => Ok(*v),
            other => Err(other.mismatch("long")),
        }
    }

    /// Extract a float
    pub fn as_float(&self) -> Result<f32, VmError> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(other.mismatch("float")),
        }
    }

    /// Extract a double
    pub fn as_double(&self) -> Result<f64, VmError> {
        match self {
            Value::Double(v) => Ok(*v),
            other => Err(other.mismatch("double")),
        }
    }

    /// Extract a (possibly null) reference
    pub fn as_reference(&self) -> Result<Option<ObjectRef>, VmError> {
        match self {
            Value::Reference(r) => Ok(*r),
            other => Err(other.mismatch("reference")),
        }
    }

    /// Extract a `jsr` return address
    pub fn as_return_address(&self) -> Result<usize, VmError> {
        match self {
            Value::ReturnAddress(pc) => Ok(*pc),
            other => Err(other.mismatch("returnAddress")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Reference(None) => write!(f, "null"),
            Value::Reference(Some(r)) => write!(f, "{}", r),
            Value::ReturnAddress(pc) => write!(f, "ret:{}", pc),
        }
    }
}
