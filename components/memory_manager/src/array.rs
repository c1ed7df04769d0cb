//! Fixed-length typed arrays.

use crate::monitor::Monitor;
use class_model::ClassData;
use core_types::{JavaType, ObjectRef, Value, VmError};
use std::sync::Arc;
use thiserror::Error;

/// Array access failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrayError {
    /// Index outside `0..length`
    #[error("Index {index} out of bounds for length {length}")]
    OutOfBounds {
        /// Requested index
        index: i64,
        /// Array length
        length: usize,
    },

    /// The stored value has the wrong category for the element type
    #[error(transparent)]
    Value(#[from] VmError),
}

/// Contiguous element storage, one variant per element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayStorage {
    /// `boolean[]`, each element 0 or 1
    Boolean(Vec<i8>),
    /// `byte[]`
    Byte(Vec<i8>),
    /// `char[]`
    Char(Vec<u16>),
    /// `short[]`
    Short(Vec<i16>),
    /// `int[]`
    Int(Vec<i32>),
    /// `long[]`
    Long(Vec<i64>),
    /// `float[]`
    Float(Vec<f32>),
    /// `double[]`
    Double(Vec<f64>),
    /// Arrays of references
    Reference(Vec<Option<ObjectRef>>),
}

impl ArrayStorage {
    /// Zero-filled storage for `length` elements of `element`
    pub fn for_type(element: &JavaType, length: usize) -> Self {
        match element {
            JavaType::Boolean => ArrayStorage::Boolean(vec![0; length]),
            JavaType::Byte => ArrayStorage::Byte(vec![0; length]),
            JavaType::Char => ArrayStorage::Char(vec![0; length]),
            JavaType::Short => ArrayStorage::Short(vec![0; length]),
            JavaType::Int => ArrayStorage::Int(vec![0; length]),
            JavaType::Long => ArrayStorage::Long(vec![0; length]),
            JavaType::Float => ArrayStorage::Float(vec![0.0; length]),
            JavaType::Double => ArrayStorage::Double(vec![0.0; length]),
            _ => ArrayStorage::Reference(vec![None; length]),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayStorage::Boolean(v) | ArrayStorage::Byte(v) => v.len(),
            ArrayStorage::Char(v) => v.len(),
            ArrayStorage::Short(v) => v.len(),
            ArrayStorage::Int(v) => v.len(),
            ArrayStorage::Long(v) => v.len(),
            ArrayStorage::Float(v) => v.len(),
            ArrayStorage::Double(v) => v.len(),
            ArrayStorage::Reference(v) => v.len(),
        }
    }

    /// Check for a zero-length array
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check for reference elements
    pub fn is_reference(&self) -> bool {
        matches!(self, ArrayStorage::Reference(_))
    }

    fn checked(&self, index: i64) -> Result<usize, ArrayError> {
        let length = self.len();
        if index < 0 || index as u64 >= length as u64 {
            return Err(ArrayError::OutOfBounds { index, length });
        }
        Ok(index as usize)
    }

    /// Read an element, widening sub-int types to `Int`
    pub fn get(&self, index: i64) -> Result<Value, ArrayError> {
        let i = self.checked(index)?;
        Ok(match self {
            ArrayStorage::Boolean(v) | ArrayStorage::Byte(v) => Value::Int(v[i] as i32),
            ArrayStorage::Char(v) => Value::Int(v[i] as i32),
            ArrayStorage::Short(v) => Value::Int(v[i] as i32),
            ArrayStorage::Int(v) => Value::Int(v[i]),
            ArrayStorage::Long(v) => Value::Long(v[i]),
            ArrayStorage::Float(v) => Value::Float(v[i]),
            ArrayStorage::Double(v) => Value::Double(v[i]),
            ArrayStorage::Reference(v) => Value::Reference(v[i]),
        })
    }

    /// Write an element, narrowing `Int` values to the element width
    pub fn set(&mut self, index: i64, value: Value) -> Result<(), ArrayError> {
        let i = self.checked(index)?;
        match self {
            ArrayStorage::Boolean(v) => v[i] = (value.as_int()? & 1) as i8,
            ArrayStorage::Byte(v) => v[i] = value.as_int()? as i8,
            ArrayStorage::Char(v) => v[i] = value.as_int()? as u16,
            ArrayStorage::Short(v) => v[i] = value.as_int()? as i16,
            ArrayStorage::Int(v) => v[i] = value.as_int()?,
            ArrayStorage::Long(v) => v[i] = value.as_long()?,
            ArrayStorage::Float(v) => v[i] = value.as_float()?,
            ArrayStorage::Double(v) => v[i] = value.as_double()?,
            ArrayStorage::Reference(v) => v[i] = value.as_reference()?,
        }
        Ok(())
    }

    /// Element type name used in diagnostics, e.g. `int`
    pub fn element_name(&self) -> &'static str {
        match self {
            ArrayStorage::Boolean(_) => "boolean",
            ArrayStorage::Byte(_) => "byte",
            ArrayStorage::Char(_) => "char",
            ArrayStorage::Short(_) => "short",
            ArrayStorage::Int(_) => "int",
            ArrayStorage::Long(_) => "long",
            ArrayStorage::Float(_) => "float",
            ArrayStorage::Double(_) => "double",
            ArrayStorage::Reference(_) => "object",
        }
    }

    /// Check if both storages hold the same element type
    pub fn same_kind(&self, other: &ArrayStorage) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// An array object.
#[derive(Debug)]
pub struct JvmArray {
    class: Arc<ClassData>,
    storage: ArrayStorage,
    monitor: Monitor,
}

impl JvmArray {
    /// Allocate a zero-filled array of an array class
    pub fn new(class: Arc<ClassData>, length: usize) -> Result<Self, VmError> {
        let element = JavaType::parse(class.name())
            .ok()
            .and_then(|ty| match ty {
                JavaType::Array(component) => Some(*component),
                _ => None,
            })
            .ok_or_else(|| VmError::MissingClass(class.name().to_string()))?;
        Ok(Self::with_storage(class, ArrayStorage::for_type(&element, length)))
    }

    /// Wrap existing storage
    pub fn with_storage(class: Arc<ClassData>, storage: ArrayStorage) -> Self {
        Self {
            class,
            storage,
            monitor: Monitor::new(),
        }
    }

    /// Element-for-element copy with a fresh monitor
    pub fn shallow_copy(&self) -> Self {
        Self::with_storage(self.class.clone(), self.storage.clone())
    }

    /// Runtime array class
    pub fn class(&self) -> &Arc<ClassData> {
        &self.class
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check for a zero-length array
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Element storage
    pub fn storage(&self) -> &ArrayStorage {
        &self.storage
    }

    /// Element storage, mutably
    pub fn storage_mut(&mut self) -> &mut ArrayStorage {
        &mut self.storage
    }

    /// Bounds-checked read
    pub fn get(&self, index: i64) -> Result<Value, ArrayError> {
        self.storage.get(index)
    }

    /// Bounds-checked, narrowing write
    pub fn set(&mut self, index: i64, value: Value) -> Result<(), ArrayError> {
        self.storage.set(index, value)
    }

    /// The array's monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// The array's monitor, mutably
    pub fn monitor_mut(&mut self) -> &mut Monitor {
        &mut self.monitor
    }
}
