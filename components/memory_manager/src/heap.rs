//! Object heap.
//!
//! An append-only arena of objects and arrays addressed by [`ObjectRef`].
//! There is no collector: entries live as long as the heap.

use crate::array::JvmArray;
use crate::monitor::Monitor;
use crate::object::JvmObject;
use class_model::ClassData;
use core_types::{ObjectRef, VmError};
use std::sync::Arc;

/// A heap entry.
#[derive(Debug)]
pub enum HeapEntry {
    /// Instance of a reference class
    Object(JvmObject),
    /// Array
    Array(JvmArray),
}

impl HeapEntry {
    /// Runtime class
    pub fn class(&self) -> &Arc<ClassData> {
        match self {
            HeapEntry::Object(o) => o.class(),
            HeapEntry::Array(a) => a.class(),
        }
    }

    /// Monitor of the entry
    pub fn monitor_mut(&mut self) -> &mut Monitor {
        match self {
            HeapEntry::Object(o) => o.monitor_mut(),
            HeapEntry::Array(a) => a.monitor_mut(),
        }
    }

    /// Monitor of the entry
    pub fn monitor(&self) -> &Monitor {
        match self {
            HeapEntry::Object(o) => o.monitor(),
            HeapEntry::Array(a) => a.monitor(),
        }
    }
}

/// Allocation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of allocated objects
    pub objects: usize,
    /// Number of allocated arrays
    pub arrays: usize,
}

/// The object heap shared by every thread of a runtime.
#[derive(Debug, Default)]
pub struct Heap {
    entries: Vec<HeapEntry>,
    stats: HeapStats,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: HeapEntry) -> ObjectRef {
        let reference = ObjectRef(self.entries.len() as u32);
        self.entries.push(entry);
        reference
    }

    /// Allocate an instance with default field values
    pub fn allocate_object(&mut self, class: Arc<ClassData>) -> ObjectRef {
        self.stats.objects += 1;
        self.push(HeapEntry::Object(JvmObject::new(class)))
    }

    /// Store an already-built object
    pub fn insert_object(&mut self, object: JvmObject) -> ObjectRef {
        self.stats.objects += 1;
        self.push(HeapEntry::Object(object))
    }

    /// Allocate a zero-filled array of an array class
    pub fn allocate_array(&mut self, class: Arc<ClassData>, length: usize) -> Result<ObjectRef, VmError> {
        let array = JvmArray::new(class, length)?;
        self.stats.arrays += 1;
        Ok(self.push(HeapEntry::Array(array)))
    }

    /// Store an already-built array
    pub fn insert_array(&mut self, array: JvmArray) -> ObjectRef {
        self.stats.arrays += 1;
        self.push(HeapEntry::Array(array))
    }

    /// Entry behind a reference
    pub fn get(&self, reference: ObjectRef) -> Result<&HeapEntry, VmError> {
        self.entries
            .get(reference.index())
            .ok_or(VmError::InvalidReference(reference))
    }

    /// Entry behind a reference, mutably
    pub fn get_mut(&mut self, reference: ObjectRef) -> Result<&mut HeapEntry, VmError> {
        self.entries
            .get_mut(reference.index())
            .ok_or(VmError::InvalidReference(reference))
    }

    /// Object behind a reference; arrays are rejected
    pub fn object(&self, reference: ObjectRef) -> Result<&JvmObject, VmError> {
        match self.get(reference)? {
            HeapEntry::Object(o) => Ok(o),
            HeapEntry::Array(_) => Err(VmError::InvalidReference(reference)),
        }
    }

    /// Object behind a reference, mutably
    pub fn object_mut(&mut self, reference: ObjectRef) -> Result<&mut JvmObject, VmError> {
        match self.get_mut(reference)? {
            HeapEntry::Object(o) => Ok(o),
            HeapEntry::Array(_) => Err(VmError::InvalidReference(reference)),
        }
    }

    /// Array behind a reference; plain objects are rejected
    pub fn array(&self, reference: ObjectRef) -> Result<&JvmArray, VmError> {
        match self.get(reference)? {
            HeapEntry::Array(a) => Ok(a),
            HeapEntry::Object(_) => Err(VmError::InvalidReference(reference)),
        }
    }

    /// Array behind a reference, mutably
    pub fn array_mut(&mut self, reference: ObjectRef) -> Result<&mut JvmArray, VmError> {
        match self.get_mut(reference)? {
            HeapEntry::Array(a) => Ok(a),
            HeapEntry::Object(_) => Err(VmError::InvalidReference(reference)),
        }
    }

    /// Check whether a reference points at an array
    pub fn is_array(&self, reference: ObjectRef) -> bool {
        matches!(self.get(reference), Ok(HeapEntry::Array(_)))
    }

    /// Runtime class of any entry
    pub fn class_of(&self, reference: ObjectRef) -> Result<Arc<ClassData>, VmError> {
        Ok(self.get(reference)?.class().clone())
    }

    /// Monitor of any entry
    pub fn monitor_mut(&mut self, reference: ObjectRef) -> Result<&mut Monitor, VmError> {
        Ok(self.get_mut(reference)?.monitor_mut())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for an empty heap
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocation statistics
    pub fn stats(&self) -> HeapStats {
        self.stats
    }
}
