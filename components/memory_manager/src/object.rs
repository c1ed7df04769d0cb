//! Heap objects.

use crate::monitor::Monitor;
use class_model::{ClassData, FieldRef, MethodRef};
use core_types::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// VM-private data attached to an object, invisible to bytecode.
///
/// Class mirrors link back to their `ClassData`, `MemberName`s carry their
/// target method, interned strings keep their text.
#[derive(Debug, Clone)]
pub enum NativeSlot {
    /// A class, e.g. behind a `java/lang/Class` mirror
    Class(Arc<ClassData>),
    /// A method, e.g. the `vmtarget` of a `MemberName`
    Method(MethodRef),
    /// A field
    Field(FieldRef),
    /// A raw number
    Long(i64),
    /// Host text
    String(Arc<str>),
}

/// An instance of a reference class.
///
/// Fields are keyed by `declaringClass.nameDescriptor` so shadowed fields of
/// superclasses stay distinct.
#[derive(Debug)]
pub struct JvmObject {
    class: Arc<ClassData>,
    fields: HashMap<String, Value>,
    native: HashMap<&'static str, NativeSlot>,
    monitor: Monitor,
}

impl JvmObject {
    /// Allocate with every instance field at its default value
    pub fn new(class: Arc<ClassData>) -> Self {
        let fields = class
            .instance_fields()
            .iter()
            .map(|f| (f.key.clone(), Value::default_for(&f.java_type)))
            .collect();
        Self {
            class,
            fields,
            native: HashMap::new(),
            monitor: Monitor::new(),
        }
    }

    /// Field-for-field copy with a fresh monitor, as `Object.clone` makes
    pub fn shallow_copy(&self) -> Self {
        Self {
            class: self.class.clone(),
            fields: self.fields.clone(),
            native: self.native.clone(),
            monitor: Monitor::new(),
        }
    }

    /// Runtime class
    pub fn class(&self) -> &Arc<ClassData> {
        &self.class
    }

    /// Read a field by key
    pub fn get_field(&self, key: &str) -> Option<Value> {
        self.fields.get(key).copied()
    }

    /// Write a field by key; returns `false` if the object has no such field
    pub fn set_field(&mut self, key: &str, value: Value) -> bool {
        match self.fields.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Key of the instance field at layout position `slot`
    pub fn field_key_at(&self, slot: usize) -> Option<&str> {
        self.class.instance_fields().get(slot).map(|f| f.key.as_str())
    }

    /// VM-private slot
    pub fn native(&self, name: &str) -> Option<&NativeSlot> {
        self.native.get(name)
    }

    /// Attach a VM-private slot
    pub fn set_native(&mut self, name: &'static str, slot: NativeSlot) {
        self.native.insert(name, slot);
    }

    /// The object's monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// The object's monitor, mutably
    pub fn monitor_mut(&mut self) -> &mut Monitor {
        &mut self.monitor
    }
}
