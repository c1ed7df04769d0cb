//! Fields and methods of a loaded class.

use crate::access::{AccessFlags, ACC_NATIVE, ACC_VARARGS};
use crate::class::ClassData;
use bytecode_system::Code;
use core_types::{JavaType, MethodDescriptor, Value, VmError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A field declared by a class.
///
/// Static fields keep their value here; instance fields only describe the
/// layout and live in each object.
pub struct Field {
    name: String,
    descriptor: String,
    java_type: JavaType,
    access: AccessFlags,
    constant_value: Option<Value>,
    static_value: Mutex<Value>,
}

impl Field {
    /// Create a field, parsing its descriptor
    pub fn new(
        name: &str,
        descriptor: &str,
        access: AccessFlags,
        constant_value: Option<Value>,
    ) -> Result<Self, VmError> {
        let java_type = JavaType::parse(descriptor)?;
        let initial = Value::default_for(&java_type);
        Ok(Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            java_type,
            access,
            constant_value,
            static_value: Mutex::new(initial),
        })
    }

    /// Simple name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptor, e.g. `I`
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Parsed field type
    pub fn java_type(&self) -> &JavaType {
        &self.java_type
    }

    /// Access flags
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    /// `ConstantValue` attribute, applied at class initialization
    pub fn constant_value(&self) -> Option<Value> {
        self.constant_value
    }

    /// Current value of a static field
    pub fn static_value(&self) -> Value {
        *self.static_value.lock()
    }

    /// Overwrite the value of a static field
    pub fn set_static_value(&self, value: Value) {
        *self.static_value.lock() = value;
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("access", &self.access)
            .finish()
    }
}

/// A method declared by a class.
pub struct Method {
    name: String,
    descriptor: String,
    parsed: MethodDescriptor,
    access: AccessFlags,
    code: Option<Code>,
}

impl Method {
    /// Create a method, parsing its descriptor
    pub fn new(
        name: &str,
        descriptor: &str,
        access: AccessFlags,
        code: Option<Code>,
    ) -> Result<Self, VmError> {
        Ok(Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            parsed: MethodDescriptor::parse(descriptor)?,
            access,
            code,
        })
    }

    /// Simple name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method descriptor, e.g. `(I)V`
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Lookup key: name followed by descriptor
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    /// Parsed descriptor
    pub fn parsed_descriptor(&self) -> &MethodDescriptor {
        &self.parsed
    }

    /// Access flags
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    /// Bytecode, absent for native and abstract methods
    pub fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }

    /// Shorthand for `access().is_static()`
    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    /// Shorthand for `access().is_native()`
    pub fn is_native(&self) -> bool {
        self.access.is_native()
    }

    /// Shorthand for `access().is_abstract()`
    pub fn is_abstract(&self) -> bool {
        self.access.is_abstract()
    }

    /// Shorthand for `access().is_synchronized()`
    pub fn is_synchronized(&self) -> bool {
        self.access.is_synchronized()
    }

    /// Instance or class initializer
    pub fn is_initializer(&self) -> bool {
        self.name == "<init>" || self.name == "<clinit>"
    }

    /// Check for a signature-polymorphic method declared by `class_name`
    pub fn is_signature_polymorphic(&self, class_name: &str) -> bool {
        (class_name == "java/lang/invoke/MethodHandle" || class_name == "java/lang/invoke/VarHandle")
            && self.access.contains(ACC_NATIVE | ACC_VARARGS)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("access", &self.access)
            .field("has_code", &self.code.is_some())
            .finish()
    }
}

/// A resolved method together with its declaring class.
#[derive(Clone)]
pub struct MethodRef {
    /// Declaring class
    pub class: Arc<ClassData>,
    /// The method itself
    pub method: Arc<Method>,
}

impl MethodRef {
    /// Pair a method with its declaring class
    pub fn new(class: Arc<ClassData>, method: Arc<Method>) -> Self {
        Self { class, method }
    }

    /// Check if both refer to the same declaration
    pub fn same_as(&self, other: &MethodRef) -> bool {
        Arc::ptr_eq(&self.method, &other.method)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MethodRef({}.{}{})",
            self.class.name(),
            self.method.name(),
            self.method.descriptor()
        )
    }
}

/// A resolved field together with its declaring class.
#[derive(Clone)]
pub struct FieldRef {
    /// Declaring class
    pub class: Arc<ClassData>,
    /// The field itself
    pub field: Arc<Field>,
}

impl FieldRef {
    /// Pair a field with its declaring class
    pub fn new(class: Arc<ClassData>, field: Arc<Field>) -> Self {
        Self { class, field }
    }

    /// Key of this field inside an object's field map
    pub fn key(&self) -> String {
        field_key(self.class.name(), self.field.name(), self.field.descriptor())
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldRef({})", self.key())
    }
}

/// Object field key: `declaringClass.nameDescriptor`
pub fn field_key(class: &str, name: &str, descriptor: &str) -> String {
    format!("{}.{}{}", class, name, descriptor)
}
