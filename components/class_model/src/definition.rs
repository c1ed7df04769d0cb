//! Already-parsed class structures handed to the loader.
//!
//! A class-file parser (out of the engine's scope) produces these; tests and
//! embedders build them directly with the fluent constructors.

use crate::access::{ACC_PUBLIC, ACC_SUPER};
use crate::constant_pool::Constant;
use bytecode_system::Code;
use core_types::Value;

/// Field declaration.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Simple name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Access flags
    pub access_flags: u16,
    /// `ConstantValue` attribute
    pub constant_value: Option<Value>,
}

/// Method declaration.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// Simple name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Access flags
    pub access_flags: u16,
    /// Bytecode, `None` for native and abstract methods
    pub code: Option<Code>,
}

/// Entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// Constant pool index of the bootstrap `MethodHandle`
    pub method_handle: u16,
    /// Constant pool indices of the static arguments
    pub arguments: Vec<u16>,
}

/// A complete class description.
///
/// # Examples
///
/// ```
/// use class_model::{ClassDefinition, ConstantPoolBuilder, ACC_PUBLIC, ACC_STATIC};
/// use bytecode_system::{CodeBuilder, Opcode};
///
/// let pool = ConstantPoolBuilder::new();
/// let def = ClassDefinition::new("demo/Main")
///     .constants(pool.build())
///     .field("counter", "I", ACC_STATIC)
///     .method(
///         "main",
///         "()V",
///         ACC_PUBLIC | ACC_STATIC,
///         Some(CodeBuilder::new().op(Opcode::Return).build(0, 0)),
///     );
///
/// assert_eq!(def.superclass.as_deref(), Some("java/lang/Object"));
/// assert_eq!(def.methods.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// Binary name, e.g. `java/lang/String`
    pub name: String,
    /// Class access flags
    pub access_flags: u16,
    /// Superclass binary name, `None` only for `java/lang/Object`
    pub superclass: Option<String>,
    /// Directly implemented interfaces
    pub interfaces: Vec<String>,
    /// Constant pool entries, index 0 unused
    pub constant_pool: Vec<Constant>,
    /// Declared fields
    pub fields: Vec<FieldDefinition>,
    /// Declared methods
    pub methods: Vec<MethodDefinition>,
    /// `NestHost` attribute
    pub nest_host: Option<String>,
    /// `BootstrapMethods` attribute
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

impl ClassDefinition {
    /// Start a public class extending `java/lang/Object`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access_flags: ACC_PUBLIC | ACC_SUPER,
            superclass: if name == "java/lang/Object" {
                None
            } else {
                Some("java/lang/Object".to_string())
            },
            interfaces: Vec::new(),
            constant_pool: vec![Constant::Unusable],
            fields: Vec::new(),
            methods: Vec::new(),
            nest_host: None,
            bootstrap_methods: Vec::new(),
        }
    }

    /// Replace the access flags
    pub fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Set the constant pool
    pub fn constants(mut self, pool: Vec<Constant>) -> Self {
        self.constant_pool = pool;
        self
    }

    /// Declare a field
    pub fn field(self, name: &str, descriptor: &str, access_flags: u16) -> Self {
        self.field_with_constant(name, descriptor, access_flags, None)
    }

    /// Declare a field with a `ConstantValue`
    pub fn field_with_constant(
        mut self,
        name: &str,
        descriptor: &str,
        access_flags: u16,
        constant_value: Option<Value>,
    ) -> Self {
        self.fields.push(FieldDefinition {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags,
            constant_value,
        });
        self
    }

    /// Declare a method
    pub fn method(mut self, name: &str, descriptor: &str, access_flags: u16, code: Option<Code>) -> Self {
        self.methods.push(MethodDefinition {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags,
            code,
        });
        self
    }

    /// Set the nest host
    pub fn nest_host(mut self, host: &str) -> Self {
        self.nest_host = Some(host.to_string());
        self
    }

    /// Add a bootstrap method entry, returning its attribute index
    pub fn bootstrap_method(&mut self, method_handle: u16, arguments: Vec<u16>) -> u16 {
        self.bootstrap_methods.push(BootstrapMethod {
            method_handle,
            arguments,
        });
        (self.bootstrap_methods.len() - 1) as u16
    }
}
