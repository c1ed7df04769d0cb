//! Constant pool entries and their resolution cache.
//!
//! Entries are symbolic; [`crate::ClassData::resolve_constant`] turns them into
//! [`ResolvedConstant`] values on first use. Successful resolutions and
//! linkage errors are memoized so every later use observes the same outcome.

use crate::class::ClassData;
use crate::member::{FieldRef, MethodRef};
use core_types::{ErrorResult, ObjectRef, VmResult};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Method handle reference kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReferenceKind {
    /// `REF_getField`
    GetField = 1,
    /// `REF_getStatic`
    GetStatic = 2,
    /// `REF_putField`
    PutField = 3,
    /// `REF_putStatic`
    PutStatic = 4,
    /// `REF_invokeVirtual`
    InvokeVirtual = 5,
    /// `REF_invokeStatic`
    InvokeStatic = 6,
    /// `REF_invokeSpecial`
    InvokeSpecial = 7,
    /// `REF_newInvokeSpecial`
    NewInvokeSpecial = 8,
    /// `REF_invokeInterface`
    InvokeInterface = 9,
}

impl ReferenceKind {
    /// Decode a reference kind byte
    pub fn from_u8(kind: u8) -> Option<ReferenceKind> {
        use ReferenceKind::*;
        Some(match kind {
            1 => GetField,
            2 => GetStatic,
            3 => PutField,
            4 => PutStatic,
            5 => InvokeVirtual,
            6 => InvokeStatic,
            7 => InvokeSpecial,
            8 => NewInvokeSpecial,
            9 => InvokeInterface,
            _ => return None,
        })
    }

    /// Check if the handle targets a field
    pub fn is_field(self) -> bool {
        (self as u8) <= 4
    }
}

/// A symbolic constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Index 0 and the slot following a long or double
    Unusable,
    /// `CONSTANT_Integer`
    Integer(i32),
    /// `CONSTANT_Float`
    Float(f32),
    /// `CONSTANT_Long`
    Long(i64),
    /// `CONSTANT_Double`
    Double(f64),
    /// `CONSTANT_Utf8`
    Utf8(String),
    /// `CONSTANT_String`
    String {
        /// Utf8 index of the contents
        string_index: u16,
    },
    /// `CONSTANT_Class`
    Class {
        /// Utf8 index of the binary name
        name_index: u16,
    },
    /// `CONSTANT_NameAndType`
    NameAndType {
        /// Utf8 index of the name
        name_index: u16,
        /// Utf8 index of the descriptor
        descriptor_index: u16,
    },
    /// `CONSTANT_Fieldref`
    Fieldref {
        /// Class index
        class_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// `CONSTANT_Methodref`
    Methodref {
        /// Class index
        class_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethodref {
        /// Class index
        class_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// `CONSTANT_MethodType`
    MethodType {
        /// Utf8 index of the method descriptor
        descriptor_index: u16,
    },
    /// `CONSTANT_MethodHandle`
    MethodHandle {
        /// What the handle does with its target
        reference_kind: ReferenceKind,
        /// Fieldref / Methodref / InterfaceMethodref index
        reference_index: u16,
    },
    /// `CONSTANT_InvokeDynamic`
    InvokeDynamic {
        /// Index into the class's bootstrap methods
        bootstrap_method_attr_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
}

/// Kind tag of a constant, as reported to the constant-pool consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    /// Unusable slot
    Unusable,
    /// Integer
    Integer,
    /// Float
    Float,
    /// Long
    Long,
    /// Double
    Double,
    /// Utf8
    Utf8,
    /// String
    String,
    /// Class
    Class,
    /// NameAndType
    NameAndType,
    /// Fieldref
    Fieldref,
    /// Methodref
    Methodref,
    /// InterfaceMethodref
    InterfaceMethodref,
    /// MethodType
    MethodType,
    /// MethodHandle
    MethodHandle,
    /// InvokeDynamic
    InvokeDynamic,
}

impl Constant {
    /// Kind tag of this entry
    pub fn kind(&self) -> ConstantKind {
        match self {
            Constant::Unusable => ConstantKind::Unusable,
            Constant::Integer(_) => ConstantKind::Integer,
            Constant::Float(_) => ConstantKind::Float,
            Constant::Long(_) => ConstantKind::Long,
            Constant::Double(_) => ConstantKind::Double,
            Constant::Utf8(_) => ConstantKind::Utf8,
            Constant::String { .. } => ConstantKind::String,
            Constant::Class { .. } => ConstantKind::Class,
            Constant::NameAndType { .. } => ConstantKind::NameAndType,
            Constant::Fieldref { .. } => ConstantKind::Fieldref,
            Constant::Methodref { .. } => ConstantKind::Methodref,
            Constant::InterfaceMethodref { .. } => ConstantKind::InterfaceMethodref,
            Constant::MethodType { .. } => ConstantKind::MethodType,
            Constant::MethodHandle { .. } => ConstantKind::MethodHandle,
            Constant::InvokeDynamic { .. } => ConstantKind::InvokeDynamic,
        }
    }
}

/// Target and appendix produced by linking an `invokedynamic` call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// `MemberName` object whose `vmtarget` is the method to invoke
    pub target: ObjectRef,
    /// Extra trailing argument passed to the target
    pub appendix: Option<ObjectRef>,
}

/// The resolved form of a constant.
#[derive(Clone)]
pub enum ResolvedConstant {
    /// Integer literal
    Int(i32),
    /// Float literal
    Float(f32),
    /// Long literal
    Long(i64),
    /// Double literal
    Double(f64),
    /// Raw modified-UTF8 text
    Utf8(Arc<str>),
    /// Interned `java/lang/String`
    String(ObjectRef),
    /// Loaded class
    Class(Arc<ClassData>),
    /// Name and descriptor pair
    NameAndType {
        /// Member name
        name: Arc<str>,
        /// Member descriptor
        descriptor: Arc<str>,
    },
    /// Resolved field
    Field(FieldRef),
    /// Resolved method (class or interface)
    Method(MethodRef),
    /// `java/lang/invoke/MethodType` object
    MethodType(ObjectRef),
    /// `java/lang/invoke/MethodHandle` object
    MethodHandle(ObjectRef),
    /// Linked dynamic call site
    CallSite(CallSite),
}

impl fmt::Debug for ResolvedConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedConstant::Int(v) => write!(f, "Int({})", v),
            ResolvedConstant::Float(v) => write!(f, "Float({})", v),
            ResolvedConstant::Long(v) => write!(f, "Long({})", v),
            ResolvedConstant::Double(v) => write!(f, "Double({})", v),
            ResolvedConstant::Utf8(s) => write!(f, "Utf8({:?})", s),
            ResolvedConstant::String(r) => write!(f, "String({})", r),
            ResolvedConstant::Class(c) => write!(f, "Class({})", c.name()),
            ResolvedConstant::NameAndType { name, descriptor } => {
                write!(f, "NameAndType({}{})", name, descriptor)
            }
            ResolvedConstant::Field(field) => write!(f, "{:?}", field),
            ResolvedConstant::Method(method) => write!(f, "{:?}", method),
            ResolvedConstant::MethodType(r) => write!(f, "MethodType({})", r),
            ResolvedConstant::MethodHandle(r) => write!(f, "MethodHandle({})", r),
            ResolvedConstant::CallSite(site) => write!(f, "{:?}", site),
        }
    }
}

#[derive(Clone)]
enum Cached {
    Resolved(ResolvedConstant),
    Failed(ErrorResult),
}

/// Symbolic view of a Fieldref / Methodref / InterfaceMethodref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSymbol<'a> {
    /// Kind of the reference
    pub kind: ConstantKind,
    /// Binary name of the referenced class
    pub class_name: &'a str,
    /// Member name
    pub name: &'a str,
    /// Member descriptor as written at the reference site
    pub descriptor: &'a str,
}

/// A class's constant pool with its per-entry resolution cache.
pub struct ConstantPool {
    entries: Vec<Constant>,
    cache: RwLock<Vec<Option<Cached>>>,
}

fn format_error(index: u16, expected: &str) -> ErrorResult {
    ErrorResult::new(
        "java/lang/ClassFormatError",
        format!("constant pool entry #{} is not a valid {}", index, expected),
    )
}

impl ConstantPool {
    /// Wrap a list of entries (index 0 must be [`Constant::Unusable`])
    pub fn new(entries: Vec<Constant>) -> Self {
        let cache = RwLock::new(vec![None; entries.len()]);
        Self { entries, cache }
    }

    /// Number of slots, including index 0
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for a pool with no usable entries
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Symbolic entry at `index`
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    /// Kind tag of the entry at `index`
    pub fn kind(&self, index: u16) -> Option<ConstantKind> {
        self.get(index).map(Constant::kind)
    }

    /// Text of a Utf8 entry
    pub fn utf8(&self, index: u16) -> Result<&str, ErrorResult> {
        match self.get(index) {
            Some(Constant::Utf8(text)) => Ok(text),
            _ => Err(format_error(index, "Utf8")),
        }
    }

    /// Binary name referenced by a Class entry
    pub fn class_name(&self, index: u16) -> Result<&str, ErrorResult> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => self.utf8(*name_index),
            _ => Err(format_error(index, "Class")),
        }
    }

    /// Name and descriptor of a NameAndType entry
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ErrorResult> {
        match self.get(index) {
            Some(Constant::NameAndType {
                name_index,
                descriptor_index,
            }) => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(format_error(index, "NameAndType")),
        }
    }

    /// Symbolic class, name and descriptor of a member reference
    pub fn member(&self, index: u16) -> Result<MemberSymbol<'_>, ErrorResult> {
        let (kind, class_index, nat_index) = match self.get(index) {
            Some(Constant::Fieldref {
                class_index,
                name_and_type_index,
            }) => (ConstantKind::Fieldref, *class_index, *name_and_type_index),
            Some(Constant::Methodref {
                class_index,
                name_and_type_index,
            }) => (ConstantKind::Methodref, *class_index, *name_and_type_index),
            Some(Constant::InterfaceMethodref {
                class_index,
                name_and_type_index,
            }) => (
                ConstantKind::InterfaceMethodref,
                *class_index,
                *name_and_type_index,
            ),
            _ => return Err(format_error(index, "member reference")),
        };
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberSymbol {
            kind,
            class_name: self.class_name(class_index)?,
            name,
            descriptor,
        })
    }

    /// Previously memoized outcome for `index`
    pub fn cached(&self, index: u16) -> Option<VmResult<ResolvedConstant>> {
        let cache = self.cache.read();
        match cache.get(index as usize)? {
            Some(Cached::Resolved(value)) => Some(VmResult::Success(value.clone())),
            Some(Cached::Failed(err)) => Some(VmResult::Error(err.clone())),
            None => None,
        }
    }

    /// Memoize a successful resolution.
    ///
    /// The first stored value wins; later stores return the existing one.
    pub fn store(&self, index: u16, value: ResolvedConstant) -> ResolvedConstant {
        let mut cache = self.cache.write();
        let Some(slot) = cache.get_mut(index as usize) else {
            return value;
        };
        match slot {
            Some(Cached::Resolved(existing)) => existing.clone(),
            Some(Cached::Failed(_)) => value,
            None => {
                *slot = Some(Cached::Resolved(value.clone()));
                value
            }
        }
    }

    /// Memoize a linkage failure
    pub fn store_error(&self, index: u16, error: ErrorResult) {
        let mut cache = self.cache.write();
        if let Some(slot) = cache.get_mut(index as usize) {
            if slot.is_none() {
                *slot = Some(Cached::Failed(error));
            }
        }
    }

    /// Memoize the outcome of a resolution step, never caching `Defer`
    pub(crate) fn remember(&self, index: u16, result: VmResult<ResolvedConstant>) -> VmResult<ResolvedConstant> {
        match result {
            VmResult::Success(value) => VmResult::Success(self.store(index, value)),
            VmResult::Error(err) => {
                self.store_error(index, err.clone());
                VmResult::Error(err)
            }
            VmResult::Defer => VmResult::Defer,
        }
    }
}

impl fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantPool")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Assembles constant pool entries, deduplicating identical ones.
///
/// # Examples
///
/// ```
/// use class_model::{Constant, ConstantPoolBuilder};
///
/// let mut pool = ConstantPoolBuilder::new();
/// let a = pool.methodref("demo/A", "run", "()V");
/// let b = pool.methodref("demo/A", "run", "()V");
/// assert_eq!(a, b);
///
/// let long = pool.long(5);
/// let after = pool.integer(1);
/// assert_eq!(after, long + 2);
///
/// let entries = pool.build();
/// assert_eq!(entries[0], Constant::Unusable);
/// ```
#[derive(Debug, Clone)]
pub struct ConstantPoolBuilder {
    entries: Vec<Constant>,
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPoolBuilder {
    /// Start a pool containing only the unusable slot 0
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }

    fn add(&mut self, constant: Constant) -> u16 {
        if let Some(pos) = self.entries.iter().position(|c| *c == constant) {
            if pos != 0 {
                return pos as u16;
            }
        }
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        self.entries.push(constant);
        let index = (self.entries.len() - 1) as u16;
        if wide {
            self.entries.push(Constant::Unusable);
        }
        index
    }

    /// `CONSTANT_Utf8`
    pub fn utf8(&mut self, text: &str) -> u16 {
        self.add(Constant::Utf8(text.to_string()))
    }

    /// `CONSTANT_Integer`
    pub fn integer(&mut self, value: i32) -> u16 {
        self.add(Constant::Integer(value))
    }

    /// `CONSTANT_Float`
    pub fn float(&mut self, value: f32) -> u16 {
        self.add(Constant::Float(value))
    }

    /// `CONSTANT_Long`, occupying two slots
    pub fn long(&mut self, value: i64) -> u16 {
        self.add(Constant::Long(value))
    }

    /// `CONSTANT_Double`, occupying two slots
    pub fn double(&mut self, value: f64) -> u16 {
        self.add(Constant::Double(value))
    }

    /// `CONSTANT_String`
    pub fn string(&mut self, text: &str) -> u16 {
        let string_index = self.utf8(text);
        self.add(Constant::String { string_index })
    }

    /// `CONSTANT_Class`
    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.add(Constant::Class { name_index })
    }

    /// `CONSTANT_NameAndType`
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.add(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// `CONSTANT_Fieldref`
    pub fn fieldref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.add(Constant::Fieldref {
            class_index,
            name_and_type_index,
        })
    }

    /// `CONSTANT_Methodref`
    pub fn methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.add(Constant::Methodref {
            class_index,
            name_and_type_index,
        })
    }

    /// `CONSTANT_InterfaceMethodref`
    pub fn interface_methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.add(Constant::InterfaceMethodref {
            class_index,
            name_and_type_index,
        })
    }

    /// `CONSTANT_MethodType`
    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor_index = self.utf8(descriptor);
        self.add(Constant::MethodType { descriptor_index })
    }

    /// `CONSTANT_MethodHandle`
    pub fn method_handle(&mut self, reference_kind: ReferenceKind, reference_index: u16) -> u16 {
        self.add(Constant::MethodHandle {
            reference_kind,
            reference_index,
        })
    }

    /// `CONSTANT_InvokeDynamic`
    pub fn invoke_dynamic(&mut self, bootstrap_method_attr_index: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.add(Constant::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    /// Finish, yielding the entries
    pub fn build(self) -> Vec<Constant> {
        self.entries
    }
}
