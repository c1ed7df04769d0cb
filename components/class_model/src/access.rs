//! Access flags shared by classes, fields and methods.

use std::fmt;

/// `public`
pub const ACC_PUBLIC: u16 = 0x0001;
/// `private`
pub const ACC_PRIVATE: u16 = 0x0002;
/// `protected`
pub const ACC_PROTECTED: u16 = 0x0004;
/// `static`
pub const ACC_STATIC: u16 = 0x0008;
/// `final`
pub const ACC_FINAL: u16 = 0x0010;
/// `synchronized` on methods
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
/// `super` on classes (shares the bit with `synchronized`)
pub const ACC_SUPER: u16 = 0x0020;
/// `volatile` on fields
pub const ACC_VOLATILE: u16 = 0x0040;
/// Compiler-generated bridge method
pub const ACC_BRIDGE: u16 = 0x0040;
/// `transient` on fields
pub const ACC_TRANSIENT: u16 = 0x0080;
/// Variable arity method
pub const ACC_VARARGS: u16 = 0x0080;
/// `native`
pub const ACC_NATIVE: u16 = 0x0100;
/// Interface type
pub const ACC_INTERFACE: u16 = 0x0200;
/// `abstract`
pub const ACC_ABSTRACT: u16 = 0x0400;
/// `strictfp`
pub const ACC_STRICT: u16 = 0x0800;
/// Not present in source
pub const ACC_SYNTHETIC: u16 = 0x1000;
/// Annotation interface
pub const ACC_ANNOTATION: u16 = 0x2000;
/// Enum type or constant
pub const ACC_ENUM: u16 = 0x4000;

/// A set of access flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    /// Check for all bits of `flag`
    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    /// `public`
    pub fn is_public(self) -> bool {
        self.contains(ACC_PUBLIC)
    }

    /// `private`
    pub fn is_private(self) -> bool {
        self.contains(ACC_PRIVATE)
    }

    /// `protected`
    pub fn is_protected(self) -> bool {
        self.contains(ACC_PROTECTED)
    }

    /// Neither public, private nor protected
    pub fn is_package_private(self) -> bool {
        self.0 & (ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED) == 0
    }

    /// `static`
    pub fn is_static(self) -> bool {
        self.contains(ACC_STATIC)
    }

    /// `final`
    pub fn is_final(self) -> bool {
        self.contains(ACC_FINAL)
    }

    /// `synchronized`
    pub fn is_synchronized(self) -> bool {
        self.contains(ACC_SYNCHRONIZED)
    }

    /// `native`
    pub fn is_native(self) -> bool {
        self.contains(ACC_NATIVE)
    }

    /// `abstract`
    pub fn is_abstract(self) -> bool {
        self.contains(ACC_ABSTRACT)
    }

    /// Interface type
    pub fn is_interface(self) -> bool {
        self.contains(ACC_INTERFACE)
    }

    /// Variable arity
    pub fn is_varargs(self) -> bool {
        self.contains(ACC_VARARGS)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessFlags(0x{:04x})", self.0)
    }
}
