//! Field and method descriptor parsing.
//!
//! Descriptors use the class-file grammar: `I`, `J`, `Ljava/lang/String;`,
//! `[[D`, and `(IJ)V` for methods.

use crate::error::VmError;
use std::fmt;

/// A field type as described by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `D`
    Double,
    /// `F`
    Float,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `S`
    Short,
    /// `Z`
    Boolean,
    /// `V`, only valid as a method return type
    Void,
    /// `Lname;`
    Reference(String),
    /// `[component`
    Array(Box<JavaType>),
}

impl JavaType {
    /// Parse a complete field descriptor
    pub fn parse(descriptor: &str) -> Result<JavaType, VmError> {
        let (ty, rest) = Self::parse_prefix(descriptor)?;
        if !rest.is_empty() {
            return Err(VmError::InvalidDescriptor(descriptor.to_string()));
        }
        Ok(ty)
    }

    /// Parse one type from the start of `input`, returning the remainder
    fn parse_prefix(input: &str) -> Result<(JavaType, &str), VmError> {
        let invalid = || VmError::InvalidDescriptor(input.to_string());
        let first = input.chars().next().ok_or_else(invalid)?;
        let rest = &input[first.len_utf8()..];
        let ty = match first {
            'B' => JavaType::Byte,
            'C' => JavaType::Char,
            'D' => JavaType::Double,
            'F' => JavaType::Float,
            'I' => JavaType::Int,
            'J' => JavaType::Long,
            'S' => JavaType::Short,
            'Z' => JavaType::Boolean,
            'V' => JavaType::Void,
            'L' => {
                let end = rest.find(';').ok_or_else(invalid)?;
                if end == 0 {
                    return Err(invalid());
                }
                return Ok((JavaType::Reference(rest[..end].to_string()), &rest[end + 1..]));
            }
            '[' => {
                let (component, rest) = Self::parse_prefix(rest)?;
                if component == JavaType::Void {
                    return Err(invalid());
                }
                return Ok((JavaType::Array(Box::new(component)), rest));
            }
            _ => return Err(invalid()),
        };
        Ok((ty, rest))
    }

    /// Number of slots a value of this type occupies (0 for void)
    pub fn slots(&self) -> usize {
        match self {
            JavaType::Void => 0,
            JavaType::Long | JavaType::Double => 2,
            _ => 1,
        }
    }

    /// Check for long or double
    pub fn is_wide(&self) -> bool {
        self.slots() == 2
    }

    /// Check for reference or array types
    pub fn is_reference(&self) -> bool {
        matches!(self, JavaType::Reference(_) | JavaType::Array(_))
    }

    /// Render back into descriptor form
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Name of the class that represents this type.
    ///
    /// Primitive types map to their keyword (`int`), references to their binary
    /// name, arrays to their descriptor (`[I`, `[Ljava/lang/String;`).
    pub fn class_name(&self) -> String {
        match self {
            JavaType::Reference(name) => name.clone(),
            JavaType::Array(_) => self.descriptor(),
            primitive => primitive.primitive_name().unwrap_or("void").to_string(),
        }
    }

    /// Keyword of a primitive type
    pub fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            JavaType::Byte => "byte",
            JavaType::Char => "char",
            JavaType::Double => "double",
            JavaType::Float => "float",
            JavaType::Int => "int",
            JavaType::Long => "long",
            JavaType::Short => "short",
            JavaType::Boolean => "boolean",
            JavaType::Void => "void",
            _ => return None,
        })
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Byte => write!(f, "B"),
            JavaType::Char => write!(f, "C"),
            JavaType::Double => write!(f, "D"),
            JavaType::Float => write!(f, "F"),
            JavaType::Int => write!(f, "I"),
            JavaType::Long => write!(f, "J"),
            JavaType::Short => write!(f, "S"),
            JavaType::Boolean => write!(f, "Z"),
            JavaType::Void => write!(f, "V"),
            JavaType::Reference(name) => write!(f, "L{};", name),
            JavaType::Array(component) => write!(f, "[{}", component),
        }
    }
}

/// Parameter and return types of a method.
///
/// # Examples
///
/// ```
/// use core_types::{JavaType, MethodDescriptor};
///
/// let desc = MethodDescriptor::parse("(IJLjava/lang/String;)D").unwrap();
/// assert_eq!(desc.params.len(), 3);
/// assert_eq!(desc.param_slots(), 4);
/// assert_eq!(desc.ret, JavaType::Double);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter types in declaration order
    pub params: Vec<JavaType>,
    /// Return type, `Void` for none
    pub ret: JavaType,
}

impl MethodDescriptor {
    /// Parse a method descriptor
    pub fn parse(descriptor: &str) -> Result<MethodDescriptor, VmError> {
        let invalid = || VmError::InvalidDescriptor(descriptor.to_string());
        let mut rest = descriptor.strip_prefix('(').ok_or_else(invalid)?;
        let mut params = Vec::new();
        while !rest.starts_with(')') {
            let (ty, next) = JavaType::parse_prefix(rest).map_err(|_| invalid())?;
            if ty == JavaType::Void {
                return Err(invalid());
            }
            params.push(ty);
            rest = next;
        }
        let ret = JavaType::parse(&rest[1..]).map_err(|_| invalid())?;
        Ok(MethodDescriptor { params, ret })
    }

    /// Total argument slots, excluding the receiver
    pub fn param_slots(&self) -> usize {
        self.params.iter().map(JavaType::slots).sum()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.ret)
    }
}
