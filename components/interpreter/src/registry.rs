//! Host implementations of methods, keyed by class and signature.

use crate::frame::NativeMethod;
use std::collections::HashMap;

fn key(class: &str, signature: &str) -> String {
    format!("{}.{}", class, signature)
}

/// Implementations for methods declared `native`.
///
/// # Examples
///
/// ```
/// use interpreter::{NativeRegistry, Thread};
/// use core_types::{Value, VmError};
///
/// fn answer(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
///     thread.return_frame(Some(Value::Int(42)))
/// }
///
/// let mut natives = NativeRegistry::new();
/// natives.register("demo/Host", "answer()I", answer);
/// assert!(natives.get("demo/Host", "answer()I").is_some());
/// assert!(natives.get("demo/Host", "answer()J").is_none());
/// ```
#[derive(Default, Clone)]
pub struct NativeRegistry {
    table: HashMap<String, NativeMethod>,
}

impl NativeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `class.signature` to `native`, replacing any earlier binding
    pub fn register(&mut self, class: &str, signature: &str, native: NativeMethod) {
        self.table.insert(key(class, signature), native);
    }

    /// Implementation bound to `class.signature`
    pub fn get(&self, class: &str, signature: &str) -> Option<NativeMethod> {
        self.table.get(&key(class, signature)).copied()
    }

    /// Copy every binding of `other` over this registry
    pub fn merge(&mut self, other: NativeRegistry) {
        self.table.extend(other.table);
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check for an empty registry
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("bindings", &self.table.len())
            .finish()
    }
}

/// Host overrides consulted before a method's own body.
///
/// An intrinsic replaces bytecode or native code alike when a frame is built
/// for the method.
#[derive(Default, Clone)]
pub struct IntrinsicRegistry {
    table: HashMap<String, NativeMethod>,
}

impl IntrinsicRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Override `class.signature` with `intrinsic`
    pub fn register(&mut self, class: &str, signature: &str, intrinsic: NativeMethod) {
        self.table.insert(key(class, signature), intrinsic);
    }

    /// Override for `class.signature`
    pub fn get(&self, class: &str, signature: &str) -> Option<NativeMethod> {
        self.table.get(&key(class, signature)).copied()
    }

    /// Copy every override of `other` over this registry
    pub fn merge(&mut self, other: IntrinsicRegistry) {
        self.table.extend(other.table);
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check for an empty registry
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl std::fmt::Debug for IntrinsicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrinsicRegistry")
            .field("overrides", &self.table.len())
            .finish()
    }
}
