//! Class model for the JVM execution engine
//!
//! This crate turns already-parsed class definitions into linked classes and
//! resolves their constant pools on demand.
//!
//! # Features
//!
//! - [`ClassData`] for reference, array and primitive types
//! - Lazily resolved, memoized [`ConstantPool`] entries
//! - Method and field lookup, virtual selection and access control
//! - The one-time static initialization state machine
//! - [`BootstrapLoader`] and a minimal [`skeleton`] class library
//!
//! # Example
//!
//! ```
//! use class_model::{BootstrapLoader, ClassDefinition, ClassLoader, InitAction, ACC_PUBLIC};
//! use core_types::ThreadId;
//!
//! let loader = BootstrapLoader::new();
//! loader.register(ClassDefinition::new("java/lang/Object"));
//! loader.register(
//!     ClassDefinition::new("demo/Counter").field("count", "I", ACC_PUBLIC),
//! );
//!
//! let counter = loader.load_class("demo/Counter").success().unwrap();
//! assert_eq!(counter.instance_fields()[0].key, "demo/Counter.countI");
//! assert!(matches!(counter.begin_initialization(ThreadId(0)), InitAction::Ready));
//! assert!(counter.is_initialized());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod access;
pub mod class;
pub mod constant_pool;
pub mod context;
pub mod definition;
pub mod loader;
pub mod member;
mod resolve;
pub mod skeleton;

// Re-export main types at crate root
pub use access::*;
pub use class::{ClassData, ClassKind, InitAction, InitState, InstanceField};
pub use constant_pool::{
    CallSite, Constant, ConstantKind, ConstantPool, ConstantPoolBuilder, MemberSymbol, ReferenceKind,
    ResolvedConstant,
};
pub use context::{CallSiteRequest, ResolutionContext};
pub use definition::{BootstrapMethod, ClassDefinition, FieldDefinition, MethodDefinition};
pub use loader::{BootstrapLoader, ClassLoader, LoadError};
pub use member::{field_key, Field, FieldRef, Method, MethodRef};
