//! Memory Manager - object heap and raw memory
//!
//! This component provides:
//! - An arena [`Heap`] of objects and typed arrays addressed by `ObjectRef`
//! - Reentrant, cooperative [`Monitor`]s attached to every heap entry
//! - The [`UnsafeHeap`] bump allocator behind `sun/misc/Unsafe`
//!
//! # Example
//!
//! ```
//! use class_model::{BootstrapLoader, ClassDefinition, ClassLoader};
//! use core_types::Value;
//! use memory_manager::Heap;
//!
//! let loader = BootstrapLoader::new();
//! loader.register(ClassDefinition::new("java/lang/Object"));
//!
//! let mut heap = Heap::new();
//! let ints = heap
//!     .allocate_array(loader.load_class("[I").success().unwrap(), 3)
//!     .unwrap();
//! heap.array_mut(ints).unwrap().set(2, Value::Int(7)).unwrap();
//! assert_eq!(heap.array(ints).unwrap().get(2).unwrap(), Value::Int(7));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod heap;
pub mod monitor;
pub mod object;
pub mod unsafe_heap;

// Re-export main types
pub use array::{ArrayError, ArrayStorage, JvmArray};
pub use heap::{Heap, HeapEntry, HeapStats};
pub use monitor::{EnterOutcome, Monitor, MonitorError, Waiter};
pub use object::{JvmObject, NativeSlot};
pub use unsafe_heap::{UnsafeHeap, UnsafeHeapError};
