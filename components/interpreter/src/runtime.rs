//! State shared by every thread of one VM: loader, heap, registries and
//! the wakeup queue.

use crate::config::VmConfig;
use crate::dispatch::DispatchTable;
use crate::frame::NativeMethod;
use crate::registry::{IntrinsicRegistry, NativeRegistry};
use crate::{intrinsics, natives};
use class_model::{skeleton, BootstrapLoader, ClassData, ClassDefinition, ClassLoader, MethodRef};
use core_types::{ObjectRef, ThreadId, Value, VmError, VmResult};
use crossbeam::queue::SegQueue;
use memory_manager::{ArrayStorage, Heap, JvmArray, NativeSlot, UnsafeHeap};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub(crate) const STRING_VALUE: &str = "java/lang/String.value[C";
pub(crate) const THROWABLE_MESSAGE: &str = "java/lang/Throwable.detailMessageLjava/lang/String;";
pub(crate) const HANDLE_TYPE: &str = "java/lang/invoke/MethodHandle.typeLjava/lang/invoke/MethodType;";
pub(crate) const HANDLE_FORM: &str = "java/lang/invoke/MethodHandle.formLjava/lang/invoke/LambdaForm;";
pub(crate) const FORM_VMENTRY: &str = "java/lang/invoke/LambdaForm.vmentryLjava/lang/invoke/MemberName;";
const MEMBER_CLAZZ: &str = "java/lang/invoke/MemberName.clazzLjava/lang/Class;";
const MEMBER_NAME: &str = "java/lang/invoke/MemberName.nameLjava/lang/String;";

/// Native slot linking a `java/lang/Class` mirror to its class
pub(crate) const CLASS_SLOT: &str = "class";
/// Native slot holding a `MethodType`'s descriptor
pub(crate) const DESCRIPTOR_SLOT: &str = "descriptor";
/// Native slot holding the method behind a `MemberName` or direct handle
pub(crate) const VMTARGET_SLOT: &str = "vmtarget";
/// Native slot holding a direct handle's reference kind
pub(crate) const KIND_SLOT: &str = "kind";

/// Shared VM state.
///
/// Locks are held for single accesses only; never keep a guard from
/// [`Runtime::heap`] alive across a call into a [`crate::Thread`].
pub struct Runtime {
    loader: Arc<dyn ClassLoader>,
    heap: Mutex<Heap>,
    unsafe_heap: Mutex<UnsafeHeap>,
    natives: NativeRegistry,
    intrinsics: IntrinsicRegistry,
    strings: Mutex<HashMap<String, ObjectRef>>,
    wakeups: SegQueue<ThreadId>,
    config: VmConfig,
    next_thread: AtomicU32,
    dispatch: DispatchTable,
    started: Instant,
}

impl Runtime {
    /// Start configuring a runtime
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Class loader
    pub fn loader(&self) -> &Arc<dyn ClassLoader> {
        &self.loader
    }

    /// Load a class the VM itself depends on; failure is host-fatal
    pub fn load_class(&self, name: &str) -> Result<Arc<ClassData>, VmError> {
        match self.loader.load_class(name) {
            VmResult::Success(class) => Ok(class),
            _ => Err(VmError::MissingClass(name.to_string())),
        }
    }

    /// Lock the object heap
    pub fn heap(&self) -> MutexGuard<'_, Heap> {
        self.heap.lock()
    }

    /// Lock the raw memory behind `sun/misc/Unsafe`
    pub fn unsafe_heap(&self) -> MutexGuard<'_, UnsafeHeap> {
        self.unsafe_heap.lock()
    }

    /// Native method implementations
    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Intrinsic overrides
    pub fn intrinsics(&self) -> &IntrinsicRegistry {
        &self.intrinsics
    }

    /// Configuration the runtime was built with
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Opcode handler table
    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Time since the runtime was built
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Allocate a thread id
    pub fn next_thread_id(&self) -> ThreadId {
        ThreadId(self.next_thread.fetch_add(1, Ordering::Relaxed))
    }

    // ------------------------------------------------------------------
    // Wakeups
    // ------------------------------------------------------------------

    /// Schedule `thread` to resume; it was just handed a monitor
    pub fn post_wakeup(&self, thread: ThreadId) {
        debug!(thread = %thread, "wakeup posted");
        self.wakeups.push(thread);
    }

    /// Next pending wakeup
    pub fn take_wakeup(&self) -> Option<ThreadId> {
        self.wakeups.pop()
    }

    /// Number of pending wakeups
    pub fn pending_wakeups(&self) -> usize {
        self.wakeups.len()
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Allocate a fresh, non-interned `java/lang/String`
    pub fn new_string(&self, text: &str) -> Result<ObjectRef, VmError> {
        let string_class = self.load_class("java/lang/String")?;
        let char_array = self.load_class("[C")?;
        let mut heap = self.heap.lock();
        let chars = ArrayStorage::Char(text.encode_utf16().collect());
        let value = heap.insert_array(JvmArray::with_storage(char_array, chars));
        let string = heap.allocate_object(string_class);
        heap.object_mut(string)?.set_field(STRING_VALUE, Value::object(value));
        Ok(string)
    }

    /// The canonical string for `text`
    pub fn intern(&self, text: &str) -> Result<ObjectRef, VmError> {
        if let Some(existing) = self.strings.lock().get(text) {
            return Ok(*existing);
        }
        let string = self.new_string(text)?;
        Ok(*self.strings.lock().entry(text.to_string()).or_insert(string))
    }

    /// Make `string` canonical unless an equal string already is
    pub fn intern_object(&self, string: ObjectRef) -> Result<ObjectRef, VmError> {
        let text = self.string_value(string)?;
        Ok(*self.strings.lock().entry(text).or_insert(string))
    }

    /// Host text of a `java/lang/String`
    pub fn string_value(&self, string: ObjectRef) -> Result<String, VmError> {
        let heap = self.heap.lock();
        match heap.object(string)?.get_field(STRING_VALUE) {
            Some(Value::Reference(Some(chars))) => match heap.array(chars)?.storage() {
                ArrayStorage::Char(units) => Ok(String::from_utf16_lossy(units)),
                other => Err(VmError::TypeMismatch {
                    expected: "char",
                    found: other.element_name(),
                }),
            },
            Some(Value::Reference(None)) => Ok(String::new()),
            _ => Err(VmError::InvalidReference(string)),
        }
    }

    // ------------------------------------------------------------------
    // Mirrors and invoke objects
    // ------------------------------------------------------------------

    /// The `java/lang/Class` object for `class`, created on first use
    pub fn mirror(&self, class: &Arc<ClassData>) -> Result<ObjectRef, VmError> {
        if let Some(mirror) = class.mirror() {
            return Ok(mirror);
        }
        let class_class = self.load_class("java/lang/Class")?;
        let mirror = {
            let mut heap = self.heap.lock();
            let mirror = heap.allocate_object(class_class);
            heap.object_mut(mirror)?
                .set_native(CLASS_SLOT, NativeSlot::Class(class.clone()));
            mirror
        };
        Ok(class.set_mirror(mirror))
    }

    /// Class represented by a mirror
    pub fn class_of_mirror(&self, mirror: ObjectRef) -> Result<Arc<ClassData>, VmError> {
        match self.heap.lock().object(mirror)?.native(CLASS_SLOT) {
            Some(NativeSlot::Class(class)) => Ok(class.clone()),
            _ => Err(VmError::InvalidReference(mirror)),
        }
    }

    /// A `java/lang/invoke/MethodType` for a method descriptor
    pub fn new_method_type(&self, descriptor: &str) -> Result<ObjectRef, VmError> {
        let class = self.load_class("java/lang/invoke/MethodType")?;
        let mut heap = self.heap.lock();
        let method_type = heap.allocate_object(class);
        heap.object_mut(method_type)?
            .set_native(DESCRIPTOR_SLOT, NativeSlot::String(Arc::from(descriptor)));
        Ok(method_type)
    }

    /// Descriptor carried by a `MethodType`
    pub fn method_type_descriptor(&self, method_type: ObjectRef) -> Result<String, VmError> {
        match self.heap.lock().object(method_type)?.native(DESCRIPTOR_SLOT) {
            Some(NativeSlot::String(descriptor)) => Ok(descriptor.to_string()),
            _ => Err(VmError::InvalidReference(method_type)),
        }
    }

    /// A `java/lang/invoke/MemberName` whose `vmtarget` is `method`.
    ///
    /// Hosts use this from `MethodHandleNatives.linkCallSite` and when
    /// building lambda forms.
    pub fn new_member_name(&self, method: &MethodRef) -> Result<ObjectRef, VmError> {
        let class = self.load_class("java/lang/invoke/MemberName")?;
        let owner = self.mirror(&method.class)?;
        let name = self.intern(method.method.name())?;
        let mut heap = self.heap.lock();
        let member = heap.allocate_object(class);
        let object = heap.object_mut(member)?;
        object.set_field(MEMBER_CLAZZ, Value::object(owner));
        object.set_field(MEMBER_NAME, Value::object(name));
        object.set_native(VMTARGET_SLOT, NativeSlot::Method(method.clone()));
        Ok(member)
    }

    /// Method behind a `MemberName` or direct handle
    pub fn member_target(&self, member: ObjectRef) -> Result<Option<MethodRef>, VmError> {
        match self.heap.lock().object(member)?.native(VMTARGET_SLOT) {
            Some(NativeSlot::Method(method)) => Ok(Some(method.clone())),
            _ => Ok(None),
        }
    }

    /// An `Object[]`-style array of `element` holding `values`
    pub fn new_reference_array(&self, element: &str, values: &[Option<ObjectRef>]) -> Result<ObjectRef, VmError> {
        let class = self.load_class(&format!("[L{};", element))?;
        let array = JvmArray::with_storage(class, ArrayStorage::Reference(values.to_vec()));
        Ok(self.heap.lock().insert_array(array))
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("heap", &self.heap.lock().stats())
            .field("natives", &self.natives)
            .field("intrinsics", &self.intrinsics)
            .field("pending_wakeups", &self.wakeups.len())
            .finish()
    }
}

/// Assembles a [`Runtime`].
///
/// # Examples
///
/// ```
/// use class_model::ClassDefinition;
/// use interpreter::{RuntimeBuilder, VmConfig};
///
/// let runtime = RuntimeBuilder::new()
///     .config(VmConfig { quantum: 10, ..VmConfig::default() })
///     .class(ClassDefinition::new("demo/Empty"))
///     .build();
///
/// assert_eq!(runtime.config().quantum, 10);
/// assert!(runtime.loader().load_class("demo/Empty").is_success());
/// assert!(runtime.natives().get("java/lang/Object", "hashCode()I").is_some());
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    config: VmConfig,
    loader: Option<Arc<dyn ClassLoader>>,
    classes: Vec<ClassDefinition>,
    natives: NativeRegistry,
    intrinsics: IntrinsicRegistry,
}

impl RuntimeBuilder {
    /// Builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration
    pub fn config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom loader instead of the built-in bootstrap loader
    pub fn loader(mut self, loader: Arc<dyn ClassLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Register a class with the bootstrap loader
    pub fn class(mut self, definition: ClassDefinition) -> Self {
        self.classes.push(definition);
        self
    }

    /// Register several classes with the bootstrap loader
    pub fn classes(mut self, definitions: impl IntoIterator<Item = ClassDefinition>) -> Self {
        self.classes.extend(definitions);
        self
    }

    /// Bind a native method; overrides a built-in with the same key
    pub fn native(mut self, class: &str, signature: &str, native: NativeMethod) -> Self {
        self.natives.register(class, signature, native);
        self
    }

    /// Install an intrinsic override
    pub fn intrinsic(mut self, class: &str, signature: &str, intrinsic: NativeMethod) -> Self {
        self.intrinsics.register(class, signature, intrinsic);
        self
    }

    /// Finish the runtime
    pub fn build(self) -> Arc<Runtime> {
        let loader: Arc<dyn ClassLoader> = match self.loader {
            Some(loader) => {
                if !self.classes.is_empty() {
                    warn!(count = self.classes.len(), "class definitions ignored by custom loader");
                }
                loader
            }
            None => {
                let bootstrap = BootstrapLoader::new();
                if self.config.preload_core_classes {
                    bootstrap.register_all(skeleton::core_classes());
                }
                bootstrap.register_all(self.classes);
                Arc::new(bootstrap)
            }
        };

        let mut native_table = NativeRegistry::new();
        let mut intrinsic_table = IntrinsicRegistry::new();
        if self.config.install_builtin_natives {
            natives::register_builtins(&mut native_table);
            intrinsics::register_builtins(&mut intrinsic_table);
        }
        native_table.merge(self.natives);
        intrinsic_table.merge(self.intrinsics);
        debug!(
            natives = native_table.len(),
            intrinsics = intrinsic_table.len(),
            "runtime built"
        );

        Arc::new(Runtime {
            loader,
            heap: Mutex::new(Heap::new()),
            unsafe_heap: Mutex::new(UnsafeHeap::new()),
            natives: native_table,
            intrinsics: intrinsic_table,
            strings: Mutex::new(HashMap::new()),
            wakeups: SegQueue::new(),
            config: self.config,
            next_thread: AtomicU32::new(0),
            dispatch: DispatchTable::new(),
            started: Instant::now(),
        })
    }
}
