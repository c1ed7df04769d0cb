//! Loaded classes: identity, hierarchy, member tables, access control and
//! the one-time initialization state machine.

use crate::access::{AccessFlags, ACC_ABSTRACT, ACC_FINAL, ACC_PUBLIC};
use crate::constant_pool::ConstantPool;
use crate::definition::{BootstrapMethod, ClassDefinition};
use crate::loader::LoadError;
use crate::member::{field_key, Field, FieldRef, Method, MethodRef};
use core_types::{ErrorResult, JavaType, ObjectRef, ThreadId, VmResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What kind of type a class represents.
pub enum ClassKind {
    /// Ordinary class or interface
    Reference,
    /// Array type with its component class
    Array {
        /// Element class
        component: Arc<ClassData>,
    },
    /// Primitive type such as `int`
    Primitive(JavaType),
}

/// Static initialization progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// `<clinit>` has not started
    Uninitialized,
    /// `<clinit>` is running on the given thread
    Initializing(ThreadId),
    /// Initialization completed
    Initialized,
    /// `<clinit>` threw; the class is unusable
    Failed,
}

/// Outcome of asking a class to start initialization.
#[derive(Debug)]
pub enum InitAction {
    /// Nothing to do; the class may be used
    Ready,
    /// Another thread is initializing; retry later
    Defer,
    /// Run this `<clinit>` now; the caller reports completion
    RunInitializer(MethodRef),
    /// Initialization failed earlier
    Failed(ErrorResult),
}

/// An instance field slot in the object layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceField {
    /// Object field-map key
    pub key: String,
    /// Field type
    pub java_type: JavaType,
}

/// A loaded class, interface, array type or primitive type.
pub struct ClassData {
    name: String,
    kind: ClassKind,
    access: AccessFlags,
    superclass: Option<Arc<ClassData>>,
    interfaces: Vec<Arc<ClassData>>,
    constant_pool: ConstantPool,
    fields: Vec<Arc<Field>>,
    methods: Vec<Arc<Method>>,
    method_index: HashMap<String, usize>,
    instance_fields: Vec<InstanceField>,
    nest_host: Option<String>,
    bootstrap_methods: Vec<BootstrapMethod>,
    state: Mutex<InitState>,
    mirror: Mutex<Option<ObjectRef>>,
}

impl ClassData {
    /// Build a reference class from its definition and already-loaded supertypes
    pub fn from_definition(
        def: ClassDefinition,
        superclass: Option<Arc<ClassData>>,
        interfaces: Vec<Arc<ClassData>>,
    ) -> Result<ClassData, LoadError> {
        let invalid = |source| LoadError::InvalidMember {
            class: def.name.clone(),
            source,
        };

        let mut fields = Vec::with_capacity(def.fields.len());
        for f in &def.fields {
            let field = Field::new(
                &f.name,
                &f.descriptor,
                AccessFlags(f.access_flags),
                f.constant_value,
            )
            .map_err(invalid)?;
            fields.push(Arc::new(field));
        }

        let mut methods = Vec::with_capacity(def.methods.len());
        let mut method_index = HashMap::new();
        for m in &def.methods {
            let method = Method::new(&m.name, &m.descriptor, AccessFlags(m.access_flags), m.code.clone())
                .map_err(invalid)?;
            method_index.insert(method.signature(), methods.len());
            methods.push(Arc::new(method));
        }

        // Layout: inherited slots first, then interface slots, then own.
        let mut instance_fields: Vec<InstanceField> = Vec::new();
        let inherited = superclass
            .iter()
            .chain(interfaces.iter())
            .flat_map(|c| c.instance_fields.iter());
        for slot in inherited {
            if !instance_fields.iter().any(|s| s.key == slot.key) {
                instance_fields.push(slot.clone());
            }
        }
        for field in fields.iter().filter(|f| !f.access().is_static()) {
            instance_fields.push(InstanceField {
                key: field_key(&def.name, field.name(), field.descriptor()),
                java_type: field.java_type().clone(),
            });
        }

        Ok(ClassData {
            kind: ClassKind::Reference,
            access: AccessFlags(def.access_flags),
            superclass,
            interfaces,
            constant_pool: ConstantPool::new(def.constant_pool),
            fields,
            methods,
            method_index,
            instance_fields,
            nest_host: def.nest_host,
            bootstrap_methods: def.bootstrap_methods,
            state: Mutex::new(InitState::Uninitialized),
            mirror: Mutex::new(None),
            name: def.name,
        })
    }

    /// Build an array class such as `[I` or `[Ljava/lang/String;`
    pub fn array(
        name: &str,
        component: Arc<ClassData>,
        object: Arc<ClassData>,
        interfaces: Vec<Arc<ClassData>>,
    ) -> ClassData {
        let visibility = component.access.0 & ACC_PUBLIC;
        ClassData {
            name: name.to_string(),
            kind: ClassKind::Array { component },
            access: AccessFlags(visibility | ACC_FINAL | ACC_ABSTRACT),
            superclass: Some(object),
            interfaces,
            constant_pool: ConstantPool::new(Vec::new()),
            fields: Vec::new(),
            methods: Vec::new(),
            method_index: HashMap::new(),
            instance_fields: Vec::new(),
            nest_host: None,
            bootstrap_methods: Vec::new(),
            state: Mutex::new(InitState::Initialized),
            mirror: Mutex::new(None),
        }
    }

    /// Build the class of a primitive type
    pub fn primitive(ty: JavaType) -> ClassData {
        ClassData {
            name: ty.class_name(),
            kind: ClassKind::Primitive(ty),
            access: AccessFlags(ACC_PUBLIC | ACC_FINAL | ACC_ABSTRACT),
            superclass: None,
            interfaces: Vec::new(),
            constant_pool: ConstantPool::new(Vec::new()),
            fields: Vec::new(),
            methods: Vec::new(),
            method_index: HashMap::new(),
            instance_fields: Vec::new(),
            nest_host: None,
            bootstrap_methods: Vec::new(),
            state: Mutex::new(InitState::Initialized),
            mirror: Mutex::new(None),
        }
    }

    /// Binary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference, array or primitive
    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    /// Class access flags
    pub fn access(&self) -> AccessFlags {
        self.access
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<&Arc<ClassData>> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[Arc<ClassData>] {
        &self.interfaces
    }

    /// Constant pool
    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    /// Declared fields
    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    /// Declared methods
    pub fn methods(&self) -> &[Arc<Method>] {
        &self.methods
    }

    /// Object layout including inherited instance fields
    pub fn instance_fields(&self) -> &[InstanceField] {
        &self.instance_fields
    }

    /// `BootstrapMethods` entries
    pub fn bootstrap_methods(&self) -> &[BootstrapMethod] {
        &self.bootstrap_methods
    }

    /// Interface type
    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    /// Abstract class or interface
    pub fn is_abstract(&self) -> bool {
        self.access.is_abstract()
    }

    /// Array type
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array { .. })
    }

    /// Primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ClassKind::Primitive(_))
    }

    /// Component class of an array type
    pub fn component(&self) -> Option<&Arc<ClassData>> {
        match &self.kind {
            ClassKind::Array { component } => Some(component),
            _ => None,
        }
    }

    /// Runtime package: everything before the last `/`
    pub fn package_name(&self) -> &str {
        match &self.kind {
            ClassKind::Array { component } => component.package_name(),
            _ => self.name.rfind('/').map(|i| &self.name[..i]).unwrap_or(""),
        }
    }

    /// Nest host name, defaulting to the class itself
    pub fn nest_host(&self) -> &str {
        self.nest_host.as_deref().unwrap_or(&self.name)
    }

    /// Declared method by `name + descriptor`
    pub fn get_method(&self, signature: &str) -> Option<Arc<Method>> {
        self.method_index
            .get(signature)
            .and_then(|&i| self.methods.get(i))
            .cloned()
    }

    /// Declared field by name and descriptor
    pub fn get_field(&self, name: &str, descriptor: &str) -> Option<Arc<Field>> {
        self.fields
            .iter()
            .find(|f| f.name() == name && f.descriptor() == descriptor)
            .cloned()
    }

    /// Cached `java/lang/Class` mirror
    pub fn mirror(&self) -> Option<ObjectRef> {
        *self.mirror.lock()
    }

    /// Record the mirror, keeping an existing one
    pub fn set_mirror(&self, mirror: ObjectRef) -> ObjectRef {
        *self.mirror.lock().get_or_insert(mirror)
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// Same class, or `other` is a superclass
    pub fn is_subclass_of(&self, other: &ClassData) -> bool {
        if self.name == other.name {
            return true;
        }
        let mut current = self.superclass.as_ref();
        while let Some(class) = current {
            if class.name == other.name {
                return true;
            }
            current = class.superclass.as_ref();
        }
        false
    }

    /// Check if `iface` is among the (transitive) superinterfaces
    pub fn implements(&self, iface: &ClassData) -> bool {
        self.interfaces
            .iter()
            .any(|i| i.name == iface.name || i.implements(iface))
            || self
                .superclass
                .as_ref()
                .map_or(false, |s| s.implements(iface))
    }

    /// Assignment compatibility, as used by `checkcast`, `instanceof` and catch matching
    pub fn check_cast(&self, target: &ClassData) -> bool {
        if self.name == target.name {
            return true;
        }
        if let ClassKind::Array { component } = &self.kind {
            return match &target.kind {
                ClassKind::Array {
                    component: target_component,
                } => {
                    if component.is_primitive() || target_component.is_primitive() {
                        component.name == target_component.name
                    } else {
                        component.check_cast(target_component)
                    }
                }
                _ => matches!(
                    target.name.as_str(),
                    "java/lang/Object" | "java/lang/Cloneable" | "java/io/Serializable"
                ),
            };
        }
        if self.is_primitive() || target.is_primitive() {
            return false;
        }
        if target.is_interface() {
            return self.implements(target);
        }
        if self.is_interface() {
            return target.name == "java/lang/Object";
        }
        self.is_subclass_of(target)
    }

    /// Every superinterface of this class and its superclasses, without duplicates
    fn all_superinterfaces(&self) -> Vec<Arc<ClassData>> {
        let mut out: Vec<Arc<ClassData>> = Vec::new();
        let mut pending: Vec<Arc<ClassData>> = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            pending.extend(class.interfaces.iter().cloned());
            current = class.superclass.as_deref();
        }
        while let Some(iface) = pending.pop() {
            if out.iter().any(|i| i.name == iface.name) {
                continue;
            }
            pending.extend(iface.interfaces.iter().cloned());
            out.push(iface);
        }
        out
    }

    /// Maximally-specific superinterface methods matching `signature`
    fn maximally_specific(&self, signature: &str, non_abstract_only: bool) -> Vec<MethodRef> {
        let candidates: Vec<MethodRef> = self
            .all_superinterfaces()
            .into_iter()
            .filter_map(|iface| {
                let method = iface.get_method(signature)?;
                let access = method.access();
                if access.is_static() || access.is_private() {
                    return None;
                }
                if non_abstract_only && access.is_abstract() {
                    return None;
                }
                Some(MethodRef::new(iface, method))
            })
            .collect();
        candidates
            .iter()
            .filter(|m| {
                !candidates
                    .iter()
                    .any(|other| other.class.name != m.class.name && other.class.implements(&m.class))
            })
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Access control
    // ------------------------------------------------------------------

    /// Check if `self` (the accessor) may reference `target`
    pub fn can_access_class(&self, target: &ClassData) -> bool {
        match &target.kind {
            ClassKind::Primitive(_) => true,
            ClassKind::Array { component } => self.can_access_class(component),
            ClassKind::Reference => {
                target.access.is_public() || self.package_name() == target.package_name()
            }
        }
    }

    /// Check if both classes share a nest
    pub fn is_nestmate_of(&self, other: &ClassData) -> bool {
        self.nest_host() == other.nest_host()
    }

    /// Check if `self` (the accessor) may use a member of `declaring` with `flags`
    pub fn can_access_member(&self, declaring: &ClassData, flags: AccessFlags) -> bool {
        if flags.is_public() {
            return true;
        }
        if flags.is_private() {
            return self.name == declaring.name || self.is_nestmate_of(declaring);
        }
        if self.package_name() == declaring.package_name() {
            return true;
        }
        flags.is_protected() && self.is_subclass_of(declaring)
    }

    // ------------------------------------------------------------------
    // Member lookup
    // ------------------------------------------------------------------

    /// Find a method in this class or its superclasses
    pub fn find_method(self: &Arc<Self>, name: &str, descriptor: &str) -> Option<MethodRef> {
        let signature = format!("{}{}", name, descriptor);
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if let Some(method) = class.get_method(&signature) {
                return Some(MethodRef::new(class, method));
            }
            current = class.superclass.clone();
        }
        None
    }

    fn find_signature_polymorphic(self: &Arc<Self>, name: &str) -> Option<MethodRef> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.is_signature_polymorphic(&self.name))
            .map(|m| MethodRef::new(self.clone(), m.clone()))
    }

    fn check_method_access(accessor: &ClassData, found: MethodRef) -> VmResult<MethodRef> {
        if accessor.can_access_member(&found.class, found.method.access()) {
            VmResult::Success(found)
        } else {
            VmResult::error(
                "java/lang/IllegalAccessError",
                format!(
                    "tried to access method {}.{}{} from class {}",
                    found.class.name,
                    found.method.name(),
                    found.method.descriptor(),
                    accessor.name
                ),
            )
        }
    }

    fn no_such_method(&self, name: &str, descriptor: &str) -> ErrorResult {
        ErrorResult::new(
            "java/lang/NoSuchMethodError",
            format!("{}.{}{}", self.name, name, descriptor),
        )
    }

    /// Resolve a class method reference on behalf of `accessor`.
    ///
    /// Searches the class and its superclasses, then the superinterfaces
    /// (preferring a non-abstract method).
    pub fn resolve_method(
        self: &Arc<Self>,
        accessor: &ClassData,
        name: &str,
        descriptor: &str,
    ) -> VmResult<MethodRef> {
        if let Some(poly) = self.find_signature_polymorphic(name) {
            return Self::check_method_access(accessor, poly);
        }
        let found = self.find_method(name, descriptor).or_else(|| {
            let signature = format!("{}{}", name, descriptor);
            let concrete = self.maximally_specific(&signature, true);
            if concrete.len() == 1 {
                return concrete.into_iter().next();
            }
            self.maximally_specific(&signature, false).into_iter().next()
        });
        match found {
            Some(found) => Self::check_method_access(accessor, found),
            None => VmResult::Error(self.no_such_method(name, descriptor)),
        }
    }

    /// Resolve an interface method reference on behalf of `accessor`.
    ///
    /// Searches the interface itself, then the public methods of its
    /// `java/lang/Object` superclass, then superinterfaces.
    pub fn resolve_interface_method(
        self: &Arc<Self>,
        accessor: &ClassData,
        name: &str,
        descriptor: &str,
    ) -> VmResult<MethodRef> {
        let signature = format!("{}{}", name, descriptor);
        let found = self
            .get_method(&signature)
            .map(|m| MethodRef::new(self.clone(), m))
            .or_else(|| {
                let object = self.superclass.as_ref()?;
                let method = object.get_method(&signature)?;
                let access = method.access();
                (access.is_public() && !access.is_static()).then(|| MethodRef::new(object.clone(), method))
            })
            .or_else(|| {
                let concrete = self.maximally_specific(&signature, true);
                if concrete.len() == 1 {
                    return concrete.into_iter().next();
                }
                self.maximally_specific(&signature, false).into_iter().next()
            });
        match found {
            Some(found) => Self::check_method_access(accessor, found),
            None => VmResult::Error(self.no_such_method(name, descriptor)),
        }
    }

    /// Resolve a field: own fields, then superinterfaces, then the superclass
    pub fn resolve_field(self: &Arc<Self>, name: &str, descriptor: &str) -> VmResult<FieldRef> {
        match self.find_field(name, descriptor) {
            Some(found) => VmResult::Success(found),
            None => VmResult::error(
                "java/lang/NoSuchFieldError",
                format!("{}.{} {}", self.name, name, descriptor),
            ),
        }
    }

    fn find_field(self: &Arc<Self>, name: &str, descriptor: &str) -> Option<FieldRef> {
        if let Some(field) = self.get_field(name, descriptor) {
            return Some(FieldRef::new(self.clone(), field));
        }
        for iface in &self.interfaces {
            if let Some(found) = iface.find_field(name, descriptor) {
                return Some(found);
            }
        }
        self.superclass
            .as_ref()
            .and_then(|s| s.find_field(name, descriptor))
    }

    /// Check whether `candidate`, declared in a subclass, overrides `resolved`
    fn overrides(candidate: &MethodRef, resolved: &MethodRef) -> bool {
        if candidate.same_as(resolved) {
            return true;
        }
        let access = resolved.method.access();
        if access.is_private() {
            return false;
        }
        if access.is_public() || access.is_protected() {
            return true;
        }
        candidate.class.package_name() == resolved.class.package_name()
    }

    /// Select the implementation of `resolved` for a receiver of this runtime class.
    ///
    /// Walks this class and its superclasses for the most-derived override,
    /// then falls back to a unique maximally-specific default method.
    pub fn select_virtual(self: &Arc<Self>, resolved: &MethodRef) -> VmResult<MethodRef> {
        if resolved.method.access().is_private() {
            return VmResult::Success(resolved.clone());
        }
        let signature = resolved.method.signature();
        let abstract_error = || {
            VmResult::error(
                "java/lang/AbstractMethodError",
                format!("{}.{}", self.name, signature),
            )
        };

        let mut current = Some(self.clone());
        while let Some(class) = current {
            if let Some(method) = class.get_method(&signature) {
                let candidate = MethodRef::new(class.clone(), method);
                if !candidate.method.is_static() && Self::overrides(&candidate, resolved) {
                    if candidate.method.is_abstract() {
                        return abstract_error();
                    }
                    return VmResult::Success(candidate);
                }
            }
            current = class.superclass.clone();
        }

        let defaults = self.maximally_specific(&signature, true);
        match defaults.len() {
            1 => defaults.into_iter().next().map_or_else(abstract_error, VmResult::Success),
            0 => abstract_error(),
            _ => VmResult::error(
                "java/lang/IncompatibleClassChangeError",
                format!("Conflicting default methods: {}", signature),
            ),
        }
    }

    /// Interface-call variant of [`ClassData::select_virtual`]: the selected
    /// method must be public.
    pub fn select_interface(self: &Arc<Self>, resolved: &MethodRef) -> VmResult<MethodRef> {
        self.select_virtual(resolved).and_then(|selected| {
            if selected.method.access().is_public() {
                VmResult::Success(selected)
            } else {
                VmResult::error(
                    "java/lang/IllegalAccessError",
                    format!(
                        "{}.{} is not public",
                        selected.class.name,
                        selected.method.signature()
                    ),
                )
            }
        })
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    /// Current initialization state
    pub fn init_state(&self) -> InitState {
        *self.state.lock()
    }

    /// Check whether the class may be used without running `<clinit>`
    pub fn is_initialized(&self) -> bool {
        self.init_state() == InitState::Initialized
    }

    /// Advance the init state machine on behalf of `thread`.
    ///
    /// Superclass initialization is the caller's responsibility. On
    /// [`InitAction::RunInitializer`] the class is marked initializing and the
    /// caller must report the outcome through [`ClassData::finish_initialization`].
    pub fn begin_initialization(self: &Arc<Self>, thread: ThreadId) -> InitAction {
        let mut state = self.state.lock();
        match *state {
            InitState::Initialized => InitAction::Ready,
            InitState::Initializing(owner) if owner == thread => InitAction::Ready,
            InitState::Initializing(_) => InitAction::Defer,
            InitState::Failed => InitAction::Failed(ErrorResult::new(
                "java/lang/NoClassDefFoundError",
                format!("Could not initialize class {}", self.name),
            )),
            InitState::Uninitialized => {
                for field in self.fields.iter().filter(|f| f.access().is_static()) {
                    if let Some(value) = field.constant_value() {
                        field.set_static_value(value);
                    }
                }
                match self.get_method("<clinit>()V") {
                    Some(clinit) => {
                        *state = InitState::Initializing(thread);
                        InitAction::RunInitializer(MethodRef::new(self.clone(), clinit))
                    }
                    None => {
                        *state = InitState::Initialized;
                        InitAction::Ready
                    }
                }
            }
        }
    }

    /// Record the outcome of a `<clinit>` run
    pub fn finish_initialization(&self, succeeded: bool) {
        *self.state.lock() = if succeeded {
            InitState::Initialized
        } else {
            InitState::Failed
        };
    }
}

impl fmt::Debug for ClassData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassData")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field("state", &self.init_state())
            .finish()
    }
}
