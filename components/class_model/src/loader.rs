//! Class loading from registered definitions.

use crate::class::ClassData;
use crate::definition::ClassDefinition;
use core_types::{ErrorResult, JavaType, VmError, VmResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Why a class could not be loaded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// No definition is registered under this name
    #[error("class {0} not found")]
    NotFound(String),

    /// A field or method declaration is malformed
    #[error("invalid member in {class}: {source}")]
    InvalidMember {
        /// Class being loaded
        class: String,
        /// Underlying descriptor error
        source: VmError,
    },

    /// The declared superclass is an interface
    #[error("class {class} has interface {superclass} as super class")]
    SuperclassIsInterface {
        /// Class being loaded
        class: String,
        /// Offending superclass
        superclass: String,
    },

    /// A declared interface is actually a class
    #[error("class {class} can not implement {interface}, because it is not an interface")]
    NotAnInterface {
        /// Class being loaded
        class: String,
        /// Offending class
        interface: String,
    },

    /// The class is (transitively) its own superclass
    #[error("class circularity while loading {0}")]
    Circularity(String),
}

impl LoadError {
    /// Guest exception describing this failure
    pub fn to_error_result(&self) -> ErrorResult {
        let class = match self {
            LoadError::NotFound(_) => "java/lang/NoClassDefFoundError",
            LoadError::InvalidMember { .. } => "java/lang/ClassFormatError",
            LoadError::SuperclassIsInterface { .. } | LoadError::NotAnInterface { .. } => {
                "java/lang/IncompatibleClassChangeError"
            }
            LoadError::Circularity(_) => "java/lang/ClassCircularityError",
        };
        let message = match self {
            LoadError::NotFound(name) | LoadError::Circularity(name) => name.clone(),
            other => other.to_string(),
        };
        ErrorResult::new(class, message)
    }
}

impl<T> From<LoadError> for VmResult<T> {
    fn from(err: LoadError) -> Self {
        VmResult::Error(err.to_error_result())
    }
}

/// Source of loaded classes.
pub trait ClassLoader: Send + Sync {
    /// Load `name` (binary name, array descriptor or primitive keyword),
    /// loading its supertypes first
    fn load_class(&self, name: &str) -> VmResult<Arc<ClassData>>;

    /// A class already loaded under `name`, without loading anything
    fn loaded_class(&self, name: &str) -> Option<Arc<ClassData>>;
}

const PRIMITIVES: [(&str, JavaType); 9] = [
    ("boolean", JavaType::Boolean),
    ("byte", JavaType::Byte),
    ("char", JavaType::Char),
    ("short", JavaType::Short),
    ("int", JavaType::Int),
    ("long", JavaType::Long),
    ("float", JavaType::Float),
    ("double", JavaType::Double),
    ("void", JavaType::Void),
];

/// Loader for classes registered as [`ClassDefinition`]s.
///
/// # Examples
///
/// ```
/// use class_model::{BootstrapLoader, ClassDefinition, ClassLoader};
///
/// let loader = BootstrapLoader::new();
/// loader.register(ClassDefinition::new("java/lang/Object"));
/// loader.register(ClassDefinition::new("demo/Point"));
///
/// let point = loader.load_class("demo/Point").success().unwrap();
/// assert_eq!(point.superclass().unwrap().name(), "java/lang/Object");
/// assert!(loader.load_class("demo/Missing").is_error());
/// ```
#[derive(Default)]
pub struct BootstrapLoader {
    definitions: RwLock<HashMap<String, ClassDefinition>>,
    loaded: RwLock<HashMap<String, Arc<ClassData>>>,
    in_progress: Mutex<HashSet<String>>,
}

impl BootstrapLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a definition available for loading
    pub fn register(&self, definition: ClassDefinition) {
        self.definitions
            .write()
            .insert(definition.name.clone(), definition);
    }

    /// Register several definitions at once
    pub fn register_all(&self, definitions: impl IntoIterator<Item = ClassDefinition>) {
        let mut table = self.definitions.write();
        for definition in definitions {
            table.insert(definition.name.clone(), definition);
        }
    }

    /// Check if a definition exists for `name`
    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn publish(&self, class: ClassData) -> Arc<ClassData> {
        let mut loaded = self.loaded.write();
        loaded
            .entry(class.name().to_string())
            .or_insert_with(|| Arc::new(class))
            .clone()
    }

    fn load_array(&self, name: &str) -> VmResult<Arc<ClassData>> {
        let component_type = match JavaType::parse(name) {
            Ok(JavaType::Array(component)) => *component,
            _ => return VmResult::error("java/lang/NoClassDefFoundError", name),
        };
        let component = match self.load_class(&component_type.class_name()) {
            VmResult::Success(c) => c,
            other => return other,
        };
        let object = match self.load_class("java/lang/Object") {
            VmResult::Success(c) => c,
            other => return other,
        };
        let interfaces = ["java/lang/Cloneable", "java/io/Serializable"]
            .iter()
            .filter(|n| self.is_registered(n))
            .filter_map(|n| self.load_class(n).success())
            .collect();
        VmResult::Success(self.publish(ClassData::array(name, component, object, interfaces)))
    }

    fn load_reference(&self, name: &str) -> VmResult<Arc<ClassData>> {
        let Some(definition) = self.definitions.read().get(name).cloned() else {
            return LoadError::NotFound(name.to_string()).into();
        };
        if !self.in_progress.lock().insert(name.to_string()) {
            return LoadError::Circularity(name.to_string()).into();
        }
        let result = self.link_definition(definition);
        self.in_progress.lock().remove(name);
        result
    }

    fn link_definition(&self, definition: ClassDefinition) -> VmResult<Arc<ClassData>> {
        let superclass = match definition.superclass.as_deref() {
            Some(super_name) => match self.load_class(super_name) {
                VmResult::Success(s) if s.is_interface() => {
                    return LoadError::SuperclassIsInterface {
                        class: definition.name.clone(),
                        superclass: super_name.to_string(),
                    }
                    .into();
                }
                VmResult::Success(s) => Some(s),
                other => return other,
            },
            None => None,
        };

        let mut interfaces = Vec::with_capacity(definition.interfaces.len());
        for iface_name in &definition.interfaces {
            match self.load_class(iface_name) {
                VmResult::Success(i) if !i.is_interface() => {
                    return LoadError::NotAnInterface {
                        class: definition.name.clone(),
                        interface: iface_name.clone(),
                    }
                    .into();
                }
                VmResult::Success(i) => interfaces.push(i),
                other => return other,
            }
        }

        match ClassData::from_definition(definition, superclass, interfaces) {
            Ok(class) => VmResult::Success(self.publish(class)),
            Err(err) => err.into(),
        }
    }
}

impl ClassLoader for BootstrapLoader {
    fn load_class(&self, name: &str) -> VmResult<Arc<ClassData>> {
        if let Some(class) = self.loaded_class(name) {
            return VmResult::Success(class);
        }
        if name.starts_with('[') {
            return self.load_array(name);
        }
        if let Some((_, ty)) = PRIMITIVES.iter().find(|(keyword, _)| *keyword == name) {
            return VmResult::Success(self.publish(ClassData::primitive(ty.clone())));
        }
        self.load_reference(name)
    }

    fn loaded_class(&self, name: &str) -> Option<Arc<ClassData>> {
        self.loaded.read().get(name).cloned()
    }
}
