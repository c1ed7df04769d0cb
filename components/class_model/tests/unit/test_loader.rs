//! Loader and skeleton tests

use class_model::{skeleton, BootstrapLoader, ClassDefinition, ClassLoader};
use std::sync::Arc;

fn loader() -> BootstrapLoader {
    let loader = BootstrapLoader::new();
    loader.register_all(skeleton::core_classes());
    loader
}

#[test]
fn test_array_classes_implement_cloneable_and_serializable() {
    let loader = loader();
    let strings = loader.load_class("[Ljava/lang/String;").success().unwrap();
    let cloneable = loader.load_class("java/lang/Cloneable").success().unwrap();
    let serializable = loader.load_class("java/io/Serializable").success().unwrap();
    let object = loader.load_class("java/lang/Object").success().unwrap();
    assert!(strings.check_cast(&cloneable));
    assert!(strings.check_cast(&serializable));
    assert!(strings.check_cast(&object));
    assert_eq!(strings.package_name(), "java/lang");
}

#[test]
fn test_loaded_class_does_not_load() {
    let loader = loader();
    loader.register(ClassDefinition::new("lazy/Thing"));
    assert!(loader.loaded_class("lazy/Thing").is_none());
    let thing = loader.load_class("lazy/Thing").success().unwrap();
    assert!(Arc::ptr_eq(&thing, &loader.loaded_class("lazy/Thing").unwrap()));
}

#[test]
fn test_class_implementing_a_class_is_rejected() {
    let loader = loader();
    loader.register(ClassDefinition::new("bad/Impl").implements("java/lang/String"));
    let err = loader.load_class("bad/Impl").error_result().unwrap();
    assert_eq!(err.exception_class, "java/lang/IncompatibleClassChangeError");
}

#[test]
fn test_primitive_class_names() {
    let loader = loader();
    for name in ["int", "long", "boolean", "double"] {
        let class = loader.load_class(name).success().unwrap();
        assert!(class.is_primitive());
        assert_eq!(class.name(), name);
    }
}
