//! Method selection tests: defaults, conflicts and interface lookup

use class_model::{
    BootstrapLoader, ClassDefinition, ClassLoader, ACC_ABSTRACT, ACC_INTERFACE, ACC_PRIVATE, ACC_PUBLIC,
};
use bytecode_system::{CodeBuilder, Opcode};

fn body() -> Option<bytecode_system::Code> {
    Some(CodeBuilder::new().op(Opcode::Return).build(0, 1))
}

fn iface(name: &str) -> ClassDefinition {
    ClassDefinition::new(name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
}

fn loader(defs: Vec<ClassDefinition>) -> BootstrapLoader {
    let loader = BootstrapLoader::new();
    loader.register(
        ClassDefinition::new("java/lang/Object")
            .method("toString", "()Ljava/lang/String;", ACC_PUBLIC, body()),
    );
    loader.register_all(defs);
    loader
}

#[test]
fn test_default_method_selected() {
    let loader = loader(vec![
        iface("d/Greeter").method("greet", "()V", ACC_PUBLIC, body()),
        ClassDefinition::new("d/Impl").implements("d/Greeter"),
    ]);
    let greeter = loader.load_class("d/Greeter").success().unwrap();
    let implementation = loader.load_class("d/Impl").success().unwrap();
    let resolved = greeter
        .resolve_interface_method(&implementation, "greet", "()V")
        .success()
        .unwrap();
    let selected = implementation.select_interface(&resolved).success().unwrap();
    assert_eq!(selected.class.name(), "d/Greeter");
}

#[test]
fn test_more_specific_default_wins() {
    let loader = loader(vec![
        iface("d/A").method("hello", "()V", ACC_PUBLIC, body()),
        iface("d/B").implements("d/A").method("hello", "()V", ACC_PUBLIC, body()),
        ClassDefinition::new("d/C").implements("d/A").implements("d/B"),
    ]);
    let a = loader.load_class("d/A").success().unwrap();
    let c = loader.load_class("d/C").success().unwrap();
    let resolved = a.resolve_interface_method(&c, "hello", "()V").success().unwrap();
    let selected = c.select_interface(&resolved).success().unwrap();
    assert_eq!(selected.class.name(), "d/B");
}

#[test]
fn test_conflicting_defaults() {
    let loader = loader(vec![
        iface("d/Left").method("go", "()V", ACC_PUBLIC, body()),
        iface("d/Right").method("go", "()V", ACC_PUBLIC, body()),
        ClassDefinition::new("d/Both").implements("d/Left").implements("d/Right"),
    ]);
    let left = loader.load_class("d/Left").success().unwrap();
    let both = loader.load_class("d/Both").success().unwrap();
    let resolved = left.resolve_interface_method(&both, "go", "()V").success().unwrap();
    let err = both.select_interface(&resolved).error_result().unwrap();
    assert_eq!(err.exception_class, "java/lang/IncompatibleClassChangeError");
}

#[test]
fn test_interface_method_falls_back_to_object() {
    let loader = loader(vec![iface("d/Named"), ClassDefinition::new("d/User").implements("d/Named")]);
    let named = loader.load_class("d/Named").success().unwrap();
    let user = loader.load_class("d/User").success().unwrap();
    let resolved = named
        .resolve_interface_method(&user, "toString", "()Ljava/lang/String;")
        .success()
        .unwrap();
    assert_eq!(resolved.class.name(), "java/lang/Object");
}

#[test]
fn test_non_public_interface_selection() {
    let loader = loader(vec![
        iface("d/Task").method("run", "()V", ACC_PUBLIC | ACC_ABSTRACT, None),
        ClassDefinition::new("d/Sneaky")
            .implements("d/Task")
            .method("run", "()V", 0, body()),
    ]);
    let task = loader.load_class("d/Task").success().unwrap();
    let sneaky = loader.load_class("d/Sneaky").success().unwrap();
    let resolved = task.resolve_interface_method(&sneaky, "run", "()V").success().unwrap();
    let err = sneaky.select_interface(&resolved).error_result().unwrap();
    assert_eq!(err.exception_class, "java/lang/IllegalAccessError");
}

#[test]
fn test_private_resolved_method_is_not_overridden() {
    let loader = loader(vec![
        ClassDefinition::new("d/Base").method("secret", "()V", ACC_PRIVATE, body()),
        ClassDefinition::new("d/Derived")
            .extends("d/Base")
            .method("secret", "()V", ACC_PUBLIC, body()),
    ]);
    let base = loader.load_class("d/Base").success().unwrap();
    let derived = loader.load_class("d/Derived").success().unwrap();
    let resolved = base.resolve_method(&base, "secret", "()V").success().unwrap();
    let selected = derived.select_virtual(&resolved).success().unwrap();
    assert_eq!(selected.class.name(), "d/Base");
}

#[test]
fn test_missing_method() {
    let loader = loader(vec![ClassDefinition::new("d/Empty")]);
    let empty = loader.load_class("d/Empty").success().unwrap();
    let err = empty.resolve_method(&empty, "nothing", "()V").error_result().unwrap();
    assert_eq!(err.exception_class, "java/lang/NoSuchMethodError");
    assert_eq!(err.message, "d/Empty.nothing()V");
}
