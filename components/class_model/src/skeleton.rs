//! A minimal `java/lang` class library.
//!
//! Hosts without a full class library register [`core_classes`] with their
//! loader. It declares the types the engine itself relies on: `Object`,
//! `String`, `Class`, the throwables the interpreter raises, the array
//! interfaces and the method-handle linkage classes. Native methods are
//! declared here and implemented by the interpreter's native registry.

use crate::access::*;
use crate::constant_pool::ConstantPoolBuilder;
use crate::definition::ClassDefinition;
use bytecode_system::{CodeBuilder, Opcode};

const OBJECT: &str = "java/lang/Object";
const THROWABLE: &str = "java/lang/Throwable";

/// Throwable classes with their superclass, parents before children.
pub const THROWABLES: &[(&str, &str)] = &[
    ("java/lang/Exception", THROWABLE),
    ("java/lang/Error", THROWABLE),
    ("java/lang/RuntimeException", "java/lang/Exception"),
    ("java/lang/InterruptedException", "java/lang/Exception"),
    ("java/lang/CloneNotSupportedException", "java/lang/Exception"),
    ("java/lang/ArithmeticException", "java/lang/RuntimeException"),
    ("java/lang/ArrayStoreException", "java/lang/RuntimeException"),
    ("java/lang/ClassCastException", "java/lang/RuntimeException"),
    ("java/lang/IllegalArgumentException", "java/lang/RuntimeException"),
    ("java/lang/IllegalMonitorStateException", "java/lang/RuntimeException"),
    ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException"),
    ("java/lang/ArrayIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException"),
    ("java/lang/NegativeArraySizeException", "java/lang/RuntimeException"),
    ("java/lang/NullPointerException", "java/lang/RuntimeException"),
    ("java/lang/LinkageError", "java/lang/Error"),
    ("java/lang/VirtualMachineError", "java/lang/Error"),
    ("java/lang/StackOverflowError", "java/lang/VirtualMachineError"),
    ("java/lang/OutOfMemoryError", "java/lang/VirtualMachineError"),
    ("java/lang/InternalError", "java/lang/VirtualMachineError"),
    ("java/lang/BootstrapMethodError", "java/lang/LinkageError"),
    ("java/lang/ClassCircularityError", "java/lang/LinkageError"),
    ("java/lang/ClassFormatError", "java/lang/LinkageError"),
    ("java/lang/ExceptionInInitializerError", "java/lang/LinkageError"),
    ("java/lang/NoClassDefFoundError", "java/lang/LinkageError"),
    ("java/lang/UnsatisfiedLinkError", "java/lang/LinkageError"),
    ("java/lang/VerifyError", "java/lang/LinkageError"),
    ("java/lang/IncompatibleClassChangeError", "java/lang/LinkageError"),
    ("java/lang/AbstractMethodError", "java/lang/IncompatibleClassChangeError"),
    ("java/lang/IllegalAccessError", "java/lang/IncompatibleClassChangeError"),
    ("java/lang/InstantiationError", "java/lang/IncompatibleClassChangeError"),
    ("java/lang/NoSuchFieldError", "java/lang/IncompatibleClassChangeError"),
    ("java/lang/NoSuchMethodError", "java/lang/IncompatibleClassChangeError"),
];

/// All skeleton class definitions.
///
/// # Examples
///
/// ```
/// use class_model::{skeleton, BootstrapLoader, ClassLoader};
///
/// let loader = BootstrapLoader::new();
/// loader.register_all(skeleton::core_classes());
///
/// let npe = loader.load_class("java/lang/NullPointerException").success().unwrap();
/// let throwable = loader.load_class("java/lang/Throwable").success().unwrap();
/// assert!(npe.is_subclass_of(&throwable));
/// ```
pub fn core_classes() -> Vec<ClassDefinition> {
    let mut classes = vec![
        object(),
        interface("java/lang/Cloneable"),
        interface("java/io/Serializable"),
        interface("java/lang/Runnable").method("run", "()V", ACC_PUBLIC | ACC_ABSTRACT, None),
        string(),
        class(),
        system(),
        unsafe_class(),
        throwable(),
    ];
    classes.extend(THROWABLES.iter().map(|(name, parent)| exception(name, parent)));
    classes.extend(method_handle_classes());
    classes
}

fn interface(name: &str) -> ClassDefinition {
    ClassDefinition::new(name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
}

/// `aload_0; invokespecial parent.<init>(); return`
fn default_constructor(pool: &mut ConstantPoolBuilder, parent: &str) -> CodeBuilder {
    let init = pool.methodref(parent, "<init>", "()V");
    CodeBuilder::new()
        .op(Opcode::Aload0)
        .op_u16(Opcode::Invokespecial, init)
}

fn object() -> ClassDefinition {
    let mut pool = ConstantPoolBuilder::new();
    let wait = pool.methodref(OBJECT, "wait", "(J)V");
    let native = ACC_PUBLIC | ACC_NATIVE;
    let final_native = native | ACC_FINAL;

    let equals = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op(Opcode::Aload1)
        .branch(Opcode::IfAcmpne, 5)
        .op(Opcode::Iconst1)
        .op(Opcode::Ireturn)
        .op(Opcode::Iconst0)
        .op(Opcode::Ireturn)
        .build(2, 2);
    let wait_forever = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op(Opcode::Lconst0)
        .op_u16(Opcode::Invokevirtual, wait)
        .op(Opcode::Return)
        .build(3, 1);

    ClassDefinition::new(OBJECT)
        .constants(pool.build())
        .method("<init>", "()V", ACC_PUBLIC, Some(CodeBuilder::new().op(Opcode::Return).build(0, 1)))
        .method("registerNatives", "()V", ACC_PRIVATE | ACC_STATIC | ACC_NATIVE, None)
        .method("hashCode", "()I", native, None)
        .method("getClass", "()Ljava/lang/Class;", final_native, None)
        .method("clone", "()Ljava/lang/Object;", ACC_PROTECTED | ACC_NATIVE, None)
        .method("equals", "(Ljava/lang/Object;)Z", ACC_PUBLIC, Some(equals))
        .method("wait", "()V", ACC_PUBLIC | ACC_FINAL, Some(wait_forever))
        .method("wait", "(J)V", final_native, None)
        .method("notify", "()V", final_native, None)
        .method("notifyAll", "()V", final_native, None)
}

fn string() -> ClassDefinition {
    let mut pool = ConstantPoolBuilder::new();
    let value = pool.fieldref("java/lang/String", "value", "[C");
    let length = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op_u16(Opcode::Getfield, value)
        .op(Opcode::Arraylength)
        .op(Opcode::Ireturn)
        .build(1, 1);
    let char_at = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op_u16(Opcode::Getfield, value)
        .op(Opcode::Iload1)
        .op(Opcode::Caload)
        .op(Opcode::Ireturn)
        .build(2, 2);
    let init = default_constructor(&mut pool, OBJECT).op(Opcode::Return).build(1, 1);

    ClassDefinition::new("java/lang/String")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .implements("java/io/Serializable")
        .constants(pool.build())
        .field("value", "[C", ACC_PRIVATE | ACC_FINAL)
        .field("hash", "I", ACC_PRIVATE)
        .method("<init>", "()V", ACC_PUBLIC, Some(init))
        .method("length", "()I", ACC_PUBLIC, Some(length))
        .method("charAt", "(I)C", ACC_PUBLIC, Some(char_at))
        .method("intern", "()Ljava/lang/String;", ACC_PUBLIC | ACC_NATIVE, None)
}

fn class() -> ClassDefinition {
    ClassDefinition::new("java/lang/Class")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .implements("java/io/Serializable")
        .method("registerNatives", "()V", ACC_PRIVATE | ACC_STATIC | ACC_NATIVE, None)
        .method("getName", "()Ljava/lang/String;", ACC_PUBLIC | ACC_NATIVE, None)
        .method("isInterface", "()Z", ACC_PUBLIC | ACC_NATIVE, None)
        .method("isArray", "()Z", ACC_PUBLIC | ACC_NATIVE, None)
        .method("isPrimitive", "()Z", ACC_PUBLIC | ACC_NATIVE, None)
        .method("isInstance", "(Ljava/lang/Object;)Z", ACC_PUBLIC | ACC_NATIVE, None)
}

fn system() -> ClassDefinition {
    let static_native = ACC_PUBLIC | ACC_STATIC | ACC_NATIVE;
    ClassDefinition::new("java/lang/System")
        .access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .method("registerNatives", "()V", ACC_PRIVATE | ACC_STATIC | ACC_NATIVE, None)
        .method("arraycopy", "(Ljava/lang/Object;ILjava/lang/Object;II)V", static_native, None)
        .method("identityHashCode", "(Ljava/lang/Object;)I", static_native, None)
        .method("currentTimeMillis", "()J", static_native, None)
        .method("nanoTime", "()J", static_native, None)
        .method(
            "loadLibrary",
            "(Ljava/lang/String;)V",
            ACC_PUBLIC | ACC_STATIC,
            Some(CodeBuilder::new().op(Opcode::Return).build(0, 1)),
        )
}

fn unsafe_class() -> ClassDefinition {
    let native = ACC_PUBLIC | ACC_NATIVE;
    let natives = [
        ("registerNatives", "()V"),
        ("allocateMemory", "(J)J"),
        ("freeMemory", "(J)V"),
        ("putLong", "(JJ)V"),
        ("getLong", "(J)J"),
        ("putInt", "(JI)V"),
        ("getInt", "(J)I"),
        ("putByte", "(JB)V"),
        ("getByte", "(J)B"),
        ("addressSize", "()I"),
        ("arrayBaseOffset", "(Ljava/lang/Class;)I"),
        ("arrayIndexScale", "(Ljava/lang/Class;)I"),
        ("compareAndSwapInt", "(Ljava/lang/Object;JII)Z"),
        ("compareAndSwapLong", "(Ljava/lang/Object;JJJ)Z"),
        (
            "compareAndSwapObject",
            "(Ljava/lang/Object;JLjava/lang/Object;Ljava/lang/Object;)Z",
        ),
        ("shouldBeInitialized", "(Ljava/lang/Class;)Z"),
    ];
    natives.iter().fold(
        ClassDefinition::new("sun/misc/Unsafe").access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER),
        |def, (name, descriptor)| {
            let flags = if *name == "registerNatives" {
                ACC_PRIVATE | ACC_STATIC | ACC_NATIVE
            } else {
                native
            };
            def.method(name, descriptor, flags, None)
        },
    )
}

fn throwable() -> ClassDefinition {
    let mut pool = ConstantPoolBuilder::new();
    let message = pool.fieldref(THROWABLE, "detailMessage", "Ljava/lang/String;");
    let init = default_constructor(&mut pool, OBJECT).op(Opcode::Return).build(1, 1);
    let init_message = default_constructor(&mut pool, OBJECT)
        .op(Opcode::Aload0)
        .op(Opcode::Aload1)
        .op_u16(Opcode::Putfield, message)
        .op(Opcode::Return)
        .build(2, 2);
    let get_message = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op_u16(Opcode::Getfield, message)
        .op(Opcode::Areturn)
        .build(1, 1);

    ClassDefinition::new(THROWABLE)
        .implements("java/io/Serializable")
        .constants(pool.build())
        .field("detailMessage", "Ljava/lang/String;", ACC_PRIVATE)
        .method("<init>", "()V", ACC_PUBLIC, Some(init))
        .method("<init>", "(Ljava/lang/String;)V", ACC_PUBLIC, Some(init_message))
        .method("getMessage", "()Ljava/lang/String;", ACC_PUBLIC, Some(get_message))
}

/// An exception class whose constructors delegate to `parent`
fn exception(name: &str, parent: &str) -> ClassDefinition {
    let mut pool = ConstantPoolBuilder::new();
    let init_message = pool.methodref(parent, "<init>", "(Ljava/lang/String;)V");
    let init = default_constructor(&mut pool, parent).op(Opcode::Return).build(1, 1);
    let with_message = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op(Opcode::Aload1)
        .op_u16(Opcode::Invokespecial, init_message)
        .op(Opcode::Return)
        .build(2, 2);

    ClassDefinition::new(name)
        .extends(parent)
        .constants(pool.build())
        .method("<init>", "()V", ACC_PUBLIC, Some(init))
        .method("<init>", "(Ljava/lang/String;)V", ACC_PUBLIC, Some(with_message))
}

fn method_handle_classes() -> Vec<ClassDefinition> {
    let polymorphic = ACC_PUBLIC | ACC_FINAL | ACC_NATIVE | ACC_VARARGS;
    let linker = ACC_STATIC | ACC_NATIVE | ACC_VARARGS;
    let generic = "([Ljava/lang/Object;)Ljava/lang/Object;";
    let static_native = ACC_STATIC | ACC_NATIVE;

    vec![
        ClassDefinition::new("java/lang/invoke/MethodHandle")
            .access(ACC_PUBLIC | ACC_ABSTRACT | ACC_SUPER)
            .field("type", "Ljava/lang/invoke/MethodType;", ACC_FINAL)
            .field("form", "Ljava/lang/invoke/LambdaForm;", ACC_FINAL)
            .method("invokeExact", generic, polymorphic, None)
            .method("invoke", generic, polymorphic, None)
            .method("invokeBasic", generic, polymorphic & !ACC_PUBLIC, None)
            .method("linkToVirtual", generic, linker, None)
            .method("linkToStatic", generic, linker, None)
            .method("linkToSpecial", generic, linker, None)
            .method("linkToInterface", generic, linker, None),
        ClassDefinition::new("java/lang/invoke/MethodType").access(ACC_PUBLIC | ACC_FINAL | ACC_SUPER),
        ClassDefinition::new("java/lang/invoke/LambdaForm")
            .access(ACC_SUPER)
            .field("vmentry", "Ljava/lang/invoke/MemberName;", 0),
        ClassDefinition::new("java/lang/invoke/MemberName")
            .access(ACC_FINAL | ACC_SUPER)
            .field("clazz", "Ljava/lang/Class;", ACC_PRIVATE)
            .field("name", "Ljava/lang/String;", ACC_PRIVATE)
            .field("flags", "I", ACC_PRIVATE),
        ClassDefinition::new("java/lang/invoke/MethodHandleNatives")
            .access(ACC_SUPER)
            .method("registerNatives", "()V", static_native, None)
            .method(
                "linkCallSite",
                "(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/invoke/MemberName;",
                static_native,
                None,
            )
            .method(
                "linkMethodHandleConstant",
                "(Ljava/lang/Class;ILjava/lang/Class;Ljava/lang/String;Ljava/lang/Object;)Ljava/lang/invoke/MethodHandle;",
                static_native,
                None,
            ),
    ]
}
