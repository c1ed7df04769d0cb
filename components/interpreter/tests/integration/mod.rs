//! Integration tests for interpreter
//!
//! Whole programs across several classes: dispatch, exceptions, class
//! initialization, fields, natives, method handles and threads sharing
//! monitors.

use bytecode_system::{atype, Code, CodeBuilder, Opcode};
use class_model::{
    ClassDefinition, ConstantPoolBuilder, ReferenceKind, ACC_ABSTRACT, ACC_FINAL, ACC_INTERFACE, ACC_NATIVE,
    ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC,
};
use core_types::{Value, VmError};
use interpreter::{PoolOutcome, Runtime, RuntimeBuilder, Thread, ThreadPool, ThreadStatus, VmConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MAIN: &str = "test/Main";
const OBJECT: &str = "java/lang/Object";
const UNSAFE: &str = "sun/misc/Unsafe";
const METHOD_HANDLE: &str = "java/lang/invoke/MethodHandle";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `<init>()V` delegating to `parent`
fn constructor(pool: &mut ConstantPoolBuilder, parent: &str) -> Code {
    let init = pool.methodref(parent, "<init>", "()V");
    CodeBuilder::new()
        .op(Opcode::Aload0)
        .op_u16(Opcode::Invokespecial, init)
        .op(Opcode::Return)
        .build(1, 1)
}

fn main_class(pool: ConstantPoolBuilder, code: Code, descriptor: &str) -> ClassDefinition {
    ClassDefinition::new(MAIN)
        .constants(pool.build())
        .method("main", descriptor, ACC_PUBLIC | ACC_STATIC, Some(code))
}

fn run_main(runtime: Arc<Runtime>, descriptor: &str, args: Vec<Value>) -> Thread {
    init_logging();
    let mut thread = Thread::new(runtime);
    assert!(thread.start(MAIN, "main", descriptor, args).unwrap().is_success());
    assert_eq!(thread.run_to_completion().unwrap(), ThreadStatus::Terminated);
    thread
}

fn run_classes(classes: Vec<ClassDefinition>, descriptor: &str) -> Thread {
    run_main(RuntimeBuilder::new().classes(classes).build(), descriptor, vec![])
}

fn uncaught_class(thread: &Thread) -> &str {
    thread
        .uncaught()
        .map(|u| u.class_name.as_str())
        .unwrap_or("<none>")
}

// ============================================================================
// Method dispatch
// ============================================================================

fn returning(value: i8) -> Code {
    CodeBuilder::new()
        .op(Opcode::Bipush)
        .i8(value)
        .op(Opcode::Ireturn)
        .build(1, 1)
}

#[test]
fn test_invokevirtual_selects_override() {
    let mut parent_pool = ConstantPoolBuilder::new();
    let parent_init = constructor(&mut parent_pool, OBJECT);
    let parent = ClassDefinition::new("test/Parent")
        .constants(parent_pool.build())
        .method("<init>", "()V", ACC_PUBLIC, Some(parent_init))
        .method("value", "()I", ACC_PUBLIC, Some(returning(1)));

    let mut child_pool = ConstantPoolBuilder::new();
    let child_init = constructor(&mut child_pool, "test/Parent");
    let child = ClassDefinition::new("test/Child")
        .extends("test/Parent")
        .constants(child_pool.build())
        .method("<init>", "()V", ACC_PUBLIC, Some(child_init))
        .method("value", "()I", ACC_PUBLIC, Some(returning(2)));

    // value(new Child()) * 10 + value(new Parent())
    let mut pool = ConstantPoolBuilder::new();
    let child_class = pool.class("test/Child");
    let new_child = pool.methodref("test/Child", "<init>", "()V");
    let parent_class = pool.class("test/Parent");
    let new_parent = pool.methodref("test/Parent", "<init>", "()V");
    let value = pool.methodref("test/Parent", "value", "()I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::New, child_class)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, new_child)
        .op_u16(Opcode::Invokevirtual, value)
        .op(Opcode::Bipush)
        .i8(10)
        .op(Opcode::Imul)
        .op_u16(Opcode::New, parent_class)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, new_parent)
        .op_u16(Opcode::Invokevirtual, value)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(3, 0);

    let thread = run_classes(vec![parent, child, main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(21)));
}

#[test]
fn test_invokeinterface_reaches_implementation() {
    let shape = ClassDefinition::new("test/Shape")
        .access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .method("area", "()I", ACC_PUBLIC | ACC_ABSTRACT, None);

    let mut square_pool = ConstantPoolBuilder::new();
    let square_init = constructor(&mut square_pool, OBJECT);
    let square = ClassDefinition::new("test/Square")
        .implements("test/Shape")
        .constants(square_pool.build())
        .method("<init>", "()V", ACC_PUBLIC, Some(square_init))
        .method("area", "()I", ACC_PUBLIC, Some(returning(16)));

    let mut pool = ConstantPoolBuilder::new();
    let square_class = pool.class("test/Square");
    let init = pool.methodref("test/Square", "<init>", "()V");
    let area = pool.interface_methodref("test/Shape", "area", "()I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::New, square_class)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, init)
        .op_u16(Opcode::Invokeinterface, area)
        .u8(1)
        .u8(0)
        .op(Opcode::Ireturn)
        .build(2, 0);

    let thread = run_classes(vec![shape, square, main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(16)));
}

#[test]
fn test_invokevirtual_on_null_receiver() {
    let mut pool = ConstantPoolBuilder::new();
    let hash = pool.methodref(OBJECT, "hashCode", "()I");
    let code = CodeBuilder::new()
        .op(Opcode::AconstNull)
        .op_u16(Opcode::Invokevirtual, hash)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(uncaught_class(&thread), "java/lang/NullPointerException");
}

// ============================================================================
// Exceptions
// ============================================================================

/// `test/Oops` plus a `test/Main` whose `main` calls a throwing helper and
/// catches `catch_type` with a handler returning 1
fn throwing_program(catch_type: Option<&str>) -> Vec<ClassDefinition> {
    let mut oops_pool = ConstantPoolBuilder::new();
    let oops_init = constructor(&mut oops_pool, "java/lang/RuntimeException");
    let oops = ClassDefinition::new("test/Oops")
        .extends("java/lang/RuntimeException")
        .constants(oops_pool.build())
        .method("<init>", "()V", ACC_PUBLIC, Some(oops_init));

    let mut pool = ConstantPoolBuilder::new();
    let oops_class = pool.class("test/Oops");
    let init = pool.methodref("test/Oops", "<init>", "()V");
    let thrower = pool.methodref(MAIN, "thrower", "()V");
    let throw_code = CodeBuilder::new()
        .op_u16(Opcode::New, oops_class)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, init)
        .op(Opcode::Athrow)
        .build(2, 0);
    let code = CodeBuilder::new()
        .op_u16(Opcode::Invokestatic, thrower)
        .op(Opcode::Iconst0)
        .op(Opcode::Ireturn)
        .op(Opcode::Pop)
        .op(Opcode::Iconst1)
        .op(Opcode::Ireturn)
        .handler(0, 3, 5, catch_type)
        .build(1, 0);
    let main = main_class(pool, code, "()I").method("thrower", "()V", ACC_PRIVATE | ACC_STATIC, Some(throw_code));
    vec![oops, main]
}

#[test]
fn test_exception_caught_by_superclass_handler() {
    let thread = run_classes(throwing_program(Some("java/lang/RuntimeException")), "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(1)));
}

#[test]
fn test_catch_all_handler() {
    let thread = run_classes(throwing_program(None), "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(1)));
}

#[test]
fn test_unmatched_handler_lets_exception_escape() {
    let thread = run_classes(throwing_program(Some("java/lang/ArithmeticException")), "()I");
    assert_eq!(uncaught_class(&thread), "test/Oops");
    assert!(thread.frames().is_empty());
    assert_eq!(thread.status(), ThreadStatus::Terminated);
}

#[test]
fn test_vm_exception_carries_message() {
    let mut pool = ConstantPoolBuilder::new();
    let get_message = pool.methodref("java/lang/Throwable", "getMessage", "()Ljava/lang/String;");
    let length = pool.methodref("java/lang/String", "length", "()I");
    let code = CodeBuilder::new()
        .op(Opcode::Iconst1)
        .op(Opcode::Iconst0)
        .op(Opcode::Idiv)
        .op(Opcode::Ireturn)
        .op_u16(Opcode::Invokevirtual, get_message)
        .op_u16(Opcode::Invokevirtual, length)
        .op(Opcode::Ireturn)
        .handler(0, 4, 4, Some("java/lang/ArithmeticException"))
        .build(2, 0);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int("Division by zero".len() as i32)));
}

// ============================================================================
// Class initialization
// ============================================================================

#[test]
fn test_clinit_runs_once_even_when_it_instantiates_its_class() {
    let single = "test/Single";
    let mut single_pool = ConstantPoolBuilder::new();
    let count = single_pool.fieldref(single, "count", "I");
    let instance = single_pool.fieldref(single, "instance", "Ltest/Single;");
    let class = single_pool.class(single);
    let init_ref = single_pool.methodref(single, "<init>", "()V");
    let init = constructor(&mut single_pool, OBJECT);
    let clinit = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, count)
        .op(Opcode::Iconst1)
        .op(Opcode::Iadd)
        .op_u16(Opcode::Putstatic, count)
        .op_u16(Opcode::New, class)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, init_ref)
        .op_u16(Opcode::Putstatic, instance)
        .op(Opcode::Return)
        .build(2, 0);
    let get = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, count)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let single_class = ClassDefinition::new(single)
        .constants(single_pool.build())
        .field("count", "I", ACC_STATIC)
        .field("instance", "Ltest/Single;", ACC_STATIC)
        .method("<init>", "()V", ACC_PUBLIC, Some(init))
        .method("<clinit>", "()V", ACC_STATIC, Some(clinit))
        .method("get", "()I", ACC_PUBLIC | ACC_STATIC, Some(get));

    let mut pool = ConstantPoolBuilder::new();
    let get_ref = pool.methodref(single, "get", "()I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Invokestatic, get_ref)
        .op_u16(Opcode::Invokestatic, get_ref)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(2, 0);

    let thread = run_classes(vec![single_class, main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(2)));
}

#[test]
fn test_failed_clinit_propagates_then_poisons_class() {
    let broken = "test/Broken";
    let clinit = CodeBuilder::new()
        .op(Opcode::Iconst1)
        .op(Opcode::Iconst0)
        .op(Opcode::Idiv)
        .op(Opcode::Pop)
        .op(Opcode::Return)
        .build(2, 0);
    let broken_class = ClassDefinition::new(broken)
        .field("value", "I", ACC_PUBLIC | ACC_STATIC)
        .method("<clinit>", "()V", ACC_STATIC, Some(clinit));

    let mut pool = ConstantPoolBuilder::new();
    let value = pool.fieldref(broken, "value", "I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, value)
        .op(Opcode::Ireturn)
        .op(Opcode::Pop)
        .op_u16(Opcode::Getstatic, value)
        .op(Opcode::Ireturn)
        .handler(0, 4, 4, Some("java/lang/ArithmeticException"))
        .build(1, 0);

    let thread = run_classes(vec![broken_class, main_class(pool, code, "()I")], "()I");
    assert_eq!(uncaught_class(&thread), "java/lang/NoClassDefFoundError");
}

#[test]
fn test_second_thread_waits_for_initialization_in_progress() {
    let slow = "test/Slow";
    let mut slow_pool = ConstantPoolBuilder::new();
    let count = slow_pool.fieldref(slow, "count", "I");
    let value = slow_pool.fieldref(slow, "value", "I");
    // Spin for a while so the initializer spans several quanta
    let clinit = CodeBuilder::new()
        .op(Opcode::Iconst0)
        .op(Opcode::Istore0)
        .op(Opcode::Iload0)
        .op(Opcode::Bipush)
        .i8(50)
        .branch(Opcode::IfIcmpge, 9)
        .op(Opcode::Iinc)
        .u8(0)
        .i8(1)
        .branch(Opcode::Goto, -9)
        .op_u16(Opcode::Getstatic, count)
        .op(Opcode::Iconst1)
        .op(Opcode::Iadd)
        .op_u16(Opcode::Putstatic, count)
        .op(Opcode::Bipush)
        .i8(7)
        .op_u16(Opcode::Putstatic, value)
        .op(Opcode::Return)
        .build(2, 1);
    let slow_class = ClassDefinition::new(slow)
        .constants(slow_pool.build())
        .field("count", "I", ACC_PUBLIC | ACC_STATIC)
        .field("value", "I", ACC_PUBLIC | ACC_STATIC)
        .method("<clinit>", "()V", ACC_STATIC, Some(clinit));

    let mut pool = ConstantPoolBuilder::new();
    let read = pool.fieldref(slow, "value", "I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, read)
        .op(Opcode::Ireturn)
        .build(1, 0);

    let runtime = RuntimeBuilder::new()
        .config(VmConfig {
            quantum: 5,
            ..VmConfig::default()
        })
        .classes(vec![slow_class, main_class(pool, code, "()I")])
        .build();
    init_logging();
    let mut pool = ThreadPool::new(runtime.clone());
    let a = pool.spawn(MAIN, "main", "()I", vec![]).unwrap().success().unwrap();
    let b = pool.spawn(MAIN, "main", "()I", vec![]).unwrap().success().unwrap();
    assert_eq!(pool.run().unwrap(), PoolOutcome::Completed);

    assert_eq!(pool.thread(a).unwrap().exit_value(), Some(Value::Int(7)));
    assert_eq!(pool.thread(b).unwrap().exit_value(), Some(Value::Int(7)));
    let slow_class = runtime.load_class(slow).unwrap();
    assert_eq!(slow_class.get_field("count", "I").unwrap().static_value(), Value::Int(1));
}

// ============================================================================
// Fields
// ============================================================================

#[test]
fn test_getstatic_on_instance_field_is_incompatible() {
    let mut pool = ConstantPoolBuilder::new();
    let x = pool.fieldref(MAIN, "x", "I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, x)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let main = main_class(pool, code, "()I").field("x", "I", ACC_PUBLIC);
    let thread = run_classes(vec![main], "()I");
    assert_eq!(uncaught_class(&thread), "java/lang/IncompatibleClassChangeError");
}

#[test]
fn test_private_field_of_another_class_is_inaccessible() {
    let other = ClassDefinition::new("test/Other").field("secret", "I", ACC_PRIVATE | ACC_STATIC);
    let mut pool = ConstantPoolBuilder::new();
    let secret = pool.fieldref("test/Other", "secret", "I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, secret)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let thread = run_classes(vec![other, main_class(pool, code, "()I")], "()I");
    assert_eq!(uncaught_class(&thread), "java/lang/IllegalAccessError");
}

#[test]
fn test_final_static_assignable_only_from_clinit() {
    let mut pool = ConstantPoolBuilder::new();
    let limit = pool.fieldref(MAIN, "LIMIT", "I");
    let clinit = CodeBuilder::new()
        .op(Opcode::Iconst5)
        .op_u16(Opcode::Putstatic, limit)
        .op(Opcode::Return)
        .build(1, 0);
    let read = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, limit)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let write = CodeBuilder::new()
        .op(Opcode::Iconst1)
        .op_u16(Opcode::Putstatic, limit)
        .op(Opcode::Return)
        .build(1, 0);
    let main = main_class(pool, read, "()I")
        .field("LIMIT", "I", ACC_PUBLIC | ACC_STATIC | ACC_FINAL)
        .method("<clinit>", "()V", ACC_STATIC, Some(clinit))
        .method("overwrite", "()V", ACC_PUBLIC | ACC_STATIC, Some(write));
    let runtime = RuntimeBuilder::new().class(main).build();

    let thread = run_main(runtime.clone(), "()I", vec![]);
    assert_eq!(thread.exit_value(), Some(Value::Int(5)));

    let mut writer = Thread::new(runtime);
    writer.start(MAIN, "overwrite", "()V", vec![]).unwrap();
    writer.run_to_completion().unwrap();
    assert_eq!(uncaught_class(&writer), "java/lang/IllegalAccessError");
}

#[test]
fn test_constant_value_attribute_seeds_static() {
    let mut pool = ConstantPoolBuilder::new();
    let k = pool.fieldref(MAIN, "K", "I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, k)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let main = main_class(pool, code, "()I").field_with_constant(
        "K",
        "I",
        ACC_PUBLIC | ACC_STATIC | ACC_FINAL,
        Some(Value::Int(11)),
    );
    let thread = run_classes(vec![main], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(11)));
}

// ============================================================================
// Built-in natives
// ============================================================================

#[test]
fn test_overlapping_arraycopy_behaves_like_memmove() {
    let mut pool = ConstantPoolBuilder::new();
    let arraycopy = pool.methodref("java/lang/System", "arraycopy", "(Ljava/lang/Object;ILjava/lang/Object;II)V");
    // a = {0, 1, 2, 3, 4}; arraycopy(a, 0, a, 1, 4); return a[4]
    let code = CodeBuilder::new()
        .op(Opcode::Iconst5)
        .op(Opcode::Newarray)
        .u8(atype::T_INT)
        .op(Opcode::Astore0)
        .op(Opcode::Iconst0)
        .op(Opcode::Istore1)
        .op(Opcode::Iload1)
        .op(Opcode::Iconst5)
        .branch(Opcode::IfIcmpge, 13)
        .op(Opcode::Aload0)
        .op(Opcode::Iload1)
        .op(Opcode::Iload1)
        .op(Opcode::Iastore)
        .op(Opcode::Iinc)
        .u8(1)
        .i8(1)
        .branch(Opcode::Goto, -12)
        .op(Opcode::Aload0)
        .op(Opcode::Iconst0)
        .op(Opcode::Aload0)
        .op(Opcode::Iconst1)
        .op(Opcode::Iconst4)
        .op_u16(Opcode::Invokestatic, arraycopy)
        .op(Opcode::Aload0)
        .op(Opcode::Iconst4)
        .op(Opcode::Iaload)
        .op(Opcode::Ireturn)
        .build(5, 2);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(3)));
}

#[test]
fn test_arraycopy_between_primitive_kinds_is_rejected() {
    let mut pool = ConstantPoolBuilder::new();
    let arraycopy = pool.methodref("java/lang/System", "arraycopy", "(Ljava/lang/Object;ILjava/lang/Object;II)V");
    let code = CodeBuilder::new()
        .op(Opcode::Iconst1)
        .op(Opcode::Newarray)
        .u8(atype::T_INT)
        .op(Opcode::Iconst0)
        .op(Opcode::Iconst1)
        .op(Opcode::Newarray)
        .u8(atype::T_LONG)
        .op(Opcode::Iconst0)
        .op(Opcode::Iconst1)
        .op_u16(Opcode::Invokestatic, arraycopy)
        .op(Opcode::Return)
        .build(5, 0);
    let thread = run_classes(vec![main_class(pool, code, "()V")], "()V");
    let uncaught = thread.uncaught().unwrap();
    assert_eq!(uncaught.class_name, "java/lang/ArrayStoreException");
    assert_eq!(uncaught.message, "arraycopy: type mismatch: can not copy int[] into long[]");
}

#[test]
fn test_array_clone_copies_elements() {
    let mut pool = ConstantPoolBuilder::new();
    let clone = pool.methodref(OBJECT, "clone", "()Ljava/lang/Object;");
    let int_array = pool.class("[I");
    let code = CodeBuilder::new()
        .op(Opcode::Iconst3)
        .op(Opcode::Newarray)
        .u8(atype::T_INT)
        .op(Opcode::Dup)
        .op(Opcode::Iconst0)
        .op(Opcode::Bipush)
        .i8(7)
        .op(Opcode::Iastore)
        .op_u16(Opcode::Invokevirtual, clone)
        .op_u16(Opcode::Checkcast, int_array)
        .op(Opcode::Iconst0)
        .op(Opcode::Iaload)
        .op(Opcode::Ireturn)
        .build(4, 0);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(7)));
}

#[test]
fn test_class_get_name_is_dotted() {
    let mut pool = ConstantPoolBuilder::new();
    let this = pool.class(MAIN);
    let get_name = pool.methodref("java/lang/Class", "getName", "()Ljava/lang/String;");
    let length = pool.methodref("java/lang/String", "length", "()I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::LdcW, this)
        .op_u16(Opcode::Invokevirtual, get_name)
        .op_u16(Opcode::Invokevirtual, length)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int("test.Main".len() as i32)));
}

/// `main()J` opening with `Unsafe u = new Unsafe(); long p = u.allocateMemory(8)`
fn unsafe_program(pool: &mut ConstantPoolBuilder) -> CodeBuilder {
    let unsafe_class = pool.class(UNSAFE);
    let allocate = pool.methodref(UNSAFE, "allocateMemory", "(J)J");
    let eight = pool.long(8);
    CodeBuilder::new()
        .op_u16(Opcode::New, unsafe_class)
        .op(Opcode::Astore0)
        .op(Opcode::Aload0)
        .op_u16(Opcode::Ldc2W, eight)
        .op_u16(Opcode::Invokevirtual, allocate)
        .op(Opcode::Lstore1)
}

#[test]
fn test_unsafe_memory_round_trips_longs() {
    let mut pool = ConstantPoolBuilder::new();
    let put = pool.methodref(UNSAFE, "putLong", "(JJ)V");
    let get = pool.methodref(UNSAFE, "getLong", "(J)J");
    let value = pool.long(0x1122_3344_5566_7788);
    let code = unsafe_program(&mut pool)
        .op(Opcode::Aload0)
        .op(Opcode::Lload1)
        .op_u16(Opcode::Ldc2W, value)
        .op_u16(Opcode::Invokevirtual, put)
        .op(Opcode::Aload0)
        .op(Opcode::Lload1)
        .op_u16(Opcode::Invokevirtual, get)
        .op(Opcode::Lreturn)
        .build(5, 3);
    let thread = run_classes(vec![main_class(pool, code, "()J")], "()J");
    assert_eq!(thread.exit_value(), Some(Value::Long(0x1122_3344_5566_7788)));
}

#[test]
fn test_unsafe_read_after_free_throws() {
    let mut pool = ConstantPoolBuilder::new();
    let free = pool.methodref(UNSAFE, "freeMemory", "(J)V");
    let get = pool.methodref(UNSAFE, "getLong", "(J)J");
    let code = unsafe_program(&mut pool)
        .op(Opcode::Aload0)
        .op(Opcode::Lload1)
        .op_u16(Opcode::Invokevirtual, free)
        .op(Opcode::Aload0)
        .op(Opcode::Lload1)
        .op_u16(Opcode::Invokevirtual, get)
        .op(Opcode::Lreturn)
        .build(3, 3);
    let thread = run_classes(vec![main_class(pool, code, "()J")], "()J");
    assert_eq!(uncaught_class(&thread), "java/lang/IllegalArgumentException");
}

#[test]
fn test_unsafe_compare_and_swap_on_array_element() {
    let mut pool = ConstantPoolBuilder::new();
    let unsafe_class = pool.class(UNSAFE);
    let cas = pool.methodref(UNSAFE, "compareAndSwapInt", "(Ljava/lang/Object;JII)Z");
    let second = pool.long(4);
    // cas(a, 4, 0, 5) + a[1]
    let code = CodeBuilder::new()
        .op_u16(Opcode::New, unsafe_class)
        .op(Opcode::Astore0)
        .op(Opcode::Iconst2)
        .op(Opcode::Newarray)
        .u8(atype::T_INT)
        .op(Opcode::Astore1)
        .op(Opcode::Aload0)
        .op(Opcode::Aload1)
        .op_u16(Opcode::Ldc2W, second)
        .op(Opcode::Iconst0)
        .op(Opcode::Iconst5)
        .op_u16(Opcode::Invokevirtual, cas)
        .op(Opcode::Aload1)
        .op(Opcode::Iconst1)
        .op(Opcode::Iaload)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(6, 2);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(6)));
}

#[test]
fn test_unsafe_array_index_scale_reads_class_mirror() {
    let mut pool = ConstantPoolBuilder::new();
    let unsafe_class = pool.class(UNSAFE);
    let scale = pool.methodref(UNSAFE, "arrayIndexScale", "(Ljava/lang/Class;)I");
    let longs = pool.class("[J");
    let shorts = pool.class("[S");
    // scale([J) * 10 + scale([S)
    let code = CodeBuilder::new()
        .op_u16(Opcode::New, unsafe_class)
        .op(Opcode::Astore0)
        .op(Opcode::Aload0)
        .op_u16(Opcode::LdcW, longs)
        .op_u16(Opcode::Invokevirtual, scale)
        .op(Opcode::Bipush)
        .i8(10)
        .op(Opcode::Imul)
        .op(Opcode::Aload0)
        .op_u16(Opcode::LdcW, shorts)
        .op_u16(Opcode::Invokevirtual, scale)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(3, 1);
    let thread = run_classes(vec![main_class(pool, code, "()I")], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(82)));
}

// ============================================================================
// Method handles and invokedynamic
// ============================================================================

fn add_method() -> Code {
    CodeBuilder::new()
        .op(Opcode::Iload0)
        .op(Opcode::Iload1)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(2, 2)
}

#[test]
fn test_invoke_exact_through_method_handle_constant() {
    let mut pool = ConstantPoolBuilder::new();
    let add = pool.methodref(MAIN, "add", "(II)I");
    let handle = pool.method_handle(ReferenceKind::InvokeStatic, add);
    let invoke_exact = pool.methodref(METHOD_HANDLE, "invokeExact", "(II)I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::LdcW, handle)
        .op(Opcode::Iconst2)
        .op(Opcode::Iconst3)
        .op_u16(Opcode::Invokevirtual, invoke_exact)
        .op(Opcode::Ireturn)
        .build(3, 0);
    let main = main_class(pool, code, "()I").method("add", "(II)I", ACC_PUBLIC | ACC_STATIC, Some(add_method()));
    let thread = run_classes(vec![main], "()I");
    assert_eq!(thread.exit_value(), Some(Value::Int(5)));
}

#[test]
fn test_form_based_handle_passes_itself_to_entry() {
    let mut pool = ConstantPoolBuilder::new();
    let invoke_exact = pool.methodref(METHOD_HANDLE, "invokeExact", "(I)I");
    let code = CodeBuilder::new()
        .op(Opcode::Aload0)
        .op(Opcode::Bipush)
        .i8(21)
        .op_u16(Opcode::Invokevirtual, invoke_exact)
        .op(Opcode::Ireturn)
        .build(2, 1);
    let entry = CodeBuilder::new()
        .op(Opcode::Iload1)
        .op(Opcode::Iconst2)
        .op(Opcode::Imul)
        .op(Opcode::Ireturn)
        .build(2, 2);
    let main = main_class(pool, code, "(Ljava/lang/invoke/MethodHandle;)I").method(
        "viaForm",
        "(Ljava/lang/invoke/MethodHandle;I)I",
        ACC_STATIC,
        Some(entry),
    );
    let runtime = RuntimeBuilder::new().class(main).build();

    let target = runtime
        .load_class(MAIN)
        .unwrap()
        .find_method("viaForm", "(Ljava/lang/invoke/MethodHandle;I)I")
        .unwrap();
    let member = runtime.new_member_name(&target).unwrap();
    let form_class = runtime.load_class("java/lang/invoke/LambdaForm").unwrap();
    let handle_class = runtime.load_class(METHOD_HANDLE).unwrap();
    let handle = {
        let mut heap = runtime.heap();
        let form = heap.allocate_object(form_class);
        heap.object_mut(form)
            .unwrap()
            .set_field("java/lang/invoke/LambdaForm.vmentryLjava/lang/invoke/MemberName;", Value::object(member));
        let handle = heap.allocate_object(handle_class);
        heap.object_mut(handle)
            .unwrap()
            .set_field("java/lang/invoke/MethodHandle.formLjava/lang/invoke/LambdaForm;", Value::object(form));
        handle
    };

    let thread = run_main(runtime, "(Ljava/lang/invoke/MethodHandle;)I", vec![Value::object(handle)]);
    assert_eq!(thread.exit_value(), Some(Value::Int(42)));
}

static CALL_SITES_LINKED: AtomicUsize = AtomicUsize::new(0);

/// Host `linkCallSite`: every call site binds to `test/Main.triple(I)I`
fn link_call_site(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    CALL_SITES_LINKED.fetch_add(1, Ordering::SeqCst);
    let runtime = thread.runtime().clone();
    let target = runtime
        .load_class(MAIN)?
        .find_method("triple", "(I)I")
        .ok_or_else(|| VmError::MissingClass(MAIN.to_string()))?;
    let member = runtime.new_member_name(&target)?;
    thread.return_frame(Some(Value::object(member)))
}

#[test]
fn test_invokedynamic_links_once_and_calls_target() {
    let mut pool = ConstantPoolBuilder::new();
    let bootstrap = pool.methodref(MAIN, "bootstrap", "()V");
    let bootstrap_handle = pool.method_handle(ReferenceKind::InvokeStatic, bootstrap);
    let site = pool.invoke_dynamic(0, "apply", "(I)I");
    let apply = pool.methodref(MAIN, "apply", "(I)I");
    // apply(5) + apply(2), both through the one call site in `apply`
    let code = CodeBuilder::new()
        .op(Opcode::Iconst5)
        .op_u16(Opcode::Invokestatic, apply)
        .op(Opcode::Iconst2)
        .op_u16(Opcode::Invokestatic, apply)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(2, 0);
    let dynamic = CodeBuilder::new()
        .op(Opcode::Iload0)
        .op_u16(Opcode::Invokedynamic, site)
        .u16(0)
        .op(Opcode::Ireturn)
        .build(1, 1);
    let triple = CodeBuilder::new()
        .op(Opcode::Iload0)
        .op(Opcode::Iconst3)
        .op(Opcode::Imul)
        .op(Opcode::Ireturn)
        .build(2, 1);
    let mut main = main_class(pool, code, "()I")
        .method("bootstrap", "()V", ACC_STATIC, Some(CodeBuilder::new().op(Opcode::Return).build(0, 0)))
        .method("apply", "(I)I", ACC_STATIC, Some(dynamic))
        .method("triple", "(I)I", ACC_STATIC, Some(triple));
    main.bootstrap_method(bootstrap_handle, vec![]);

    let runtime = RuntimeBuilder::new()
        .class(main)
        .native(
            "java/lang/invoke/MethodHandleNatives",
            "linkCallSite(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/invoke/MemberName;",
            link_call_site,
        )
        .build();
    let thread = run_main(runtime, "()I", vec![]);
    assert_eq!(thread.exit_value(), Some(Value::Int(21)));
    assert_eq!(CALL_SITES_LINKED.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Threads and monitors
// ============================================================================

/// `test/Shared` with a static lock created in `<clinit>` and a static
/// counter
fn shared_class(methods: Vec<(&str, Code)>, pool: ConstantPoolBuilder) -> ClassDefinition {
    methods.into_iter().fold(
        ClassDefinition::new("test/Shared")
            .constants(pool.build())
            .field("lock", "Ljava/lang/Object;", ACC_STATIC)
            .field("counter", "I", ACC_STATIC),
        |class, (name, code)| {
            let descriptor = if name == "<clinit>" { "()V" } else { "()I" };
            class.method(name, descriptor, ACC_STATIC, Some(code))
        },
    )
}

fn lock_initializer(pool: &mut ConstantPoolBuilder) -> Code {
    let object = pool.class(OBJECT);
    let init = pool.methodref(OBJECT, "<init>", "()V");
    let lock = pool.fieldref("test/Shared", "lock", "Ljava/lang/Object;");
    CodeBuilder::new()
        .op_u16(Opcode::New, object)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, init)
        .op_u16(Opcode::Putstatic, lock)
        .op(Opcode::Return)
        .build(2, 0)
}

#[test]
fn test_monitor_serializes_read_modify_write_across_threads() {
    let mut pool = ConstantPoolBuilder::new();
    let clinit = lock_initializer(&mut pool);
    let lock = pool.fieldref("test/Shared", "lock", "Ljava/lang/Object;");
    let counter = pool.fieldref("test/Shared", "counter", "I");
    // synchronized (lock) { int c = counter; spin 20; counter = ++c; } return c
    let bump = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, lock)
        .op(Opcode::Dup)
        .op(Opcode::Astore0)
        .op(Opcode::Monitorenter)
        .op_u16(Opcode::Getstatic, counter)
        .op(Opcode::Istore1)
        .op(Opcode::Iconst0)
        .op(Opcode::Istore2)
        .op(Opcode::Iload2)
        .op(Opcode::Bipush)
        .i8(20)
        .branch(Opcode::IfIcmpge, 9)
        .op(Opcode::Iinc)
        .u8(2)
        .i8(1)
        .branch(Opcode::Goto, -9)
        .op(Opcode::Iinc)
        .u8(1)
        .i8(1)
        .op(Opcode::Iload1)
        .op_u16(Opcode::Putstatic, counter)
        .op(Opcode::Aload0)
        .op(Opcode::Monitorexit)
        .op(Opcode::Iload1)
        .op(Opcode::Ireturn)
        .build(2, 3);
    let shared = shared_class(vec![("<clinit>", clinit), ("bump", bump)], pool);

    let runtime = RuntimeBuilder::new()
        .config(VmConfig {
            quantum: 5,
            ..VmConfig::default()
        })
        .class(shared)
        .build();
    init_logging();
    let mut threads = ThreadPool::new(runtime.clone());
    let a = threads.spawn("test/Shared", "bump", "()I", vec![]).unwrap().success().unwrap();
    let b = threads.spawn("test/Shared", "bump", "()I", vec![]).unwrap().success().unwrap();
    assert_eq!(threads.run().unwrap(), PoolOutcome::Completed);

    let mut results: Vec<i32> = [a, b]
        .iter()
        .map(|&id| threads.thread(id).unwrap().exit_value().unwrap().as_int().unwrap())
        .collect();
    results.sort_unstable();
    assert_eq!(results, vec![1, 2]);
}

fn wait_and_notify_program() -> ClassDefinition {
    let mut pool = ConstantPoolBuilder::new();
    let clinit = lock_initializer(&mut pool);
    let lock = pool.fieldref("test/Shared", "lock", "Ljava/lang/Object;");
    let wait = pool.methodref(OBJECT, "wait", "()V");
    let notify = pool.methodref(OBJECT, "notify", "()V");
    let waiter = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, lock)
        .op(Opcode::Dup)
        .op(Opcode::Astore0)
        .op(Opcode::Monitorenter)
        .op(Opcode::Aload0)
        .op_u16(Opcode::Invokevirtual, wait)
        .op(Opcode::Aload0)
        .op(Opcode::Monitorexit)
        .op(Opcode::Iconst1)
        .op(Opcode::Ireturn)
        .build(2, 1);
    let notifier = CodeBuilder::new()
        .op_u16(Opcode::Getstatic, lock)
        .op(Opcode::Dup)
        .op(Opcode::Astore0)
        .op(Opcode::Monitorenter)
        .op(Opcode::Aload0)
        .op_u16(Opcode::Invokevirtual, notify)
        .op(Opcode::Aload0)
        .op(Opcode::Monitorexit)
        .op(Opcode::Iconst2)
        .op(Opcode::Ireturn)
        .build(2, 1);
    shared_class(vec![("<clinit>", clinit), ("waiter", waiter), ("notifier", notifier)], pool)
}

#[test]
fn test_wait_resumes_after_notify() {
    let runtime = RuntimeBuilder::new().class(wait_and_notify_program()).build();
    init_logging();
    let mut threads = ThreadPool::new(runtime);
    let waiter = threads.spawn("test/Shared", "waiter", "()I", vec![]).unwrap().success().unwrap();
    let notifier = threads.spawn("test/Shared", "notifier", "()I", vec![]).unwrap().success().unwrap();
    assert_eq!(threads.run().unwrap(), PoolOutcome::Completed);
    assert_eq!(threads.thread(waiter).unwrap().exit_value(), Some(Value::Int(1)));
    assert_eq!(threads.thread(notifier).unwrap().exit_value(), Some(Value::Int(2)));
}

#[test]
fn test_wait_without_notify_is_reported_as_deadlock() {
    let runtime = RuntimeBuilder::new().class(wait_and_notify_program()).build();
    let mut threads = ThreadPool::new(runtime);
    let waiter = threads.spawn("test/Shared", "waiter", "()I", vec![]).unwrap().success().unwrap();
    assert_eq!(threads.run().unwrap(), PoolOutcome::Deadlocked { blocked: vec![waiter] });
    assert_eq!(threads.thread(waiter).unwrap().status(), ThreadStatus::Waiting);
}

#[test]
fn test_wait_without_owning_monitor_throws() {
    let mut pool = ConstantPoolBuilder::new();
    let object = pool.class(OBJECT);
    let init = pool.methodref(OBJECT, "<init>", "()V");
    let notify = pool.methodref(OBJECT, "notify", "()V");
    let code = CodeBuilder::new()
        .op_u16(Opcode::New, object)
        .op(Opcode::Dup)
        .op_u16(Opcode::Invokespecial, init)
        .op_u16(Opcode::Invokevirtual, notify)
        .op(Opcode::Return)
        .build(2, 0);
    let thread = run_classes(vec![main_class(pool, code, "()V")], "()V");
    assert_eq!(uncaught_class(&thread), "java/lang/IllegalMonitorStateException");
}

#[test]
fn test_native_method_declared_on_guest_class() {
    fn seven(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
        thread.return_frame(Some(Value::Int(7)))
    }
    let mut pool = ConstantPoolBuilder::new();
    let native = pool.methodref(MAIN, "seven", "()I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Invokestatic, native)
        .op(Opcode::Ireturn)
        .build(1, 0);
    let main = main_class(pool, code, "()I").method("seven", "()I", ACC_STATIC | ACC_NATIVE, None);
    let runtime = RuntimeBuilder::new().class(main).native(MAIN, "seven()I", seven).build();
    let thread = run_main(runtime, "()I", vec![]);
    assert_eq!(thread.exit_value(), Some(Value::Int(7)));
}
