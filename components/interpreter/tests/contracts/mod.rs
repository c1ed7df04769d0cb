//! Contract tests for the interpreter's public API
//!
//! These pin the behavior hosts rely on: the dispatch table, native and
//! intrinsic injection, thread status reporting and the runtime services.

use bytecode_system::{CodeBuilder, Opcode};
use class_model::{ClassDefinition, ConstantPoolBuilder, ACC_NATIVE, ACC_PUBLIC, ACC_STATIC};
use core_types::{Value, VmError};
use interpreter::{
    DispatchTable, IntrinsicRegistry, NativeRegistry, PoolOutcome, RuntimeBuilder, Thread, ThreadPool,
    ThreadStatus, VmConfig,
};

const HOST: &str = "test/Host";
const MAIN: &str = "test/Main";

fn answer(thread: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    thread.return_frame(Some(Value::Int(42)))
}

fn double_it(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let n = args[0].as_int()?;
    thread.return_frame(Some(Value::Int(n * 2)))
}

/// Never returns its frame; the host finishes it later
fn pending(_: &mut Thread, _: &[Value]) -> Result<(), VmError> {
    Ok(())
}

/// `test/Main.main()I` calling `test/Host.<name>()I`
fn caller(name: &str) -> ClassDefinition {
    let mut pool = ConstantPoolBuilder::new();
    let target = pool.methodref(HOST, name, "()I");
    let code = CodeBuilder::new()
        .op_u16(Opcode::Invokestatic, target)
        .op(Opcode::Iconst1)
        .op(Opcode::Iadd)
        .op(Opcode::Ireturn)
        .build(2, 0);
    ClassDefinition::new(MAIN)
        .constants(pool.build())
        .method("main", "()I", ACC_PUBLIC | ACC_STATIC, Some(code))
}

fn host_class() -> ClassDefinition {
    let bytecode = CodeBuilder::new().op(Opcode::Iconst1).op(Opcode::Ireturn).build(1, 1);
    ClassDefinition::new(HOST)
        .method("answer", "()I", ACC_PUBLIC | ACC_STATIC | ACC_NATIVE, None)
        .method("missing", "()I", ACC_PUBLIC | ACC_STATIC | ACC_NATIVE, None)
        .method("slow", "()I", ACC_PUBLIC | ACC_STATIC | ACC_NATIVE, None)
        .method("twice", "(I)I", ACC_PUBLIC | ACC_STATIC | ACC_NATIVE, None)
        .method("compute", "()I", ACC_PUBLIC | ACC_STATIC, Some(bytecode))
}

// ============================================================================
// Dispatch table
// ============================================================================

#[test]
fn test_dispatch_table_covers_instruction_set() {
    let table = DispatchTable::new();
    assert!(table.is_implemented(Opcode::Nop.byte()));
    assert!(table.is_implemented(Opcode::Invokedynamic.byte()));
    assert!(table.is_implemented(Opcode::Multianewarray.byte()));
    assert!(!table.is_implemented(Opcode::Breakpoint.byte()));
    assert!(!table.is_implemented(0xff));
}

#[test]
fn test_dispatch_table_handler_can_be_replaced() {
    fn halt(t: &mut Thread) -> Result<(), VmError> {
        t.return_frame(Some(Value::Int(-1)))
    }
    let mut table = DispatchTable::new();
    table.set(Opcode::Breakpoint, halt);
    assert!(table.is_implemented(Opcode::Breakpoint.byte()));
}

// ============================================================================
// Natives and intrinsics
// ============================================================================

#[test]
fn test_registered_native_runs_in_place_of_body() {
    let runtime = RuntimeBuilder::new()
        .class(host_class())
        .class(caller("answer"))
        .native(HOST, "answer()I", answer)
        .build();
    let mut thread = Thread::new(runtime);
    assert!(thread.start(MAIN, "main", "()I", vec![]).unwrap().is_success());
    assert_eq!(thread.run_to_completion().unwrap(), ThreadStatus::Terminated);
    assert_eq!(thread.exit_value(), Some(Value::Int(43)));
}

#[test]
fn test_native_receives_compact_arguments() {
    let runtime = RuntimeBuilder::new()
        .class(host_class())
        .native(HOST, "twice(I)I", double_it)
        .build();
    let mut thread = Thread::new(runtime);
    assert!(thread.start(HOST, "twice", "(I)I", vec![Value::Int(21)]).unwrap().is_success());
    thread.run_to_completion().unwrap();
    assert_eq!(thread.exit_value(), Some(Value::Int(42)));
}

#[test]
fn test_unbound_native_throws_unsatisfied_link_error() {
    let runtime = RuntimeBuilder::new().class(host_class()).class(caller("missing")).build();
    let mut thread = Thread::new(runtime);
    thread.start(MAIN, "main", "()I", vec![]).unwrap();
    thread.run_to_completion().unwrap();
    let uncaught = thread.uncaught().unwrap();
    assert_eq!(uncaught.class_name, "java/lang/UnsatisfiedLinkError");
    assert!(uncaught.message.contains("missing"));
}

#[test]
fn test_intrinsic_overrides_bytecode() {
    let runtime = RuntimeBuilder::new()
        .class(host_class())
        .class(caller("compute"))
        .intrinsic(HOST, "compute()I", answer)
        .build();
    let mut thread = Thread::new(runtime);
    thread.start(MAIN, "main", "()I", vec![]).unwrap();
    thread.run_to_completion().unwrap();
    assert_eq!(thread.exit_value(), Some(Value::Int(43)));
}

#[test]
fn test_pending_native_parks_until_completed() {
    let runtime = RuntimeBuilder::new()
        .class(host_class())
        .class(caller("slow"))
        .native(HOST, "slow()I", pending)
        .build();
    let mut thread = Thread::new(runtime);
    thread.start(MAIN, "main", "()I", vec![]).unwrap();
    assert_eq!(thread.run_to_completion().unwrap(), ThreadStatus::Waiting);
    assert_eq!(thread.depth(), 2);

    thread.complete_pending(Some(Value::Int(9))).unwrap();
    assert_eq!(thread.run_to_completion().unwrap(), ThreadStatus::Terminated);
    assert_eq!(thread.exit_value(), Some(Value::Int(10)));
}

#[test]
fn test_pending_native_reported_as_blocked_by_pool() {
    let runtime = RuntimeBuilder::new()
        .class(host_class())
        .class(caller("slow"))
        .native(HOST, "slow()I", pending)
        .build();
    let mut pool = ThreadPool::new(runtime);
    let id = pool.spawn(MAIN, "main", "()I", vec![]).unwrap().success().unwrap();
    assert_eq!(pool.run().unwrap(), PoolOutcome::Deadlocked { blocked: vec![id] });

    pool.thread_mut(id).unwrap().complete_pending(Some(Value::Int(0))).unwrap();
    assert_eq!(pool.run().unwrap(), PoolOutcome::Completed);
    assert_eq!(pool.thread(id).unwrap().exit_value(), Some(Value::Int(1)));
}

#[test]
fn test_registries_merge_and_replace() {
    let mut natives = NativeRegistry::new();
    natives.register(HOST, "answer()I", answer);
    let mut more = NativeRegistry::new();
    more.register(HOST, "twice(I)I", double_it);
    natives.merge(more);
    assert_eq!(natives.len(), 2);

    let mut intrinsics = IntrinsicRegistry::new();
    assert!(intrinsics.is_empty());
    intrinsics.register(HOST, "compute()I", answer);
    assert!(intrinsics.get(HOST, "compute()I").is_some());
    assert!(intrinsics.get(HOST, "compute()J").is_none());
}

#[test]
fn test_builtins_can_be_left_out() {
    let runtime = RuntimeBuilder::new()
        .config(VmConfig {
            install_builtin_natives: false,
            ..VmConfig::default()
        })
        .build();
    assert!(runtime.natives().get("java/lang/Object", "hashCode()I").is_none());
    assert!(runtime.intrinsics().is_empty());
}

// ============================================================================
// Thread lifecycle
// ============================================================================

#[test]
fn test_thread_status_lifecycle() {
    let code = CodeBuilder::new().op(Opcode::Return).build(0, 0);
    let runtime = RuntimeBuilder::new()
        .class(ClassDefinition::new(MAIN).method("main", "()V", ACC_PUBLIC | ACC_STATIC, Some(code)))
        .build();
    let mut thread = Thread::new(runtime);
    assert_eq!(thread.status(), ThreadStatus::New);
    thread.start(MAIN, "main", "()V", vec![]).unwrap();
    assert_eq!(thread.status(), ThreadStatus::Runnable);
    assert_eq!(thread.run_to_completion().unwrap(), ThreadStatus::Terminated);
    assert_eq!(thread.exit_value(), None);
    assert!(thread.uncaught().is_none());
}

#[test]
fn test_start_reports_missing_method() {
    let runtime = RuntimeBuilder::new().class(ClassDefinition::new(MAIN)).build();
    let mut thread = Thread::new(runtime);
    let started = thread.start(MAIN, "main", "()V", vec![]).unwrap();
    assert_eq!(started.error_result().unwrap().exception_class, "java/lang/NoSuchMethodError");
    assert_eq!(thread.status(), ThreadStatus::New);
}

#[test]
fn test_start_reports_missing_class() {
    let runtime = RuntimeBuilder::new().build();
    let mut thread = Thread::new(runtime.clone());
    assert!(thread.start("no/Such", "main", "()V", vec![]).unwrap().is_error());

    let mut pool = ThreadPool::new(runtime);
    assert!(pool.spawn("no/Such", "main", "()V", vec![]).unwrap().is_error());
    assert!(pool.threads().is_empty());
}

#[test]
fn test_thread_ids_are_unique() {
    let runtime = RuntimeBuilder::new().build();
    let a = Thread::new(runtime.clone());
    let b = Thread::new(runtime);
    assert_ne!(a.id(), b.id());
}

// ============================================================================
// Runtime services
// ============================================================================

#[test]
fn test_interned_strings_are_shared() {
    let runtime = RuntimeBuilder::new().build();
    let first = runtime.intern("hello").unwrap();
    assert_eq!(runtime.intern("hello").unwrap(), first);
    let fresh = runtime.new_string("hello").unwrap();
    assert_ne!(fresh, first);
    assert_eq!(runtime.intern_object(fresh).unwrap(), first);
    assert_eq!(runtime.string_value(fresh).unwrap(), "hello");
}

#[test]
fn test_mirror_is_stable_and_reversible() {
    let runtime = RuntimeBuilder::new().build();
    let string = runtime.load_class("java/lang/String").unwrap();
    let mirror = runtime.mirror(&string).unwrap();
    assert_eq!(runtime.mirror(&string).unwrap(), mirror);
    assert_eq!(runtime.class_of_mirror(mirror).unwrap().name(), "java/lang/String");
}

#[test]
fn test_method_type_keeps_descriptor() {
    let runtime = RuntimeBuilder::new().build();
    let method_type = runtime.new_method_type("(IJ)V").unwrap();
    assert_eq!(runtime.method_type_descriptor(method_type).unwrap(), "(IJ)V");
}

#[test]
fn test_wakeups_are_fifo() {
    let runtime = RuntimeBuilder::new().build();
    let a = runtime.next_thread_id();
    let b = runtime.next_thread_id();
    runtime.post_wakeup(a);
    runtime.post_wakeup(b);
    assert_eq!(runtime.pending_wakeups(), 2);
    assert_eq!(runtime.take_wakeup(), Some(a));
    assert_eq!(runtime.take_wakeup(), Some(b));
    assert_eq!(runtime.take_wakeup(), None);
}
