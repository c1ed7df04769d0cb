//! Contract tests: the resolution protocol other components rely on

use class_model::{
    BootstrapLoader, CallSite, CallSiteRequest, ClassData, ClassDefinition, ClassLoader, ConstantKind,
    ConstantPoolBuilder, InitAction, InitState, ReferenceKind, ResolutionContext, ResolvedConstant,
    ACC_STATIC,
};
use bytecode_system::{CodeBuilder, Opcode};
use core_types::{ObjectRef, ThreadId, VmResult};
use std::sync::Arc;

struct Host {
    loader: Arc<BootstrapLoader>,
}

impl ResolutionContext for Host {
    fn thread_id(&self) -> ThreadId {
        ThreadId(7)
    }

    fn loader(&self) -> Arc<dyn ClassLoader> {
        self.loader.clone()
    }

    fn intern_string(&mut self, _: &str) -> VmResult<ObjectRef> {
        VmResult::Success(ObjectRef(1))
    }

    fn link_method_type(&mut self, _: &Arc<ClassData>, _: u16, _: &str) -> VmResult<ObjectRef> {
        VmResult::Success(ObjectRef(2))
    }

    fn link_method_handle(
        &mut self,
        owner: &Arc<ClassData>,
        index: u16,
        _: ReferenceKind,
        _: &ResolvedConstant,
    ) -> VmResult<ObjectRef> {
        // Simulate guest linkage finishing later and storing its own result.
        owner
            .constant_pool()
            .store(index, ResolvedConstant::MethodHandle(ObjectRef(3)));
        VmResult::Defer
    }

    fn link_call_site(&mut self, _: &Arc<ClassData>, _: u16, _: CallSiteRequest) -> VmResult<CallSite> {
        VmResult::Defer
    }
}

/// Every entry reports its kind through the pool
#[test]
fn test_contract_constant_kinds() {
    let mut pool = ConstantPoolBuilder::new();
    let long = pool.long(1);
    let method = pool.interface_methodref("a/I", "m", "()V");
    let loader = Arc::new(BootstrapLoader::new());
    loader.register(ClassDefinition::new("java/lang/Object"));
    loader.register(ClassDefinition::new("a/Main").constants(pool.build()));
    let main = loader.load_class("a/Main").success().unwrap();
    let constants = main.constant_pool();
    assert_eq!(constants.kind(long), Some(ConstantKind::Long));
    assert_eq!(constants.kind(long + 1), Some(ConstantKind::Unusable));
    assert_eq!(constants.kind(method), Some(ConstantKind::InterfaceMethodref));
}

/// A deferred link completes through the pool cache, and the retry sees it
#[test]
fn test_contract_deferred_link_is_picked_up_on_retry() {
    let mut pool = ConstantPoolBuilder::new();
    let target = pool.methodref("a/Main", "run", "()V");
    let handle = pool.method_handle(ReferenceKind::InvokeStatic, target);
    let loader = Arc::new(BootstrapLoader::new());
    loader.register(ClassDefinition::new("java/lang/Object"));
    loader.register(
        ClassDefinition::new("a/Main")
            .constants(pool.build())
            .method("run", "()V", ACC_STATIC, Some(CodeBuilder::new().op(Opcode::Return).build(0, 0))),
    );
    let main = loader.load_class("a/Main").success().unwrap();
    let mut host = Host { loader };

    assert!(main.resolve_constant(handle, &mut host).is_defer());
    match main.resolve_constant(handle, &mut host).success() {
        Some(ResolvedConstant::MethodHandle(obj)) => assert_eq!(obj, ObjectRef(3)),
        other => panic!("unexpected {:?}", other),
    }
}

/// `<clinit>` is handed out exactly once; other threads defer until it ends
#[test]
fn test_contract_initializer_handed_out_once() {
    let loader = BootstrapLoader::new();
    loader.register(ClassDefinition::new("java/lang/Object"));
    loader.register(ClassDefinition::new("a/Lazy").method(
        "<clinit>",
        "()V",
        ACC_STATIC,
        Some(CodeBuilder::new().op(Opcode::Return).build(0, 0)),
    ));
    let lazy = loader.load_class("a/Lazy").success().unwrap();

    let runs = (0..3)
        .map(|_| lazy.begin_initialization(ThreadId(1)))
        .filter(|a| matches!(a, InitAction::RunInitializer(_)))
        .count();
    assert_eq!(runs, 1);
    assert_eq!(lazy.init_state(), InitState::Initializing(ThreadId(1)));
    assert!(matches!(lazy.begin_initialization(ThreadId(2)), InitAction::Defer));
    lazy.finish_initialization(true);
    assert!(matches!(lazy.begin_initialization(ThreadId(2)), InitAction::Ready));
}
