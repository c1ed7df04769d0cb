//! Constant resolution hooks backed by a running thread.
//!
//! Method handle constants and call sites are produced by guest code in
//! `java/lang/invoke/MethodHandleNatives`. The thread pushes an internal
//! frame for the linkage method, answers `Defer`, and the frame's
//! continuation records the outcome in the constant pool so the retried
//! instruction finds it cached.

use crate::frame::{Continuation, FrameOutcome, StackFrame};
use crate::invoke;
use crate::runtime::Runtime;
use crate::thread::Thread;
use class_model::{
    CallSite, CallSiteRequest, ClassData, ClassLoader, MethodRef, ReferenceKind, ResolutionContext, ResolvedConstant,
};
use core_types::{ErrorResult, MethodDescriptor, ObjectRef, ThreadId, Value, VmError, VmResult};
use memory_manager::ArrayStorage;
use std::sync::Arc;
use tracing::{debug, warn};

const METHOD_HANDLE_NATIVES: &str = "java/lang/invoke/MethodHandleNatives";
const LINK_METHOD_HANDLE_CONSTANT: &str =
    "(Ljava/lang/Class;ILjava/lang/Class;Ljava/lang/String;Ljava/lang/Object;)Ljava/lang/invoke/MethodHandle;";
const LINK_CALL_SITE: &str = "(Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/invoke/MemberName;";

/// Host faults during linkage surface to the guest as `InternalError`
fn host<T>(result: Result<T, VmError>) -> VmResult<T> {
    match result {
        Ok(value) => VmResult::Success(value),
        Err(err) => VmResult::error("java/lang/InternalError", err.to_string()),
    }
}

impl Thread {
    /// Run `class_name.name descriptor` in an internal frame whose outcome
    /// goes to `continuation`.
    ///
    /// Answers `Defer` without pushing anything when the class first needs
    /// initializing.
    pub fn call_internal(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
        continuation: Continuation,
    ) -> Result<VmResult<()>, VmError> {
        let class = match self.runtime().loader().load_class(class_name) {
            VmResult::Success(class) => class,
            other => return Ok(other.map(|_| ())),
        };
        match self.initialize_class(&class)? {
            VmResult::Success(()) => {}
            other => return Ok(other),
        }
        let Some(method) = class.get_method(&format!("{}{}", name, descriptor)) else {
            return Ok(VmResult::error(
                "java/lang/NoSuchMethodError",
                format!("{}.{}{}", class_name, name, descriptor),
            ));
        };
        let method = MethodRef::new(class, method);
        let body = match invoke::select_body(self.runtime(), &method) {
            VmResult::Success(body) => body,
            other => return Ok(other.map(|_| ())),
        };
        self.invoke_frame(StackFrame::internal(method, args, body, continuation));
        Ok(VmResult::Success(()))
    }

    fn method_handle_arguments(
        &self,
        owner: &Arc<ClassData>,
        kind: ReferenceKind,
        target: &ResolvedConstant,
    ) -> Result<VmResult<Vec<Value>>, VmError> {
        let runtime = self.runtime();
        let (declaring, name, member_type) = match target {
            ResolvedConstant::Method(method) => (
                method.class.clone(),
                method.method.name().to_string(),
                runtime.new_method_type(method.method.descriptor())?,
            ),
            ResolvedConstant::Field(field) => {
                let field_class = match runtime.loader().load_class(&field.field.java_type().class_name()) {
                    VmResult::Success(class) => class,
                    other => return Ok(other.map(|_| Vec::new())),
                };
                (field.class.clone(), field.field.name().to_string(), runtime.mirror(&field_class)?)
            }
            _ => {
                return Ok(VmResult::error(
                    "java/lang/ClassFormatError",
                    "method handle target is not a member",
                ))
            }
        };
        Ok(VmResult::Success(vec![
            Value::object(runtime.mirror(owner)?),
            Value::Int(kind as i32),
            Value::object(runtime.mirror(&declaring)?),
            Value::object(runtime.intern(&name)?),
            Value::object(member_type),
        ]))
    }

    fn call_site_arguments(
        &self,
        owner: &Arc<ClassData>,
        request: &CallSiteRequest,
    ) -> Result<(Vec<Value>, ObjectRef), VmError> {
        let runtime = self.runtime();
        let statics = request
            .static_arguments
            .iter()
            .map(|argument| static_argument(runtime, argument))
            .collect::<Result<Vec<_>, _>>()?;
        let appendix = runtime.new_reference_array("java/lang/Object", &[None])?;
        let args = vec![
            Value::object(runtime.mirror(owner)?),
            Value::object(request.bootstrap),
            Value::object(runtime.intern(&request.name)?),
            Value::object(runtime.new_method_type(&request.descriptor)?),
            Value::object(runtime.new_reference_array("java/lang/Object", &statics)?),
            Value::object(appendix),
        ];
        Ok((args, appendix))
    }
}

fn static_argument(runtime: &Runtime, argument: &ResolvedConstant) -> Result<Option<ObjectRef>, VmError> {
    Ok(match argument {
        ResolvedConstant::String(r) | ResolvedConstant::MethodType(r) | ResolvedConstant::MethodHandle(r) => Some(*r),
        ResolvedConstant::Class(class) => Some(runtime.mirror(class)?),
        other => {
            warn!(argument = ?other, "bootstrap static argument has no object form; passing null");
            None
        }
    })
}

/// Record a linkage failure reported by guest code
fn store_failure(thread: &Thread, owner: &ClassData, index: u16, exception: ObjectRef) -> Result<(), VmError> {
    let err = thread.describe_exception(exception)?;
    debug!(class = owner.name(), index, exception = %err, "linkage failed");
    owner.constant_pool().store_error(index, err);
    Ok(())
}

impl ResolutionContext for Thread {
    fn thread_id(&self) -> ThreadId {
        self.id()
    }

    fn loader(&self) -> Arc<dyn ClassLoader> {
        self.runtime().loader().clone()
    }

    fn intern_string(&mut self, text: &str) -> VmResult<ObjectRef> {
        host(self.runtime().intern(text))
    }

    fn link_method_type(&mut self, _owner: &Arc<ClassData>, _index: u16, descriptor: &str) -> VmResult<ObjectRef> {
        if let Err(err) = MethodDescriptor::parse(descriptor) {
            return VmResult::error("java/lang/ClassFormatError", err.to_string());
        }
        host(self.runtime().new_method_type(descriptor))
    }

    fn link_method_handle(
        &mut self,
        owner: &Arc<ClassData>,
        index: u16,
        kind: ReferenceKind,
        target: &ResolvedConstant,
    ) -> VmResult<ObjectRef> {
        let args = match host(self.method_handle_arguments(owner, kind, target)) {
            VmResult::Success(VmResult::Success(args)) => args,
            VmResult::Success(other) => return other.map(|_| ObjectRef(0)),
            VmResult::Error(err) => return VmResult::Error(err),
            VmResult::Defer => return VmResult::Defer,
        };
        let pool_owner = owner.clone();
        let continuation: Continuation = Box::new(move |thread: &mut Thread, outcome: FrameOutcome| {
            match outcome {
                FrameOutcome::Returned(Some(Value::Reference(Some(handle)))) => {
                    pool_owner.constant_pool().store(index, ResolvedConstant::MethodHandle(handle));
                }
                FrameOutcome::Returned(_) => pool_owner.constant_pool().store_error(
                    index,
                    ErrorResult::new("java/lang/InternalError", "linkMethodHandleConstant returned null"),
                ),
                FrameOutcome::Threw(exception) => store_failure(thread, &pool_owner, index, exception)?,
            }
            Ok(())
        });
        debug!(class = owner.name(), index, ?kind, "linking method handle constant");
        match host(self.call_internal(
            METHOD_HANDLE_NATIVES,
            "linkMethodHandleConstant",
            LINK_METHOD_HANDLE_CONSTANT,
            args,
            continuation,
        )) {
            VmResult::Success(VmResult::Error(err)) | VmResult::Error(err) => VmResult::Error(err),
            _ => VmResult::Defer,
        }
    }

    fn link_call_site(&mut self, owner: &Arc<ClassData>, index: u16, request: CallSiteRequest) -> VmResult<CallSite> {
        let (args, appendix) = match host(self.call_site_arguments(owner, &request)) {
            VmResult::Success(prepared) => prepared,
            other => return other.map(|_| CallSite { target: ObjectRef(0), appendix: None }),
        };
        let pool_owner = owner.clone();
        let continuation: Continuation = Box::new(move |thread: &mut Thread, outcome: FrameOutcome| {
            match outcome {
                FrameOutcome::Returned(Some(Value::Reference(Some(target)))) => {
                    let appendix = match thread.runtime().heap().array(appendix)?.storage() {
                        ArrayStorage::Reference(slots) => slots.first().copied().flatten(),
                        _ => None,
                    };
                    pool_owner
                        .constant_pool()
                        .store(index, ResolvedConstant::CallSite(CallSite { target, appendix }));
                }
                FrameOutcome::Returned(_) => pool_owner.constant_pool().store_error(
                    index,
                    ErrorResult::new("java/lang/BootstrapMethodError", "linkCallSite returned null"),
                ),
                FrameOutcome::Threw(exception) => store_failure(thread, &pool_owner, index, exception)?,
            }
            Ok(())
        });
        debug!(class = owner.name(), index, name = %request.name, "linking call site");
        match host(self.call_internal(METHOD_HANDLE_NATIVES, "linkCallSite", LINK_CALL_SITE, args, continuation)) {
            VmResult::Success(VmResult::Error(err)) | VmResult::Error(err) => VmResult::Error(err),
            _ => VmResult::Defer,
        }
    }
}
