//! Method invocation: body selection, argument passing and the `invoke*`
//! instructions, including signature-polymorphic method handle calls.

use crate::frame::{FrameBody, StackFrame};
use crate::runtime::{Runtime, FORM_VMENTRY, HANDLE_FORM, KIND_SLOT, VMTARGET_SLOT};
use crate::thread::{Thread, ThreadStatus};
use class_model::{ClassData, Constant, MethodRef, ReferenceKind, ResolvedConstant};
use core_types::{ErrorResult, MethodDescriptor, ObjectRef, Value, VmError, VmResult};
use memory_manager::{EnterOutcome, NativeSlot};
use std::sync::Arc;
use tracing::debug;

const NPE: &str = "java/lang/NullPointerException";
const ICCE: &str = "java/lang/IncompatibleClassChangeError";

fn describe(method: &MethodRef) -> String {
    format!("{}.{}{}", method.class.name(), method.method.name(), method.method.descriptor())
}

/// What runs when `method` is invoked: an intrinsic, a registered native or
/// the method's own bytecode
pub(crate) fn select_body(runtime: &Runtime, method: &MethodRef) -> VmResult<FrameBody> {
    let class = method.class.name();
    let signature = method.method.signature();
    if let Some(intrinsic) = runtime.intrinsics().get(class, &signature) {
        return VmResult::Success(FrameBody::Native(intrinsic));
    }
    if method.method.is_native() {
        return match runtime.natives().get(class, &signature) {
            Some(native) => VmResult::Success(FrameBody::Native(native)),
            None => VmResult::error("java/lang/UnsatisfiedLinkError", describe(method)),
        };
    }
    if method.method.is_abstract() {
        return VmResult::error("java/lang/AbstractMethodError", describe(method));
    }
    if method.method.code().is_none() {
        return VmResult::error("java/lang/ClassFormatError", format!("{} has no code", describe(method)));
    }
    VmResult::Success(FrameBody::Bytecode)
}

/// Frame for invoking `method` with compact `args`
pub fn build_frame(runtime: &Runtime, method: MethodRef, args: Vec<Value>, return_offset: usize) -> VmResult<StackFrame> {
    select_body(runtime, &method).map(|body| match body {
        FrameBody::Bytecode => StackFrame::interpreted(method, args, return_offset),
        FrameBody::Native(native) => StackFrame::native(method, native, args, return_offset),
    })
}

/// Push `frame`, entering its monitor first when the method is synchronized
pub(crate) fn push_frame(thread: &mut Thread, frame: StackFrame) -> Result<(), VmError> {
    let monitor = if frame.method.method.is_synchronized() {
        if frame.method.method.is_static() {
            Some(thread.runtime().mirror(&frame.method.class)?)
        } else {
            frame
                .locals
                .first()
                .map(|receiver| receiver.as_reference())
                .transpose()?
                .flatten()
        }
    } else {
        None
    };
    thread.invoke_frame(frame);
    if let Some(object) = monitor {
        thread.frame_mut()?.monitor = Some(object);
        if thread.enter_monitor(object)? == EnterOutcome::Blocked {
            thread.park(ThreadStatus::Blocked, None);
        }
    }
    Ok(())
}

/// Invoke `method`; the caller's pc advances by `return_offset` once it returns
pub fn invoke_method(thread: &mut Thread, method: MethodRef, args: Vec<Value>, return_offset: usize) -> Result<(), VmError> {
    if thread.depth() >= thread.runtime().config().max_call_depth {
        debug!(thread = %thread.id(), method = %describe(&method), "call depth limit reached");
        return thread.throw_new_exception("java/lang/StackOverflowError", "");
    }
    let frame = resolve_or_throw!(thread, build_frame(thread.runtime(), method, args, return_offset));
    push_frame(thread, frame)
}

/// Pop the arguments for `descriptor` (and the receiver) into compact form
pub fn pop_arguments(thread: &mut Thread, descriptor: &MethodDescriptor, receiver: bool) -> Result<VmResult<Vec<Value>>, VmError> {
    let mut args = Vec::with_capacity(descriptor.params.len() + usize::from(receiver));
    for param in descriptor.params.iter().rev() {
        let popped = if param.is_wide() {
            thread.pop_stack64()?
        } else {
            thread.pop_stack()?
        };
        match popped {
            VmResult::Success(value) => args.push(value),
            other => return Ok(other.map(|_| Vec::new())),
        }
    }
    if receiver {
        match thread.pop_stack()? {
            VmResult::Success(value) => args.push(value),
            other => return Ok(other.map(|_| Vec::new())),
        }
    }
    args.reverse();
    Ok(VmResult::Success(args))
}

/// Receiver sitting below the arguments of `method`, without popping
fn peek_receiver(thread: &mut Thread, method: &MethodRef) -> Result<VmResult<Option<ObjectRef>>, VmError> {
    let slots = method.method.parsed_descriptor().param_slots();
    thread.peek_stack(slots)?.map(|v| v.as_reference()).transpose()
}

// ----------------------------------------------------------------------
// Instructions
// ----------------------------------------------------------------------

/// `invokestatic`
pub fn invokestatic(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let resolved = resolve_or_throw!(t, caller.resolve_method_at(index, t));
    if resolved.method.is_signature_polymorphic(resolved.class.name()) {
        return invoke_polymorphic(t, &caller, index, resolved);
    }
    if !resolved.method.is_static() {
        return t.throw_new_exception(ICCE, &format!("Expected static method {}", describe(&resolved)));
    }
    resolve_or_throw!(t, t.initialize_class(&resolved.class)?);
    let args = vm_try!(pop_arguments(t, resolved.method.parsed_descriptor(), false)?);
    invoke_method(t, resolved, args, 3)
}

/// `invokespecial`: constructors, private methods and `super` calls
pub fn invokespecial(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let resolved = resolve_or_throw!(t, caller.resolve_method_at(index, t));
    if resolved.method.is_static() {
        return t.throw_new_exception(ICCE, &format!("Expected non-static method {}", describe(&resolved)));
    }

    let is_super_call = resolved.method.name() != "<init>"
        && !resolved.class.is_interface()
        && caller.name() != resolved.class.name()
        && caller.is_subclass_of(&resolved.class);
    let target = if is_super_call {
        caller
            .superclass()
            .and_then(|parent| parent.find_method(resolved.method.name(), resolved.method.descriptor()))
            .unwrap_or_else(|| resolved.clone())
    } else {
        resolved.clone()
    };
    if target.method.is_abstract() {
        return t.throw_new_exception("java/lang/AbstractMethodError", &describe(&target));
    }

    if vm_try!(peek_receiver(t, &resolved)?).is_none() {
        return t.throw_new_exception(NPE, &format!("Cannot invoke \"{}\" on null", describe(&resolved)));
    }
    let args = vm_try!(pop_arguments(t, resolved.method.parsed_descriptor(), true)?);
    invoke_method(t, target, args, 3)
}

/// `invokevirtual`
pub fn invokevirtual(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let resolved = resolve_or_throw!(t, caller.resolve_method_at(index, t));
    if resolved.method.is_signature_polymorphic(resolved.class.name()) {
        return invoke_polymorphic(t, &caller, index, resolved);
    }
    if resolved.method.is_static() {
        return t.throw_new_exception(ICCE, &format!("Expected non-static method {}", describe(&resolved)));
    }
    let Some(receiver) = vm_try!(peek_receiver(t, &resolved)?) else {
        return t.throw_new_exception(NPE, &format!("Cannot invoke \"{}\" on null", describe(&resolved)));
    };
    let runtime_class = t.runtime().heap().class_of(receiver)?;
    let selected = resolve_or_throw!(t, runtime_class.select_virtual(&resolved));
    let args = vm_try!(pop_arguments(t, resolved.method.parsed_descriptor(), true)?);
    invoke_method(t, selected, args, 3)
}

/// `invokeinterface`
pub fn invokeinterface(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let resolved = resolve_or_throw!(t, caller.resolve_method_at(index, t));
    if resolved.method.is_static() {
        return t.throw_new_exception(ICCE, &format!("Expected non-static method {}", describe(&resolved)));
    }
    let Some(receiver) = vm_try!(peek_receiver(t, &resolved)?) else {
        return t.throw_new_exception(NPE, &format!("Cannot invoke \"{}\" on null", describe(&resolved)));
    };
    let runtime_class = t.runtime().heap().class_of(receiver)?;
    if !runtime_class.check_cast(&resolved.class) {
        return t.throw_new_exception(
            ICCE,
            &format!(
                "Class {} does not implement the requested interface {}",
                runtime_class.name().replace('/', "."),
                resolved.class.name().replace('/', ".")
            ),
        );
    }
    let selected = resolve_or_throw!(t, runtime_class.select_interface(&resolved));
    let args = vm_try!(pop_arguments(t, resolved.method.parsed_descriptor(), true)?);
    invoke_method(t, selected, args, 5)
}

/// `invokedynamic`: link the call site once, then call its target with the
/// appendix as a trailing argument
pub fn invokedynamic(t: &mut Thread) -> Result<(), VmError> {
    let index = t.operand_u16(1)?;
    let caller = t.current_class()?;
    let site = match resolve_or_throw!(t, caller.resolve_constant(index, t)) {
        ResolvedConstant::CallSite(site) => site,
        other => {
            return Err(VmError::InvalidConstant {
                index,
                reason: format!("expected a call site, found {:?}", other),
            })
        }
    };
    let descriptor = match call_site_descriptor(&caller, index) {
        Ok(descriptor) => MethodDescriptor::parse(&descriptor)?,
        Err(err) => return t.throw_error(err),
    };
    let Some(target) = t.runtime().member_target(site.target)? else {
        return t.throw_new_exception("java/lang/BootstrapMethodError", "call site target is not linked");
    };
    if target.method.is_static() {
        resolve_or_throw!(t, t.initialize_class(&target.class)?);
    }
    let mut args = vm_try!(pop_arguments(t, &descriptor, false)?);
    if let Some(appendix) = site.appendix {
        args.push(Value::object(appendix));
    }
    debug!(thread = %t.id(), target = %describe(&target), "invokedynamic");
    invoke_method(t, target, args, 5)
}

fn call_site_descriptor(class: &ClassData, index: u16) -> Result<String, ErrorResult> {
    let pool = class.constant_pool();
    match pool.get(index) {
        Some(Constant::InvokeDynamic { name_and_type_index, .. }) => {
            Ok(pool.name_and_type(*name_and_type_index)?.1.to_string())
        }
        _ => Err(ErrorResult::new(
            "java/lang/ClassFormatError",
            format!("constant pool entry #{} is not an InvokeDynamic", index),
        )),
    }
}

// ----------------------------------------------------------------------
// Method handles
// ----------------------------------------------------------------------

enum Linkage {
    /// Handle built for a single member, with its reference kind
    Direct(MethodRef, Option<ReferenceKind>),
    /// Handle whose lambda form names the method to run
    Form(MethodRef),
}

fn handle_linkage(runtime: &Runtime, handle: ObjectRef) -> Result<Option<Linkage>, VmError> {
    let heap = runtime.heap();
    let object = heap.object(handle)?;
    if let Some(NativeSlot::Method(method)) = object.native(VMTARGET_SLOT) {
        let kind = match object.native(KIND_SLOT) {
            Some(NativeSlot::Long(kind)) => u8::try_from(*kind).ok().and_then(ReferenceKind::from_u8),
            _ => None,
        };
        return Ok(Some(Linkage::Direct(method.clone(), kind)));
    }
    let Some(Value::Reference(Some(form))) = object.get_field(HANDLE_FORM) else {
        return Ok(None);
    };
    let Some(Value::Reference(Some(entry))) = heap.object(form)?.get_field(FORM_VMENTRY) else {
        return Ok(None);
    };
    match heap.object(entry)?.native(VMTARGET_SLOT) {
        Some(NativeSlot::Method(method)) => Ok(Some(Linkage::Form(method.clone()))),
        _ => Ok(None),
    }
}

/// Calls to `MethodHandle` invokers and `linkTo*` linkers. The argument
/// shape comes from the call site, not from the varargs declaration.
fn invoke_polymorphic(t: &mut Thread, caller: &Arc<ClassData>, index: u16, resolved: MethodRef) -> Result<(), VmError> {
    let descriptor = match caller.constant_pool().member(index) {
        Ok(symbol) => MethodDescriptor::parse(symbol.descriptor)?,
        Err(err) => return t.throw_error(err),
    };
    debug!(
        thread = %t.id(),
        method = resolved.method.name(),
        descriptor = %descriptor_text(caller, index),
        "signature-polymorphic call"
    );
    match resolved.method.name() {
        "invokeExact" | "invoke" | "invokeBasic" => invoke_handle(t, &descriptor),
        "linkToVirtual" => link_to(t, &descriptor, Some(ReferenceKind::InvokeVirtual)),
        "linkToInterface" => link_to(t, &descriptor, Some(ReferenceKind::InvokeInterface)),
        "linkToStatic" | "linkToSpecial" => link_to(t, &descriptor, None),
        other => t.throw_new_exception(
            "java/lang/LinkageError",
            &format!("unsupported signature-polymorphic method {}.{}", resolved.class.name(), other),
        ),
    }
}

fn descriptor_text(caller: &ClassData, index: u16) -> String {
    caller
        .constant_pool()
        .member(index)
        .map(|symbol| symbol.descriptor.to_string())
        .unwrap_or_default()
}

fn invoke_handle(t: &mut Thread, descriptor: &MethodDescriptor) -> Result<(), VmError> {
    let receiver = vm_try!(t.peek_stack(descriptor.param_slots())?);
    let Some(handle) = receiver.as_reference()? else {
        return t.throw_new_exception(NPE, "Cannot invoke a null method handle");
    };
    let Some(linkage) = handle_linkage(t.runtime(), handle)? else {
        return t.throw_new_exception("java/lang/InternalError", "method handle is not linked");
    };
    match linkage {
        Linkage::Direct(method, kind) => {
            if method.method.is_static() {
                resolve_or_throw!(t, t.initialize_class(&method.class)?);
            }
            let mut args = vm_try!(pop_arguments(t, descriptor, true)?);
            args.remove(0);
            dispatch_linked(t, method, kind, args)
        }
        Linkage::Form(method) => {
            if method.method.is_static() {
                resolve_or_throw!(t, t.initialize_class(&method.class)?);
            }
            let args = vm_try!(pop_arguments(t, descriptor, true)?);
            invoke_method(t, method, args, 3)
        }
    }
}

/// `linkTo*`: the trailing argument is a `MemberName` naming the target
fn link_to(t: &mut Thread, descriptor: &MethodDescriptor, kind: Option<ReferenceKind>) -> Result<(), VmError> {
    let Some(member) = vm_try!(t.peek_stack(0)?).as_reference()? else {
        return t.throw_new_exception(NPE, "Cannot link to a null MemberName");
    };
    let Some(target) = t.runtime().member_target(member)? else {
        return t.throw_new_exception("java/lang/InternalError", "MemberName is not linked");
    };
    if target.method.is_static() {
        resolve_or_throw!(t, t.initialize_class(&target.class)?);
    }
    let mut args = vm_try!(pop_arguments(t, descriptor, false)?);
    args.pop();
    dispatch_linked(t, target, kind, args)
}

/// Re-dispatch virtual and interface targets on the first argument's class
fn dispatch_linked(t: &mut Thread, method: MethodRef, kind: Option<ReferenceKind>, args: Vec<Value>) -> Result<(), VmError> {
    let method = match kind {
        Some(kind @ (ReferenceKind::InvokeVirtual | ReferenceKind::InvokeInterface)) => {
            let receiver = args.first().map(|v| v.as_reference()).transpose()?.flatten();
            let Some(receiver) = receiver else {
                return t.throw_new_exception(NPE, &format!("Cannot invoke \"{}\" on null", describe(&method)));
            };
            let class = t.runtime().heap().class_of(receiver)?;
            if kind == ReferenceKind::InvokeInterface {
                resolve_or_throw!(t, class.select_interface(&method))
            } else {
                resolve_or_throw!(t, class.select_virtual(&method))
            }
        }
        _ => method,
    };
    invoke_method(t, method, args, 3)
}
