//! `java/lang/invoke/MethodHandleNatives` natives.
//!
//! `linkCallSite` runs application bootstrap methods and is left for the
//! host to register.

use super::{arg, int_arg, reference_arg, register_natives};
use crate::runtime::{HANDLE_TYPE, KIND_SLOT, VMTARGET_SLOT};
use crate::registry::NativeRegistry;
use crate::thread::Thread;
use class_model::ReferenceKind;
use core_types::{Value, VmError};
use memory_manager::NativeSlot;
use tracing::{debug, warn};

const NATIVES: &str = "java/lang/invoke/MethodHandleNatives";

pub(super) fn register(registry: &mut NativeRegistry) {
    registry.register(NATIVES, "registerNatives()V", register_natives);
    registry.register(
        NATIVES,
        "linkMethodHandleConstant(Ljava/lang/Class;ILjava/lang/Class;Ljava/lang/String;Ljava/lang/Object;)Ljava/lang/invoke/MethodHandle;",
        link_method_handle_constant,
    );
}

/// Build a direct handle for a `CONSTANT_MethodHandle`.
///
/// Field accessors and constructor handles have no direct form here and
/// link to null.
fn link_method_handle_constant(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let raw_kind = int_arg(args, 1)?;
    let kind = u8::try_from(raw_kind).ok().and_then(ReferenceKind::from_u8);
    let (Some(declaring), Some(name), Some(member_type)) =
        (reference_arg(args, 2)?, reference_arg(args, 3)?, reference_arg(args, 4)?)
    else {
        return thread.throw_new_exception("java/lang/NullPointerException", "incomplete method handle constant");
    };
    let runtime = thread.runtime().clone();
    let name = runtime.string_value(name)?;
    let kind = match kind {
        Some(kind) if !kind.is_field() && kind != ReferenceKind::NewInvokeSpecial => kind,
        other => {
            warn!(?other, name = %name, "method handle kind not supported, linking null");
            return thread.return_frame(Some(Value::null()));
        }
    };
    let class = runtime.class_of_mirror(declaring)?;
    let descriptor = runtime.method_type_descriptor(member_type)?;
    let Some(method) = class.find_method(&name, &descriptor) else {
        return thread.throw_new_exception(
            "java/lang/NoSuchMethodError",
            &format!("{}.{}{}", class.name(), name, descriptor),
        );
    };

    let handle_class = runtime.load_class("java/lang/invoke/MethodHandle")?;
    let handle = {
        let mut heap = runtime.heap();
        let handle = heap.allocate_object(handle_class);
        let object = heap.object_mut(handle)?;
        object.set_field(HANDLE_TYPE, arg(args, 4)?);
        object.set_native(VMTARGET_SLOT, NativeSlot::Method(method));
        object.set_native(KIND_SLOT, NativeSlot::Long(i64::from(kind as u8)));
        handle
    };
    debug!(class = class.name(), name = %name, ?kind, "direct method handle linked");
    thread.return_frame(Some(Value::object(handle)))
}
