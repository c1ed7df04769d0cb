//! Lazy resolution of constant pool entries.

use crate::class::ClassData;
use crate::constant_pool::{Constant, ConstantKind, ResolvedConstant};
use crate::context::{CallSiteRequest, ResolutionContext};
use crate::member::{FieldRef, MethodRef};
use core_types::{ErrorResult, VmResult};
use std::sync::Arc;

/// Unwrap a `VmResult`, returning early on error or defer.
macro_rules! attempt {
    ($e:expr) => {
        match $e {
            VmResult::Success(v) => v,
            VmResult::Error(e) => return VmResult::Error(e),
            VmResult::Defer => return VmResult::Defer,
        }
    };
}

/// Unwrap a pool accessor result, returning its `ClassFormatError` early.
macro_rules! symbol {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return VmResult::Error(e),
        }
    };
}

fn class_format(index: u16, reason: &str) -> ErrorResult {
    ErrorResult::new(
        "java/lang/ClassFormatError",
        format!("constant pool entry #{}: {}", index, reason),
    )
}

impl ClassData {
    /// Resolve the constant at `index` on behalf of this class.
    ///
    /// Outcomes other than `Defer` are memoized in the constant pool, so a
    /// failed resolution reports the same error on every retry.
    pub fn resolve_constant(
        self: &Arc<Self>,
        index: u16,
        ctx: &mut dyn ResolutionContext,
    ) -> VmResult<ResolvedConstant> {
        if let Some(cached) = self.constant_pool().cached(index) {
            return cached;
        }
        let result = self.resolve_uncached(index, ctx);
        self.constant_pool().remember(index, result)
    }

    /// Load `name` and check this class may access it
    pub fn resolve_class(
        self: &Arc<Self>,
        name: &str,
        ctx: &mut dyn ResolutionContext,
    ) -> VmResult<Arc<ClassData>> {
        let class = attempt!(ctx.loader().load_class(name));
        if !self.can_access_class(&class) {
            return VmResult::error(
                "java/lang/IllegalAccessError",
                format!("failed to access class {} from class {}", class.name(), self.name()),
            );
        }
        VmResult::Success(class)
    }

    /// Resolve a `Class` entry, going through the cache
    pub fn resolve_class_at(
        self: &Arc<Self>,
        index: u16,
        ctx: &mut dyn ResolutionContext,
    ) -> VmResult<Arc<ClassData>> {
        match attempt!(self.resolve_constant(index, ctx)) {
            ResolvedConstant::Class(class) => VmResult::Success(class),
            _ => VmResult::Error(class_format(index, "expected a Class")),
        }
    }

    /// Resolve a `Fieldref` entry
    pub fn resolve_field_at(self: &Arc<Self>, index: u16, ctx: &mut dyn ResolutionContext) -> VmResult<FieldRef> {
        match attempt!(self.resolve_constant(index, ctx)) {
            ResolvedConstant::Field(field) => VmResult::Success(field),
            _ => VmResult::Error(class_format(index, "expected a Fieldref")),
        }
    }

    /// Resolve a `Methodref` or `InterfaceMethodref` entry
    pub fn resolve_method_at(self: &Arc<Self>, index: u16, ctx: &mut dyn ResolutionContext) -> VmResult<MethodRef> {
        match attempt!(self.resolve_constant(index, ctx)) {
            ResolvedConstant::Method(method) => VmResult::Success(method),
            _ => VmResult::Error(class_format(index, "expected a method reference")),
        }
    }

    fn resolve_uncached(self: &Arc<Self>, index: u16, ctx: &mut dyn ResolutionContext) -> VmResult<ResolvedConstant> {
        let pool = self.constant_pool();
        match pool.get(index) {
            Some(Constant::Integer(v)) => VmResult::Success(ResolvedConstant::Int(*v)),
            Some(Constant::Float(v)) => VmResult::Success(ResolvedConstant::Float(*v)),
            Some(Constant::Long(v)) => VmResult::Success(ResolvedConstant::Long(*v)),
            Some(Constant::Double(v)) => VmResult::Success(ResolvedConstant::Double(*v)),
            Some(Constant::Utf8(text)) => VmResult::Success(ResolvedConstant::Utf8(Arc::from(text.as_str()))),
            Some(Constant::String { string_index }) => {
                let text = symbol!(pool.utf8(*string_index));
                ctx.intern_string(text).map(ResolvedConstant::String)
            }
            Some(Constant::Class { .. }) => {
                let name = symbol!(pool.class_name(index));
                self.resolve_class(name, ctx).map(ResolvedConstant::Class)
            }
            Some(Constant::NameAndType { .. }) => {
                let (name, descriptor) = symbol!(pool.name_and_type(index));
                VmResult::Success(ResolvedConstant::NameAndType {
                    name: Arc::from(name),
                    descriptor: Arc::from(descriptor),
                })
            }
            Some(Constant::Fieldref { class_index, .. }) => {
                let class = attempt!(self.resolve_class_at(*class_index, ctx));
                let member = symbol!(pool.member(index));
                let field = attempt!(class.resolve_field(member.name, member.descriptor));
                if !self.can_access_member(&field.class, field.field.access()) {
                    return VmResult::error(
                        "java/lang/IllegalAccessError",
                        format!("tried to access field {} from class {}", field.key(), self.name()),
                    );
                }
                VmResult::Success(ResolvedConstant::Field(field))
            }
            Some(Constant::Methodref { class_index, .. } | Constant::InterfaceMethodref { class_index, .. }) => {
                let class = attempt!(self.resolve_class_at(*class_index, ctx));
                let member = symbol!(pool.member(index));
                let method = if member.kind == ConstantKind::InterfaceMethodref {
                    if !class.is_interface() {
                        return VmResult::error(
                            "java/lang/IncompatibleClassChangeError",
                            format!("Found class {}, but interface was expected", class.name()),
                        );
                    }
                    class.resolve_interface_method(self, member.name, member.descriptor)
                } else {
                    if class.is_interface() {
                        return VmResult::error(
                            "java/lang/IncompatibleClassChangeError",
                            format!("Found interface {}, but class was expected", class.name()),
                        );
                    }
                    class.resolve_method(self, member.name, member.descriptor)
                };
                method.map(ResolvedConstant::Method)
            }
            Some(Constant::MethodType { descriptor_index }) => {
                let descriptor = symbol!(pool.utf8(*descriptor_index));
                ctx.link_method_type(self, index, descriptor)
                    .map(ResolvedConstant::MethodType)
            }
            Some(Constant::MethodHandle {
                reference_kind,
                reference_index,
            }) => {
                let target = attempt!(self.resolve_constant(*reference_index, ctx));
                let shape_ok = match &target {
                    ResolvedConstant::Field(_) => reference_kind.is_field(),
                    ResolvedConstant::Method(_) => !reference_kind.is_field(),
                    _ => false,
                };
                if !shape_ok {
                    return VmResult::Error(class_format(index, "method handle target does not match its kind"));
                }
                ctx.link_method_handle(self, index, *reference_kind, &target)
                    .map(ResolvedConstant::MethodHandle)
            }
            Some(Constant::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            }) => {
                let Some(bootstrap) = self.bootstrap_methods().get(*bootstrap_method_attr_index as usize) else {
                    return VmResult::Error(class_format(index, "bootstrap method index out of range"));
                };
                let handle = match attempt!(self.resolve_constant(bootstrap.method_handle, ctx)) {
                    ResolvedConstant::MethodHandle(handle) => handle,
                    _ => return VmResult::Error(class_format(index, "bootstrap method is not a MethodHandle")),
                };
                let mut static_arguments = Vec::with_capacity(bootstrap.arguments.len());
                for argument in &bootstrap.arguments {
                    static_arguments.push(attempt!(self.resolve_constant(*argument, ctx)));
                }
                let (name, descriptor) = symbol!(pool.name_and_type(*name_and_type_index));
                let request = CallSiteRequest {
                    bootstrap: handle,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                    static_arguments,
                };
                ctx.link_call_site(self, index, request)
                    .map(ResolvedConstant::CallSite)
            }
            Some(Constant::Unusable) | None => VmResult::Error(class_format(index, "not a loadable constant")),
        }
    }
}
