//! The seam between constant resolution and the running VM.
//!
//! Resolving some constants needs more than the class model can offer on its
//! own: strings must be interned on the heap, and method types, method
//! handles and call sites are produced by guest code. The interpreter's
//! thread implements [`ResolutionContext`] and supplies those pieces.

use crate::class::ClassData;
use crate::constant_pool::{CallSite, ReferenceKind, ResolvedConstant};
use crate::loader::ClassLoader;
use core_types::{ObjectRef, ThreadId, VmResult};
use std::sync::Arc;

/// Everything a bootstrap method needs to link an `invokedynamic` site.
#[derive(Debug, Clone)]
pub struct CallSiteRequest {
    /// Resolved bootstrap `MethodHandle`
    pub bootstrap: ObjectRef,
    /// Call site name
    pub name: String,
    /// Call site method descriptor
    pub descriptor: String,
    /// Resolved static arguments, in declaration order
    pub static_arguments: Vec<ResolvedConstant>,
}

/// Services the running VM provides to constant resolution.
///
/// The `link_*` hooks may start guest code and answer [`VmResult::Defer`].
/// When that guest code later completes, the implementation stores the
/// outcome with [`crate::ConstantPool::store`] (or `store_error`) at
/// `index` so the retried instruction finds it cached.
pub trait ResolutionContext {
    /// Thread on whose behalf resolution runs
    fn thread_id(&self) -> ThreadId;

    /// Loader used for `Class` entries
    fn loader(&self) -> Arc<dyn ClassLoader>;

    /// Interned `java/lang/String` for `text`
    fn intern_string(&mut self, text: &str) -> VmResult<ObjectRef>;

    /// `java/lang/invoke/MethodType` for a method descriptor
    fn link_method_type(&mut self, owner: &Arc<ClassData>, index: u16, descriptor: &str) -> VmResult<ObjectRef>;

    /// `java/lang/invoke/MethodHandle` for an already-resolved member
    fn link_method_handle(
        &mut self,
        owner: &Arc<ClassData>,
        index: u16,
        kind: ReferenceKind,
        target: &ResolvedConstant,
    ) -> VmResult<ObjectRef>;

    /// Run the bootstrap method of an `invokedynamic` site
    fn link_call_site(&mut self, owner: &Arc<ClassData>, index: u16, request: CallSiteRequest) -> VmResult<CallSite>;
}
