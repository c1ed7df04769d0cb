//! Activation records for the per-thread call stack.

use crate::thread::Thread;
use class_model::MethodRef;
use core_types::{ObjectRef, Value, VmError};
use std::fmt;

/// Host implementation of a native method.
///
/// Arguments are compact, one [`Value`] per parameter with the receiver
/// first. A native finishes by returning its frame, by throwing, or by
/// leaving the frame in place for the host to complete later.
pub type NativeMethod = fn(&mut Thread, &[Value]) -> Result<(), VmError>;

/// How a frame left the call stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Normal return with an optional value
    Returned(Option<Value>),
    /// Unwound by an exception
    Threw(ObjectRef),
}

/// Callback run when an internal frame leaves the stack.
pub type Continuation = Box<dyn FnOnce(&mut Thread, FrameOutcome) -> Result<(), VmError> + Send>;

/// What executes inside an internal frame.
#[derive(Debug, Clone, Copy)]
pub enum FrameBody {
    /// The method's bytecode
    Bytecode,
    /// A host function
    Native(NativeMethod),
}

/// Frame polymorphism.
pub enum FrameKind {
    /// Bytecode invoked by bytecode
    Interpreted,
    /// Native method bridged to a host function
    Native(NativeMethod),
    /// Frame pushed by the VM itself; the result goes to the continuation
    /// instead of the caller's operand stack
    Internal {
        /// Taken when the frame leaves the stack
        continuation: Option<Continuation>,
        /// Bytecode or native body
        body: FrameBody,
    },
}

impl FrameKind {
    /// Host function to run, if the frame has a native body
    pub fn native_method(&self) -> Option<NativeMethod> {
        match self {
            FrameKind::Native(f)
            | FrameKind::Internal {
                body: FrameBody::Native(f),
                ..
            } => Some(*f),
            _ => None,
        }
    }

    /// Check if the frame executes bytecode
    pub fn is_bytecode(&self) -> bool {
        self.native_method().is_none()
    }

    /// Check if the frame was pushed by the VM
    pub fn is_internal(&self) -> bool {
        matches!(self, FrameKind::Internal { .. })
    }
}

impl fmt::Debug for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Interpreted => write!(f, "Interpreted"),
            FrameKind::Native(_) => write!(f, "Native"),
            FrameKind::Internal { body, continuation } => f
                .debug_struct("Internal")
                .field("body", body)
                .field("pending", &continuation.is_some())
                .finish(),
        }
    }
}

/// One method activation.
pub struct StackFrame {
    /// Executing method and its declaring class
    pub method: MethodRef,
    /// Interpreted, native or internal
    pub kind: FrameKind,
    /// Offset of the current instruction
    pub pc: usize,
    /// How far the caller's pc advances once this frame returns
    pub return_offset: usize,
    /// Operand stack, one entry per slot
    pub stack: Vec<Value>,
    /// Operand stack capacity in slots
    pub max_stack: usize,
    /// Local variables
    pub locals: Vec<Value>,
    /// Monitor held for a synchronized method
    pub monitor: Option<ObjectRef>,
    /// Set once a native body has been called
    pub native_started: bool,
}

impl StackFrame {
    /// Bytecode frame; `args` are compact and get spread over the slot layout
    pub fn interpreted(method: MethodRef, args: Vec<Value>, return_offset: usize) -> Self {
        Self::with_kind(method, FrameKind::Interpreted, args, return_offset)
    }

    /// Native frame; the host function receives `args` as given
    pub fn native(method: MethodRef, native: NativeMethod, args: Vec<Value>, return_offset: usize) -> Self {
        Self::with_kind(method, FrameKind::Native(native), args, return_offset)
    }

    /// VM-pushed frame reporting to `continuation`
    pub fn internal(method: MethodRef, args: Vec<Value>, body: FrameBody, continuation: Continuation) -> Self {
        let kind = FrameKind::Internal {
            continuation: Some(continuation),
            body,
        };
        Self::with_kind(method, kind, args, 0)
    }

    fn with_kind(method: MethodRef, kind: FrameKind, args: Vec<Value>, return_offset: usize) -> Self {
        let (locals, max_stack) = if kind.is_bytecode() {
            let code = method.method.code();
            let max_locals = code.map_or(0, |c| c.max_locals);
            (Self::slot_layout(args, max_locals), code.map_or(0, |c| c.max_stack))
        } else {
            (args, 0)
        };
        Self {
            method,
            kind,
            pc: 0,
            return_offset,
            stack: Vec::with_capacity(max_stack),
            max_stack,
            locals,
            monitor: None,
            native_started: false,
        }
    }

    /// Long and double arguments take two identical slots
    fn slot_layout(args: Vec<Value>, max_locals: usize) -> Vec<Value> {
        let mut locals = Vec::with_capacity(max_locals.max(args.len()));
        for arg in args {
            locals.push(arg);
            if arg.category() == 2 {
                locals.push(arg);
            }
        }
        if locals.len() < max_locals {
            locals.resize(max_locals, Value::default());
        }
        locals
    }

    /// `class.name(descriptor)` for diagnostics
    pub fn describe(&self) -> String {
        format!(
            "{}.{}{}",
            self.method.class.name(),
            self.method.method.name(),
            self.method.method.descriptor()
        )
    }
}

impl fmt::Debug for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackFrame")
            .field("method", &self.describe())
            .field("kind", &self.kind)
            .field("pc", &self.pc)
            .field("stack", &self.stack)
            .field("locals", &self.locals)
            .field("monitor", &self.monitor)
            .finish()
    }
}
