//! Guest threads.
//!
//! A [`Thread`] owns its call stack and runs one instruction per
//! [`Thread::step`]. Every operand-stack helper answers a
//! `Result<VmResult<_>, VmError>`: the outer `Err` is a host fault, an inner
//! `Error` means a guest exception has already been thrown on this thread.

use crate::frame::{Continuation, FrameBody, FrameKind, FrameOutcome, StackFrame};
use crate::invoke;
use crate::runtime::{Runtime, THROWABLE_MESSAGE};
use bytecode_system::{branch_target, Code, Opcode};
use class_model::{ClassData, InitAction, MethodRef};
use core_types::{ErrorResult, ObjectRef, ThreadId, Value, VmError, VmResult};
use memory_manager::{EnterOutcome, MonitorError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

const STACK_OVERFLOW: &str = "java/lang/StackOverflowError";
const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";
const ILLEGAL_MONITOR_STATE: &str = "java/lang/IllegalMonitorStateException";

/// Scheduling state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Created, nothing started yet
    New,
    /// Eligible to execute instructions
    Runnable,
    /// Waiting to enter a monitor
    Blocked,
    /// In `Object.wait()` or a pending native
    Waiting,
    /// In `Object.wait(timeout)`
    TimedWaiting,
    /// Finished, normally or by an uncaught exception
    Terminated,
}

impl ThreadStatus {
    /// Parked until a wakeup arrives
    pub fn is_parked(self) -> bool {
        matches!(self, ThreadStatus::Blocked | ThreadStatus::Waiting | ThreadStatus::TimedWaiting)
    }
}

/// An exception that unwound the whole call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtException {
    /// Internal name of the exception class
    pub class_name: String,
    /// `detailMessage`, empty when null
    pub message: String,
    /// The exception object
    pub object: ObjectRef,
}

/// Work to run when a parked thread is woken.
pub type Resume = Box<dyn FnOnce(&mut Thread) -> Result<(), VmError> + Send>;

/// A guest thread.
pub struct Thread {
    id: ThreadId,
    runtime: Arc<Runtime>,
    frames: Vec<StackFrame>,
    status: ThreadStatus,
    uncaught: Option<UncaughtException>,
    resume: Option<Resume>,
    exit_value: Option<Value>,
}

impl Thread {
    /// New thread with an empty call stack
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let id = runtime.next_thread_id();
        Self {
            id,
            runtime,
            frames: Vec::new(),
            status: ThreadStatus::New,
            uncaught: None,
            resume: None,
            exit_value: None,
        }
    }

    /// Thread id
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Runtime this thread belongs to
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Scheduling state
    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    /// Exception that terminated the thread, if any
    pub fn uncaught(&self) -> Option<&UncaughtException> {
        self.uncaught.as_ref()
    }

    /// Value returned by the bottom frame
    pub fn exit_value(&self) -> Option<Value> {
        self.exit_value
    }

    /// Call stack, bottom first
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Number of frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Top frame, or `None` once the stack is empty
    pub fn peek_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Top frame
    pub fn frame(&self) -> Result<&StackFrame, VmError> {
        self.frames.last().ok_or(VmError::EmptyCallStack)
    }

    /// Top frame, mutably
    pub fn frame_mut(&mut self) -> Result<&mut StackFrame, VmError> {
        self.frames.last_mut().ok_or(VmError::EmptyCallStack)
    }

    /// Class declaring the executing method
    pub fn current_class(&self) -> Result<Arc<ClassData>, VmError> {
        Ok(self.frame()?.method.class.clone())
    }

    /// Executing method
    pub fn current_method(&self) -> Result<MethodRef, VmError> {
        Ok(self.frame()?.method.clone())
    }

    /// Bytecode of the executing method
    pub fn code(&self) -> Result<&Code, VmError> {
        let frame = self.frame()?;
        frame.method.method.code().ok_or_else(|| VmError::MalformedBytecode {
            pc: frame.pc,
            reason: format!("{} has no code", frame.describe()),
        })
    }

    /// Push an activation
    pub fn invoke_frame(&mut self, frame: StackFrame) {
        debug!(
            thread = %self.id,
            method = %frame.describe(),
            depth = self.frames.len() + 1,
            "frame pushed"
        );
        self.frames.push(frame);
    }

    // ------------------------------------------------------------------
    // Program counter and operands
    // ------------------------------------------------------------------

    /// Offset of the current instruction
    pub fn pc(&self) -> Result<usize, VmError> {
        Ok(self.frame()?.pc)
    }

    /// Move past `n` bytes of the current instruction
    pub fn advance(&mut self, n: usize) -> Result<(), VmError> {
        self.frame_mut()?.pc += n;
        Ok(())
    }

    /// Continue at an absolute offset
    pub fn jump(&mut self, target: usize) -> Result<(), VmError> {
        self.frame_mut()?.pc = target;
        Ok(())
    }

    /// Continue at an offset relative to the current instruction
    pub fn branch(&mut self, offset: i32) -> Result<(), VmError> {
        let pc = self.pc()?;
        let target = branch_target(self.code()?, pc, offset)?;
        self.jump(target)
    }

    /// Byte of the current instruction
    pub fn opcode(&self) -> Result<u8, VmError> {
        self.code()?.read_u8(self.pc()?)
    }

    /// Operand byte `offset` bytes past the opcode
    pub fn operand_u8(&self, offset: usize) -> Result<u8, VmError> {
        self.code()?.read_u8(self.pc()? + offset)
    }

    /// Signed operand byte
    pub fn operand_i8(&self, offset: usize) -> Result<i8, VmError> {
        self.code()?.read_i8(self.pc()? + offset)
    }

    /// Big-endian `u16` operand
    pub fn operand_u16(&self, offset: usize) -> Result<u16, VmError> {
        self.code()?.read_u16(self.pc()? + offset)
    }

    /// Big-endian `i16` operand
    pub fn operand_i16(&self, offset: usize) -> Result<i16, VmError> {
        self.code()?.read_i16(self.pc()? + offset)
    }

    /// Big-endian `i32` operand
    pub fn operand_i32(&self, offset: usize) -> Result<i32, VmError> {
        self.code()?.read_i32(self.pc()? + offset)
    }

    // ------------------------------------------------------------------
    // Operand stack
    // ------------------------------------------------------------------

    fn raise<T>(&mut self, class_name: &str, message: &str) -> Result<VmResult<T>, VmError> {
        self.throw_new_exception(class_name, message)?;
        Ok(VmResult::error(class_name, message))
    }

    /// Push one slot
    pub fn push_stack(&mut self, value: Value) -> Result<VmResult<()>, VmError> {
        let frame = self.frame_mut()?;
        if frame.stack.len() < frame.max_stack {
            frame.stack.push(value);
            return Ok(VmResult::Success(()));
        }
        self.raise(STACK_OVERFLOW, "")
    }

    /// Push a long or double as two identical slots
    pub fn push_stack64(&mut self, value: Value) -> Result<VmResult<()>, VmError> {
        let frame = self.frame_mut()?;
        if frame.stack.len() + 2 <= frame.max_stack {
            frame.stack.push(value);
            frame.stack.push(value);
            return Ok(VmResult::Success(()));
        }
        self.raise(STACK_OVERFLOW, "")
    }

    /// Push a value using as many slots as its category needs
    pub fn push_value(&mut self, value: Value) -> Result<VmResult<()>, VmError> {
        if value.category() == 2 {
            self.push_stack64(value)
        } else {
            self.push_stack(value)
        }
    }

    /// Pop one slot
    pub fn pop_stack(&mut self) -> Result<VmResult<Value>, VmError> {
        match self.frame_mut()?.stack.pop() {
            Some(value) => Ok(VmResult::Success(value)),
            None => self.raise(RUNTIME_EXCEPTION, "Stack Underflow"),
        }
    }

    /// Pop two slots holding a long or double
    pub fn pop_stack64(&mut self) -> Result<VmResult<Value>, VmError> {
        let frame = self.frame_mut()?;
        if frame.stack.len() < 2 {
            return self.raise(RUNTIME_EXCEPTION, "Stack Underflow");
        }
        frame.stack.pop();
        match frame.stack.pop() {
            Some(value) => Ok(VmResult::Success(value)),
            None => Err(VmError::EmptyCallStack),
        }
    }

    /// Pop an `int`
    pub fn pop_int(&mut self) -> Result<VmResult<i32>, VmError> {
        self.pop_stack()?.map(|v| v.as_int()).transpose()
    }

    /// Pop a `long`
    pub fn pop_long(&mut self) -> Result<VmResult<i64>, VmError> {
        self.pop_stack64()?.map(|v| v.as_long()).transpose()
    }

    /// Pop a `float`
    pub fn pop_float(&mut self) -> Result<VmResult<f32>, VmError> {
        self.pop_stack()?.map(|v| v.as_float()).transpose()
    }

    /// Pop a `double`
    pub fn pop_double(&mut self) -> Result<VmResult<f64>, VmError> {
        self.pop_stack64()?.map(|v| v.as_double()).transpose()
    }

    /// Pop a reference, `None` for null
    pub fn pop_reference(&mut self) -> Result<VmResult<Option<ObjectRef>>, VmError> {
        self.pop_stack()?.map(|v| v.as_reference()).transpose()
    }

    /// Read the slot `depth` entries below the top without popping
    pub fn peek_stack(&mut self, depth: usize) -> Result<VmResult<Value>, VmError> {
        let frame = self.frame()?;
        let value = frame
            .stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| frame.stack.get(i))
            .copied();
        match value {
            Some(value) => Ok(VmResult::Success(value)),
            None => self.raise(RUNTIME_EXCEPTION, "Stack Underflow"),
        }
    }

    // ------------------------------------------------------------------
    // Locals
    // ------------------------------------------------------------------

    /// Read a local slot
    pub fn load_local(&self, index: usize) -> Result<Value, VmError> {
        let frame = self.frame()?;
        frame.locals.get(index).copied().ok_or_else(|| VmError::MalformedBytecode {
            pc: frame.pc,
            reason: format!("local {} out of range", index),
        })
    }

    /// Write a local slot
    pub fn store_local(&mut self, index: usize, value: Value) -> Result<(), VmError> {
        let frame = self.frame_mut()?;
        let pc = frame.pc;
        let slot = frame.locals.get_mut(index).ok_or_else(|| VmError::MalformedBytecode {
            pc,
            reason: format!("local {} out of range", index),
        })?;
        *slot = value;
        Ok(())
    }

    /// Write a long or double into two local slots
    pub fn store_local64(&mut self, index: usize, value: Value) -> Result<(), VmError> {
        self.store_local(index, value)?;
        self.store_local(index + 1, value)
    }

    // ------------------------------------------------------------------
    // Monitors
    // ------------------------------------------------------------------

    /// Enter `object`'s monitor
    pub fn enter_monitor(&mut self, object: ObjectRef) -> Result<EnterOutcome, VmError> {
        let outcome = self.runtime.heap().monitor_mut(object)?.enter(self.id);
        trace!(thread = %self.id, monitor = %object, ?outcome, "monitor enter");
        Ok(outcome)
    }

    /// Leave `object`'s monitor once, posting a wakeup if it changed hands
    pub fn exit_monitor(&mut self, object: ObjectRef) -> Result<Result<(), MonitorError>, VmError> {
        let released = self.runtime.heap().monitor_mut(object)?.exit(self.id);
        match released {
            Ok(next) => {
                if let Some(next) = next {
                    debug!(monitor = %object, from = %self.id, to = %next, "monitor handed off");
                    self.runtime.post_wakeup(next);
                }
                Ok(Ok(()))
            }
            Err(err) => Ok(Err(err)),
        }
    }

    // ------------------------------------------------------------------
    // Calls and returns
    // ------------------------------------------------------------------

    /// Pop the top frame and hand `value` to whoever called it
    pub fn return_frame(&mut self, value: Option<Value>) -> Result<(), VmError> {
        if let Some(monitor) = self.frame()?.monitor {
            if let Err(err) = self.exit_monitor(monitor)? {
                self.frame_mut()?.monitor = None;
                return self.throw_new_exception(ILLEGAL_MONITOR_STATE, &err.to_string());
            }
        }
        let frame = self.frames.pop().ok_or(VmError::EmptyCallStack)?;
        debug!(thread = %self.id, method = %frame.describe(), "frame returned");
        match frame.kind {
            FrameKind::Internal { continuation, .. } => {
                if let Some(continuation) = continuation {
                    continuation(self, FrameOutcome::Returned(value))?;
                }
                Ok(())
            }
            FrameKind::Interpreted | FrameKind::Native(_) => {
                if self.frames.is_empty() {
                    self.exit_value = value;
                    self.status = ThreadStatus::Terminated;
                    return Ok(());
                }
                if let Some(value) = value {
                    vm_try!(self.push_value(value)?);
                }
                self.advance(frame.return_offset)
            }
        }
    }

    /// Return a long or double
    pub fn return_frame64(&mut self, value: Value) -> Result<(), VmError> {
        self.return_frame(Some(value))
    }

    /// Run `next` after the top internal frame's own continuation
    pub(crate) fn chain_continuation(&mut self, next: Continuation) -> Result<(), VmError> {
        if let FrameKind::Internal { continuation, .. } = &mut self.frame_mut()?.kind {
            let first = continuation.take();
            *continuation = Some(Box::new(move |thread: &mut Thread, outcome: FrameOutcome| {
                if let Some(first) = first {
                    first(thread, outcome)?;
                }
                next(thread, outcome)
            }));
        }
        Ok(())
    }

    /// Initialize `class` and its superclasses.
    ///
    /// `Defer` means either an initializer frame was pushed and the caller
    /// should retry once it returns, or another thread is initializing.
    pub fn initialize_class(&mut self, class: &Arc<ClassData>) -> Result<VmResult<()>, VmError> {
        if class.is_initialized() {
            return Ok(VmResult::Success(()));
        }
        if !class.is_interface() {
            if let Some(superclass) = class.superclass() {
                match self.initialize_class(superclass)? {
                    VmResult::Success(()) => {}
                    other => return Ok(other),
                }
            }
        }
        match class.begin_initialization(self.id) {
            InitAction::Ready => Ok(VmResult::Success(())),
            InitAction::Defer => Ok(VmResult::Defer),
            InitAction::Failed(err) => Ok(VmResult::Error(err)),
            InitAction::RunInitializer(clinit) => {
                debug!(thread = %self.id, class = class.name(), "running <clinit>");
                let initialized = class.clone();
                let continuation: Continuation = Box::new(move |thread: &mut Thread, outcome: FrameOutcome| {
                    let succeeded = matches!(outcome, FrameOutcome::Returned(_));
                    debug!(thread = %thread.id, class = initialized.name(), succeeded, "<clinit> finished");
                    initialized.finish_initialization(succeeded);
                    Ok(())
                });
                self.invoke_frame(StackFrame::internal(clinit, Vec::new(), FrameBody::Bytecode, continuation));
                Ok(VmResult::Defer)
            }
        }
    }

    // ------------------------------------------------------------------
    // Exceptions
    // ------------------------------------------------------------------

    /// Throw a resolution or linkage failure
    pub fn throw_error(&mut self, err: ErrorResult) -> Result<(), VmError> {
        self.throw_new_exception(&err.exception_class, &err.message)
    }

    /// Allocate an exception of `class_name` with `message` and throw it.
    ///
    /// The class is initialized first; if that pushes a `<clinit>` frame the
    /// throw happens once the initializer returns.
    pub fn throw_new_exception(&mut self, class_name: &str, message: &str) -> Result<(), VmError> {
        let class = self.runtime.load_class(class_name)?;
        let depth = self.frames.len();
        match self.initialize_class(&class)? {
            VmResult::Success(()) => {}
            VmResult::Error(err) if err.exception_class != class_name => return self.throw_error(err),
            VmResult::Error(_) => return Err(VmError::MissingClass(class_name.to_string())),
            VmResult::Defer if self.frames.len() > depth => {
                let (name, text) = (class_name.to_string(), message.to_string());
                return self.chain_continuation(Box::new(move |thread: &mut Thread, outcome: FrameOutcome| match outcome {
                    FrameOutcome::Returned(_) => thread.throw_new_exception(&name, &text),
                    FrameOutcome::Threw(_) => Ok(()),
                }));
            }
            VmResult::Defer => {
                debug!(exception = class_name, "exception class initializing on another thread");
            }
        }

        debug!(thread = %self.id, exception = class_name, message, "throwing");
        let text = self.runtime.new_string(message)?;
        let exception = {
            let mut heap = self.runtime.heap();
            let exception = heap.allocate_object(class);
            heap.object_mut(exception)?
                .set_field(THROWABLE_MESSAGE, Value::object(text));
            exception
        };
        self.throw_exception(exception)
    }

    /// Unwind to the nearest handler for `exception`
    pub fn throw_exception(&mut self, exception: ObjectRef) -> Result<(), VmError> {
        let class = self.runtime.heap().class_of(exception)?;
        while let Some(frame) = self.frames.last() {
            if frame.kind.is_bytecode() {
                if let Some(handler_pc) = self.find_handler(&class)? {
                    let frame = self.frame_mut()?;
                    frame.stack.clear();
                    frame.stack.push(Value::object(exception));
                    frame.pc = handler_pc;
                    debug!(
                        thread = %self.id,
                        exception = class.name(),
                        handler_pc,
                        "exception caught"
                    );
                    return Ok(());
                }
            }
            let Some(frame) = self.frames.pop() else { break };
            if let Some(monitor) = frame.monitor {
                if self.exit_monitor(monitor)?.is_err() {
                    debug!(thread = %self.id, monitor = %monitor, "unwound frame no longer owned its monitor");
                }
            }
            if let FrameKind::Internal {
                continuation: Some(continuation),
                ..
            } = frame.kind
            {
                continuation(self, FrameOutcome::Threw(exception))?;
            }
        }

        let message = self.exception_message(exception).unwrap_or_default();
        error!(thread = %self.id, exception = class.name(), %message, "uncaught exception");
        self.uncaught = Some(UncaughtException {
            class_name: class.name().to_string(),
            message,
            object: exception,
        });
        self.status = ThreadStatus::Terminated;
        Ok(())
    }

    fn find_handler(&self, class: &ClassData) -> Result<Option<usize>, VmError> {
        let frame = self.frame()?;
        let method = frame.method.method.clone();
        let Some(code) = method.code() else {
            return Ok(None);
        };
        for handler in code.exception_table.iter().filter(|h| h.covers(frame.pc)) {
            let matches = match &handler.catch_type {
                None => true,
                Some(name) => match self.runtime.loader().load_class(name) {
                    VmResult::Success(catch) => class.check_cast(&catch),
                    _ => false,
                },
            };
            if matches {
                return Ok(Some(handler.handler_pc as usize));
            }
        }
        Ok(None)
    }

    /// `detailMessage` of a throwable, empty when null
    pub fn exception_message(&self, exception: ObjectRef) -> Result<String, VmError> {
        let message = self.runtime.heap().object(exception)?.get_field(THROWABLE_MESSAGE);
        match message {
            Some(Value::Reference(Some(text))) => self.runtime.string_value(text),
            _ => Ok(String::new()),
        }
    }

    /// Class name and message of a throwable
    pub fn describe_exception(&self, exception: ObjectRef) -> Result<ErrorResult, VmError> {
        let class = self.runtime.heap().class_of(exception)?;
        Ok(ErrorResult::new(class.name(), self.exception_message(exception)?))
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Push the entry frame for `class_name.method_name descriptor`.
    ///
    /// The class is initialized before the entry method runs.
    pub fn start(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<VmResult<()>, VmError> {
        let class = match self.runtime.loader().load_class(class_name) {
            VmResult::Success(class) => class,
            other => return Ok(other.map(|_| ())),
        };
        let Some(method) = class.find_method(method_name, descriptor) else {
            return Ok(VmResult::error(
                "java/lang/NoSuchMethodError",
                format!("{}.{}{}", class_name, method_name, descriptor),
            ));
        };
        let frame = match invoke::build_frame(&self.runtime, method, args, 0) {
            VmResult::Success(frame) => frame,
            other => return Ok(other.map(|_| ())),
        };
        self.status = ThreadStatus::Runnable;
        invoke::push_frame(self, frame)?;
        if let VmResult::Error(err) = self.initialize_class(&class)? {
            self.frames.clear();
            self.status = ThreadStatus::New;
            return Ok(VmResult::Error(err));
        }
        debug!(thread = %self.id, class = class_name, method = method_name, "thread started");
        Ok(VmResult::Success(()))
    }

    /// Execute one instruction or one native call
    pub fn step(&mut self) -> Result<(), VmError> {
        let id = self.id;
        let frame = self.frame_mut()?;
        if let Some(native) = frame.kind.native_method() {
            if frame.native_started {
                self.status = ThreadStatus::Waiting;
                return Ok(());
            }
            frame.native_started = true;
            let args = frame.locals.clone();
            trace!(thread = %id, method = %frame.describe(), "native call");
            let depth = self.frames.len();
            native(self, &args)?;
            if self.frames.len() == depth && self.status == ThreadStatus::Runnable {
                debug!(thread = %self.id, "native left its frame pending");
                self.status = ThreadStatus::Waiting;
            }
            return Ok(());
        }

        let opcode = self.opcode()?;
        trace!(
            thread = %self.id,
            pc = self.pc()?,
            op = Opcode::from_byte(opcode).map_or("?", Opcode::mnemonic),
            "dispatch"
        );
        let handler = self.runtime.dispatch().handler(opcode);
        handler(self)
    }

    /// Run up to `quantum` steps while runnable; answers the steps taken
    pub fn run_for(&mut self, quantum: usize) -> Result<usize, VmError> {
        let mut executed = 0;
        while executed < quantum && self.status == ThreadStatus::Runnable {
            if self.frames.is_empty() {
                self.status = ThreadStatus::Terminated;
                break;
            }
            self.step()?;
            executed += 1;
        }
        if self.status == ThreadStatus::Runnable && self.frames.is_empty() {
            self.status = ThreadStatus::Terminated;
        }
        Ok(executed)
    }

    /// Run this thread alone until it terminates or parks with no wakeup
    /// pending for it
    pub fn run_to_completion(&mut self) -> Result<ThreadStatus, VmError> {
        let quantum = self.runtime.config().quantum;
        loop {
            self.run_for(quantum)?;
            match self.status {
                ThreadStatus::Runnable => {}
                ThreadStatus::New | ThreadStatus::Terminated => return Ok(self.status),
                _ => {
                    if !self.take_own_wakeup() {
                        return Ok(self.status);
                    }
                    self.wake()?;
                }
            }
        }
    }

    fn take_own_wakeup(&self) -> bool {
        let mut others = Vec::new();
        let mut found = false;
        while let Some(id) = self.runtime.take_wakeup() {
            if id == self.id {
                found = true;
                break;
            }
            others.push(id);
        }
        for id in others {
            self.runtime.post_wakeup(id);
        }
        found
    }

    /// Park with `status`; `resume` runs when the thread is woken
    pub fn park(&mut self, status: ThreadStatus, resume: Option<Resume>) {
        debug!(thread = %self.id, ?status, "thread parked");
        self.status = status;
        self.resume = resume;
    }

    /// Make a parked thread runnable again
    pub fn wake(&mut self) -> Result<(), VmError> {
        if self.status == ThreadStatus::Terminated {
            return Ok(());
        }
        debug!(thread = %self.id, "thread woken");
        self.status = ThreadStatus::Runnable;
        if let Some(resume) = self.resume.take() {
            resume(self)?;
        }
        Ok(())
    }

    /// Finish a native frame the native left pending
    pub fn complete_pending(&mut self, value: Option<Value>) -> Result<(), VmError> {
        self.status = ThreadStatus::Runnable;
        self.return_frame(value)
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("depth", &self.frames.len())
            .field("uncaught", &self.uncaught)
            .finish()
    }
}
