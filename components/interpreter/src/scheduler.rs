//! Cooperative round-robin scheduling of guest threads.
//!
//! Each round first delivers pending wakeups (monitor hand-offs), then runs
//! every runnable thread for one quantum. No instruction of one thread ever
//! runs concurrently with another of the same thread.

use crate::runtime::Runtime;
use crate::thread::{Thread, ThreadStatus};
use core_types::{ThreadId, Value, VmError, VmResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// How [`ThreadPool::run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolOutcome {
    /// Every thread terminated
    Completed,
    /// Live threads remain but none can make progress
    Deadlocked {
        /// Threads parked in `Blocked`, `Waiting` or `TimedWaiting`
        blocked: Vec<ThreadId>,
    },
}

/// Threads sharing one [`Runtime`].
///
/// # Examples
///
/// ```
/// use bytecode_system::{CodeBuilder, Opcode};
/// use class_model::{ClassDefinition, ACC_PUBLIC, ACC_STATIC};
/// use interpreter::{PoolOutcome, RuntimeBuilder, ThreadPool};
///
/// let idle = CodeBuilder::new().op(Opcode::Return).build(0, 0);
/// let runtime = RuntimeBuilder::new()
///     .class(ClassDefinition::new("demo/Idle").method("run", "()V", ACC_PUBLIC | ACC_STATIC, Some(idle)))
///     .build();
///
/// let mut pool = ThreadPool::new(runtime);
/// pool.spawn("demo/Idle", "run", "()V", vec![]).unwrap();
/// pool.spawn("demo/Idle", "run", "()V", vec![]).unwrap();
/// assert_eq!(pool.run().unwrap(), PoolOutcome::Completed);
/// ```
#[derive(Debug)]
pub struct ThreadPool {
    runtime: Arc<Runtime>,
    threads: Vec<Thread>,
}

impl ThreadPool {
    /// Empty pool over `runtime`
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            threads: Vec::new(),
        }
    }

    /// Start a thread at `class_name.method_name descriptor`
    pub fn spawn(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<VmResult<ThreadId>, VmError> {
        let mut thread = Thread::new(self.runtime.clone());
        let id = thread.id();
        match thread.start(class_name, method_name, descriptor, args)? {
            VmResult::Error(err) => Ok(VmResult::Error(err)),
            VmResult::Success(()) | VmResult::Defer => {
                self.threads.push(thread);
                Ok(VmResult::Success(id))
            }
        }
    }

    /// Adopt a thread started elsewhere
    pub fn add(&mut self, thread: Thread) {
        self.threads.push(thread);
    }

    /// All threads, in scheduling order
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Thread with `id`
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id() == id)
    }

    /// Thread with `id`, mutably
    pub fn thread_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id() == id)
    }

    /// Resume every thread named in the wakeup queue
    fn deliver_wakeups(&mut self) -> Result<bool, VmError> {
        let mut delivered = false;
        while let Some(id) = self.runtime.take_wakeup() {
            match self.thread_mut(id) {
                Some(thread) => {
                    thread.wake()?;
                    delivered = true;
                }
                None => warn!(thread = %id, "wakeup for a thread outside the pool dropped"),
            }
        }
        Ok(delivered)
    }

    fn is_live(thread: &Thread) -> bool {
        !matches!(thread.status(), ThreadStatus::New | ThreadStatus::Terminated)
    }

    /// Run until every thread terminates or no thread can progress.
    ///
    /// A thread parked by a native that left its frame pending counts as
    /// blocked; the host completes it and calls `run` again.
    #[instrument(level = "debug", skip(self), fields(threads = self.threads.len()))]
    pub fn run(&mut self) -> Result<PoolOutcome, VmError> {
        let quantum = self.runtime.config().quantum;
        let mut rounds = 0usize;
        loop {
            let mut progressed = self.deliver_wakeups()?;
            for thread in self.threads.iter_mut() {
                if thread.status() == ThreadStatus::Runnable {
                    progressed |= thread.run_for(quantum)? > 0;
                }
            }
            rounds += 1;

            if !self.threads.iter().any(Self::is_live) {
                debug!(rounds, "all threads terminated");
                return Ok(PoolOutcome::Completed);
            }
            if !progressed && self.runtime.pending_wakeups() == 0 {
                let blocked: Vec<ThreadId> = self
                    .threads
                    .iter()
                    .filter(|t| t.status().is_parked())
                    .map(Thread::id)
                    .collect();
                warn!(rounds, ?blocked, "no runnable threads left");
                return Ok(PoolOutcome::Deadlocked { blocked });
            }
        }
    }
}
