//! Reentrant object monitors.
//!
//! Monitors never block an OS thread. A contended `enter` queues the caller
//! and reports [`EnterOutcome::Blocked`]; ownership is later handed to the
//! first queued thread by `exit` or `wait`, which report the woken thread so
//! the scheduler can resume it.

use core_types::ThreadId;
use std::collections::VecDeque;
use thiserror::Error;

/// Monitor misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The calling thread does not own the monitor
    #[error("Cannot exit a monitor that you do not own.")]
    NotOwner,
}

/// Result of trying to enter a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The caller now owns the monitor
    Acquired,
    /// The caller was queued and will be handed ownership later
    Blocked,
}

/// A thread queued on a monitor together with the count it will own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    /// Queued thread
    pub thread: ThreadId,
    /// Reentrancy count restored when ownership is handed over
    pub count: u32,
}

/// Reentrant lock attached to every heap object.
///
/// The count is non-zero exactly when there is an owner.
///
/// # Examples
///
/// ```
/// use core_types::ThreadId;
/// use memory_manager::{EnterOutcome, Monitor};
///
/// let mut monitor = Monitor::new();
/// let (a, b) = (ThreadId(1), ThreadId(2));
///
/// assert_eq!(monitor.enter(a), EnterOutcome::Acquired);
/// assert_eq!(monitor.enter(b), EnterOutcome::Blocked);
/// assert_eq!(monitor.exit(a), Ok(Some(b)));
/// assert_eq!(monitor.owner(), Some(b));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    owner: Option<ThreadId>,
    count: u32,
    entry_queue: VecDeque<Waiter>,
    wait_set: VecDeque<Waiter>,
}

impl Monitor {
    /// Create an unowned monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    /// Reentrancy count
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Check whether `thread` owns the monitor
    pub fn is_owned_by(&self, thread: ThreadId) -> bool {
        self.owner == Some(thread)
    }

    /// Threads blocked in `enter`
    pub fn queued(&self) -> usize {
        self.entry_queue.len()
    }

    /// Threads parked in `wait`
    pub fn waiting(&self) -> usize {
        self.wait_set.len()
    }

    /// Acquire (or re-enter) the monitor, queueing on contention
    pub fn enter(&mut self, thread: ThreadId) -> EnterOutcome {
        match self.owner {
            None => {
                self.owner = Some(thread);
                self.count = 1;
                EnterOutcome::Acquired
            }
            Some(owner) if owner == thread => {
                self.count += 1;
                EnterOutcome::Acquired
            }
            Some(_) => {
                self.entry_queue.push_back(Waiter { thread, count: 1 });
                EnterOutcome::Blocked
            }
        }
    }

    fn check_owner(&self, thread: ThreadId) -> Result<(), MonitorError> {
        if self.is_owned_by(thread) {
            Ok(())
        } else {
            Err(MonitorError::NotOwner)
        }
    }

    /// Give ownership to the first queued thread, if any
    fn hand_off(&mut self) -> Option<ThreadId> {
        let next = self.entry_queue.pop_front()?;
        self.owner = Some(next.thread);
        self.count = next.count;
        Some(next.thread)
    }

    /// Release one level of ownership.
    ///
    /// Returns the thread that received ownership when the count reached zero.
    pub fn exit(&mut self, thread: ThreadId) -> Result<Option<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        self.count -= 1;
        if self.count > 0 {
            return Ok(None);
        }
        self.owner = None;
        Ok(self.hand_off())
    }

    /// Release every level of ownership and park `thread` in the wait set.
    ///
    /// The saved count is restored once the thread is notified and handed the
    /// monitor again. Returns the thread that received ownership.
    pub fn wait(&mut self, thread: ThreadId) -> Result<Option<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        self.wait_set.push_back(Waiter {
            thread,
            count: self.count,
        });
        self.owner = None;
        self.count = 0;
        Ok(self.hand_off())
    }

    /// Move the longest-waiting thread to the entry queue
    pub fn notify(&mut self, thread: ThreadId) -> Result<Option<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        let Some(waiter) = self.wait_set.pop_front() else {
            return Ok(None);
        };
        self.entry_queue.push_back(waiter);
        Ok(Some(waiter.thread))
    }

    /// Move every waiting thread to the entry queue
    pub fn notify_all(&mut self, thread: ThreadId) -> Result<Vec<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        let moved: Vec<ThreadId> = self.wait_set.iter().map(|w| w.thread).collect();
        self.entry_queue.extend(self.wait_set.drain(..));
        Ok(moved)
    }
}
