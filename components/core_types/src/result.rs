//! Tri-state result used for resolution and operand-stack operations.
//!
//! Every fallible or re-entrant engine operation returns a [`VmResult`]. The
//! three states are intentionally distinct:
//!
//! - `Success(value)`: the operation completed.
//! - `Error(ErrorResult)`: a guest exception should be raised (or, for stack
//!   operations, already has been).
//! - `Defer`: guest code (a static initializer or a linkage bootstrap) has
//!   to run first; the caller must return without side effects and retry
//!   the same instruction later.

use std::fmt;

/// Exception class and message describing a guest-visible failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResult {
    /// Binary name of the exception class, e.g. `java/lang/ArithmeticException`
    pub exception_class: String,
    /// Detail message
    pub message: String,
}

impl ErrorResult {
    /// Create a new error result
    pub fn new(exception_class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception_class: exception_class.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.exception_class)
        } else {
            write!(f, "{}: {}", self.exception_class, self.message)
        }
    }
}

/// Success, error or defer.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorResult, VmResult};
///
/// let ok: VmResult<i32> = VmResult::Success(3);
/// assert_eq!(ok.map(|v| v * 2).success(), Some(6));
///
/// let err: VmResult<i32> = VmResult::error("java/lang/NoSuchFieldError", "x");
/// assert!(err.is_error());
///
/// let later: VmResult<i32> = VmResult::Defer;
/// assert!(later.is_defer());
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum VmResult<T> {
    /// The operation completed with a value
    Success(T),
    /// A guest exception is (or should be) raised
    Error(ErrorResult),
    /// Retry the same operation after pending guest code has run
    Defer,
}

impl<T> VmResult<T> {
    /// Build an `Error` from a class name and message
    pub fn error(exception_class: impl Into<String>, message: impl Into<String>) -> Self {
        VmResult::Error(ErrorResult::new(exception_class, message))
    }

    /// Check for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, VmResult::Success(_))
    }

    /// Check for `Error`
    pub fn is_error(&self) -> bool {
        matches!(self, VmResult::Error(_))
    }

    /// Check for `Defer`
    pub fn is_defer(&self) -> bool {
        matches!(self, VmResult::Defer)
    }

    /// Take the success value, dropping errors and defers
    pub fn success(self) -> Option<T> {
        match self {
            VmResult::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Take the error payload, if any
    pub fn error_result(self) -> Option<ErrorResult> {
        match self {
            VmResult::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Map the success value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> VmResult<U> {
        match self {
            VmResult::Success(v) => VmResult::Success(f(v)),
            VmResult::Error(e) => VmResult::Error(e),
            VmResult::Defer => VmResult::Defer,
        }
    }

    /// Chain another tri-state operation on success
    pub fn and_then<U>(self, f: impl FnOnce(T) -> VmResult<U>) -> VmResult<U> {
        match self {
            VmResult::Success(v) => f(v),
            VmResult::Error(e) => VmResult::Error(e),
            VmResult::Defer => VmResult::Defer,
        }
    }

    /// Borrow the success value
    pub fn as_ref(&self) -> VmResult<&T> {
        match self {
            VmResult::Success(v) => VmResult::Success(v),
            VmResult::Error(e) => VmResult::Error(e.clone()),
            VmResult::Defer => VmResult::Defer,
        }
    }
}

impl<T, E> VmResult<Result<T, E>> {
    /// Turn a tri-state of fallible values into a fallible tri-state
    pub fn transpose(self) -> Result<VmResult<T>, E> {
        match self {
            VmResult::Success(Ok(v)) => Ok(VmResult::Success(v)),
            VmResult::Success(Err(e)) => Err(e),
            VmResult::Error(e) => Ok(VmResult::Error(e)),
            VmResult::Defer => Ok(VmResult::Defer),
        }
    }
}

impl<T> From<ErrorResult> for VmResult<T> {
    fn from(err: ErrorResult) -> Self {
        VmResult::Error(err)
    }
}
