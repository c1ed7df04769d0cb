//! Control-flow helpers for the tri-state result.

/// Unwrap a `VmResult` whose failure already raised a guest exception.
///
/// On `Error` or `Defer` the enclosing handler returns `Ok(())`.
macro_rules! vm_try {
    ($e:expr) => {
        match $e {
            core_types::VmResult::Success(value) => value,
            core_types::VmResult::Error(_) | core_types::VmResult::Defer => return Ok(()),
        }
    };
}

/// Unwrap a resolution result, throwing its error on the given thread.
///
/// On `Defer` the enclosing handler returns `Ok(())` without side effects so
/// the instruction runs again later.
macro_rules! resolve_or_throw {
    ($thread:expr, $e:expr) => {
        match $e {
            core_types::VmResult::Success(value) => value,
            core_types::VmResult::Error(err) => {
                $thread.throw_error(err)?;
                return Ok(());
            }
            core_types::VmResult::Defer => return Ok(()),
        }
    };
}
