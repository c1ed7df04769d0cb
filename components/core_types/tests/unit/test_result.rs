//! Unit tests for the tri-state VmResult

use core_types::{ErrorResult, VmResult};

#[test]
fn test_success_accessors() {
    let res: VmResult<&str> = VmResult::Success("ok");
    assert!(res.is_success());
    assert!(!res.is_error());
    assert_eq!(res.success(), Some("ok"));
}

#[test]
fn test_error_carries_class_and_message() {
    let res: VmResult<()> = VmResult::error("java/lang/NoSuchMethodError", "foo()V");
    let err = res.error_result().unwrap();
    assert_eq!(err.exception_class, "java/lang/NoSuchMethodError");
    assert_eq!(err.message, "foo()V");
}

#[test]
fn test_defer_has_no_value() {
    let res: VmResult<u8> = VmResult::Defer;
    assert!(res.is_defer());
    assert_eq!(res.clone().success(), None);
    assert_eq!(res.error_result(), None);
}

#[test]
fn test_from_error_result() {
    let res: VmResult<i64> = ErrorResult::new("java/lang/Error", "x").into();
    assert!(res.is_error());
}

#[test]
fn test_and_then_chains_success() {
    let res: VmResult<i32> = VmResult::Success(2);
    let chained = res.and_then(|v| {
        if v > 1 {
            VmResult::Success(v * 10)
        } else {
            VmResult::Defer
        }
    });
    assert_eq!(chained, VmResult::Success(20));
}
