//! Operand stack shuffles.
//!
//! These work on raw slots, so a long or double is moved as its two halves
//! exactly as the instruction's category-agnostic form describes.

use crate::thread::Thread;
use arrayvec::ArrayVec;
use core_types::{Value, VmError};

/// Pop `count` slots (top first) and push back `pattern`, bottom to top,
/// where each entry indexes the popped slots
fn shuffle(t: &mut Thread, count: usize, pattern: &[usize]) -> Result<(), VmError> {
    let mut popped: ArrayVec<Value, 4> = ArrayVec::new();
    for _ in 0..count {
        popped.push(vm_try!(t.pop_stack()?));
    }
    for &slot in pattern {
        vm_try!(t.push_stack(popped[slot])?);
    }
    t.advance(1)
}

/// `pop`
pub fn pop(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 1, &[])
}

/// `pop2`
pub fn pop2(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 2, &[])
}

/// `dup`
pub fn dup(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 1, &[0, 0])
}

/// `dup_x1`
pub fn dup_x1(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 2, &[0, 1, 0])
}

/// `dup_x2`
pub fn dup_x2(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 3, &[0, 2, 1, 0])
}

/// `dup2`
pub fn dup2(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 2, &[1, 0, 1, 0])
}

/// `dup2_x1`
pub fn dup2_x1(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 3, &[1, 0, 2, 1, 0])
}

/// `dup2_x2`
pub fn dup2_x2(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 4, &[1, 0, 3, 2, 1, 0])
}

/// `swap`
pub fn swap(t: &mut Thread) -> Result<(), VmError> {
    shuffle(t, 2, &[0, 1])
}
