//! Arithmetic, bitwise and shift instructions.
//!
//! Integer arithmetic wraps on overflow; shift distances are masked to the
//! operand width.

use crate::thread::Thread;
use core_types::{Value, VmError};

const ARITHMETIC: &str = "java/lang/ArithmeticException";

macro_rules! binary {
    ($name:ident, $pop:ident, $push:ident, $variant:ident, $op:expr) => {
        #[doc = concat!("`", stringify!($name), "`")]
        pub fn $name(t: &mut Thread) -> Result<(), VmError> {
            let b = vm_try!(t.$pop()?);
            let a = vm_try!(t.$pop()?);
            let op = $op;
            vm_try!(t.$push(Value::$variant(op(a, b)))?);
            t.advance(1)
        }
    };
}

binary!(iadd, pop_int, push_stack, Int, i32::wrapping_add);
binary!(isub, pop_int, push_stack, Int, i32::wrapping_sub);
binary!(imul, pop_int, push_stack, Int, i32::wrapping_mul);
binary!(iand, pop_int, push_stack, Int, |a: i32, b: i32| a & b);
binary!(ior, pop_int, push_stack, Int, |a: i32, b: i32| a | b);
binary!(ixor, pop_int, push_stack, Int, |a: i32, b: i32| a ^ b);
binary!(ishl, pop_int, push_stack, Int, |a: i32, b: i32| a << (b & 0x1f));
binary!(ishr, pop_int, push_stack, Int, |a: i32, b: i32| a >> (b & 0x1f));
binary!(iushr, pop_int, push_stack, Int, |a: i32, b: i32| ((a as u32) >> (b & 0x1f)) as i32);

binary!(ladd, pop_long, push_stack64, Long, i64::wrapping_add);
binary!(lsub, pop_long, push_stack64, Long, i64::wrapping_sub);
binary!(lmul, pop_long, push_stack64, Long, i64::wrapping_mul);
binary!(land, pop_long, push_stack64, Long, |a: i64, b: i64| a & b);
binary!(lor, pop_long, push_stack64, Long, |a: i64, b: i64| a | b);
binary!(lxor, pop_long, push_stack64, Long, |a: i64, b: i64| a ^ b);

binary!(fadd, pop_float, push_stack, Float, |a: f32, b: f32| a + b);
binary!(fsub, pop_float, push_stack, Float, |a: f32, b: f32| a - b);
binary!(fmul, pop_float, push_stack, Float, |a: f32, b: f32| a * b);
binary!(fdiv, pop_float, push_stack, Float, |a: f32, b: f32| a / b);
binary!(frem, pop_float, push_stack, Float, |a: f32, b: f32| a % b);

binary!(dadd, pop_double, push_stack64, Double, |a: f64, b: f64| a + b);
binary!(dsub, pop_double, push_stack64, Double, |a: f64, b: f64| a - b);
binary!(dmul, pop_double, push_stack64, Double, |a: f64, b: f64| a * b);
binary!(ddiv, pop_double, push_stack64, Double, |a: f64, b: f64| a / b);
binary!(drem, pop_double, push_stack64, Double, |a: f64, b: f64| a % b);

/// Long shifts take an `int` distance
macro_rules! long_shift {
    ($name:ident, $op:expr) => {
        #[doc = concat!("`", stringify!($name), "`")]
        pub fn $name(t: &mut Thread) -> Result<(), VmError> {
            let distance = vm_try!(t.pop_int()?) & 0x3f;
            let value = vm_try!(t.pop_long()?);
            let op = $op;
            vm_try!(t.push_stack64(Value::Long(op(value, distance)))?);
            t.advance(1)
        }
    };
}

long_shift!(lshl, |a: i64, n: i32| a << n);
long_shift!(lshr, |a: i64, n: i32| a >> n);
long_shift!(lushr, |a: i64, n: i32| ((a as u64) >> n) as i64);

macro_rules! division {
    ($name:ident, $pop:ident, $push:ident, $variant:ident, $op:expr) => {
        #[doc = concat!("`", stringify!($name), "`; a zero divisor throws `ArithmeticException`")]
        pub fn $name(t: &mut Thread) -> Result<(), VmError> {
            let b = vm_try!(t.$pop()?);
            let a = vm_try!(t.$pop()?);
            if b == 0 {
                return t.throw_new_exception(ARITHMETIC, "Division by zero");
            }
            let op = $op;
            vm_try!(t.$push(Value::$variant(op(a, b)))?);
            t.advance(1)
        }
    };
}

division!(idiv, pop_int, push_stack, Int, i32::wrapping_div);
division!(irem, pop_int, push_stack, Int, i32::wrapping_rem);
division!(ldiv, pop_long, push_stack64, Long, i64::wrapping_div);
division!(lrem, pop_long, push_stack64, Long, i64::wrapping_rem);

/// `ineg`
pub fn ineg(t: &mut Thread) -> Result<(), VmError> {
    let value = vm_try!(t.pop_int()?);
    vm_try!(t.push_stack(Value::Int(value.wrapping_neg()))?);
    t.advance(1)
}

/// `lneg`
pub fn lneg(t: &mut Thread) -> Result<(), VmError> {
    let value = vm_try!(t.pop_long()?);
    vm_try!(t.push_stack64(Value::Long(value.wrapping_neg()))?);
    t.advance(1)
}

/// `fneg`
pub fn fneg(t: &mut Thread) -> Result<(), VmError> {
    let value = vm_try!(t.pop_float()?);
    vm_try!(t.push_stack(Value::Float(-value))?);
    t.advance(1)
}

/// `dneg`
pub fn dneg(t: &mut Thread) -> Result<(), VmError> {
    let value = vm_try!(t.pop_double()?);
    vm_try!(t.push_stack64(Value::Double(-value))?);
    t.advance(1)
}

/// `iinc`
pub fn iinc(t: &mut Thread) -> Result<(), VmError> {
    let index = usize::from(t.operand_u8(1)?);
    let delta = i32::from(t.operand_i8(2)?);
    increment(t, index, delta)?;
    t.advance(3)
}

/// Add `delta` to an `int` local
pub(crate) fn increment(t: &mut Thread, index: usize, delta: i32) -> Result<(), VmError> {
    let value = t.load_local(index)?.as_int()?;
    t.store_local(index, Value::Int(value.wrapping_add(delta)))
}
