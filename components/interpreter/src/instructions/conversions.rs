//! Primitive conversions.

use crate::thread::Thread;
use core_types::{Value, VmError};
use num_traits::{Bounded, Float, Zero};

/// Float to integer narrowing: NaN becomes zero, out-of-range values clamp
fn narrow<F: Float, I: num_traits::NumCast + Bounded + Zero>(value: F) -> I {
    if value.is_nan() {
        return I::zero();
    }
    num_traits::cast::<F, I>(value).unwrap_or_else(|| {
        if value.is_sign_negative() {
            I::min_value()
        } else {
            I::max_value()
        }
    })
}

macro_rules! convert {
    ($name:ident, $pop:ident, $op:expr) => {
        #[doc = concat!("`", stringify!($name), "`")]
        pub fn $name(t: &mut Thread) -> Result<(), VmError> {
            let value = vm_try!(t.$pop()?);
            let op = $op;
            vm_try!(t.push_value(op(value))?);
            t.advance(1)
        }
    };
}

convert!(i2l, pop_int, |v: i32| Value::Long(i64::from(v)));
convert!(i2f, pop_int, |v: i32| Value::Float(v as f32));
convert!(i2d, pop_int, |v: i32| Value::Double(f64::from(v)));
convert!(l2i, pop_long, |v: i64| Value::Int(v as i32));
convert!(l2f, pop_long, |v: i64| Value::Float(v as f32));
convert!(l2d, pop_long, |v: i64| Value::Double(v as f64));
convert!(f2i, pop_float, |v: f32| Value::Int(narrow(v)));
convert!(f2l, pop_float, |v: f32| Value::Long(narrow(v)));
convert!(f2d, pop_float, |v: f32| Value::Double(f64::from(v)));
convert!(d2i, pop_double, |v: f64| Value::Int(narrow(v)));
convert!(d2l, pop_double, |v: f64| Value::Long(narrow(v)));
convert!(d2f, pop_double, |v: f64| Value::Float(v as f32));
convert!(i2b, pop_int, |v: i32| Value::Int(i32::from(v as i8)));
convert!(i2c, pop_int, |v: i32| Value::Int(i32::from(v as u16)));
convert!(i2s, pop_int, |v: i32| Value::Int(i32::from(v as i16)));
