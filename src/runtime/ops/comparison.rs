//! Test and comparison operations
//!
//! Every comparison pushes an i32: 1 when the relation holds, 0 otherwise.
//! Unsigned variants compare the same bits reinterpreted as unsigned.

use super::*;

fn push_bool(stack: &mut Stack, b: bool) {
    stack.push(Value::I32(b as i32));
}

/// Generates a comparison:
/// 1. Pop value b from stack
/// 2. Pop value a from stack
/// 3. If either value is not of the op's type, trap
/// 4. Push i32 1 if `body(a, b)` holds, else 0
macro_rules! relop {
    ($(#[$meta:meta])* $name:ident, $pop:ident, |$a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let $b = stack.$pop()?;
            let $a = stack.$pop()?;
            push_bool(stack, $body);
            Ok(())
        }
    };
}

/// i32.eqz
/// 1. Pop value c from stack
/// 2. If it is not i32, trap
/// 3. Push i32 1 if c is zero, else 0
pub fn i32_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    push_bool(stack, c == 0);
    Ok(())
}

/// i64.eqz - as i32.eqz on an i64, still pushing an i32
pub fn i64_eqz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i64()?;
    push_bool(stack, c == 0);
    Ok(())
}

relop!(i32_eq, pop_i32, |a, b| a == b);
relop!(i32_ne, pop_i32, |a, b| a != b);
relop!(i32_lt_s, pop_i32, |a, b| a < b);
relop!(
    /// i32.lt_u - a < b with both read as unsigned, so -1 is the largest value
    i32_lt_u, pop_i32, |a, b| (a as u32) < (b as u32)
);
relop!(i32_gt_s, pop_i32, |a, b| a > b);
relop!(i32_gt_u, pop_i32, |a, b| (a as u32) > (b as u32));
relop!(i32_le_s, pop_i32, |a, b| a <= b);
relop!(i32_le_u, pop_i32, |a, b| (a as u32) <= (b as u32));
relop!(i32_ge_s, pop_i32, |a, b| a >= b);
relop!(i32_ge_u, pop_i32, |a, b| (a as u32) >= (b as u32));

relop!(i64_eq, pop_i64, |a, b| a == b);
relop!(i64_ne, pop_i64, |a, b| a != b);
relop!(i64_lt_s, pop_i64, |a, b| a < b);
relop!(i64_lt_u, pop_i64, |a, b| (a as u64) < (b as u64));
relop!(i64_gt_s, pop_i64, |a, b| a > b);
relop!(i64_gt_u, pop_i64, |a, b| (a as u64) > (b as u64));
relop!(i64_le_s, pop_i64, |a, b| a <= b);
relop!(i64_le_u, pop_i64, |a, b| (a as u64) <= (b as u64));
relop!(i64_ge_s, pop_i64, |a, b| a >= b);
relop!(i64_ge_u, pop_i64, |a, b| (a as u64) >= (b as u64));

// Float comparisons with NaN are false, except ne
relop!(
    /// f32.eq - IEEE equality: NaN equals nothing, and -0 equals +0
    f32_eq, pop_f32, |a, b| a == b
);
relop!(
    /// f32.ne - 1 when either operand is NaN
    f32_ne, pop_f32, |a, b| a != b
);
relop!(f32_lt, pop_f32, |a, b| a < b);
relop!(f32_gt, pop_f32, |a, b| a > b);
relop!(f32_le, pop_f32, |a, b| a <= b);
relop!(f32_ge, pop_f32, |a, b| a >= b);

relop!(f64_eq, pop_f64, |a, b| a == b);
relop!(f64_ne, pop_f64, |a, b| a != b);
relop!(f64_lt, pop_f64, |a, b| a < b);
relop!(f64_gt, pop_f64, |a, b| a > b);
relop!(f64_le, pop_f64, |a, b| a <= b);
relop!(f64_ge, pop_f64, |a, b| a >= b);
