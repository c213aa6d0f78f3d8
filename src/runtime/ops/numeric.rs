//! Numeric operations
//!
//! Constants, integer arithmetic and float arithmetic. Integer add, sub and
//! mul wrap; division and remainder fault on a zero divisor and on the one
//! signed quotient that does not fit.

use super::*;
use crate::runtime::config::SignedDivision;

// ============================================================================
// Helpers
// ============================================================================

/// Pop two i32 operands, c2 first, and push `f(c1, c2)`
fn i32_binop(stack: &mut Stack, f: impl FnOnce(i32, i32) -> Result<i32, RuntimeError>) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(f(c1, c2)?));
    Ok(())
}

fn i64_binop(stack: &mut Stack, f: impl FnOnce(i64, i64) -> Result<i64, RuntimeError>) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(f(c1, c2)?));
    Ok(())
}

fn f32_binop(stack: &mut Stack, f: impl FnOnce(f32, f32) -> f32) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f32()?;
    let c1 = stack.pop_f32()?;
    stack.push(Value::F32(f(c1, c2)));
    Ok(())
}

fn f64_binop(stack: &mut Stack, f: impl FnOnce(f64, f64) -> f64) -> Result<(), RuntimeError> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(f(c1, c2)));
    Ok(())
}

/// Pop one f32 operand and push `f(c)`
fn f32_unop(stack: &mut Stack, f: impl FnOnce(f32) -> f32) -> Result<(), RuntimeError> {
    let c = stack.pop_f32()?;
    stack.push(Value::F32(f(c)));
    Ok(())
}

fn f64_unop(stack: &mut Stack, f: impl FnOnce(f64) -> f64) -> Result<(), RuntimeError> {
    let c = stack.pop_f64()?;
    stack.push(Value::F64(f(c)));
    Ok(())
}

/// Signed division and remainder, generic over width
///
/// Truncation rounds the quotient toward zero and gives the remainder the
/// dividend's sign: `-7 / 2 == -3`, `-7 % 2 == -1`. Floor rounds toward
/// negative infinity and gives the remainder the divisor's sign:
/// `-7 / 2 == -4`, `-7 % 2 == 1`. A zero divisor faults with
/// `DivisionByZero`; `MIN / -1` faults with `IntegerOverflow` in both modes.
macro_rules! signed_div_rem {
    ($div:ident, $rem:ident, $ty:ty) => {
        fn $div(c1: $ty, c2: $ty, mode: SignedDivision) -> Result<$ty, RuntimeError> {
            if c2 == 0 {
                return Err(ArithmeticFault::DivisionByZero.into());
            }
            if c1 == <$ty>::MIN && c2 == -1 {
                return Err(ArithmeticFault::IntegerOverflow.into());
            }
            let q = c1 / c2;
            match mode {
                SignedDivision::Truncate => Ok(q),
                SignedDivision::Floor if c1 % c2 != 0 && ((c1 < 0) != (c2 < 0)) => Ok(q - 1),
                SignedDivision::Floor => Ok(q),
            }
        }

        fn $rem(c1: $ty, c2: $ty, mode: SignedDivision) -> Result<$ty, RuntimeError> {
            if c2 == 0 {
                return Err(ArithmeticFault::DivisionByZero.into());
            }
            // MIN % -1 is 0 in both modes
            let r = c1.wrapping_rem(c2);
            match mode {
                SignedDivision::Truncate => Ok(r),
                SignedDivision::Floor if r != 0 && ((r < 0) != (c2 < 0)) => Ok(r + c2),
                SignedDivision::Floor => Ok(r),
            }
        }
    };
}

signed_div_rem!(div_s32, rem_s32, i32);
signed_div_rem!(div_s64, rem_s64, i64);

/// IEEE minimum with NaN propagation and -0 ordered below +0
macro_rules! float_min_max {
    ($min:ident, $max:ident, $ty:ty) => {
        fn $min(a: $ty, b: $ty) -> $ty {
            if a.is_nan() || b.is_nan() {
                <$ty>::NAN
            } else if a == 0.0 && b == 0.0 {
                if a.is_sign_negative() {
                    a
                } else {
                    b
                }
            } else {
                a.min(b)
            }
        }

        fn $max(a: $ty, b: $ty) -> $ty {
            if a.is_nan() || b.is_nan() {
                <$ty>::NAN
            } else if a == 0.0 && b == 0.0 {
                if a.is_sign_positive() {
                    a
                } else {
                    b
                }
            } else {
                a.max(b)
            }
        }
    };
}

float_min_max!(min32, max32, f32);
float_min_max!(min64, max64, f64);

// ============================================================================
// Constants
// ============================================================================

/// i32.const
/// Push the immediate i32 value to the stack.
pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), RuntimeError> {
    stack.push(Value::I32(value));
    Ok(())
}

/// i64.const
/// Push the immediate i64 value to the stack.
pub fn i64_const(stack: &mut Stack, value: i64) -> Result<(), RuntimeError> {
    stack.push(Value::I64(value));
    Ok(())
}

/// f32.const
/// Push the immediate f32 value to the stack.
pub fn f32_const(stack: &mut Stack, value: f32) -> Result<(), RuntimeError> {
    stack.push(Value::F32(value));
    Ok(())
}

/// f64.const
/// Push the immediate f64 value to the stack.
pub fn f64_const(stack: &mut Stack, value: f64) -> Result<(), RuntimeError> {
    stack.push(Value::F64(value));
    Ok(())
}

// ============================================================================
// Integer arithmetic
// ============================================================================

/// i32.add
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. Compute c1 + c2 modulo 2^32
/// 5. Push result to stack
pub fn i32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| Ok(c1.wrapping_add(c2)))
}

/// i32.sub
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. Compute c1 - c2 modulo 2^32
/// 5. Push result to stack
pub fn i32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| Ok(c1.wrapping_sub(c2)))
}

/// i32.mul
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. Compute c1 * c2 modulo 2^32
/// 5. Push result to stack
pub fn i32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| Ok(c1.wrapping_mul(c2)))
}

/// i32.div_s
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. If c2 is 0, trap
/// 5. If c1 is i32::MIN and c2 is -1, trap
/// 6. Compute the signed quotient, rounded as `mode` says
/// 7. Push result to stack
pub fn i32_div_s(stack: &mut Stack, mode: SignedDivision) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| div_s32(c1, c2, mode))
}

/// i32.div_u
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. If c2 is 0, trap
/// 5. Compute the quotient of c1 and c2 read as unsigned
/// 6. Push result to stack
pub fn i32_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| {
        (c1 as u32)
            .checked_div(c2 as u32)
            .map(|q| q as i32)
            .ok_or_else(|| ArithmeticFault::DivisionByZero.into())
    })
}

/// i32.rem_s
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. If c2 is 0, trap
/// 5. Compute the signed remainder, signed as `mode` says
/// 6. Push result to stack
pub fn i32_rem_s(stack: &mut Stack, mode: SignedDivision) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| rem_s32(c1, c2, mode))
}

/// i32.rem_u
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. If c2 is 0, trap
/// 5. Compute the remainder of c1 and c2 read as unsigned
/// 6. Push result to stack
pub fn i32_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    i32_binop(stack, |c1, c2| {
        (c1 as u32)
            .checked_rem(c2 as u32)
            .map(|r| r as i32)
            .ok_or_else(|| ArithmeticFault::DivisionByZero.into())
    })
}

/// i64.add
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. Compute c1 + c2 modulo 2^64
/// 5. Push result to stack
pub fn i64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| Ok(c1.wrapping_add(c2)))
}

/// i64.sub
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. Compute c1 - c2 modulo 2^64
/// 5. Push result to stack
pub fn i64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| Ok(c1.wrapping_sub(c2)))
}

/// i64.mul
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. Compute c1 * c2 modulo 2^64
/// 5. Push result to stack
pub fn i64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| Ok(c1.wrapping_mul(c2)))
}

/// i64.div_s
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. If c2 is 0, trap
/// 5. If c1 is i64::MIN and c2 is -1, trap
/// 6. Compute the signed quotient, rounded as `mode` says
/// 7. Push result to stack
pub fn i64_div_s(stack: &mut Stack, mode: SignedDivision) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| div_s64(c1, c2, mode))
}

/// i64.div_u
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. If c2 is 0, trap
/// 5. Compute the quotient of c1 and c2 read as unsigned
/// 6. Push result to stack
pub fn i64_div_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| {
        (c1 as u64)
            .checked_div(c2 as u64)
            .map(|q| q as i64)
            .ok_or_else(|| ArithmeticFault::DivisionByZero.into())
    })
}

/// i64.rem_s
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. If c2 is 0, trap
/// 5. Compute the signed remainder, signed as `mode` says
/// 6. Push result to stack
pub fn i64_rem_s(stack: &mut Stack, mode: SignedDivision) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| rem_s64(c1, c2, mode))
}

/// i64.rem_u
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i64, trap
/// 4. If c2 is 0, trap
/// 5. Compute the remainder of c1 and c2 read as unsigned
/// 6. Push result to stack
pub fn i64_rem_u(stack: &mut Stack) -> Result<(), RuntimeError> {
    i64_binop(stack, |c1, c2| {
        (c1 as u64)
            .checked_rem(c2 as u64)
            .map(|r| r as i64)
            .ok_or_else(|| ArithmeticFault::DivisionByZero.into())
    })
}

// ============================================================================
// Float arithmetic
// ============================================================================

/// f32.add
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute c1 + c2 under IEEE 754 rounding
/// 5. Push result to stack
pub fn f32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, |c1, c2| c1 + c2)
}

/// f32.sub
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute c1 - c2 under IEEE 754 rounding
/// 5. Push result to stack
pub fn f32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, |c1, c2| c1 - c2)
}

/// f32.mul
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute c1 * c2 under IEEE 754 rounding
/// 5. Push result to stack
pub fn f32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, |c1, c2| c1 * c2)
}

/// f32.div
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute c1 / c2; a zero divisor gives an infinity or NaN, never a trap
/// 5. Push result to stack
pub fn f32_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, |c1, c2| c1 / c2)
}

/// f32.min
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute the minimum; NaN if either is NaN, and -0 below +0
/// 5. Push result to stack
pub fn f32_min(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, min32)
}

/// f32.max
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute the maximum; NaN if either is NaN, and +0 above -0
/// 5. Push result to stack
pub fn f32_max(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, max32)
}

/// f32.copysign
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not f32, trap
/// 4. Compute c1 with the sign bit of c2
/// 5. Push result to stack
pub fn f32_copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_binop(stack, f32::copysign)
}

/// f32.abs
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Clear the sign bit
/// 4. Push result to stack
pub fn f32_abs(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, f32::abs)
}

/// f32.neg
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Flip the sign bit
/// 4. Push result to stack
pub fn f32_neg(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, |c| -c)
}

/// f32.sqrt
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Compute the square root; negative inputs give NaN
/// 4. Push result to stack
pub fn f32_sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, f32::sqrt)
}

/// f32.ceil
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Round toward positive infinity
/// 4. Push result to stack
pub fn f32_ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, f32::ceil)
}

/// f32.floor
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Round toward negative infinity
/// 4. Push result to stack
pub fn f32_floor(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, f32::floor)
}

/// f32.trunc
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Round toward zero
/// 4. Push result to stack
pub fn f32_trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, f32::trunc)
}

/// f32.nearest
/// 1. Pop value c from stack
/// 2. If it is not f32, trap
/// 3. Round to the nearest integer, ties to even
/// 4. Push result to stack
pub fn f32_nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
    f32_unop(stack, f32::round_ties_even)
}

/// f64.add
/// As f32.add, on f64 operands.
pub fn f64_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, |c1, c2| c1 + c2)
}

/// f64.sub
/// As f32.sub, on f64 operands.
pub fn f64_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, |c1, c2| c1 - c2)
}

/// f64.mul
/// As f32.mul, on f64 operands.
pub fn f64_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, |c1, c2| c1 * c2)
}

/// f64.div
/// As f32.div, on f64 operands.
pub fn f64_div(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, |c1, c2| c1 / c2)
}

/// f64.min
/// As f32.min, on f64 operands.
pub fn f64_min(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, min64)
}

/// f64.max
/// As f32.max, on f64 operands.
pub fn f64_max(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, max64)
}

/// f64.copysign
/// As f32.copysign, on f64 operands.
pub fn f64_copysign(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_binop(stack, f64::copysign)
}

/// f64.abs
/// As f32.abs, on f64 operands.
pub fn f64_abs(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, f64::abs)
}

/// f64.neg
/// As f32.neg, on f64 operands.
pub fn f64_neg(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, |c| -c)
}

/// f64.sqrt
/// As f32.sqrt, on f64 operands.
pub fn f64_sqrt(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, f64::sqrt)
}

/// f64.ceil
/// As f32.ceil, on f64 operands.
pub fn f64_ceil(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, f64::ceil)
}

/// f64.floor
/// As f32.floor, on f64 operands.
pub fn f64_floor(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, f64::floor)
}

/// f64.trunc
/// As f32.trunc, on f64 operands.
pub fn f64_trunc(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, f64::trunc)
}

/// f64.nearest
/// As f32.nearest, on f64 operands.
pub fn f64_nearest(stack: &mut Stack) -> Result<(), RuntimeError> {
    f64_unop(stack, f64::round_ties_even)
}
