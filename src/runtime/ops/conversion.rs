//! Conversion operations
//!
//! Width changes, sign extension, int/float conversion and bit
//! reinterpretation. Float to integer truncation faults on NaN and on values
//! whose integer part does not fit the target.

use super::*;

/// Generates a non-trapping conversion:
/// 1. Pop value a from stack
/// 2. If it is not the source type, trap
/// 3. Push `body(a)` as the target type
macro_rules! convert {
    ($(#[$meta:meta])* $name:ident, $pop:ident, $variant:ident, |$a:ident| $body:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let $a = stack.$pop()?;
            stack.push(Value::$variant($body));
            Ok(())
        }
    };
}

// ============================================================================
// Integer width and sign extension
// ============================================================================

convert!(
    /// i32.wrap_i64 - keep the low 32 bits
    i32_wrap_i64, pop_i64, I32, |a| a as i32
);
convert!(i64_extend_i32_s, pop_i32, I64, |a| a as i64);
convert!(
    /// i64.extend_i32_u - zero-extend, so -1 becomes 4294967295
    i64_extend_i32_u, pop_i32, I64, |a| a as u32 as i64
);
convert!(
    /// i32.extend8_s - sign-extend the low 8 bits
    i32_extend8_s, pop_i32, I32, |a| a as i8 as i32
);
convert!(i32_extend16_s, pop_i32, I32, |a| a as i16 as i32);
convert!(i64_extend8_s, pop_i64, I64, |a| a as i8 as i64);
convert!(i64_extend16_s, pop_i64, I64, |a| a as i16 as i64);
convert!(i64_extend32_s, pop_i64, I64, |a| a as i32 as i64);

// ============================================================================
// Reinterpretation (bit pattern preserved)
// ============================================================================

convert!(
    /// i32.reinterpret_f32 - the same 32 bits read as an integer, NaN payloads included
    i32_reinterpret_f32, pop_f32, I32, |a| a.to_bits() as i32
);
convert!(i64_reinterpret_f64, pop_f64, I64, |a| a.to_bits() as i64);
convert!(f32_reinterpret_i32, pop_i32, F32, |a| f32::from_bits(a as u32));
convert!(f64_reinterpret_i64, pop_i64, F64, |a| f64::from_bits(a as u64));

// ============================================================================
// Float precision and integer to float
// ============================================================================

convert!(
    /// f32.demote_f64 - round to nearest; out-of-range values become infinities
    f32_demote_f64, pop_f64, F32, |a| a as f32
);
convert!(f64_promote_f32, pop_f32, F64, |a| a as f64);
convert!(f32_convert_i32_s, pop_i32, F32, |a| a as f32);
convert!(f32_convert_i32_u, pop_i32, F32, |a| a as u32 as f32);
convert!(f32_convert_i64_s, pop_i64, F32, |a| a as f32);
convert!(
    /// f32.convert_i64_u - read a as unsigned, then round to nearest f32
    f32_convert_i64_u, pop_i64, F32, |a| a as u64 as f32
);
convert!(f64_convert_i32_s, pop_i32, F64, |a| a as f64);
convert!(f64_convert_i32_u, pop_i32, F64, |a| a as u32 as f64);
convert!(f64_convert_i64_s, pop_i64, F64, |a| a as f64);
convert!(f64_convert_i64_u, pop_i64, F64, |a| a as u64 as f64);

// ============================================================================
// Trapping float to integer truncation
// ============================================================================

/// Truncate toward zero, requiring `min <= result < max_exclusive`
fn checked_trunc(value: f64, min: f64, max_exclusive: f64) -> Result<f64, RuntimeError> {
    if value.is_nan() {
        return Err(ArithmeticFault::InvalidConversion(format!("{value}")).into());
    }
    let t = value.trunc();
    if t < min || t >= max_exclusive {
        return Err(ArithmeticFault::IntegerOverflow.into());
    }
    Ok(t)
}

const I32_MIN: f64 = -2147483648.0;
const I32_END: f64 = 2147483648.0;
const U32_END: f64 = 4294967296.0;
const I64_MIN: f64 = -9223372036854775808.0;
const I64_END: f64 = 9223372036854775808.0;
const U64_END: f64 = 18446744073709551616.0;

/// Generates a trapping float to integer truncation:
/// 1. Pop value a from stack
/// 2. If it is not the source float type, trap
/// 3. If a is NaN, trap with `InvalidConversion`
/// 4. Round a toward zero
/// 5. If the result lies outside `[min, end)`, trap with `IntegerOverflow`
/// 6. Push the result as the target integer type
macro_rules! trunc {
    ($(#[$meta:meta])* $name:ident, $pop:ident, $variant:ident, $min:expr, $end:expr, |$t:ident| $cast:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let value = stack.$pop()? as f64;
            let $t = checked_trunc(value, $min, $end)?;
            stack.push(Value::$variant($cast));
            Ok(())
        }
    };
}

trunc!(
    /// i32.trunc_f32_s - valid for truncated values in [-2^31, 2^31)
    i32_trunc_f32_s, pop_f32, I32, I32_MIN, I32_END, |t| t as i32
);
trunc!(
    /// i32.trunc_f32_u - valid for truncated values in [0, 2^32); -0.9 truncates to 0 and passes
    i32_trunc_f32_u, pop_f32, I32, 0.0, U32_END, |t| t as u32 as i32
);
trunc!(i32_trunc_f64_s, pop_f64, I32, I32_MIN, I32_END, |t| t as i32);
trunc!(i32_trunc_f64_u, pop_f64, I32, 0.0, U32_END, |t| t as u32 as i32);
trunc!(
    /// i64.trunc_f32_s - valid for truncated values in [-2^63, 2^63)
    i64_trunc_f32_s, pop_f32, I64, I64_MIN, I64_END, |t| t as i64
);
trunc!(
    /// i64.trunc_f32_u - valid for truncated values in [0, 2^64)
    i64_trunc_f32_u, pop_f32, I64, 0.0, U64_END, |t| t as u64 as i64
);
trunc!(i64_trunc_f64_s, pop_f64, I64, I64_MIN, I64_END, |t| t as i64);
trunc!(i64_trunc_f64_u, pop_f64, I64, 0.0, U64_END, |t| t as u64 as i64);
