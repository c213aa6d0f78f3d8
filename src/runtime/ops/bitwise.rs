//! Bitwise operations
//!
//! Logical ops, shifts and rotates (count taken modulo the width) and the
//! bit-counting unary ops.

use super::*;

/// Generates a binary integer op:
/// 1. Pop value b from stack
/// 2. Pop value a from stack
/// 3. If either value is not of the op's type, trap
/// 4. Push `body(a, b)` to stack
macro_rules! int_binop {
    ($(#[$meta:meta])* $name:ident, $pop:ident, $variant:ident, |$a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let $b = stack.$pop()?;
            let $a = stack.$pop()?;
            stack.push(Value::$variant($body));
            Ok(())
        }
    };
}

/// Generates a unary integer op that pops a and pushes `body(a)`
macro_rules! int_unop {
    ($(#[$meta:meta])* $name:ident, $pop:ident, $variant:ident, |$a:ident| $body:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack) -> Result<(), RuntimeError> {
            let $a = stack.$pop()?;
            stack.push(Value::$variant($body));
            Ok(())
        }
    };
}

int_binop!(i32_and, pop_i32, I32, |a, b| a & b);
int_binop!(i32_or, pop_i32, I32, |a, b| a | b);
int_binop!(i32_xor, pop_i32, I32, |a, b| a ^ b);
int_binop!(
    /// i32.shl - shift a left by b modulo 32 bits
    i32_shl, pop_i32, I32, |a, b| a.wrapping_shl(b as u32)
);
int_binop!(
    /// i32.shr_s - arithmetic shift right by b modulo 32, copying the sign bit in
    i32_shr_s, pop_i32, I32, |a, b| a.wrapping_shr(b as u32)
);
int_binop!(
    /// i32.shr_u - logical shift right by b modulo 32, shifting zeros in
    i32_shr_u, pop_i32, I32, |a, b| (a as u32).wrapping_shr(b as u32) as i32
);
int_binop!(
    /// i32.rotl
    /// 1. Pop the count b and the value a
    /// 2. Take b modulo 32, reading it as unsigned so negative counts wrap
    /// 3. Push a rotated left by that many bits; bits leaving the top re-enter at the bottom
    i32_rotl, pop_i32, I32, |a, b| a.rotate_left(b as u32 % 32)
);
int_binop!(
    /// i32.rotr - as i32.rotl, rotating toward the low bits
    i32_rotr, pop_i32, I32, |a, b| a.rotate_right(b as u32 % 32)
);

int_binop!(i64_and, pop_i64, I64, |a, b| a & b);
int_binop!(i64_or, pop_i64, I64, |a, b| a | b);
int_binop!(i64_xor, pop_i64, I64, |a, b| a ^ b);
int_binop!(
    /// i64.shl - the count is taken modulo 64
    i64_shl, pop_i64, I64, |a, b| a.wrapping_shl(b as u32)
);
int_binop!(i64_shr_s, pop_i64, I64, |a, b| a.wrapping_shr(b as u32));
int_binop!(i64_shr_u, pop_i64, I64, |a, b| (a as u64).wrapping_shr(b as u32) as i64);
int_binop!(
    /// i64.rotl - as i32.rotl with the count taken modulo 64
    i64_rotl, pop_i64, I64, |a, b| a.rotate_left((b as u64 % 64) as u32)
);
int_binop!(
    /// i64.rotr - as i32.rotr with the count taken modulo 64
    i64_rotr, pop_i64, I64, |a, b| a.rotate_right((b as u64 % 64) as u32)
);

int_unop!(
    /// i32.clz - number of leading zero bits; 32 for zero
    i32_clz, pop_i32, I32, |a| a.leading_zeros() as i32
);
int_unop!(
    /// i32.ctz - number of trailing zero bits; 32 for zero
    i32_ctz, pop_i32, I32, |a| a.trailing_zeros() as i32
);
int_unop!(
    /// i32.popcnt - number of set bits
    i32_popcnt, pop_i32, I32, |a| a.count_ones() as i32
);
int_unop!(
    /// i64.clz - 64 for zero
    i64_clz, pop_i64, I64, |a| a.leading_zeros() as i64
);
int_unop!(i64_ctz, pop_i64, I64, |a| a.trailing_zeros() as i64);
int_unop!(i64_popcnt, pop_i64, I64, |a| a.count_ones() as i64);
