//! Memory operations
//!
//! Loads pop an address, stores pop a value then an address. The address is
//! an i32 read as unsigned; the static offset is added without wrapping, so
//! the effective address may exceed 32 bits and fail the bounds check.

use super::*;
use crate::runtime::config::GrowResult;

/// Pop the base address and add the static offset in 64 bits
fn effective_address(stack: &mut Stack, memarg: &MemArg) -> Result<u64, RuntimeError> {
    let base = stack.pop_i32()? as u32;
    Ok(base as u64 + memarg.offset as u64)
}

/// Generates a load:
/// 1. Pop the i32 base address from stack
/// 2. Add the memarg offset to get the effective address ea
/// 3. If ea plus the access width exceeds the memory size, trap
/// 4. Read the bytes at ea as little-endian
/// 5. Extend narrow reads to the result type (sign or zero, per the suffix)
/// 6. Push result to stack
macro_rules! load {
    ($(#[$meta:meta])* $name:ident, $read:ident, $variant:ident, |$v:ident| $conv:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack, memory: &Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
            let ea = effective_address(stack, memarg)?;
            let $v = memory.$read(ea)?;
            stack.push(Value::$variant($conv));
            Ok(())
        }
    };
}

/// Generates a store:
/// 1. Pop the value from stack
/// 2. Pop the i32 base address from stack
/// 3. Add the memarg offset to get the effective address ea
/// 4. If ea plus the access width exceeds the memory size, trap
/// 5. Write the value, or its low bytes for narrow stores, little-endian at ea
macro_rules! store {
    ($(#[$meta:meta])* $name:ident, $pop:ident, $write:ident, |$v:ident| $conv:expr) => {
        $(#[$meta])*
        pub fn $name(stack: &mut Stack, memory: &mut Memory, memarg: &MemArg) -> Result<(), RuntimeError> {
            let $v = stack.$pop()?;
            let ea = effective_address(stack, memarg)?;
            memory.$write(ea, $conv)
        }
    };
}

// ============================================================================
// Loads
// ============================================================================

load!(i32_load, read_i32, I32, |v| v);
load!(i64_load, read_i64, I64, |v| v);
load!(f32_load, read_f32, F32, |v| v);
load!(f64_load, read_f64, F64, |v| v);
load!(
    /// i32.load8_s - one byte, sign-extended: 0xff loads as -1
    i32_load8_s, read_i8, I32, |v| v as i32
);
load!(
    /// i32.load8_u - one byte, zero-extended: 0xff loads as 255
    i32_load8_u, read_u8, I32, |v| v as i32
);
load!(i32_load16_s, read_i16, I32, |v| v as i32);
load!(i32_load16_u, read_u16, I32, |v| v as i32);
load!(i64_load8_s, read_i8, I64, |v| v as i64);
load!(i64_load8_u, read_u8, I64, |v| v as i64);
load!(i64_load16_s, read_i16, I64, |v| v as i64);
load!(i64_load16_u, read_u16, I64, |v| v as i64);
load!(i64_load32_s, read_i32, I64, |v| v as i64);
load!(
    /// i64.load32_u - four bytes, zero-extended to 64 bits
    i64_load32_u, read_u32, I64, |v| v as i64
);

// ============================================================================
// Stores (narrow variants write only the low bytes)
// ============================================================================

store!(i32_store, pop_i32, write_u32, |v| v as u32);
store!(i64_store, pop_i64, write_u64, |v| v as u64);
store!(f32_store, pop_f32, write_f32, |v| v);
store!(f64_store, pop_f64, write_f64, |v| v);
store!(i32_store8, pop_i32, write_u8, |v| v as u8);
store!(i32_store16, pop_i32, write_u16, |v| v as u16);
store!(i64_store8, pop_i64, write_u8, |v| v as u8);
store!(i64_store16, pop_i64, write_u16, |v| v as u16);
store!(
    /// i64.store32 - the low four bytes of the value
    i64_store32, pop_i64, write_u32, |v| v as u32
);

// ============================================================================
// Size and growth
// ============================================================================

/// memory.size - current size in pages
pub fn memory_size(stack: &mut Stack, memory: &Memory) -> Result<(), RuntimeError> {
    stack.push(Value::I32(memory.size() as i32));
    Ok(())
}

/// memory.grow - pop a page delta and grow
///
/// Pushes the page count selected by `grow_result`, or -1 when the delta is
/// negative or the memory cannot grow that far.
pub fn memory_grow(stack: &mut Stack, memory: &mut Memory, grow_result: GrowResult) -> Result<(), RuntimeError> {
    let delta = stack.pop_i32()?;
    let outcome = u32::try_from(delta).ok().and_then(|delta| memory.grow(delta));
    let pushed = match (outcome, grow_result) {
        (None, _) => -1,
        (Some(previous), GrowResult::PreviousSize) => previous as i32,
        (Some(_), GrowResult::NewSize) => memory.size() as i32,
    };
    stack.push(Value::I32(pushed));
    Ok(())
}
