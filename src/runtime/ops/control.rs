//! Branch, return and trap operations
//!
//! These only decide how the current sequence ends. Unwinding the operand
//! stack happens in the machine, when the targeted construct absorbs the
//! [`BlockEnd`].

use super::*;
use crate::parser::module::ValueType;
use crate::runtime::control::BlockEnd;

/// br l - branch to the enclosing construct l levels out
pub fn br(label_idx: u32) -> Result<BlockEnd, RuntimeError> {
    Ok(BlockEnd::Branch(label_idx))
}

/// br_if l - pop an i32 and branch if it is non-zero
pub fn br_if(stack: &mut Stack, label_idx: u32) -> Result<BlockEnd, RuntimeError> {
    let condition = stack.pop_i32()?;
    if condition != 0 {
        Ok(BlockEnd::Branch(label_idx))
    } else {
        Ok(BlockEnd::Normal)
    }
}

/// br_table l* ld - pop an index and branch to the label it selects
///
/// Negative or out-of-range indices take the default label.
pub fn br_table(stack: &mut Stack, labels: &[u32], default: u32) -> Result<BlockEnd, RuntimeError> {
    let index = stack.pop_i32()?;
    let target = usize::try_from(index)
        .ok()
        .and_then(|i| labels.get(i).copied())
        .unwrap_or(default);
    Ok(BlockEnd::Branch(target))
}

/// return - leave the current function, carrying its result if it declares one
pub fn return_op(stack: &mut Stack, result: Option<ValueType>) -> Result<BlockEnd, RuntimeError> {
    let value = match result {
        Some(typ) => Some(stack.pop_typed(typ)?),
        None => None,
    };
    Ok(BlockEnd::Return(value))
}

/// unreachable - always traps
pub fn unreachable() -> Result<BlockEnd, RuntimeError> {
    Err(RuntimeError::Unreachable)
}
