//! Instruction implementations
//!
//! Each operation is a free function over the operand stack (and memory or
//! the local frame where it needs them), grouped by category.

pub mod bitwise;
pub mod comparison;
pub mod control;
pub mod conversion;
pub mod memory;
pub mod numeric;
pub mod parametric;
pub mod variable;

pub(crate) use crate::parser::instruction::MemArg;
pub(crate) use crate::runtime::frame::Frame;
pub(crate) use crate::runtime::memory::Memory;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{ArithmeticFault, RuntimeError, Value};
