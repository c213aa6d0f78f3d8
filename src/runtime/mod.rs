//! Execution engine
//!
//! This module provides the stack machine that interprets decoded programs:
//! value representation, the operand stack, linear memory, the function
//! table and the recursive instruction interpreter.

pub mod config;
pub mod control;
pub mod frame;
pub mod function;
pub mod host;
pub mod imports;
pub mod instance;
pub mod machine;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod test_utils;
pub mod value;

pub use config::Config;
pub use function::{Function, FunctionTable, HostFunction};
pub use imports::ImportObject;
pub use instance::Instance;
pub use machine::Machine;
pub use memory::Memory;
pub use value::Value;

/// Undefined numeric cases, raised instead of letting the host panic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticFault {
    #[error("integer divide by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer: {0}")]
    InvalidConversion(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Type violation: expected {expected}, got {actual}")]
    TypeViolation { expected: String, actual: String },
    #[error("Malformed control flow: {0}")]
    MalformedControlFlow(String),
    #[error("Arithmetic fault: {0}")]
    ArithmeticFault(#[from] ArithmeticFault),
    #[error("Out of range memory access: {length} bytes at {address}, memory size {size}")]
    OutOfRangeMemoryAccess { address: u64, length: usize, size: usize },
    #[error("Local variable index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("Function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("Unknown export: {0}")]
    UnknownExport(String),
    #[error("Unknown import: {module}.{name}")]
    UnknownImport { module: String, name: String },
    #[error("Import type mismatch for {module}.{name}: expected {expected}, got {actual}")]
    ImportTypeMismatch {
        module: String,
        name: String,
        expected: String,
        actual: String,
    },
    #[error("Unreachable executed")]
    Unreachable,
    #[error("Call stack exhausted")]
    CallStackExhausted,
    #[error("Memory error: {0}")]
    MemoryError(String),
    #[error("Host function failed: {0}")]
    Host(String),
}

impl RuntimeError {
    pub(crate) fn type_violation(expected: impl ToString, actual: impl ToString) -> Self {
        RuntimeError::TypeViolation {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
