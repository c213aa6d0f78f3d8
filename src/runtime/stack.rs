//! Operand stack

use super::{RuntimeError, Value};
use crate::parser::module::ValueType;

/// The operand stack shared by every nested call of one top-level invocation
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
}

macro_rules! typed_pop {
    ($name:ident, $ty:ty, $variant:ident, $vt:expr) => {
        pub fn $name(&mut self) -> Result<$ty, RuntimeError> {
            match self.pop()? {
                Value::$variant(v) => Ok(v),
                other => Err(RuntimeError::type_violation($vt, other.typ())),
            }
        }
    };
}

impl Stack {
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.extend(values);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop a value and check its kind
    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, RuntimeError> {
        let value = self.pop()?;
        if value.typ() != expected {
            return Err(RuntimeError::type_violation(expected, value.typ()));
        }
        Ok(value)
    }

    typed_pop!(pop_i32, i32, I32, ValueType::I32);
    typed_pop!(pop_i64, i64, I64, ValueType::I64);
    typed_pop!(pop_f32, f32, F32, ValueType::F32);
    typed_pop!(pop_f64, f64, F64, ValueType::F64);

    /// Pop `count` values, returned in the order they were pushed
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        if count > self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        let start = self.values.len() - count;
        Ok(self.values.split_off(start))
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// Drop everything above `height`
    pub fn truncate(&mut self, height: usize) {
        self.values.truncate(height);
    }

    /// Bottom to top
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
