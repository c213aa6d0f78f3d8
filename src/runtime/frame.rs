//! Local frame
//!
//! Holds the locals of one function invocation: the positional arguments
//! followed by the declared extra locals, zero-initialised.

use super::{RuntimeError, Value};
use crate::parser::module::ValueType;

#[derive(Debug, Default)]
pub struct Frame {
    pub locals: Vec<Value>,
    /// Declared result of the function this frame belongs to
    pub result: Option<ValueType>,
}

impl Frame {
    pub fn new(args: Vec<Value>, extra_locals: &[ValueType], result: Option<ValueType>) -> Self {
        let mut locals = args;
        locals.extend(extra_locals.iter().map(|&t| Value::default_for(t)));
        Frame { locals, result }
    }

    /// A frame with no locals, used for top-level sequences such as data segment offsets
    pub fn empty() -> Self {
        Frame::default()
    }

    pub fn get(&self, local_idx: u32) -> Result<Value, RuntimeError> {
        self.locals
            .get(local_idx as usize)
            .copied()
            .ok_or(RuntimeError::LocalIndexOutOfBounds(local_idx))
    }

    pub fn set(&mut self, local_idx: u32, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .locals
            .get_mut(local_idx as usize)
            .ok_or(RuntimeError::LocalIndexOutOfBounds(local_idx))?;
        *slot = value;
        Ok(())
    }
}
