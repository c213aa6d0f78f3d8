//! Structured control flow
//!
//! Branches and returns are not faults: they travel outward as a [`BlockEnd`]
//! returned by each instruction sequence until the construct they target
//! absorbs them. A [`Label`] records what a construct needs to restore the
//! operand stack when it absorbs a branch.

use super::stack::Stack;
use super::{RuntimeError, Value};
use crate::parser::instruction::BlockType;

/// How an instruction sequence finished
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEnd {
    /// Fell off the end
    Normal,
    /// Branch to the enclosing construct at this relative depth (0 = innermost)
    Branch(u32),
    /// Return from the current function with its result, if it declares one
    Return(Option<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Branches exit forward past the end
    Block,
    /// Branches restart from the first instruction
    Loop,
    If,
}

/// An active construct: its kind, the stack height on entry and its result arity
#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub kind: LabelKind,
    pub stack_height: usize,
    pub arity: usize,
}

impl Label {
    pub fn new(kind: LabelKind, block_type: BlockType, stack_height: usize) -> Self {
        // A branch back to a loop carries no values
        let arity = match kind {
            LabelKind::Loop => 0,
            LabelKind::Block | LabelKind::If => block_type.arity(),
        };
        Label {
            kind,
            stack_height,
            arity,
        }
    }

    /// Restore the stack for a branch that targets this label
    ///
    /// Values pushed since entry are discarded, except the topmost `arity`
    /// values which become the construct's result.
    pub fn unwind(&self, stack: &mut Stack) -> Result<(), RuntimeError> {
        let kept = stack.pop_n(self.arity)?;
        if stack.depth() < self.stack_height {
            return Err(RuntimeError::StackUnderflow);
        }
        stack.truncate(self.stack_height);
        stack.push_all(kept);
        Ok(())
    }
}
