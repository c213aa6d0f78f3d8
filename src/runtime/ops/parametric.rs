//! Parametric operations

use super::*;

/// drop - pop and discard the top value
pub fn drop(stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.pop()?;
    Ok(())
}

/// select - pop a condition, then two values; keep the first if the
/// condition is non-zero, the second otherwise
pub fn select(stack: &mut Stack) -> Result<(), RuntimeError> {
    let condition = stack.pop_i32()?;
    let val2 = stack.pop()?;
    let val1 = stack.pop()?;
    stack.push(if condition != 0 { val1 } else { val2 });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::instruction::Instruction;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    #[test]
    fn drop_single_value() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 42 })
            .inst(Instruction::Drop)
            .inst(Instruction::I32Const { value: 100 })
            .expect_stack(vec![Value::I32(100)]);
    }

    #[test]
    fn drop_any_kind() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::F64Const { value: 2.0 })
            .inst(Instruction::I64Const { value: 3 })
            .inst(Instruction::Drop)
            .inst(Instruction::Drop)
            .expect_stack(vec![Value::I32(1)]);
    }

    #[test]
    fn drop_empty_stack() {
        ExecutorTest::new()
            .inst(Instruction::Drop)
            .expect_error("Stack underflow");
    }

    #[test]
    fn select_by_condition() {
        ExecutorTest::new()
            .inst(Instruction::F64Const { value: 1.0 })
            .inst(Instruction::F64Const { value: 2.0 })
            .inst(Instruction::I32Const { value: 7 })
            .inst(Instruction::Select)
            .inst(Instruction::I64Const { value: 1 })
            .inst(Instruction::I64Const { value: 2 })
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::Select)
            .expect_stack(vec![Value::F64(1.0), Value::I64(2)]);
    }

    #[test]
    fn select_condition_must_be_i32() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::F32Const { value: 1.0 })
            .inst(Instruction::Select)
            .expect_error("Type violation: expected i32, got f32");
    }
}
