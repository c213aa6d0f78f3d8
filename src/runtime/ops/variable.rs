//! Local variable operations

use super::*;

/// local.get x - push a copy of slot x
pub fn local_get(stack: &mut Stack, frame: &Frame, local_idx: u32) -> Result<(), RuntimeError> {
    stack.push(frame.get(local_idx)?);
    Ok(())
}

/// local.set x - pop into slot x
pub fn local_set(stack: &mut Stack, frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    frame.set(local_idx, value)
}

/// local.tee x - like local.set, but the value stays on the stack
pub fn local_tee(stack: &mut Stack, frame: &mut Frame, local_idx: u32) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    frame.set(local_idx, value)?;
    stack.push(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::Value;

    #[test]
    fn get_arguments() {
        ExecutorTest::new()
            .args(vec![Value::F64(2.0), Value::I32(3)])
            .inst(Instruction::LocalGet { local_idx: 1 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .expect_stack(vec![Value::I32(3), Value::F64(2.0)]);
    }

    #[test]
    fn declared_locals_start_at_zero() {
        ExecutorTest::new()
            .arg(Value::I32(9))
            .locals(vec![ValueType::I64, ValueType::F64])
            .inst(Instruction::LocalGet { local_idx: 1 })
            .inst(Instruction::LocalGet { local_idx: 2 })
            .expect_stack(vec![Value::I64(0), Value::F64(0.0)]);
    }

    #[test]
    fn set_then_get() {
        ExecutorTest::new()
            .locals(vec![ValueType::I32])
            .inst(Instruction::I32Const { value: 42 })
            .inst(Instruction::LocalSet { local_idx: 0 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .expect_stack(vec![Value::I32(42)]);
    }

    #[test]
    fn tee_keeps_value() {
        ExecutorTest::new()
            .locals(vec![ValueType::F64])
            .inst(Instruction::F64Const { value: 1.5 })
            .inst(Instruction::LocalTee { local_idx: 0 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .expect_stack(vec![Value::F64(1.5), Value::F64(1.5)]);
    }

    #[test]
    fn out_of_bounds_slot() {
        ExecutorTest::new()
            .arg(Value::I32(1))
            .inst(Instruction::LocalGet { local_idx: 1 })
            .expect_error("Local variable index out of bounds: 1");

        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::LocalSet { local_idx: 0 })
            .expect_error("Local variable index out of bounds: 0");

        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::LocalTee { local_idx: 3 })
            .expect_error("Local variable index out of bounds: 3");
    }

    #[test]
    fn set_on_empty_stack() {
        ExecutorTest::new()
            .locals(vec![ValueType::I32])
            .inst(Instruction::LocalSet { local_idx: 0 })
            .expect_error("Stack underflow");
    }
}
