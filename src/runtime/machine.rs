//! The stack machine
//!
//! A [`Machine`] owns the operand stack and linear memory and interprets
//! instruction trees recursively. Structured control flow is carried by the
//! [`BlockEnd`] each sequence returns: a construct absorbs a branch that
//! targets it and passes deeper branches outward one level at a time, and a
//! function boundary absorbs a return.
//!
//! One operand stack is shared by every nested call. A call pops exactly the
//! callee's parameters and, on completion, the stack is restored to where
//! it stood after those pops, plus the callee's result if it declares one.

use super::{
    config::Config,
    control::{BlockEnd, Label, LabelKind},
    frame::Frame,
    function::{Function, FunctionTable, HostFunction},
    memory::Memory,
    ops,
    stack::Stack,
    RuntimeError, Value,
};
use crate::parser::instruction::{BlockType, Instruction};
use crate::parser::module::{FunctionBody, FunctionType, ValueType};
use log::trace;
use std::rc::Rc;

pub struct Machine {
    functions: Rc<FunctionTable>,
    stack: Stack,
    memory: Memory,
    config: Config,
    /// Number of calls and structured constructs currently active
    depth: usize,
}

impl Machine {
    /// Create a machine with a fresh memory of `config.memory_bytes` bytes
    pub fn new(functions: Rc<FunctionTable>, config: Config) -> Result<Self, RuntimeError> {
        let memory = Memory::new(config.memory_bytes)?;
        Ok(Machine {
            functions,
            stack: Stack::new(),
            memory,
            config,
            depth: 0,
        })
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Run a top-level instruction sequence in the given frame
    ///
    /// Values the sequence produces stay on the stack. A branch or return
    /// that is not absorbed inside the sequence is malformed.
    pub fn execute(&mut self, instructions: &[Instruction], frame: &mut Frame) -> Result<(), RuntimeError> {
        match self.execute_sequence(instructions, frame)? {
            BlockEnd::Normal => Ok(()),
            BlockEnd::Branch(depth) => Err(RuntimeError::MalformedControlFlow(format!(
                "branch to depth {depth} escapes the enclosing sequence"
            ))),
            BlockEnd::Return(_) => Err(RuntimeError::MalformedControlFlow(
                "return outside of a function".to_string(),
            )),
        }
    }

    /// Run a constant expression against an empty frame and take its value
    ///
    /// The stack is left as it was found.
    pub fn evaluate(&mut self, expr: &[Instruction]) -> Result<Value, RuntimeError> {
        let height = self.stack.depth();
        let mut frame = Frame::empty();
        let outcome = self.execute(expr, &mut frame).and_then(|()| {
            if self.stack.depth() > height {
                self.stack.pop()
            } else {
                Err(RuntimeError::StackUnderflow)
            }
        });
        self.stack.truncate(height);
        outcome
    }

    /// Call a function by table index with the given arguments
    ///
    /// The stack is left as it was found, whether or not the call succeeds.
    pub fn invoke(&mut self, func_idx: u32, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let func_type = self.functions.get(func_idx)?.func_type().clone();
        if args.len() != func_type.param_count() {
            return Err(RuntimeError::type_violation(
                format!("{} arguments", func_type.param_count()),
                format!("{} arguments", args.len()),
            ));
        }

        let height = self.stack.depth();
        let depth = self.depth;
        self.stack.push_all(args.iter().copied());
        let outcome = self.call(func_idx).and_then(|()| match func_type.result {
            Some(typ) => self.stack.pop_typed(typ).map(Some),
            None => Ok(None),
        });
        self.stack.truncate(height);
        self.depth = depth;
        outcome
    }

    /// Execute `call func_idx` against the current stack
    ///
    /// Pops the callee's parameters (the last parameter on top), runs it and
    /// pushes its result, if any.
    pub fn call(&mut self, func_idx: u32) -> Result<(), RuntimeError> {
        let functions = Rc::clone(&self.functions);
        let function = functions.get(func_idx)?;
        let func_type = function.func_type();

        let args = self.stack.pop_n(func_type.param_count())?;
        check_args(func_idx, func_type, &args)?;

        self.enter()?;
        trace!("call {func_idx} {func_type} depth {}", self.depth);
        let result = match function {
            Function::Defined(body) => self.run_defined(func_idx, body, args),
            Function::Imported(host) => run_host(func_idx, host, &args),
        };
        self.depth -= 1;

        if let Some(value) = result? {
            self.stack.push(value);
        }
        Ok(())
    }

    /// Take one nesting level, faulting once the budget is spent
    fn enter(&mut self) -> Result<(), RuntimeError> {
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::CallStackExhausted);
        }
        self.depth += 1;
        Ok(())
    }

    fn run_defined(&mut self, func_idx: u32, body: &FunctionBody, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let result_type = body.func_type.result;
        let mut frame = Frame::new(args, &body.locals, result_type);
        let height = self.stack.depth();

        let result = match self.execute_sequence(&body.body, &mut frame) {
            Ok(BlockEnd::Return(value)) => Ok(value),
            Ok(BlockEnd::Normal) => self.pop_result(result_type, height),
            Ok(BlockEnd::Branch(depth)) => Err(RuntimeError::MalformedControlFlow(format!(
                "branch to depth {depth} escapes function {func_idx}"
            ))),
            Err(e) => Err(e),
        };

        // Whatever the body left behind besides its result is discarded
        self.stack.truncate(height);
        result
    }

    fn pop_result(&mut self, result_type: Option<ValueType>, height: usize) -> Result<Option<Value>, RuntimeError> {
        match result_type {
            Some(typ) if self.stack.depth() > height => self.stack.pop_typed(typ).map(Some),
            Some(_) => Err(RuntimeError::StackUnderflow),
            None => Ok(None),
        }
    }

    fn execute_sequence(&mut self, instructions: &[Instruction], frame: &mut Frame) -> Result<BlockEnd, RuntimeError> {
        for instruction in instructions {
            match self.execute_instruction(instruction, frame)? {
                BlockEnd::Normal => continue,
                end => return Ok(end),
            }
        }
        Ok(BlockEnd::Normal)
    }

    fn execute_instruction(&mut self, instruction: &Instruction, frame: &mut Frame) -> Result<BlockEnd, RuntimeError> {
        match instruction {
            Instruction::Block { block_type, body } => self.execute_block(LabelKind::Block, *block_type, body, frame),
            Instruction::Loop { block_type, body } => self.execute_block(LabelKind::Loop, *block_type, body, frame),
            Instruction::If {
                block_type,
                then_branch,
                else_branch,
            } => {
                let condition = self.stack.pop_i32()?;
                let body = if condition != 0 { then_branch } else { else_branch };
                self.execute_block(LabelKind::If, *block_type, body, frame)
            }

            Instruction::Br { label_idx } => ops::control::br(*label_idx),
            Instruction::BrIf { label_idx } => ops::control::br_if(&mut self.stack, *label_idx),
            Instruction::BrTable { labels, default } => ops::control::br_table(&mut self.stack, labels, *default),
            Instruction::Return => ops::control::return_op(&mut self.stack, frame.result),
            Instruction::Unreachable => ops::control::unreachable(),
            Instruction::Call { func_idx } => {
                self.call(*func_idx)?;
                Ok(BlockEnd::Normal)
            }

            plain => {
                self.execute_plain(plain, frame)?;
                Ok(BlockEnd::Normal)
            }
        }
    }

    /// Run the body of a block, loop or if until it leaves the construct
    fn execute_block(
        &mut self,
        kind: LabelKind,
        block_type: BlockType,
        body: &[Instruction],
        frame: &mut Frame,
    ) -> Result<BlockEnd, RuntimeError> {
        let label = Label::new(kind, block_type, self.stack.depth());
        self.enter()?;
        let result = loop {
            match self.execute_sequence(body, frame) {
                Ok(BlockEnd::Branch(0)) => {
                    if let Err(e) = label.unwind(&mut self.stack) {
                        break Err(e);
                    }
                    if kind != LabelKind::Loop {
                        break Ok(BlockEnd::Normal);
                    }
                }
                Ok(BlockEnd::Branch(depth)) => break Ok(BlockEnd::Branch(depth - 1)),
                end => break end,
            }
        };
        self.depth -= 1;
        result
    }

    /// Execute a non-control instruction
    ///
    /// Kept out of line so its frame never sits in the recursion.
    #[inline(never)]
    fn execute_plain(&mut self, instruction: &Instruction, frame: &mut Frame) -> Result<(), RuntimeError> {
        use ops::{bitwise::*, comparison::*, conversion::*, memory::*, numeric::*, parametric::*, variable::*};
        use Instruction::*;

        let stack = &mut self.stack;
        let memory = &mut self.memory;
        let division = self.config.signed_division;
        let grow_result = self.config.grow_result;

        match instruction {
            Nop => Ok(()),

            // Parametric
            Drop => drop(stack),
            Select => select(stack),

            // Variables
            LocalGet { local_idx } => local_get(stack, frame, *local_idx),
            LocalSet { local_idx } => local_set(stack, frame, *local_idx),
            LocalTee { local_idx } => local_tee(stack, frame, *local_idx),

            // Memory
            I32Load { memarg } => i32_load(stack, memory, memarg),
            I64Load { memarg } => i64_load(stack, memory, memarg),
            F32Load { memarg } => f32_load(stack, memory, memarg),
            F64Load { memarg } => f64_load(stack, memory, memarg),
            I32Load8S { memarg } => i32_load8_s(stack, memory, memarg),
            I32Load8U { memarg } => i32_load8_u(stack, memory, memarg),
            I32Load16S { memarg } => i32_load16_s(stack, memory, memarg),
            I32Load16U { memarg } => i32_load16_u(stack, memory, memarg),
            I64Load8S { memarg } => i64_load8_s(stack, memory, memarg),
            I64Load8U { memarg } => i64_load8_u(stack, memory, memarg),
            I64Load16S { memarg } => i64_load16_s(stack, memory, memarg),
            I64Load16U { memarg } => i64_load16_u(stack, memory, memarg),
            I64Load32S { memarg } => i64_load32_s(stack, memory, memarg),
            I64Load32U { memarg } => i64_load32_u(stack, memory, memarg),
            I32Store { memarg } => i32_store(stack, memory, memarg),
            I64Store { memarg } => i64_store(stack, memory, memarg),
            F32Store { memarg } => f32_store(stack, memory, memarg),
            F64Store { memarg } => f64_store(stack, memory, memarg),
            I32Store8 { memarg } => i32_store8(stack, memory, memarg),
            I32Store16 { memarg } => i32_store16(stack, memory, memarg),
            I64Store8 { memarg } => i64_store8(stack, memory, memarg),
            I64Store16 { memarg } => i64_store16(stack, memory, memarg),
            I64Store32 { memarg } => i64_store32(stack, memory, memarg),
            MemorySize => memory_size(stack, memory),
            MemoryGrow => memory_grow(stack, memory, grow_result),

            // Constants
            I32Const { value } => i32_const(stack, *value),
            I64Const { value } => i64_const(stack, *value),
            F32Const { value } => f32_const(stack, *value),
            F64Const { value } => f64_const(stack, *value),

            // Comparisons
            I32Eqz => i32_eqz(stack),
            I32Eq => i32_eq(stack),
            I32Ne => i32_ne(stack),
            I32LtS => i32_lt_s(stack),
            I32LtU => i32_lt_u(stack),
            I32GtS => i32_gt_s(stack),
            I32GtU => i32_gt_u(stack),
            I32LeS => i32_le_s(stack),
            I32LeU => i32_le_u(stack),
            I32GeS => i32_ge_s(stack),
            I32GeU => i32_ge_u(stack),
            I64Eqz => i64_eqz(stack),
            I64Eq => i64_eq(stack),
            I64Ne => i64_ne(stack),
            I64LtS => i64_lt_s(stack),
            I64LtU => i64_lt_u(stack),
            I64GtS => i64_gt_s(stack),
            I64GtU => i64_gt_u(stack),
            I64LeS => i64_le_s(stack),
            I64LeU => i64_le_u(stack),
            I64GeS => i64_ge_s(stack),
            I64GeU => i64_ge_u(stack),
            F32Eq => f32_eq(stack),
            F32Ne => f32_ne(stack),
            F32Lt => f32_lt(stack),
            F32Gt => f32_gt(stack),
            F32Le => f32_le(stack),
            F32Ge => f32_ge(stack),
            F64Eq => f64_eq(stack),
            F64Ne => f64_ne(stack),
            F64Lt => f64_lt(stack),
            F64Gt => f64_gt(stack),
            F64Le => f64_le(stack),
            F64Ge => f64_ge(stack),

            // i32 arithmetic
            I32Clz => i32_clz(stack),
            I32Ctz => i32_ctz(stack),
            I32Popcnt => i32_popcnt(stack),
            I32Add => i32_add(stack),
            I32Sub => i32_sub(stack),
            I32Mul => i32_mul(stack),
            I32DivS => i32_div_s(stack, division),
            I32DivU => i32_div_u(stack),
            I32RemS => i32_rem_s(stack, division),
            I32RemU => i32_rem_u(stack),
            I32And => i32_and(stack),
            I32Or => i32_or(stack),
            I32Xor => i32_xor(stack),
            I32Shl => i32_shl(stack),
            I32ShrS => i32_shr_s(stack),
            I32ShrU => i32_shr_u(stack),
            I32Rotl => i32_rotl(stack),
            I32Rotr => i32_rotr(stack),

            // i64 arithmetic
            I64Clz => i64_clz(stack),
            I64Ctz => i64_ctz(stack),
            I64Popcnt => i64_popcnt(stack),
            I64Add => i64_add(stack),
            I64Sub => i64_sub(stack),
            I64Mul => i64_mul(stack),
            I64DivS => i64_div_s(stack, division),
            I64DivU => i64_div_u(stack),
            I64RemS => i64_rem_s(stack, division),
            I64RemU => i64_rem_u(stack),
            I64And => i64_and(stack),
            I64Or => i64_or(stack),
            I64Xor => i64_xor(stack),
            I64Shl => i64_shl(stack),
            I64ShrS => i64_shr_s(stack),
            I64ShrU => i64_shr_u(stack),
            I64Rotl => i64_rotl(stack),
            I64Rotr => i64_rotr(stack),

            // f32 arithmetic
            F32Abs => f32_abs(stack),
            F32Neg => f32_neg(stack),
            F32Ceil => f32_ceil(stack),
            F32Floor => f32_floor(stack),
            F32Trunc => f32_trunc(stack),
            F32Nearest => f32_nearest(stack),
            F32Sqrt => f32_sqrt(stack),
            F32Add => f32_add(stack),
            F32Sub => f32_sub(stack),
            F32Mul => f32_mul(stack),
            F32Div => f32_div(stack),
            F32Min => f32_min(stack),
            F32Max => f32_max(stack),
            F32Copysign => f32_copysign(stack),

            // f64 arithmetic
            F64Abs => f64_abs(stack),
            F64Neg => f64_neg(stack),
            F64Ceil => f64_ceil(stack),
            F64Floor => f64_floor(stack),
            F64Trunc => f64_trunc(stack),
            F64Nearest => f64_nearest(stack),
            F64Sqrt => f64_sqrt(stack),
            F64Add => f64_add(stack),
            F64Sub => f64_sub(stack),
            F64Mul => f64_mul(stack),
            F64Div => f64_div(stack),
            F64Min => f64_min(stack),
            F64Max => f64_max(stack),
            F64Copysign => f64_copysign(stack),

            // Conversions
            I32WrapI64 => i32_wrap_i64(stack),
            I32TruncF32S => i32_trunc_f32_s(stack),
            I32TruncF32U => i32_trunc_f32_u(stack),
            I32TruncF64S => i32_trunc_f64_s(stack),
            I32TruncF64U => i32_trunc_f64_u(stack),
            I64ExtendI32S => i64_extend_i32_s(stack),
            I64ExtendI32U => i64_extend_i32_u(stack),
            I64TruncF32S => i64_trunc_f32_s(stack),
            I64TruncF32U => i64_trunc_f32_u(stack),
            I64TruncF64S => i64_trunc_f64_s(stack),
            I64TruncF64U => i64_trunc_f64_u(stack),
            F32ConvertI32S => f32_convert_i32_s(stack),
            F32ConvertI32U => f32_convert_i32_u(stack),
            F32ConvertI64S => f32_convert_i64_s(stack),
            F32ConvertI64U => f32_convert_i64_u(stack),
            F32DemoteF64 => f32_demote_f64(stack),
            F64ConvertI32S => f64_convert_i32_s(stack),
            F64ConvertI32U => f64_convert_i32_u(stack),
            F64ConvertI64S => f64_convert_i64_s(stack),
            F64ConvertI64U => f64_convert_i64_u(stack),
            F64PromoteF32 => f64_promote_f32(stack),
            I32ReinterpretF32 => i32_reinterpret_f32(stack),
            I64ReinterpretF64 => i64_reinterpret_f64(stack),
            F32ReinterpretI32 => f32_reinterpret_i32(stack),
            F64ReinterpretI64 => f64_reinterpret_i64(stack),
            I32Extend8S => i32_extend8_s(stack),
            I32Extend16S => i32_extend16_s(stack),
            I64Extend8S => i64_extend8_s(stack),
            I64Extend16S => i64_extend16_s(stack),
            I64Extend32S => i64_extend32_s(stack),

            Unreachable
            | Block { .. }
            | Loop { .. }
            | If { .. }
            | Br { .. }
            | BrIf { .. }
            | BrTable { .. }
            | Return
            | Call { .. } => Err(RuntimeError::MalformedControlFlow(format!(
                "{} dispatched as a plain instruction",
                instruction.mnemonic()
            ))),
        }
    }
}

fn check_args(func_idx: u32, func_type: &FunctionType, args: &[Value]) -> Result<(), RuntimeError> {
    for (i, (arg, expected)) in args.iter().zip(&func_type.params).enumerate() {
        if arg.typ() != *expected {
            return Err(RuntimeError::type_violation(
                format!("{expected} for argument {i} of function {func_idx}"),
                arg.typ(),
            ));
        }
    }
    Ok(())
}

fn run_host(func_idx: u32, host: &HostFunction, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
    let result = host.call(args)?;
    let declared = host.func_type.result;
    if result.map(|v| v.typ()) != declared {
        let describe = |t: Option<ValueType>| t.map_or_else(|| "no result".to_string(), |t| t.to_string());
        return Err(RuntimeError::type_violation(
            format!("{} from host function {func_idx}", describe(declared)),
            describe(result.map(|v| v.typ())),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::config::{Config, DEFAULT_MAX_CALL_DEPTH};
    use crate::runtime::test_utils::test::ExecutorTest;

    fn f64c(value: f64) -> Instruction {
        Instruction::F64Const { value }
    }

    fn table(functions: Vec<Function>) -> Rc<FunctionTable> {
        Rc::new(FunctionTable::new(functions))
    }

    fn add_f64() -> FunctionBody {
        FunctionBody::new(
            FunctionType::new(vec![ValueType::F64, ValueType::F64], Some(ValueType::F64)),
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::F64Add,
            ],
        )
    }

    #[test]
    fn call_pops_args_in_push_order() {
        let sub = FunctionBody::new(
            FunctionType::new(vec![ValueType::I32, ValueType::I32], Some(ValueType::I32)),
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 1 },
                Instruction::I32Sub,
            ],
        );
        ExecutorTest::new()
            .function(sub)
            .inst(Instruction::I32Const { value: 99 })
            .inst(Instruction::I32Const { value: 10 })
            .inst(Instruction::I32Const { value: 3 })
            .inst(Instruction::Call { func_idx: 0 })
            .expect_stack(vec![Value::I32(99), Value::I32(7)]);
    }

    #[test]
    fn call_discards_leftovers() {
        // The body leaves junk below its result
        let noisy = FunctionBody::new(
            FunctionType::new(vec![], Some(ValueType::I32)),
            vec![
                Instruction::I32Const { value: 1 },
                Instruction::I32Const { value: 2 },
                Instruction::I32Const { value: 3 },
            ],
        );
        let silent = FunctionBody::new(FunctionType::default(), vec![Instruction::I32Const { value: 4 }]);
        ExecutorTest::new()
            .function(noisy)
            .function(silent)
            .inst(Instruction::Call { func_idx: 0 })
            .inst(Instruction::Call { func_idx: 1 })
            .expect_stack(vec![Value::I32(3)]);
    }

    #[test]
    fn nested_calls_net_one_result() {
        // f0(a, b) = a + b; f1(x) = f0(x, x) + f0(x, 1.0)
        let twice = FunctionBody::new(
            FunctionType::new(vec![ValueType::F64], Some(ValueType::F64)),
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::LocalGet { local_idx: 0 },
                Instruction::Call { func_idx: 0 },
                Instruction::LocalGet { local_idx: 0 },
                f64c(1.0),
                Instruction::Call { func_idx: 0 },
                Instruction::F64Add,
            ],
        );
        ExecutorTest::new()
            .function(add_f64())
            .function(twice)
            .inst(f64c(-1.0))
            .inst(f64c(2.0))
            .inst(Instruction::Call { func_idx: 1 })
            .expect_stack(vec![Value::F64(-1.0), Value::F64(7.0)]);
    }

    #[test]
    fn missing_result_underflows() {
        let empty = FunctionBody::new(FunctionType::new(vec![], Some(ValueType::I32)), vec![]);
        ExecutorTest::new()
            .function(empty)
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Stack underflow");
    }

    #[test]
    fn wrong_result_kind() {
        let lying = FunctionBody::new(FunctionType::new(vec![], Some(ValueType::I32)), vec![f64c(1.0)]);
        ExecutorTest::new()
            .function(lying)
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Type violation: expected i32, got f64");
    }

    #[test]
    fn argument_kind_is_checked() {
        ExecutorTest::new()
            .function(add_f64())
            .inst(f64c(1.0))
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("expected f64 for argument 1 of function 0, got i32");
    }

    #[test]
    fn too_few_arguments() {
        ExecutorTest::new()
            .function(add_f64())
            .inst(f64c(1.0))
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Stack underflow");
    }

    #[test]
    fn unknown_function() {
        ExecutorTest::new()
            .inst(Instruction::Call { func_idx: 3 })
            .expect_error("Function index out of bounds: 3");
    }

    #[test]
    fn host_function_call() {
        ExecutorTest::new()
            .host(FunctionType::new(vec![ValueType::I32, ValueType::I64], Some(ValueType::I64)), |args| {
                let a = args[0].as_i32().unwrap_or_default() as i64;
                let b = args[1].as_i64().unwrap_or_default();
                Ok(Some(Value::I64(a * 100 + b)))
            })
            .inst(Instruction::I32Const { value: 4 })
            .inst(Instruction::I64Const { value: 2 })
            .inst(Instruction::Call { func_idx: 0 })
            .expect_stack(vec![Value::I64(402)]);
    }

    #[test]
    fn host_result_must_match_declaration() {
        ExecutorTest::new()
            .host(FunctionType::default(), |_| Ok(Some(Value::I32(1))))
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("expected no result from host function 0, got i32");

        ExecutorTest::new()
            .host(FunctionType::new(vec![], Some(ValueType::F64)), |_| Ok(None))
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("expected f64 from host function 0, got no result");
    }

    #[test]
    fn host_error_propagates() {
        ExecutorTest::new()
            .host(FunctionType::default(), |_| Err(RuntimeError::Host("display offline".to_string())))
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Host function failed: display offline");
    }

    #[test]
    fn recursion_limit() {
        let forever = FunctionBody::new(FunctionType::default(), vec![Instruction::Call { func_idx: 0 }]);
        ExecutorTest::new()
            .config(Config::builder().max_call_depth(16).build())
            .function(forever)
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Call stack exhausted");
    }

    fn nest(levels: usize, inner: Vec<Instruction>) -> Vec<Instruction> {
        (0..levels).fold(inner, |body, _| {
            vec![Instruction::Block {
                block_type: BlockType::Empty,
                body,
            }]
        })
    }

    #[test]
    fn default_limit_faults_before_native_overflow() {
        let forever = FunctionBody::new(FunctionType::default(), vec![Instruction::Call { func_idx: 0 }]);
        ExecutorTest::new()
            .function(forever)
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Call stack exhausted");

        let forever_in_blocks = FunctionBody::new(FunctionType::default(), nest(4, vec![Instruction::Call { func_idx: 0 }]));
        let (machine, result) = ExecutorTest::new()
            .function(forever_in_blocks)
            .inst(Instruction::Call { func_idx: 0 })
            .run();
        assert!(matches!(result, Err(RuntimeError::CallStackExhausted)));
        assert_eq!(machine.config().max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(machine.depth, 0);
    }

    #[test]
    fn blocks_share_the_depth_budget() {
        let config = Config::builder().max_call_depth(8).build();
        ExecutorTest::new()
            .config(config.clone())
            .insts(nest(8, vec![Instruction::I32Const { value: 1 }]))
            .expect_stack(vec![Value::I32(1)]);

        let (machine, result) = ExecutorTest::new()
            .config(config.clone())
            .insts(nest(9, vec![Instruction::I32Const { value: 1 }]))
            .run();
        assert!(matches!(result, Err(RuntimeError::CallStackExhausted)));
        assert_eq!(machine.depth, 0);

        // A loop inside a recursive call counts once per active call
        let looping = FunctionBody::new(
            FunctionType::default(),
            vec![Instruction::Loop {
                block_type: BlockType::Empty,
                body: vec![Instruction::Call { func_idx: 0 }],
            }],
        );
        ExecutorTest::new()
            .config(config)
            .function(looping)
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("Call stack exhausted");
    }

    #[test]
    fn recursion_within_limit() {
        // countdown(n) = n == 0 ? 0 : countdown(n - 1) + 1
        let countdown = FunctionBody::new(
            FunctionType::new(vec![ValueType::I32], Some(ValueType::I32)),
            vec![
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I32Eqz,
                Instruction::If {
                    block_type: BlockType::Empty,
                    then_branch: vec![Instruction::I32Const { value: 0 }, Instruction::Return],
                    else_branch: vec![],
                },
                Instruction::LocalGet { local_idx: 0 },
                Instruction::I32Const { value: 1 },
                Instruction::I32Sub,
                Instruction::Call { func_idx: 0 },
                Instruction::I32Const { value: 1 },
                Instruction::I32Add,
            ],
        );
        // 40 calls plus the if taken at the bottom
        ExecutorTest::new()
            .config(Config::builder().max_call_depth(41).build())
            .function(countdown)
            .inst(Instruction::I32Const { value: 39 })
            .inst(Instruction::Call { func_idx: 0 })
            .expect_stack(vec![Value::I32(39)]);
    }

    #[test]
    fn invoke_restores_stack() {
        let mut machine = Machine::new(table(vec![Function::Defined(add_f64())]), Config::default()).unwrap();
        machine.push(Value::I32(5));

        let result = machine.invoke(0, &[Value::F64(2.0), Value::F64(0.5)]).unwrap();
        assert_eq!(result, Some(Value::F64(2.5)));
        assert_eq!(machine.stack().values(), &[Value::I32(5)]);

        let err = machine.invoke(0, &[Value::F64(2.0), Value::I32(1)]).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeViolation { .. }));
        assert_eq!(machine.stack().values(), &[Value::I32(5)]);
    }

    #[test]
    fn invoke_checks_argument_count() {
        let mut machine = Machine::new(table(vec![Function::Defined(add_f64())]), Config::default()).unwrap();
        let err = machine.invoke(0, &[Value::F64(2.0)]).unwrap_err();
        assert_eq!(err.to_string(), "Type violation: expected 2 arguments, got 1 arguments");
    }

    #[test]
    fn evaluate_constant_expression() {
        let mut machine = Machine::new(table(vec![]), Config::default()).unwrap();
        let value = machine
            .evaluate(&[Instruction::I32Const { value: 40 }, Instruction::I32Const { value: 2 }, Instruction::I32Add])
            .unwrap();
        assert_eq!(value, Value::I32(42));
        assert!(machine.stack().is_empty());

        assert!(matches!(machine.evaluate(&[]), Err(RuntimeError::StackUnderflow)));
    }

    #[test]
    fn return_outside_function_is_malformed() {
        ExecutorTest::new()
            .inst(Instruction::Return)
            .expect_error("Malformed control flow: return outside of a function");
    }

    #[test]
    fn branch_escaping_function_is_malformed() {
        let escaping = FunctionBody::new(FunctionType::default(), vec![Instruction::Br { label_idx: 0 }]);
        ExecutorTest::new()
            .function(escaping)
            .inst(Instruction::Call { func_idx: 0 })
            .expect_error("escapes function 0");
    }

    #[test]
    fn memory_is_sized_from_config() {
        let machine = Machine::new(table(vec![]), Config::builder().memory_pages(3).build()).unwrap();
        assert_eq!(machine.memory().size(), 3);
        assert!(Machine::new(table(vec![]), Config::builder().memory_pages(65537).build()).is_err());
    }
}
