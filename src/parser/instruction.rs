//! Instruction representation and decoding
//!
//! Instructions arrive from the loader in tuple form: a JSON array whose first
//! element is the instruction name and whose remaining elements are operands,
//! e.g. `["i32.const", 7]`, `["f64.load", 3, 8]` or
//! `["block", null, [["br", 0]]]`. Decoding turns each tuple into a variant of
//! the closed [`Instruction`] enum; a name that matches no instruction is
//! rejected with [`ParseError::UnknownOperation`].

use super::module::ValueType;
use super::ParseError;
use crate::runtime::Value;
use fhex::ToHex;
use serde_json::Value as Json;
use std::fmt;

/// Alignment hint and static offset of a load or store
///
/// Alignment is carried for fidelity with the loader's output but never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemArg {
    pub align: u32,
    pub offset: u32,
}

impl MemArg {
    pub fn offset(offset: u32) -> Self {
        MemArg { align: 0, offset }
    }
}

/// Result signature of a block, loop or if
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockType {
    #[default]
    Empty,
    Value(ValueType),
}

impl BlockType {
    /// Number of values the construct leaves on the stack
    pub fn arity(&self) -> usize {
        match self {
            BlockType::Empty => 0,
            BlockType::Value(_) => 1,
        }
    }
}

/// Every operation the engine can dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Control instructions
    Unreachable,
    Nop,
    Block {
        block_type: BlockType,
        body: Vec<Instruction>,
    },
    Loop {
        block_type: BlockType,
        body: Vec<Instruction>,
    },
    If {
        block_type: BlockType,
        then_branch: Vec<Instruction>,
        else_branch: Vec<Instruction>,
    },
    Br { label_idx: u32 },
    BrIf { label_idx: u32 },
    BrTable { labels: Vec<u32>, default: u32 },
    Return,
    Call { func_idx: u32 },

    // Parametric instructions
    Drop,
    Select,

    // Variable instructions
    LocalGet { local_idx: u32 },
    LocalSet { local_idx: u32 },
    LocalTee { local_idx: u32 },

    // Memory instructions
    I32Load { memarg: MemArg },
    I64Load { memarg: MemArg },
    F32Load { memarg: MemArg },
    F64Load { memarg: MemArg },
    I32Load8S { memarg: MemArg },
    I32Load8U { memarg: MemArg },
    I32Load16S { memarg: MemArg },
    I32Load16U { memarg: MemArg },
    I64Load8S { memarg: MemArg },
    I64Load8U { memarg: MemArg },
    I64Load16S { memarg: MemArg },
    I64Load16U { memarg: MemArg },
    I64Load32S { memarg: MemArg },
    I64Load32U { memarg: MemArg },
    I32Store { memarg: MemArg },
    I64Store { memarg: MemArg },
    F32Store { memarg: MemArg },
    F64Store { memarg: MemArg },
    I32Store8 { memarg: MemArg },
    I32Store16 { memarg: MemArg },
    I64Store8 { memarg: MemArg },
    I64Store16 { memarg: MemArg },
    I64Store32 { memarg: MemArg },
    MemorySize,
    MemoryGrow,

    // Numeric constants
    I32Const { value: i32 },
    I64Const { value: i64 },
    F32Const { value: f32 },
    F64Const { value: f64 },

    // Test and comparison
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // Integer arithmetic and bitwise
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    // Float arithmetic
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    // Conversions
    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,
}

/// Generates the name table for instructions without operands
macro_rules! simple_instructions {
    ($($name:literal => $variant:ident),* $(,)?) => {
        impl Instruction {
            fn from_simple_name(name: &str) -> Option<Instruction> {
                match name {
                    $($name => Some(Instruction::$variant),)*
                    _ => None,
                }
            }

            fn simple_mnemonic(&self) -> Option<&'static str> {
                match self {
                    $(Instruction::$variant => Some($name),)*
                    _ => None,
                }
            }
        }
    };
}

/// Generates the name table for loads and stores, which all take a memarg
macro_rules! memory_instructions {
    ($($name:literal => $variant:ident),* $(,)?) => {
        impl Instruction {
            /// Constructor for a load or store, looked up before its memarg is read
            fn memory_constructor(name: &str) -> Option<fn(MemArg) -> Instruction> {
                match name {
                    $($name => Some((|memarg| Instruction::$variant { memarg }) as fn(MemArg) -> Instruction),)*
                    _ => None,
                }
            }

            fn memory_mnemonic(&self) -> Option<(&'static str, &MemArg)> {
                match self {
                    $(Instruction::$variant { memarg } => Some(($name, memarg)),)*
                    _ => None,
                }
            }
        }
    };
}

simple_instructions! {
    "unreachable" => Unreachable,
    "nop" => Nop,
    "return" => Return,
    "drop" => Drop,
    "select" => Select,

    "i32.eqz" => I32Eqz,
    "i32.eq" => I32Eq,
    "i32.ne" => I32Ne,
    "i32.lt_s" => I32LtS,
    "i32.lt_u" => I32LtU,
    "i32.gt_s" => I32GtS,
    "i32.gt_u" => I32GtU,
    "i32.le_s" => I32LeS,
    "i32.le_u" => I32LeU,
    "i32.ge_s" => I32GeS,
    "i32.ge_u" => I32GeU,
    "i64.eqz" => I64Eqz,
    "i64.eq" => I64Eq,
    "i64.ne" => I64Ne,
    "i64.lt_s" => I64LtS,
    "i64.lt_u" => I64LtU,
    "i64.gt_s" => I64GtS,
    "i64.gt_u" => I64GtU,
    "i64.le_s" => I64LeS,
    "i64.le_u" => I64LeU,
    "i64.ge_s" => I64GeS,
    "i64.ge_u" => I64GeU,
    "f32.eq" => F32Eq,
    "f32.ne" => F32Ne,
    "f32.lt" => F32Lt,
    "f32.gt" => F32Gt,
    "f32.le" => F32Le,
    "f32.ge" => F32Ge,
    "f64.eq" => F64Eq,
    "f64.ne" => F64Ne,
    "f64.lt" => F64Lt,
    "f64.gt" => F64Gt,
    "f64.le" => F64Le,
    "f64.ge" => F64Ge,

    "i32.clz" => I32Clz,
    "i32.ctz" => I32Ctz,
    "i32.popcnt" => I32Popcnt,
    "i32.add" => I32Add,
    "i32.sub" => I32Sub,
    "i32.mul" => I32Mul,
    "i32.div_s" => I32DivS,
    "i32.div_u" => I32DivU,
    "i32.rem_s" => I32RemS,
    "i32.rem_u" => I32RemU,
    "i32.and" => I32And,
    "i32.or" => I32Or,
    "i32.xor" => I32Xor,
    "i32.shl" => I32Shl,
    "i32.shr_s" => I32ShrS,
    "i32.shr_u" => I32ShrU,
    "i32.rotl" => I32Rotl,
    "i32.rotr" => I32Rotr,
    "i64.clz" => I64Clz,
    "i64.ctz" => I64Ctz,
    "i64.popcnt" => I64Popcnt,
    "i64.add" => I64Add,
    "i64.sub" => I64Sub,
    "i64.mul" => I64Mul,
    "i64.div_s" => I64DivS,
    "i64.div_u" => I64DivU,
    "i64.rem_s" => I64RemS,
    "i64.rem_u" => I64RemU,
    "i64.and" => I64And,
    "i64.or" => I64Or,
    "i64.xor" => I64Xor,
    "i64.shl" => I64Shl,
    "i64.shr_s" => I64ShrS,
    "i64.shr_u" => I64ShrU,
    "i64.rotl" => I64Rotl,
    "i64.rotr" => I64Rotr,

    "f32.abs" => F32Abs,
    "f32.neg" => F32Neg,
    "f32.ceil" => F32Ceil,
    "f32.floor" => F32Floor,
    "f32.trunc" => F32Trunc,
    "f32.nearest" => F32Nearest,
    "f32.sqrt" => F32Sqrt,
    "f32.add" => F32Add,
    "f32.sub" => F32Sub,
    "f32.mul" => F32Mul,
    "f32.div" => F32Div,
    "f32.min" => F32Min,
    "f32.max" => F32Max,
    "f32.copysign" => F32Copysign,
    "f64.abs" => F64Abs,
    "f64.neg" => F64Neg,
    "f64.ceil" => F64Ceil,
    "f64.floor" => F64Floor,
    "f64.trunc" => F64Trunc,
    "f64.nearest" => F64Nearest,
    "f64.sqrt" => F64Sqrt,
    "f64.add" => F64Add,
    "f64.sub" => F64Sub,
    "f64.mul" => F64Mul,
    "f64.div" => F64Div,
    "f64.min" => F64Min,
    "f64.max" => F64Max,
    "f64.copysign" => F64Copysign,

    "i32.wrap_i64" => I32WrapI64,
    "i32.trunc_f32_s" => I32TruncF32S,
    "i32.trunc_f32_u" => I32TruncF32U,
    "i32.trunc_f64_s" => I32TruncF64S,
    "i32.trunc_f64_u" => I32TruncF64U,
    "i64.extend_i32_s" => I64ExtendI32S,
    "i64.extend_i32_u" => I64ExtendI32U,
    "i64.trunc_f32_s" => I64TruncF32S,
    "i64.trunc_f32_u" => I64TruncF32U,
    "i64.trunc_f64_s" => I64TruncF64S,
    "i64.trunc_f64_u" => I64TruncF64U,
    "f32.convert_i32_s" => F32ConvertI32S,
    "f32.convert_i32_u" => F32ConvertI32U,
    "f32.convert_i64_s" => F32ConvertI64S,
    "f32.convert_i64_u" => F32ConvertI64U,
    "f32.demote_f64" => F32DemoteF64,
    "f64.convert_i32_s" => F64ConvertI32S,
    "f64.convert_i32_u" => F64ConvertI32U,
    "f64.convert_i64_s" => F64ConvertI64S,
    "f64.convert_i64_u" => F64ConvertI64U,
    "f64.promote_f32" => F64PromoteF32,
    "i32.reinterpret_f32" => I32ReinterpretF32,
    "i64.reinterpret_f64" => I64ReinterpretF64,
    "f32.reinterpret_i32" => F32ReinterpretI32,
    "f64.reinterpret_i64" => F64ReinterpretI64,
    "i32.extend8_s" => I32Extend8S,
    "i32.extend16_s" => I32Extend16S,
    "i64.extend8_s" => I64Extend8S,
    "i64.extend16_s" => I64Extend16S,
    "i64.extend32_s" => I64Extend32S,
}

memory_instructions! {
    "i32.load" => I32Load,
    "i64.load" => I64Load,
    "f32.load" => F32Load,
    "f64.load" => F64Load,
    "i32.load8_s" => I32Load8S,
    "i32.load8_u" => I32Load8U,
    "i32.load16_s" => I32Load16S,
    "i32.load16_u" => I32Load16U,
    "i64.load8_s" => I64Load8S,
    "i64.load8_u" => I64Load8U,
    "i64.load16_s" => I64Load16S,
    "i64.load16_u" => I64Load16U,
    "i64.load32_s" => I64Load32S,
    "i64.load32_u" => I64Load32U,
    "i32.store" => I32Store,
    "i64.store" => I64Store,
    "f32.store" => F32Store,
    "f64.store" => F64Store,
    "i32.store8" => I32Store8,
    "i32.store16" => I32Store16,
    "i64.store8" => I64Store8,
    "i64.store16" => I64Store16,
    "i64.store32" => I64Store32,
}

impl Instruction {
    /// Decode one instruction from its tuple form
    pub fn decode(raw: &Json) -> Result<Instruction, ParseError> {
        let items = raw
            .as_array()
            .ok_or_else(|| ParseError::Malformed(format!("instruction must be an array, got {raw}")))?;
        let Some((Json::String(name), rest)) = items.split_first() else {
            return Err(ParseError::Malformed(format!(
                "instruction must start with its name, got {raw}"
            )));
        };
        let operands = Operands { op: name, items: rest };

        if let Some(inst) = Self::from_simple_name(name) {
            operands.expect_at_most(0)?;
            return Ok(inst);
        }
        if let Some(construct) = Self::memory_constructor(name) {
            return Ok(construct(operands.memarg()?));
        }

        let inst = match name.as_str() {
            "i32.const" => Instruction::I32Const { value: operands.i32(0)? },
            "i64.const" => Instruction::I64Const { value: operands.i64(0)? },
            "f32.const" => Instruction::F32Const { value: operands.f32(0)? },
            "f64.const" => Instruction::F64Const { value: operands.f64(0)? },

            "local.get" => Instruction::LocalGet { local_idx: operands.u32(0)? },
            "local.set" => Instruction::LocalSet { local_idx: operands.u32(0)? },
            "local.tee" => Instruction::LocalTee { local_idx: operands.u32(0)? },

            "br" => Instruction::Br { label_idx: operands.u32(0)? },
            "br_if" => Instruction::BrIf { label_idx: operands.u32(0)? },
            "br_table" => Instruction::BrTable {
                labels: operands.u32_list(0)?,
                default: operands.u32(1)?,
            },
            "call" => Instruction::Call { func_idx: operands.u32(0)? },

            "block" => {
                let (block_type, body) = operands.block()?;
                Instruction::Block { block_type, body }
            }
            "loop" => {
                let (block_type, body) = operands.block()?;
                Instruction::Loop { block_type, body }
            }
            "if" => operands.if_else()?,

            // The loader emits a memory index operand which is always 0
            "memory.size" | "memory.grow" => {
                operands.expect_at_most(1)?;
                if !operands.items.is_empty() && operands.u32(0)? != 0 {
                    return Err(operands.invalid("only memory 0 exists"));
                }
                if name == "memory.size" {
                    Instruction::MemorySize
                } else {
                    Instruction::MemoryGrow
                }
            }

            _ => return Err(ParseError::UnknownOperation(name.to_string())),
        };
        Ok(inst)
    }

    /// Instruction name as it appears in the tuple form
    pub fn mnemonic(&self) -> &'static str {
        if let Some(name) = self.simple_mnemonic() {
            return name;
        }
        if let Some((name, _)) = self.memory_mnemonic() {
            return name;
        }
        match self {
            Instruction::Block { .. } => "block",
            Instruction::Loop { .. } => "loop",
            Instruction::If { .. } => "if",
            Instruction::Br { .. } => "br",
            Instruction::BrIf { .. } => "br_if",
            Instruction::BrTable { .. } => "br_table",
            Instruction::Call { .. } => "call",
            Instruction::LocalGet { .. } => "local.get",
            Instruction::LocalSet { .. } => "local.set",
            Instruction::LocalTee { .. } => "local.tee",
            Instruction::MemorySize => "memory.size",
            Instruction::MemoryGrow => "memory.grow",
            Instruction::I32Const { .. } => "i32.const",
            Instruction::I64Const { .. } => "i64.const",
            Instruction::F32Const { .. } => "f32.const",
            Instruction::F64Const { .. } => "f64.const",
            // Covered by the generated tables above
            _ => "unknown",
        }
    }
}

/// Decode an instruction sequence
pub fn decode_sequence(raw: &[Json]) -> Result<Vec<Instruction>, ParseError> {
    raw.iter().map(Instruction::decode).collect()
}

/// Positional operands of one tuple, with the instruction name for error context
struct Operands<'a> {
    op: &'a str,
    items: &'a [Json],
}

impl<'a> Operands<'a> {
    fn invalid(&self, reason: impl Into<String>) -> ParseError {
        ParseError::InvalidOperands {
            op: self.op.to_string(),
            reason: reason.into(),
        }
    }

    fn expect_at_most(&self, count: usize) -> Result<(), ParseError> {
        if self.items.len() > count {
            return Err(self.invalid(format!("expected at most {count} operands, got {}", self.items.len())));
        }
        Ok(())
    }

    fn get(&self, idx: usize) -> Result<&'a Json, ParseError> {
        self.items
            .get(idx)
            .ok_or_else(|| self.invalid(format!("missing operand {idx}")))
    }

    fn u32(&self, idx: usize) -> Result<u32, ParseError> {
        let raw = self.get(idx)?;
        raw.as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.invalid(format!("expected an unsigned 32-bit index, got {raw}")))
    }

    fn u32_list(&self, idx: usize) -> Result<Vec<u32>, ParseError> {
        let raw = self.get(idx)?;
        let items = raw
            .as_array()
            .ok_or_else(|| self.invalid(format!("expected a list of label depths, got {raw}")))?;
        items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| self.invalid(format!("invalid label depth {item}")))
            })
            .collect()
    }

    /// Integer literals may be written signed or as their unsigned bit pattern
    fn i32(&self, idx: usize) -> Result<i32, ParseError> {
        let raw = self.get(idx)?;
        if let Some(v) = raw.as_i64() {
            if let Ok(v) = i32::try_from(v) {
                return Ok(v);
            }
            if let Ok(v) = u32::try_from(v) {
                return Ok(v as i32);
            }
        }
        Err(self.invalid(format!("expected a 32-bit integer, got {raw}")))
    }

    fn i64(&self, idx: usize) -> Result<i64, ParseError> {
        let raw = self.get(idx)?;
        if let Some(v) = raw.as_i64() {
            return Ok(v);
        }
        if let Some(v) = raw.as_u64() {
            return Ok(v as i64);
        }
        if let Some(text) = raw.as_str() {
            if let Ok(Value::I64(v)) = Value::parse(ValueType::I64, text) {
                return Ok(v);
            }
        }
        Err(self.invalid(format!("expected a 64-bit integer, got {raw}")))
    }

    fn f32(&self, idx: usize) -> Result<f32, ParseError> {
        match self.float(idx, ValueType::F32)? {
            Value::F32(v) => Ok(v),
            _ => Err(self.invalid("expected an f32 literal")),
        }
    }

    fn f64(&self, idx: usize) -> Result<f64, ParseError> {
        match self.float(idx, ValueType::F64)? {
            Value::F64(v) => Ok(v),
            _ => Err(self.invalid("expected an f64 literal")),
        }
    }

    /// JSON numbers, or strings for values JSON cannot carry (NaN, infinities, raw bits)
    fn float(&self, idx: usize, typ: ValueType) -> Result<Value, ParseError> {
        let raw = self.get(idx)?;
        match raw {
            Json::Number(n) => {
                let v = n
                    .as_f64()
                    .ok_or_else(|| self.invalid(format!("invalid float literal {raw}")))?;
                Ok(match typ {
                    ValueType::F32 => Value::F32(v as f32),
                    _ => Value::F64(v),
                })
            }
            Json::String(text) => Value::parse(typ, text).map_err(|e| self.invalid(e)),
            _ => Err(self.invalid(format!("expected a float literal, got {raw}"))),
        }
    }

    /// `[align, offset]`, `[offset]` or nothing
    fn memarg(&self) -> Result<MemArg, ParseError> {
        match self.items.len() {
            0 => Ok(MemArg::default()),
            1 => Ok(MemArg::offset(self.u32(0)?)),
            2 => Ok(MemArg {
                align: self.u32(0)?,
                offset: self.u32(1)?,
            }),
            n => Err(self.invalid(format!("expected alignment and offset, got {n} operands"))),
        }
    }

    /// Accepts null, a type name, or a binary block type code (0x40 empty, 0x7f..0x7c)
    fn block_type(&self, raw: &Json) -> Result<BlockType, ParseError> {
        match raw {
            Json::Null => Ok(BlockType::Empty),
            Json::String(name) if name == "empty" => Ok(BlockType::Empty),
            Json::String(name) => ValueType::from_name(name)
                .map(BlockType::Value)
                .ok_or_else(|| self.invalid(format!("unknown block type {name}"))),
            Json::Number(code) => match code.as_u64() {
                Some(0x40) => Ok(BlockType::Empty),
                Some(0x7f) => Ok(BlockType::Value(ValueType::I32)),
                Some(0x7e) => Ok(BlockType::Value(ValueType::I64)),
                Some(0x7d) => Ok(BlockType::Value(ValueType::F32)),
                Some(0x7c) => Ok(BlockType::Value(ValueType::F64)),
                _ => Err(self.invalid(format!("unsupported block type code {code}"))),
            },
            other => Err(self.invalid(format!("invalid block type {other}"))),
        }
    }

    fn body(&self, raw: &Json) -> Result<Vec<Instruction>, ParseError> {
        let items = raw
            .as_array()
            .ok_or_else(|| self.invalid(format!("expected an instruction list, got {raw}")))?;
        decode_sequence(items)
    }

    /// `[type, [body]]` or just `[[body]]`
    fn block(&self) -> Result<(BlockType, Vec<Instruction>), ParseError> {
        match self.items {
            [body] => Ok((BlockType::Empty, self.body(body)?)),
            [block_type, body] => Ok((self.block_type(block_type)?, self.body(body)?)),
            _ => Err(self.invalid("expected a block type and a body")),
        }
    }

    /// `[type, [then]]` or `[type, [then], [else]]`
    fn if_else(&self) -> Result<Instruction, ParseError> {
        let (block_type, then_branch, else_branch) = match self.items {
            [block_type, then_branch] => (self.block_type(block_type)?, self.body(then_branch)?, Vec::new()),
            [block_type, then_branch, else_branch] => (
                self.block_type(block_type)?,
                self.body(then_branch)?,
                self.body(else_branch)?,
            ),
            _ => return Err(self.invalid("expected a block type, a then body and an optional else body")),
        };
        Ok(Instruction::If {
            block_type,
            then_branch,
            else_branch,
        })
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Empty => Ok(()),
            BlockType::Value(t) => write!(f, " (result {t})"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_instruction(f, self, 0)
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &[Instruction], indent: usize) -> fmt::Result {
    for inst in body {
        writeln!(f)?;
        write_instruction(f, inst, indent)?;
    }
    Ok(())
}

fn write_instruction(f: &mut fmt::Formatter<'_>, inst: &Instruction, indent: usize) -> fmt::Result {
    let prefix = "  ".repeat(indent);
    write!(f, "{prefix}{}", inst.mnemonic())?;
    if let Some((_, memarg)) = inst.memory_mnemonic() {
        if memarg.offset != 0 {
            write!(f, " offset={}", memarg.offset)?;
        }
        return Ok(());
    }
    match inst {
        Instruction::Block { block_type, body } | Instruction::Loop { block_type, body } => {
            write!(f, "{block_type}")?;
            write_body(f, body, indent + 1)?;
            write!(f, "\n{prefix}end")
        }
        Instruction::If {
            block_type,
            then_branch,
            else_branch,
        } => {
            write!(f, "{block_type}")?;
            write_body(f, then_branch, indent + 1)?;
            if !else_branch.is_empty() {
                write!(f, "\n{prefix}else")?;
                write_body(f, else_branch, indent + 1)?;
            }
            write!(f, "\n{prefix}end")
        }
        Instruction::Br { label_idx } | Instruction::BrIf { label_idx } => write!(f, " {label_idx}"),
        Instruction::BrTable { labels, default } => {
            for label in labels {
                write!(f, " {label}")?;
            }
            write!(f, " {default}")
        }
        Instruction::Call { func_idx } => write!(f, " {func_idx}"),
        Instruction::LocalGet { local_idx }
        | Instruction::LocalSet { local_idx }
        | Instruction::LocalTee { local_idx } => write!(f, " {local_idx}"),
        Instruction::I32Const { value } => write!(f, " {value}"),
        Instruction::I64Const { value } => write!(f, " {value}"),
        Instruction::F32Const { value } => write!(f, " {}", value.to_hex()),
        Instruction::F64Const { value } => write!(f, " {}", value.to_hex()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn decode(raw: Json) -> Result<Instruction, ParseError> {
        Instruction::decode(&raw)
    }

    #[rstest]
    #[case(json!(["i32.add"]), Instruction::I32Add)]
    #[case(json!(["f64.reinterpret_i64"]), Instruction::F64ReinterpretI64)]
    #[case(json!(["select"]), Instruction::Select)]
    #[case(json!(["i32.const", -5]), Instruction::I32Const { value: -5 })]
    #[case(json!(["i32.const", 4294967295u32]), Instruction::I32Const { value: -1 })]
    #[case(json!(["i64.const", "18446744073709551615"]), Instruction::I64Const { value: -1 })]
    #[case(json!(["f64.const", 0.1]), Instruction::F64Const { value: 0.1 })]
    #[case(json!(["local.tee", 3]), Instruction::LocalTee { local_idx: 3 })]
    #[case(json!(["call", 7]), Instruction::Call { func_idx: 7 })]
    #[case(json!(["memory.size", 0]), Instruction::MemorySize)]
    #[case(json!(["memory.grow"]), Instruction::MemoryGrow)]
    fn decodes_tuple_form(#[case] raw: Json, #[case] expected: Instruction) {
        assert_eq!(decode(raw).unwrap(), expected);
    }

    #[test]
    fn decodes_memargs() {
        assert_eq!(
            decode(json!(["f64.load", 3, 8])).unwrap(),
            Instruction::F64Load {
                memarg: MemArg { align: 3, offset: 8 }
            }
        );
        assert_eq!(
            decode(json!(["i32.store8", 16])).unwrap(),
            Instruction::I32Store8 {
                memarg: MemArg::offset(16)
            }
        );
        assert_eq!(
            decode(json!(["i64.load32_u"])).unwrap(),
            Instruction::I64Load32U {
                memarg: MemArg::default()
            }
        );
    }

    #[test]
    fn decodes_nested_blocks() {
        let inst = decode(json!(["block", null, [
            ["loop", "i32", [["br_if", 1], ["br", 0]]],
            ["drop"]
        ]]))
        .unwrap();

        assert_eq!(
            inst,
            Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![
                    Instruction::Loop {
                        block_type: BlockType::Value(ValueType::I32),
                        body: vec![Instruction::BrIf { label_idx: 1 }, Instruction::Br { label_idx: 0 }],
                    },
                    Instruction::Drop,
                ],
            }
        );
    }

    #[test]
    fn decodes_binary_block_type_codes() {
        let inst = decode(json!(["block", 64, []])).unwrap();
        assert_eq!(
            inst,
            Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![]
            }
        );
        let inst = decode(json!(["loop", 0x7c, []])).unwrap();
        assert!(matches!(
            inst,
            Instruction::Loop {
                block_type: BlockType::Value(ValueType::F64),
                ..
            }
        ));
    }

    #[test]
    fn decodes_block_without_type_slot() {
        let inst = decode(json!(["block", [["nop"]]])).unwrap();
        assert_eq!(
            inst,
            Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![Instruction::Nop]
            }
        );
    }

    #[test]
    fn decodes_if_else() {
        let inst = decode(json!(["if", "f64", [["f64.const", 1.0]], [["f64.const", 2.0]]])).unwrap();
        assert_eq!(
            inst,
            Instruction::If {
                block_type: BlockType::Value(ValueType::F64),
                then_branch: vec![Instruction::F64Const { value: 1.0 }],
                else_branch: vec![Instruction::F64Const { value: 2.0 }],
            }
        );
    }

    #[test]
    fn decodes_br_table() {
        let inst = decode(json!(["br_table", [0, 1, 2], 3])).unwrap();
        assert_eq!(
            inst,
            Instruction::BrTable {
                labels: vec![0, 1, 2],
                default: 3
            }
        );
    }

    #[test]
    fn decodes_float_strings() {
        let inst = decode(json!(["f32.const", "nan"])).unwrap();
        assert!(matches!(inst, Instruction::F32Const { value } if value.is_nan()));

        let inst = decode(json!(["f64.const", "0x4000000000000000"])).unwrap();
        assert_eq!(inst, Instruction::F64Const { value: 2.0 });
    }

    #[test]
    fn rejects_unknown_operation() {
        let err = decode(json!(["i32.frobnicate"])).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperation(ref name) if name == "i32.frobnicate"));

        // Near-miss load and store names are unknown whatever their operands
        let err = decode(json!(["i32.loadz", 1, 2, 3])).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperation(ref name) if name == "i32.loadz"));
        let err = decode(json!(["f64.store64"])).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperation(ref name) if name == "f64.store64"));

        // Unknown names nested inside a body are rejected too
        let err = decode(json!(["block", null, [["v128.const", 0]]])).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperation(_)));
    }

    #[test]
    fn rejects_bad_operands() {
        assert!(matches!(
            decode(json!(["local.get"])),
            Err(ParseError::InvalidOperands { .. })
        ));
        assert!(matches!(
            decode(json!(["local.get", -1])),
            Err(ParseError::InvalidOperands { .. })
        ));
        assert!(matches!(
            decode(json!(["i32.const", 1.5])),
            Err(ParseError::InvalidOperands { .. })
        ));
        assert!(matches!(
            decode(json!(["i32.add", 1])),
            Err(ParseError::InvalidOperands { .. })
        ));
        assert!(matches!(
            decode(json!(["memory.size", 1])),
            Err(ParseError::InvalidOperands { .. })
        ));
        assert!(matches!(decode(json!("i32.add")), Err(ParseError::Malformed(_))));
        assert!(matches!(decode(json!([5])), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Instruction::I64Rotl.mnemonic(), "i64.rotl");
        assert_eq!(
            Instruction::I64Load16S {
                memarg: MemArg::default()
            }
            .mnemonic(),
            "i64.load16_s"
        );
        assert_eq!(Instruction::MemoryGrow.mnemonic(), "memory.grow");
        assert_eq!(Instruction::LocalGet { local_idx: 0 }.mnemonic(), "local.get");
    }

    #[test]
    fn display_nested() {
        let inst = Instruction::Block {
            block_type: BlockType::Value(ValueType::I32),
            body: vec![
                Instruction::I32Const { value: 42 },
                Instruction::Loop {
                    block_type: BlockType::Empty,
                    body: vec![Instruction::Br { label_idx: 1 }],
                },
            ],
        };
        let text = inst.to_string();
        assert!(text.starts_with("block (result i32)"));
        assert!(text.contains("  i32.const 42"));
        assert!(text.contains("    br 1"));
        assert!(text.ends_with("end"));
    }
}
