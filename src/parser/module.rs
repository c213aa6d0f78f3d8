//! Program description types
//!
//! A [`Module`] is what the external loader hands to the runtime: the imported
//! host function signatures, the defined function bodies, data segments and
//! the export table. The function index space is the imports first, then the
//! defined functions, in declaration order.

use super::instruction::Instruction;
use crate::runtime::config::Config;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// The four numeric value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(name)
    }
}

impl ValueType {
    /// Parse a type name as it appears in instruction operands (`"i32"`, `"f64"`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "i32" => Some(ValueType::I32),
            "i64" => Some(ValueType::I64),
            "f32" => Some(ValueType::F32),
            "f64" => Some(ValueType::F64),
            _ => None,
        }
    }
}

/// Function signature: positional parameter types and at most one result
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FunctionType {
    #[serde(default)]
    pub params: Vec<ValueType>,
    #[serde(default)]
    pub result: Option<ValueType>,
}

impl FunctionType {
    pub fn new(params: Vec<ValueType>, result: Option<ValueType>) -> Self {
        FunctionType { params, result }
    }

    /// Number of values a call pops from the operand stack
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")?;
        match self.result {
            Some(result) => write!(f, " -> {result}"),
            None => Ok(()),
        }
    }
}

/// A host function the program expects the embedder to provide
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub func_type: FunctionType,
}

/// An interpreted function: signature, extra locals and instruction tree
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub func_type: FunctionType,
    /// Locals declared beyond the parameters, zero-initialised on entry
    pub locals: Vec<ValueType>,
    pub body: Vec<Instruction>,
}

impl FunctionBody {
    pub fn new(func_type: FunctionType, body: Vec<Instruction>) -> Self {
        FunctionBody {
            func_type,
            locals: Vec::new(),
            body,
        }
    }

    pub fn with_locals(mut self, locals: Vec<ValueType>) -> Self {
        self.locals = locals;
        self
    }
}

/// Bytes copied into linear memory at instantiation
///
/// The offset is an instruction sequence evaluated against an empty frame;
/// it must leave a single i32 on the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    pub offset: Vec<Instruction>,
    pub bytes: Vec<u8>,
}

/// A decoded program, ready for instantiation
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub config: Config,
    pub imports: Vec<Import>,
    pub functions: Vec<FunctionBody>,
    pub data: Vec<DataSegment>,
    /// Export name to absolute function index
    pub exports: BTreeMap<String, u32>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    /// Declare a host import; returns its function index
    ///
    /// Imports must be declared before any defined function so indices stay stable.
    pub fn add_import(&mut self, module: &str, name: &str, func_type: FunctionType) -> u32 {
        self.imports.push(Import {
            module: module.to_string(),
            name: name.to_string(),
            func_type,
        });
        (self.imports.len() - 1) as u32
    }

    /// Add a defined function; returns its function index
    pub fn add_function(&mut self, function: FunctionBody) -> u32 {
        self.functions.push(function);
        (self.imports.len() + self.functions.len() - 1) as u32
    }

    pub fn add_data(&mut self, offset: Vec<Instruction>, bytes: Vec<u8>) {
        self.data.push(DataSegment { offset, bytes });
    }

    pub fn add_export(&mut self, name: &str, func_idx: u32) {
        self.exports.insert(name.to_string(), func_idx);
    }

    /// Total size of the function index space
    pub fn function_count(&self) -> usize {
        self.imports.len() + self.functions.len()
    }

    /// Signature of the function at an absolute index
    pub fn function_type(&self, func_idx: u32) -> Option<&FunctionType> {
        let idx = func_idx as usize;
        if idx < self.imports.len() {
            Some(&self.imports[idx].func_type)
        } else {
            self.functions.get(idx - self.imports.len()).map(|f| &f.func_type)
        }
    }
}
