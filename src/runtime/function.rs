//! Function table
//!
//! The table is the single index space that `call` instructions address:
//! imported host functions first, then the defined functions, in declaration
//! order. It is immutable once built and shared with the machine through an `Rc`.

use super::{RuntimeError, Value};
use crate::parser::module::{FunctionBody, FunctionType};
use std::fmt;
use std::rc::Rc;

/// Host callback: receives exactly the declared number of arguments
pub type HostFunc = Rc<dyn Fn(&[Value]) -> Result<Option<Value>, RuntimeError>>;

/// A native function together with the signature it is called through
#[derive(Clone)]
pub struct HostFunction {
    pub func_type: FunctionType,
    pub func: HostFunc,
}

impl HostFunction {
    pub fn new<F>(func_type: FunctionType, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, RuntimeError> + 'static,
    {
        HostFunction {
            func_type,
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        (self.func)(args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction {}", self.func_type)
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    Defined(FunctionBody),
    Imported(HostFunction),
}

impl Function {
    pub fn func_type(&self) -> &FunctionType {
        match self {
            Function::Defined(body) => &body.func_type,
            Function::Imported(host) => &host.func_type,
        }
    }
}

#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: Vec<Function>,
}

impl FunctionTable {
    pub fn new(functions: Vec<Function>) -> Self {
        FunctionTable { functions }
    }

    pub fn get(&self, func_idx: u32) -> Result<&Function, RuntimeError> {
        self.functions
            .get(func_idx as usize)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(func_idx))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FromIterator<Function> for FunctionTable {
    fn from_iter<I: IntoIterator<Item = Function>>(iter: I) -> Self {
        FunctionTable::new(iter.into_iter().collect())
    }
}
