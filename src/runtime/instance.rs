//! Program instance
//!
//! Instantiation resolves the module's imports against an [`ImportObject`],
//! builds the function table, creates the machine and copies every data
//! segment into linear memory. Exported functions are then invoked by name.

use super::{
    config::Config,
    function::{Function, FunctionTable},
    imports::ImportObject,
    machine::Machine,
    memory::Memory,
    RuntimeError, Value,
};
use crate::parser::module::{FunctionType, Module};
use log::debug;
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct Instance {
    machine: Machine,
    exports: BTreeMap<String, u32>,
}

impl Instance {
    /// Instantiate with the configuration the module carries
    pub fn new(module: Module, imports: &ImportObject) -> Result<Self, RuntimeError> {
        let config = module.config.clone();
        Self::with_config(module, imports, config)
    }

    /// Instantiate with an explicit configuration, ignoring the module's own
    pub fn with_config(module: Module, imports: &ImportObject, config: Config) -> Result<Self, RuntimeError> {
        let mut functions = Vec::with_capacity(module.function_count());
        for import in &module.imports {
            functions.push(Function::Imported(imports.resolve(import)?));
        }
        functions.extend(module.functions.into_iter().map(Function::Defined));
        let table = Rc::new(FunctionTable::new(functions));

        for &func_idx in module.exports.values() {
            table.get(func_idx)?;
        }

        let mut machine = Machine::new(table, config)?;

        for (i, segment) in module.data.iter().enumerate() {
            let offset = match machine.evaluate(&segment.offset)? {
                Value::I32(offset) => offset as u32 as u64,
                other => return Err(RuntimeError::type_violation("i32 data segment offset", other.typ())),
            };
            machine.memory_mut().write_bytes(offset, &segment.bytes)?;
            debug!("data segment {i}: {} bytes at {offset}", segment.bytes.len());
        }

        debug!(
            "instantiated {} functions ({} imported), {} exports, {} bytes of memory",
            machine.functions().len(),
            module.imports.len(),
            module.exports.len(),
            machine.memory().len()
        );

        Ok(Instance {
            machine,
            exports: module.exports,
        })
    }

    /// Invoke an exported function by name
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let func_idx = self.export_index(name)?;
        debug!("invoke {name} (function {func_idx})");
        self.machine.invoke(func_idx, args)
    }

    pub fn export_index(&self, name: &str) -> Result<u32, RuntimeError> {
        self.exports
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))
    }

    pub fn export_type(&self, name: &str) -> Result<&FunctionType, RuntimeError> {
        let func_idx = self.export_index(name)?;
        Ok(self.machine.functions().get(func_idx)?.func_type())
    }

    /// Export names with their function indices, in name order
    pub fn exports(&self) -> impl Iterator<Item = (&str, u32)> {
        self.exports.iter().map(|(name, &idx)| (name.as_str(), idx))
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn memory(&self) -> &Memory {
        self.machine.memory()
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        self.machine.memory_mut()
    }
}
