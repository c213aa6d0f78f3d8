//! Import resolution
//!
//! An [`ImportObject`] holds the host functions an embedder offers, keyed by
//! `(module, name)`. Instantiation looks each declared import up here and
//! checks that the offered signature matches the declared one.

use super::function::HostFunction;
use super::{RuntimeError, Value};
use crate::parser::module::{FunctionType, Import};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ImportObject {
    pub functions: HashMap<(String, String), HostFunction>,
}

impl ImportObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a host function under `module.name`, replacing any earlier one
    pub fn add_function<F>(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        func_type: FunctionType,
        func: F,
    ) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, RuntimeError> + 'static,
    {
        self.functions
            .insert((module.into(), name.into()), HostFunction::new(func_type, func));
        self
    }

    pub fn get_function(&self, module: &str, name: &str) -> Option<&HostFunction> {
        self.functions.get(&(module.to_string(), name.to_string()))
    }

    /// Merge another import object into this one; its entries win on conflict
    pub fn extend(&mut self, other: ImportObject) {
        self.functions.extend(other.functions);
    }

    /// Find the host function for a declared import
    ///
    /// # Errors
    /// `UnknownImport` if nothing is offered under that name,
    /// `ImportTypeMismatch` if the offered signature differs.
    pub fn resolve(&self, import: &Import) -> Result<HostFunction, RuntimeError> {
        let host = self
            .get_function(&import.module, &import.name)
            .ok_or_else(|| RuntimeError::UnknownImport {
                module: import.module.clone(),
                name: import.name.clone(),
            })?;
        if host.func_type != import.func_type {
            return Err(RuntimeError::ImportTypeMismatch {
                module: import.module.clone(),
                name: import.name.clone(),
                expected: import.func_type.to_string(),
                actual: host.func_type.to_string(),
            });
        }
        Ok(host.clone())
    }
}
