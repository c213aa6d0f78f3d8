//! Program description decoding
//!
//! Programs are handed to the runtime as a JSON document carrying the import
//! declarations, defined functions, data segments and export table, with every
//! instruction in tuple form. This module turns that document into a [`Module`].

pub mod instruction;
pub mod module;

use base64::{engine::general_purpose, Engine as _};
use instruction::decode_sequence;
use module::{FunctionBody, FunctionType, Module, ValueType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::runtime::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid data segment bytes: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to read program: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Invalid operands for {op}: {reason}")]
    InvalidOperands { op: String, reason: String },
    #[error("Malformed program: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModule {
    #[serde(default)]
    config: Config,
    #[serde(default)]
    imports: Vec<RawImport>,
    #[serde(default)]
    functions: Vec<RawFunction>,
    #[serde(default)]
    data: Vec<RawData>,
    #[serde(default)]
    exports: BTreeMap<String, u32>,
}

#[derive(Deserialize)]
struct RawImport {
    module: String,
    name: String,
    #[serde(rename = "type", default)]
    func_type: FunctionType,
}

#[derive(Deserialize)]
struct RawFunction {
    #[serde(rename = "type", default)]
    func_type: FunctionType,
    #[serde(default)]
    locals: Vec<ValueType>,
    body: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawData {
    offset: Vec<serde_json::Value>,
    /// Base64, standard alphabet
    bytes: String,
}

/// Decode a program description from its JSON text
pub fn parse(json: &str) -> Result<Module, ParseError> {
    let raw: RawModule = serde_json::from_str(json)?;

    let mut module = Module::new();
    module.config = raw.config;

    for import in raw.imports {
        module.add_import(&import.module, &import.name, import.func_type);
    }

    for (i, function) in raw.functions.into_iter().enumerate() {
        let body = decode_sequence(&function.body).map_err(|e| match e {
            ParseError::Malformed(reason) => ParseError::Malformed(format!("function {i}: {reason}")),
            other => other,
        })?;
        module.add_function(FunctionBody::new(function.func_type, body).with_locals(function.locals));
    }

    for segment in raw.data {
        let offset = decode_sequence(&segment.offset)?;
        let bytes = general_purpose::STANDARD.decode(segment.bytes.as_bytes())?;
        module.add_data(offset, bytes);
    }

    let count = module.function_count();
    for (name, func_idx) in raw.exports {
        if func_idx as usize >= count {
            return Err(ParseError::Malformed(format!(
                "export {name} refers to function {func_idx}, but only {count} exist"
            )));
        }
        module.add_export(&name, func_idx);
    }

    Ok(module)
}

/// Read and decode a program description file
pub fn load(path: impl AsRef<Path>) -> Result<Module, ParseError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}
