//! Standard host imports
//!
//! Programs compiled for a browser-like host commonly import a few math
//! helpers and print functions from `env`. This module offers them so a
//! program can run without the embedder writing any host code.

use super::{ImportObject, RuntimeError, Value};
use crate::parser::module::{FunctionType, ValueType};

pub const HOST_MODULE: &str = "env";

fn f64_arg(name: &str, args: &[Value]) -> Result<f64, RuntimeError> {
    match args {
        [Value::F64(x)] => Ok(*x),
        _ => Err(RuntimeError::Host(format!("{name} expects a single f64, got {args:?}"))),
    }
}

fn add_math(imports: &mut ImportObject, name: &'static str, f: fn(f64) -> f64) {
    let func_type = FunctionType::new(vec![ValueType::F64], Some(ValueType::F64));
    imports.add_function(HOST_MODULE, name, func_type, move |args| {
        Ok(Some(Value::F64(f(f64_arg(name, args)?))))
    });
}

/// Build an import object holding the standard `env` functions
///
/// - `Math_atan`, `cos`, `sin`: `(f64) -> f64`
/// - `print_i32`, `print_i64`, `print_f32`, `print_f64`: print the argument to stdout
pub fn create_host_imports() -> ImportObject {
    let mut imports = ImportObject::new();

    add_math(&mut imports, "Math_atan", f64::atan);
    add_math(&mut imports, "cos", f64::cos);
    add_math(&mut imports, "sin", f64::sin);

    for (name, typ) in [
        ("print_i32", ValueType::I32),
        ("print_i64", ValueType::I64),
        ("print_f32", ValueType::F32),
        ("print_f64", ValueType::F64),
    ] {
        imports.add_function(HOST_MODULE, name, FunctionType::new(vec![typ], None), |args| {
            for arg in args {
                println!("{arg}");
            }
            Ok(None)
        });
    }

    imports
}
