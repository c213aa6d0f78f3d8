//! A minimal WebAssembly-style stack machine interpreter.
//!
//! minwasm executes already-decoded programs: numeric values on an operand
//! stack, a growable little-endian linear memory, a function table mixing
//! interpreted functions with host callbacks, and structured control flow
//! (blocks, loops, ifs and relative branches) interpreted recursively.
//!
//! # Modules
//!
//! - [`parser`] -- Program descriptions. Decodes a JSON document with
//!   instructions in tuple form into a [`parser::module::Module`].
//! - [`runtime`] -- Values, operand stack, memory, function table and the
//!   [`runtime::Machine`] that runs them.
//!
//! # Example
//!
//! Decode a program, instantiate it, and call an exported function:
//!
//! ```
//! use minwasm::parser;
//! use minwasm::runtime::{ImportObject, Instance, Value};
//!
//! let module = parser::parse(r#"{
//!     "functions": [{
//!         "type": {"params": ["i32", "i32"], "result": "i32"},
//!         "body": [["local.get", 0], ["local.get", 1], ["i32.add"]]
//!     }],
//!     "exports": {"add": 0}
//! }"#).unwrap();
//!
//! let mut instance = Instance::new(module, &ImportObject::new()).unwrap();
//! let result = instance.invoke("add", &[Value::I32(2), Value::I32(3)]).unwrap();
//! assert_eq!(result, Some(Value::I32(5)));
//! ```

pub mod parser;
pub mod runtime;
