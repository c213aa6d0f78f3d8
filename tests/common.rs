//! Common test utilities shared between integration tests
#![allow(dead_code)]

use minwasm::parser::module::{FunctionType, ValueType};
use minwasm::runtime::host::HOST_MODULE;
use minwasm::runtime::{ImportObject, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub const BOUNCE: &str = include_str!("../demos/bounce.json");

/// Every value passed to `env.display_player`, in call order
#[derive(Clone, Default)]
pub struct Recorder(pub Rc<RefCell<Vec<f64>>>);

impl Recorder {
    pub fn positions(&self) -> Vec<f64> {
        self.0.borrow().clone()
    }
}

/// Imports for the bouncing program, recording each displayed position
pub fn display_imports() -> (ImportObject, Recorder) {
    let recorder = Recorder::default();
    let sink = recorder.clone();
    let mut imports = ImportObject::new();
    imports.add_function(
        HOST_MODULE,
        "display_player",
        FunctionType::new(vec![ValueType::F64], None),
        move |args| {
            if let [Value::F64(x)] = args {
                sink.0.borrow_mut().push(*x);
            }
            Ok(None)
        },
    );
    (imports, recorder)
}

/// A program with a single exported function `main` of the given signature
pub fn single_function(params: &str, result: &str, body: &str) -> String {
    format!(
        r#"{{
            "functions": [{{"type": {{"params": {params}, "result": {result}}}, "body": {body}}}],
            "exports": {{"main": 0}}
        }}"#
    )
}
