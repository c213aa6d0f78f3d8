//! Program runner
//!
//! Loads a program description, invokes one export with arguments parsed
//! against its parameter types, and prints the result.
//!
//! Usage: minwasm <program.json> <export> [args...]

use minwasm::parser;
use minwasm::runtime::host::create_host_imports;
use minwasm::runtime::{Instance, Value};
use std::env;
use std::error::Error;
use std::process;

fn print_help(prog: &str) {
    eprintln!("Usage: {prog} <program.json> <export> [args...]");
    eprintln!();
    eprintln!("Runs an exported function of a program description.");
    eprintln!("Arguments are parsed as the export's parameter types; floats accept");
    eprintln!("decimal or 0x-prefixed raw bits. Set RUST_LOG=debug for tracing.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -l, --list   List the program's exports and exit");
    eprintln!("  -h, --help   Show this help message");
}

fn list_exports(path: &str) -> Result<(), Box<dyn Error>> {
    let module = parser::load(path)?;
    let instance = Instance::new(module, &create_host_imports())?;
    for (name, func_idx) in instance.exports() {
        println!("{name}: {} (function {func_idx})", instance.export_type(name)?);
    }
    Ok(())
}

fn run(path: &str, export: &str, raw_args: &[String]) -> Result<Option<Value>, Box<dyn Error>> {
    let module = parser::load(path)?;
    let mut instance = Instance::new(module, &create_host_imports())?;

    let func_type = instance.export_type(export)?.clone();
    if raw_args.len() != func_type.params.len() {
        return Err(format!(
            "{export} {func_type} takes {} arguments, got {}",
            func_type.params.len(),
            raw_args.len()
        )
        .into());
    }
    let args = func_type
        .params
        .iter()
        .zip(raw_args)
        .map(|(&typ, raw)| Value::parse(typ, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(instance.invoke(export, &args)?)
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("minwasm");

    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        print_help(prog);
        process::exit(0);
    }

    if args.len() == 3 && (args[1] == "-l" || args[1] == "--list") {
        if let Err(e) = list_exports(&args[2]) {
            eprintln!("error: {e}");
            process::exit(1);
        }
        return;
    }

    if args.len() < 3 {
        print_help(prog);
        process::exit(1);
    }

    match run(&args[1], &args[2], &args[3..]) {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
