//! Schist CLI - stages and runs a `printf` call through the term core
//!
//! Usage: `schist [--dump] [message]`. With `--dump` the term tree, its
//! type and its compiled form are printed before it is evaluated.

use std::env;
use std::process;

use log::info;

use schist::{compile, evaluate, infer_type, Context, CoreConfig, CoreError, Store, TermId};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let dump = args.iter().any(|a| a == "--dump");
    let message = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "hello from schist\n".to_string());

    if let Err(e) = run(&message, dump) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(message: &str, dump: bool) -> Result<(), CoreError> {
    let config = CoreConfig::from_env();
    info!("max depth {}", config.max_depth);
    let mut store = Store::with_config(config);
    let ctx = Context::new();

    let call = build_call(&mut store, message)?;
    if dump {
        print!("{}", store.dump(call));
    }

    let ty = infer_type(&mut store, &ctx, call)?;
    let staged = compile(&mut store, &ctx, call)?;
    if dump {
        println!("type: {}", store.show(ty));
        println!("compiled: {}", store.show(staged));
    }

    let result = evaluate(&mut store, &ctx, staged)?;
    println!();
    println!("printf returned {}", store.show(result));
    Ok(())
}

/// `cimport("#include <stdio>").printf(message)`
fn build_call(store: &mut Store, message: &str) -> Result<TermId, CoreError> {
    let cimport = store.builtin("cimport").ok_or(CoreError::NotYetImplemented("cimport"))?;
    let header = store.string("#include <stdio>");
    let module = store.apply(cimport, vec![header]);
    let printf = store.project(module, "printf");
    let text = store.string(message);
    Ok(store.apply(printf, vec![text]))
}
