//! # Culebra
//!
//! The driver binary. It combines the lexer, parser, interpreter, and LLVM IR
//! emitter into a single application: by default a source file is
//! interpreted; `--emit-llvm` and `--compile` select the ahead-of-time path.

mod cli;

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context};
use log::{error, info};

use culebra::interpreter::Interpreter;
use culebra::{codegen, parse_source};

use cli::Cli;

fn main() -> ExitCode {
    let args = Cli::init();

    simple_logger::init_with_level(args.verbosity.clone().into()).expect("logger init");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // diagnostics carry their own `<Kind> at line L, col C: message`
            // format; everything else is an environment failure
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("could not read '{}'", args.file.display()))?;

    if args.dump_tokens {
        let tokens = culebra::lexer::Lexer::new(&source).lex()?;
        info!("tokens:\n{tokens:#?}");
    }

    let program = parse_source(&source)?;

    if args.dump_ast {
        info!("AST:\n{program:#?}");
    }

    if args.emit_llvm {
        let ir = codegen::emit(&program)?;
        match &args.output {
            Some(path) => fs::write(path, ir)
                .with_context(|| format!("could not write '{}'", path.display()))?,
            None => print!("{ir}"),
        }
        return Ok(());
    }

    if args.compile {
        let ir = codegen::emit(&program)?;
        return build_executable(args, &ir);
    }

    info!("interpreting '{}'", args.file.display());
    Interpreter::new().evaluate(&program)?;

    Ok(())
}

/// Write the IR next to the output and hand it to the native toolchain
/// together with the runtime library.
fn build_executable(args: &Cli, ir: &str) -> anyhow::Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.file.with_extension(""));
    let ir_path = output.with_extension("ll");

    fs::write(&ir_path, ir)
        .with_context(|| format!("could not write '{}'", ir_path.display()))?;

    let status = run_native_compiler(args, &ir_path, &output)?;

    if !args.keep_ir {
        let _ = fs::remove_file(&ir_path);
    }

    if !status {
        bail!("native compilation failed");
    }

    info!("compiled '{}'", output.display());
    Ok(())
}

fn run_native_compiler(args: &Cli, ir_path: &PathBuf, output: &PathBuf) -> anyhow::Result<bool> {
    let opt_level = if args.no_optimize { "-O0" } else { "-O2" };

    info!(
        "running {} {opt_level} on '{}'...",
        args.compiler,
        ir_path.display()
    );

    let result = Command::new(&args.compiler)
        .arg(opt_level)
        .arg("-o")
        .arg(output)
        .arg(ir_path)
        .arg(&args.runtime_lib)
        .output()
        .with_context(|| format!("could not invoke '{}'", args.compiler))?;

    let stderr = String::from_utf8_lossy(&result.stderr);
    if !stderr.is_empty() {
        error!("{stderr}");
    }

    Ok(result.status.success())
}
