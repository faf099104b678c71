//! # Cli
//!
//! This module contains everything needed for parsing the CLI arguments for
//! the Culebra driver.

use clap::{Parser, ValueEnum};

/// Struct containing the CLI configuration for Culebra.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The path to the Culebra source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// Compile to a native executable instead of interpreting.
    ///
    /// Note: the compiled backend only accepts the statically-typed subset of
    /// the language (no maps, sets, tuples, or nested functions).
    #[arg(long)]
    pub compile: bool,

    /// Emit the LLVM IR module and stop (to stdout, or to -o if given).
    #[arg(long)]
    pub emit_llvm: bool,

    /// The path of the output artifact.
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Keep the intermediate .ll file next to the compiled executable.
    #[arg(long)]
    pub keep_ir: bool,

    /// Skip native optimization (-O0 instead of -O2).
    #[arg(long)]
    pub no_optimize: bool,

    /// The runtime library to link compiled programs against.
    #[arg(long, default_value = "libculebra_runtime.a")]
    pub runtime_lib: std::path::PathBuf,

    /// The native compiler used to assemble and link the emitted IR.
    #[arg(long, default_value = "clang")]
    pub compiler: String,

    /// Whether to dump the token stream (for debugging).
    #[arg(long)]
    pub dump_tokens: bool,

    /// Whether to dump the parsed AST (for debugging).
    #[arg(long)]
    pub dump_ast: bool,

    /// Specify the log level of the driver.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of Culebra.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// A log level, where also warnings are logged.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the driver, e.g.,
    /// which phases run.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the pipeline.
    #[value(alias("3"))]
    Debug,

    /// Log extra information, down to individual phase internals.
    #[value(alias("4"))]
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl From<LogLevel> for log::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
