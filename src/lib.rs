//! # Culebra
//!
//! A small dynamically-typed, indentation-structured programming language
//! with two execution backends: a tree-walking interpreter and an
//! ahead-of-time code generator targeting LLVM IR linked against a small C
//! runtime.

pub mod codegen;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;

use error::Result;
use parser::ast::Program;

/// Lex and parse a source string into a [`Program`].
pub fn parse_source(source: &str) -> Result<Program> {
    let tokens = lexer::Lexer::new(source).lex()?;
    parser::Parser::new(tokens).parse()
}
