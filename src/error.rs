//! Diagnostics for every stage of the pipeline.
//!
//! All errors share one shape: a kind from the closed taxonomy, a message, and
//! the source position the diagnostic points at. The `Display` output is the
//! user-visible contract of the whole toolchain.

use std::fmt::Display;

use thiserror::Error;

/// A line/column pair, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Indentation,
    Name,
    Type,
    Value,
    Index,
    Key,
    Attribute,
    FileNotFound,
    Compile,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Indentation => "IndentationError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Value => "ValueError",
            ErrorKind::Index => "IndexError",
            ErrorKind::Key => "KeyError",
            ErrorKind::Attribute => "AttributeError",
            ErrorKind::FileNotFound => "FileNotFoundError",
            ErrorKind::Compile => "CompileError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {position}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Position,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, position: Position, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    pub fn syntax(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, position, message)
    }

    pub fn indentation(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Indentation, position, message)
    }

    pub fn name(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, position, message)
    }

    pub fn type_error(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, position, message)
    }

    pub fn value(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, position, message)
    }

    pub fn index(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Index, position, message)
    }

    pub fn key(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Key, position, message)
    }

    pub fn attribute(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Attribute, position, message)
    }

    pub fn file_not_found(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileNotFound, position, message)
    }

    pub fn compile(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Compile, position, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let error = Error::syntax(Position::new(3, 7), "unexpected token ')'");

        assert_eq!(
            error.to_string(),
            "SyntaxError at line 3, col 7: unexpected token ')'"
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Indentation.to_string(), "IndentationError");
        assert_eq!(ErrorKind::FileNotFound.to_string(), "FileNotFoundError");
    }
}
