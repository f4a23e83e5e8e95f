//! JSH Parser
//!
//! Parses the token stream from `jsh-lexer` into a single `Program` AST in
//! which host-language statements and template nodes (element start/end,
//! self-closing element, decorator) sit side by side.
//!
//! Statement-level parsing, including tags and decorators, lives in
//! `parser`; host-language expressions are parsed by `expr_parser`.

pub mod ast;
pub mod expr_parser;
pub mod parser;

pub use ast::{Expression, Program, Statement};
pub use parser::Parser;

use jsh_lexer::LexerError;

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The source could not be tokenized.
    #[error(transparent)]
    Lexer(#[from] LexerError),

    /// The token stream does not form a valid program.
    #[error("Parse error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn message(&self) -> &str {
        match self {
            ParseError::Lexer(e) => &e.message,
            ParseError::Syntax { message, .. } => message,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::Lexer(e) => e.line,
            ParseError::Syntax { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Lexer(e) => e.column,
            ParseError::Syntax { column, .. } => *column,
        }
    }
}
