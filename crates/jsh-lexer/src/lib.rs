//! JSH Lexer
//!
//! Tokenizes `.jsh` source: JavaScript statements interleaved with markup
//! tags (`<h1>`, `</h1>`, `<br/>`), attribute names (`href`, `[prop]`,
//! `(event)`, `$cmpt`) and decorator markers (`@Template()`).
//!
//! Tokenization is context sensitive. A mode stack tracks whether the cursor
//! is inside tag content or in statement/expression territory, because `<`
//! and identifier-like runs mean different things in each.
//!
//! # Example
//!
//! ```
//! use jsh_lexer::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("<br/>").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::TagStart);
//! assert_eq!(tokens[1].kind, TokenKind::Name("br".into()));
//! ```

pub mod mode;
pub mod scanner;
pub mod token;

pub use mode::{Mode, ModeStack};
pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lexer error at line {line}, column {column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
