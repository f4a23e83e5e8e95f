//! JSH Code Generator
//!
//! Turns a parsed JSH program into plain JavaScript. Decorated functions
//! become template functions whose markup is lowered to index-addressed
//! render-instruction calls, and the instructions used are imported once
//! from the runtime module.
//!
//! ```text
//! source → parse → attach_decorators → lower_instructions → print_program
//!                                                   ↓
//!                                   CompilerOutput { code, program, warnings }
//! ```

pub mod decorators;
pub mod instructions;
pub mod printer;

pub use decorators::{attach_decorators, Attachment};
pub use instructions::lower_instructions;
pub use printer::print_program;

use jsh_parser::ast::{Decorator, Program};
use jsh_parser::{ParseError, Parser};
use serde::Deserialize;

/// Knobs for one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Module the instruction functions are imported from.
    pub runtime_module: String,
    /// Name of the parameter prepended to every template function.
    pub render_context: String,
    /// Fail instead of returning warnings.
    pub deny_warnings: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            runtime_module: "fw-x".into(),
            render_context: "$renderContext".into(),
            deny_warnings: false,
        }
    }
}

/// The compiled output of one JSH unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOutput {
    /// Generated JavaScript source.
    pub code: String,
    /// The lowered program `code` was printed from.
    pub program: Program,
    pub warnings: Vec<Warning>,
}

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Warning {
    /// A decorator that never reached a function declaration.
    pub fn dropped_decorator(decorator: &Decorator) -> Self {
        Self {
            message: format!(
                "Decorator @{} is not followed by a function declaration and was ignored",
                decorator.name
            ),
            line: decorator.span.line,
            column: decorator.span.column,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Warning at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

/// Code generation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Codegen error: {message}")]
pub struct CodegenError {
    pub message: String,
}

/// Any failure of the full pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("{} warning(s) treated as errors", .0.len())]
    Warnings(Vec<Warning>),
}

/// Compile JSH source into JavaScript.
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompilerOutput, CompileError> {
    let program = Parser::parse(source)?;

    let Attachment { program, dropped } = attach_decorators(program);
    let warnings: Vec<Warning> = dropped.iter().map(Warning::dropped_decorator).collect();
    if options.deny_warnings && !warnings.is_empty() {
        return Err(CompileError::Warnings(warnings));
    }

    let program = lower_instructions(program, options)?;
    let code = print_program(&program);

    Ok(CompilerOutput {
        code,
        program,
        warnings,
    })
}
