use clap::{Args, Parser, Subcommand};
use jsh_codegen::{CompileError, CompileOptions, CompilerOutput};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jsh")]
#[command(about = "JSH template compiler: decorated functions to render instructions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .jsh file to JavaScript
    Build {
        /// Input .jsh file
        path: String,

        /// Output file (defaults to <stem>.js next to the input)
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Check a .jsh file for errors without generating output
    Check {
        /// Input .jsh file
        path: String,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Print the parsed AST as JSON
    Ast {
        /// Input .jsh file
        path: String,

        /// Attach decorators to their functions before printing
        #[arg(long)]
        attach: bool,
    },
}

#[derive(Args)]
struct OptionArgs {
    /// Module the instructions are imported from
    #[arg(long, default_value = "fw-x")]
    runtime: String,

    /// Name of the render context parameter
    #[arg(long, default_value = "$renderContext")]
    context: String,

    /// Fail on warnings
    #[arg(long)]
    deny_warnings: bool,
}

impl OptionArgs {
    fn to_options(&self) -> CompileOptions {
        CompileOptions {
            runtime_module: self.runtime.clone(),
            render_context: self.context.clone(),
            deny_warnings: self.deny_warnings,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build { path, out, options } => cmd_build(&path, out, &options.to_options()),
        Command::Check { path, options } => cmd_check(&path, &options.to_options()),
        Command::Ast { path, attach } => cmd_ast(&path, attach),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

/// Run the full pipeline, reporting warnings and exiting on error.
fn compile_or_exit(path: &str, options: &CompileOptions) -> CompilerOutput {
    let source = read_source(path);

    match jsh_codegen::compile(&source, options) {
        Ok(output) => {
            for warning in &output.warnings {
                eprintln!("{path}: {warning}");
            }
            output
        }
        Err(CompileError::Warnings(warnings)) => {
            for warning in &warnings {
                eprintln!("{path}: {warning}");
            }
            eprintln!("Error: {} warning(s) treated as errors", warnings.len());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}

/// `<dir>/<stem>.js` next to the input.
fn default_output_path(path: &str) -> PathBuf {
    let p = Path::new(path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let dir = p.parent().unwrap_or(Path::new("."));
    dir.join(format!("{stem}.js"))
}

fn cmd_build(path: &str, out: Option<PathBuf>, options: &CompileOptions) {
    let output = compile_or_exit(path, options);

    let js_path = out.unwrap_or_else(|| default_output_path(path));
    if js_path == Path::new(path) {
        eprintln!("Error: output would overwrite the input file {path}");
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&js_path, &output.code) {
        eprintln!("Error writing {}: {e}", js_path.display());
        std::process::exit(1);
    }

    eprintln!("Built: {}", js_path.display());
}

fn cmd_check(path: &str, options: &CompileOptions) {
    compile_or_exit(path, options);
    eprintln!("OK: {path}");
}

fn cmd_ast(path: &str, attach: bool) {
    let source = read_source(path);

    let mut program = match jsh_parser::Parser::parse(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };

    if attach {
        let attachment = jsh_codegen::attach_decorators(program);
        for decorator in &attachment.dropped {
            eprintln!("{path}: {}", jsh_codegen::Warning::dropped_decorator(decorator));
        }
        program = attachment.program;
    }

    match serde_json::to_string_pretty(&program) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing AST: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("src/card.jsh"),
            PathBuf::from("src/card.js")
        );
        assert_eq!(default_output_path("card.jsh"), PathBuf::from("card.js"));
    }

    #[test]
    fn test_build_flags() {
        let cli = Cli::try_parse_from([
            "jsh",
            "build",
            "card.jsh",
            "-o",
            "dist/card.js",
            "--runtime",
            "@app/rt",
            "--deny-warnings",
        ])
        .unwrap();

        match cli.command {
            Command::Build { path, out, options } => {
                assert_eq!(path, "card.jsh");
                assert_eq!(out, Some(PathBuf::from("dist/card.js")));
                assert_eq!(
                    options.to_options(),
                    CompileOptions {
                        runtime_module: "@app/rt".into(),
                        render_context: "$renderContext".into(),
                        deny_warnings: true,
                    }
                );
            }
            _ => panic!("Expected build command"),
        }
    }

    #[test]
    fn test_check_defaults_match_library() {
        let cli = Cli::try_parse_from(["jsh", "check", "card.jsh"]).unwrap();
        match cli.command {
            Command::Check { options, .. } => {
                assert_eq!(options.to_options(), CompileOptions::default());
            }
            _ => panic!("Expected check command"),
        }
    }

    #[test]
    fn test_ast_attach_flag() {
        let cli = Cli::try_parse_from(["jsh", "ast", "card.jsh", "--attach"]).unwrap();
        assert!(matches!(cli.command, Command::Ast { attach: true, .. }));
    }
}
