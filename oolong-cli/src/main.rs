use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser as CliParser, ValueEnum};

use oolong_compiler::{
    CompileOptions, Compiler, Diagnostic, DiagnosticLevel, Lexer, Parser, Registry, Value,
};
use oolong_support::caret_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Ast,
}

#[derive(CliParser)]
#[command(
    name = "oolong",
    version,
    about = "Evaluate oolong expressions.",
    long_about = "Compile and evaluate an oolong expression against typed arguments.\n\
        Positional slots $0..$N bind to the supplied --arg values in order."
)]
struct Cli {
    /// Expression source text, e.g. '$0 + $1'.
    expression: String,

    /// Argument value as JSON (repeatable). Integers become Long, other
    /// numbers Double; strings, booleans, and null map directly.
    #[arg(long = "arg", value_name = "JSON")]
    args: Vec<String>,

    /// Extra namespace searched when resolving bare type names
    /// (repeatable; 'std' is always in scope).
    #[arg(long = "namespace", value_name = "NS")]
    namespaces: Vec<String>,

    /// Dump the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// Emit an intermediate representation instead of evaluating.
    #[arg(long, value_name = "WHAT")]
    emit: Option<Emit>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if cli.emit == Some(Emit::Ast) {
        return emit_ast(&cli.expression);
    }

    let arguments = cli
        .args
        .iter()
        .map(|text| parse_argument(text))
        .collect::<Result<Vec<_>>>()?;

    let mut namespaces = vec!["std".to_string()];
    namespaces.extend(cli.namespaces.iter().cloned());

    let options = CompileOptions {
        param_types: arguments.iter().map(Value::type_of).collect(),
        namespaces,
        dump_tokens: cli.dump_tokens,
        ..CompileOptions::default()
    };

    let mut compiler = Compiler::new(Arc::new(Registry::with_builtins()), options);
    let compiled = match compiler.compile(&cli.expression) {
        Ok(compiled) => compiled,
        Err(_) => {
            for diagnostic in compiler.diagnostics().entries() {
                print_diagnostic(&cli.expression, diagnostic);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    match compiled.invoke(&arguments) {
        Ok(result) => {
            println!("{result}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("error: {error}");
            if let Some(offset) = error.offset() {
                eprintln!("    {}", cli.expression);
                eprintln!("    {}", caret_line(&cli.expression, offset));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn emit_ast(expression: &str) -> Result<ExitCode> {
    let tokens = Lexer::new(expression)
        .tokenize()
        .context("lexing failed")?;
    let parsed = Parser::new(tokens).parse().context("parsing failed")?;
    println!("{parsed:#?}");
    Ok(ExitCode::SUCCESS)
}

/// Map a JSON value from the command line onto a runtime value.
fn parse_argument(text: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("argument '{text}' is not valid JSON"))?;
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(value) => Ok(Value::Bool(value)),
        serde_json::Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Value::Long(value))
            } else if let Some(value) = number.as_f64() {
                Ok(Value::Double(value))
            } else {
                bail!("argument '{number}' does not fit a Long or a Double");
            }
        }
        serde_json::Value::String(value) => Ok(Value::from(value)),
        other => bail!("argument '{other}' must be a scalar, not an array or object"),
    }
}

fn print_diagnostic(source: &str, diagnostic: &Diagnostic) {
    let label = match diagnostic.level {
        DiagnosticLevel::Error => "error",
        DiagnosticLevel::Warning => "warning",
    };
    eprintln!("{label}: {}", diagnostic.message);
    if let Some(offset) = diagnostic.offset {
        eprintln!("    {source}");
        eprintln!("    {}", caret_line(source, offset));
    }
}
