pub mod ast;
mod interpreter;
mod parser;
mod scanner;
mod source;
mod source_reference;
mod value;

pub use interpreter::{
    Context, FsLoader, InputSource, Interpreter, LineInput, Loader, ReadlineInput, RuntimeError,
};
pub use parser::{Parser, ParserError};
pub use scanner::{Scanner, ScannerError, Token, TokenType, TokenTypeName};
pub use source::{SourceOffset, SourceSpan};
pub use source_reference::SourceReference;
pub use value::Value;

use ast::Program;
use miette::Diagnostic;
use thiserror::Error;

/// A fatal parse-time failure: either the scanner or the parser rejected the
/// script. Carries the position of the first unmatched construct.
#[derive(Error, Diagnostic, Debug)]
pub enum SyntaxError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Scan(#[from] ScannerError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParserError),
}

/// Parses a whole script into a program, stopping at the first error.
pub fn parse(name: impl Into<String>, source: &str) -> Result<Program, SyntaxError> {
    let source_reference = SourceReference::new(name, source);
    let tokens = Scanner::new(source, source_reference.clone())
        .collect::<Result<Vec<_>, ScannerError>>()?;
    Ok(Parser::parse(tokens.into_iter(), source_reference)?)
}
