use std::io;

use miette::Diagnostic;
use thiserror::Error;

use crate::{source::SourceSpan, source_reference::SourceReference, SyntaxError};

#[derive(Error, Diagnostic, Debug)]
pub enum RuntimeError {
    #[error("Unbound template variable $[[{name}]]")]
    UnboundTemplateVariable {
        name: String,
        #[label("This text refers to {name:?}, which is not bound")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Could not load script {path:?}")]
    LoadFailure {
        path: String,
        #[source]
        cause: io::Error,
        #[label("RUN was called here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Syntax error in script {path:?} run from here")]
    SubprogramSyntax {
        path: String,
        #[source]
        cause: Box<SyntaxError>,
        #[label("RUN was called here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("The input source closed while a choice was pending")]
    InputClosed,
    #[error("I/O error")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// An unbound template variable only fails its own display operation;
    /// the engine logs it and moves on. Everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RuntimeError::UnboundTemplateVariable { .. })
    }
}
