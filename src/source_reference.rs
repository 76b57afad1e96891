use std::sync::Arc;

use miette::{NamedSource, SourceCode};

use crate::source::SourceOffset;

#[derive(Debug)]
struct SourceReferenceInner {
    named_source: NamedSource,
    source: String,
}

/// Cheaply-clonable handle to a script's name and full text, shared between
/// the AST and every diagnostic that points into it.
#[derive(Clone, Debug)]
pub struct SourceReference(Arc<SourceReferenceInner>);

impl SourceReference {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let source = source.into();
        SourceReference(Arc::new(SourceReferenceInner {
            named_source: NamedSource::new(name, source.clone()),
            source,
        }))
    }
    pub fn source(&self) -> &str {
        &self.0.source
    }
    /// One-based line/column of a byte offset, for callers that want a
    /// position without rendering a full diagnostic.
    pub fn line_col(&self, offset: SourceOffset) -> (usize, usize) {
        let upto = &self.0.source[..offset.byte_offset().min(self.0.source.len())];
        let line = upto.matches('\n').count() + 1;
        let col = upto.chars().rev().take_while(|&ch| ch != '\n').count() + 1;
        (line, col)
    }
}

impl SourceCode for SourceReference {
    fn read_span<'a>(
        &'a self,
        span: &miette::SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn miette::SpanContents<'a> + 'a>, miette::MietteError> {
        self.0
            .named_source
            .read_span(span, context_lines_before, context_lines_after)
    }
}
