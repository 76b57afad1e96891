use std::fmt::Display;

use crate::{source::SourceSpan, source_reference::SourceReference, value::Value};

/// An ordered, immutable-after-parse sequence of top-level blocks.
#[derive(Debug, Clone)]
pub struct Program {
    pub blocks: Vec<Block>,
    pub source_reference: SourceReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub source_span: SourceSpan,
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// The closed set of node kinds the parser produces and the interpreter
/// dispatches over. Adding a kind is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Choices(ChoicesBlock),
    Effects(EffectsBlock),
    If(IfStatement),
    Var(VariableDefinition),
    Call(FunctionCall),
}

impl Block {
    /// The label this block can be jumped to by, if any. Only labeled
    /// top-level blocks are GOTO targets.
    pub fn label(&self) -> Option<&Identifier> {
        match self {
            Block::Text(block) => block.label.as_ref(),
            Block::Choices(block) => block.label.as_ref(),
            Block::Effects(block) => block.label.as_ref(),
            Block::If(_) | Block::Var(_) | Block::Call(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub label: Option<Identifier>,
    pub source_span: SourceSpan,
}

impl TextBlock {
    pub fn new(raw: &str, label: Option<Identifier>, source_span: SourceSpan) -> Self {
        Self {
            text: normalize_text(raw),
            label,
            source_span,
        }
    }
}

/// Trims every line, drops the blank ones, and rejoins with single newlines,
/// so script authors can indent prose freely. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectsBlock {
    pub effects: Vec<Effect>,
    pub label: Option<Identifier>,
}

/// A mutation applied in written order: a variable binding or a call to a
/// registered function.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Var(VariableDefinition),
    Call(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceBlock {
    pub description: String,
    pub effects: Vec<Effect>,
    pub text: Option<TextBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoicesBlock {
    /// Always non-empty; a `CHOICES` block without choices is a parse error.
    pub choices: Vec<ChoiceBlock>,
    pub label: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub predicate: Identifier,
    pub then_blocks: Vec<Block>,
    pub else_blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub identifier: Identifier,
    pub value: Value,
}

/// A function-call argument. Identifier arguments are deliberately kept raw
/// rather than resolved against the run-time context; `GOTO(start)` names the
/// label `start`, not whatever `start` happens to be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Value),
    Identifier(String),
}

impl Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Literal(value) => Display::fmt(value, f),
            Argument::Identifier(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Identifier,
    pub argument: Argument,
    pub source_span: SourceSpan,
}
