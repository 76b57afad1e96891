use miette::Diagnostic;
use std::iter::Peekable;
use thiserror::Error;

use crate::{
    ast::*,
    scanner::{Token, TokenType, TokenTypeName},
    source::SourceSpan,
    source_reference::SourceReference,
    value::Value,
};

#[derive(Error, Diagnostic, Debug)]
pub enum ParserError {
    #[error("Unexpected token")]
    UnexpectedToken {
        actual: TokenTypeName,
        expected: TokenTypeName,
        #[label("Found {actual:?} instead of {expected:?}")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Expected a block")]
    ExpectedBlock {
        actual: TokenTypeName,
        #[label("Found {actual:?} instead of TEXT, EFFECTS, CHOICES, or IF")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Unknown block header {word:?}")]
    UnknownHeader {
        word: String,
        #[label("This is not a block keyword, a variable definition, or a function call")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Expected a literal (true, false, a number, or a quoted string)")]
    ExpectedLiteral {
        actual: TokenTypeName,
        #[label("Found {actual:?} instead")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Labels must be identifiers")]
    InvalidLabel {
        text: String,
        #[label("{text:?} contains characters outside letters, `_`, and `.`")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("A CHOICES block needs at least one CHOICE")]
    EmptyChoices {
        #[label("This block has no choices")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("The script is empty")]
    #[diagnostic(help("A script needs at least one top-level block"))]
    EmptyDocument,
}

pub struct Parser<Stream: Iterator<Item = Token>> {
    token_stream: Peekable<Stream>,
    source_reference: SourceReference,
    current_token: Option<Token>,
}

impl<Stream: Iterator<Item = Token>> Parser<Stream> {
    /// Parses a whole script. The first syntax error is fatal; there is no
    /// error recovery.
    pub fn parse(
        token_stream: Stream,
        source_reference: SourceReference,
    ) -> Result<Program, ParserError> {
        let mut parser = Parser {
            token_stream: token_stream.peekable(),
            source_reference,
            current_token: None,
        };
        parser.parse_program()
    }

    fn parse_program(&mut self) -> Result<Program, ParserError> {
        let mut blocks = Vec::new();
        while !matches!(
            self.token_stream.peek(),
            None | Some(Token {
                token_type: TokenType::Eof,
                ..
            })
        ) {
            blocks.push(self.parse_block()?);
        }
        if blocks.is_empty() {
            return Err(ParserError::EmptyDocument);
        }
        Ok(Program {
            blocks,
            source_reference: self.source_reference.clone(),
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParserError> {
        match self.peek_token_type() {
            Some(TokenType::Text) => Ok(Block::Text(self.parse_text_block()?)),
            Some(TokenType::Effects) => Ok(Block::Effects(self.parse_effects_block()?)),
            Some(TokenType::Choices) => Ok(Block::Choices(self.parse_choices_block()?)),
            Some(TokenType::If) => Ok(Block::If(self.parse_if_statement()?)),
            Some(TokenType::Identifier(_)) => {
                let identifier = self.parse_identifier()?;
                match self.peek_token_type() {
                    Some(TokenType::Equal) => {
                        Ok(Block::Var(self.parse_variable_definition(identifier)?))
                    }
                    Some(TokenType::OpenParen) => {
                        Ok(Block::Call(self.parse_function_call(identifier)?))
                    }
                    _ => Err(ParserError::UnknownHeader {
                        word: identifier.name,
                        found_at: identifier.source_span,
                        source_code: self.source_reference.clone(),
                    }),
                }
            }
            _ => {
                let token = self.peek_or_eof();
                Err(ParserError::ExpectedBlock {
                    actual: (&token.token_type).into(),
                    found_at: token.span,
                    source_code: self.source_reference.clone(),
                })
            }
        }
    }

    fn parse_text_block(&mut self) -> Result<TextBlock, ParserError> {
        let header_span = self.consume_token_or_default_error(TokenTypeName::Text)?.span;
        let label = self.parse_optional_label()?;
        self.consume_token_or_default_error(TokenTypeName::OpenBrace)?;
        let raw = match self.consume_match(|token| match &token.token_type {
            TokenType::RawText(raw) => Some(raw.clone()),
            _ => None,
        }) {
            Some(raw) => raw,
            None => return Err(self.default_error(TokenTypeName::RawText)),
        };
        let close_span = self
            .consume_token_or_default_error(TokenTypeName::CloseBrace)?
            .span;
        Ok(TextBlock::new(
            &raw,
            label,
            SourceSpan::range(header_span.start(), close_span.end()),
        ))
    }

    fn parse_effects_block(&mut self) -> Result<EffectsBlock, ParserError> {
        self.consume_token_or_default_error(TokenTypeName::Effects)?;
        let label = self.parse_optional_label()?;
        self.consume_token_or_default_error(TokenTypeName::OpenBrace)?;
        let mut effects = Vec::new();
        while matches!(self.peek_token_type(), Some(TokenType::Identifier(_))) {
            effects.push(self.parse_effect()?);
        }
        self.consume_token_or_default_error(TokenTypeName::CloseBrace)?;
        Ok(EffectsBlock { effects, label })
    }

    fn parse_effect(&mut self) -> Result<Effect, ParserError> {
        let identifier = self.parse_identifier()?;
        match self.peek_token_type() {
            Some(TokenType::Equal) => Ok(Effect::Var(self.parse_variable_definition(identifier)?)),
            Some(TokenType::OpenParen) => Ok(Effect::Call(self.parse_function_call(identifier)?)),
            _ => Err(self.default_error(TokenTypeName::Equal)),
        }
    }

    fn parse_variable_definition(
        &mut self,
        identifier: Identifier,
    ) -> Result<VariableDefinition, ParserError> {
        self.consume_token_or_default_error(TokenTypeName::Equal)?;
        let value = self.parse_literal()?;
        Ok(VariableDefinition { identifier, value })
    }

    fn parse_function_call(&mut self, name: Identifier) -> Result<FunctionCall, ParserError> {
        self.consume_token_or_default_error(TokenTypeName::OpenParen)?;
        let argument = match self.peek_token_type() {
            Some(TokenType::Identifier(_)) => Argument::Identifier(self.parse_identifier()?.name),
            _ => Argument::Literal(self.parse_literal()?),
        };
        let close_span = self
            .consume_token_or_default_error(TokenTypeName::CloseParen)?
            .span;
        Ok(FunctionCall {
            source_span: SourceSpan::range(name.source_span.start(), close_span.end()),
            name,
            argument,
        })
    }

    fn parse_choices_block(&mut self) -> Result<ChoicesBlock, ParserError> {
        let header_span = self
            .consume_token_or_default_error(TokenTypeName::Choices)?
            .span;
        let label = self.parse_optional_label()?;
        self.consume_token_or_default_error(TokenTypeName::OpenBrace)?;
        let mut choices = Vec::new();
        while matches!(self.peek_token_type(), Some(TokenType::Choice)) {
            choices.push(self.parse_choice_block()?);
        }
        self.consume_token_or_default_error(TokenTypeName::CloseBrace)?;
        if choices.is_empty() {
            return Err(ParserError::EmptyChoices {
                found_at: header_span,
                source_code: self.source_reference.clone(),
            });
        }
        Ok(ChoicesBlock { choices, label })
    }

    fn parse_choice_block(&mut self) -> Result<ChoiceBlock, ParserError> {
        self.consume_token_or_default_error(TokenTypeName::Choice)?;
        // The block grammar admits a label here too, but a CHOICE is not
        // addressable by GOTO, so any label is parsed and dropped.
        self.parse_optional_label()?;
        self.consume_token_or_default_error(TokenTypeName::OpenBrace)?;
        let description = match self.consume_match(|token| match &token.token_type {
            TokenType::BracketText(text) => Some(text.clone()),
            _ => None,
        }) {
            Some(text) => text,
            None => return Err(self.default_error(TokenTypeName::BracketText)),
        };
        let effects = if matches!(self.peek_token_type(), Some(TokenType::Effects)) {
            self.parse_effects_block()?.effects
        } else {
            Vec::new()
        };
        let text = if matches!(self.peek_token_type(), Some(TokenType::Text)) {
            Some(self.parse_text_block()?)
        } else {
            None
        };
        self.consume_token_or_default_error(TokenTypeName::CloseBrace)?;
        Ok(ChoiceBlock {
            description,
            effects,
            text,
        })
    }

    fn parse_if_statement(&mut self) -> Result<IfStatement, ParserError> {
        self.consume_token_or_default_error(TokenTypeName::If)?;
        let predicate = self.parse_identifier()?;
        let then_blocks = self.parse_block_body()?;
        let else_blocks = if self
            .consume_match(|token| matches!(token.token_type, TokenType::Else).then_some(()))
            .is_some()
        {
            self.parse_block_body()?
        } else {
            Vec::new()
        };
        Ok(IfStatement {
            predicate,
            then_blocks,
            else_blocks,
        })
    }

    /// `{` one-or-more blocks `}`, as used by IF and ELSE bodies.
    fn parse_block_body(&mut self) -> Result<Vec<Block>, ParserError> {
        self.consume_token_or_default_error(TokenTypeName::OpenBrace)?;
        let mut blocks = Vec::new();
        while !matches!(
            self.peek_token_type(),
            Some(TokenType::CloseBrace | TokenType::Eof) | None
        ) {
            blocks.push(self.parse_block()?);
        }
        if blocks.is_empty() {
            let token = self.peek_or_eof();
            return Err(ParserError::ExpectedBlock {
                actual: (&token.token_type).into(),
                found_at: token.span,
                source_code: self.source_reference.clone(),
            });
        }
        self.consume_token_or_default_error(TokenTypeName::CloseBrace)?;
        Ok(blocks)
    }

    fn parse_optional_label(&mut self) -> Result<Option<Identifier>, ParserError> {
        let label = match self.consume_match(|token| match &token.token_type {
            TokenType::BracketText(text) => Some((text.clone(), token.span)),
            _ => None,
        }) {
            Some(label) => label,
            None => return Ok(None),
        };
        let (text, span) = label;
        if text.is_empty() || !text.chars().all(|ch| ch.is_ascii_alphabetic() || ch == '_' || ch == '.') {
            return Err(ParserError::InvalidLabel {
                text,
                found_at: span,
                source_code: self.source_reference.clone(),
            });
        }
        Ok(Some(Identifier {
            name: text,
            source_span: span,
        }))
    }

    fn parse_literal(&mut self) -> Result<Value, ParserError> {
        // Quoted strings run through the same literal-typing rule as bare
        // tokens, so `x = "5"` binds the integer 5.
        let literal = self.consume_match(|token| match &token.token_type {
            TokenType::True => Some(Value::Boolean(true)),
            TokenType::False => Some(Value::Boolean(false)),
            TokenType::Number(number) => Some(Value::Integer(*number)),
            TokenType::String(string) => Some(Value::from_bare_token(string)),
            _ => None,
        });
        match literal {
            Some(value) => Ok(value),
            None => {
                let token = self.peek_or_eof();
                Err(ParserError::ExpectedLiteral {
                    actual: (&token.token_type).into(),
                    found_at: token.span,
                    source_code: self.source_reference.clone(),
                })
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<Identifier, ParserError> {
        match self.consume_match(|token| match &token.token_type {
            TokenType::Identifier(name) => Some(Identifier {
                name: name.clone(),
                source_span: token.span,
            }),
            _ => None,
        }) {
            Some(identifier) => Ok(identifier),
            None => Err(self.default_error(TokenTypeName::Identifier)),
        }
    }

    fn advance(&mut self) -> bool {
        match self.token_stream.next() {
            Some(token) => {
                self.current_token = Some(token);
                true
            }
            None => false,
        }
    }

    fn peek_or_eof(&mut self) -> &Token {
        self.token_stream
            .peek()
            .or(self.current_token.as_ref())
            .expect("token stream must not start empty")
    }

    fn peek_token_type(&mut self) -> Option<&TokenType> {
        self.token_stream.peek().map(|token| &token.token_type)
    }

    fn consume_match<T, F: Fn(&Token) -> Option<T>>(&mut self, check: F) -> Option<T> {
        match self.token_stream.peek() {
            None => None,
            Some(token) => match check(token) {
                Some(value) => {
                    self.advance();
                    Some(value)
                }
                None => None,
            },
        }
    }

    fn consume_token_or_default_error(
        &mut self,
        expected: TokenTypeName,
    ) -> Result<&Token, ParserError> {
        match self.token_stream.peek() {
            Some(token) if TokenTypeName::from(&token.token_type) == expected => {
                self.advance();
                Ok(self.current_token.as_ref().unwrap())
            }
            _ => Err(self.default_error(expected)),
        }
    }

    fn default_error(&mut self, expected: TokenTypeName) -> ParserError {
        let source_code = self.source_reference.clone();
        let token = self.peek_or_eof();
        ParserError::UnexpectedToken {
            actual: (&token.token_type).into(),
            expected,
            found_at: token.span,
            source_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Program, ParserError> {
        let source_reference = SourceReference::new("test", source);
        let tokens = Scanner::new(source, source_reference.clone())
            .collect::<Result<Vec<_>, _>>()
            .expect("scan error");
        Parser::parse(tokens.into_iter(), source_reference)
    }

    #[test]
    fn top_level_node_count_matches_source_order() {
        let program = parse(concat!(
            "TEXT { one }\n",
            "EFFECTS { x = 1 }\n",
            "TEXT { two }\n",
            "CHOICES { CHOICE { [go] } }\n",
        ))
        .unwrap();
        assert_eq!(program.blocks.len(), 4);
        assert!(matches!(program.blocks[0], Block::Text(_)));
        assert!(matches!(program.blocks[1], Block::Effects(_)));
        assert!(matches!(program.blocks[2], Block::Text(_)));
        assert!(matches!(program.blocks[3], Block::Choices(_)));
    }

    #[test]
    fn text_block_is_normalized_and_labeled() {
        let program = parse("TEXT [intro] {\n   You wake up. \n\n  It is dark. \n}").unwrap();
        match &program.blocks[0] {
            Block::Text(text) => {
                assert_eq!(text.text, "You wake up.\nIt is dark.");
                assert_eq!(text.label.as_ref().unwrap().name, "intro");
            }
            other => panic!("expected a text block, got {:?}", other),
        }
    }

    #[test]
    fn choices_with_effects_and_text() {
        let program = parse(concat!(
            "CHOICES [fork] {\n",
            "  CHOICE { [Go left] EFFECTS { dir = \"left\" ring(bell) } TEXT { You go left. } }\n",
            "  CHOICE { [Go right] }\n",
            "}\n",
        ))
        .unwrap();
        let choices = match &program.blocks[0] {
            Block::Choices(choices) => choices,
            other => panic!("expected choices, got {:?}", other),
        };
        assert_eq!(choices.label.as_ref().unwrap().name, "fork");
        assert_eq!(choices.choices.len(), 2);
        let first = &choices.choices[0];
        assert_eq!(first.description, "Go left");
        assert_eq!(first.effects.len(), 2);
        assert!(matches!(
            &first.effects[0],
            Effect::Var(VariableDefinition { value: Value::Text(v), .. }) if v == "left"
        ));
        assert!(matches!(
            &first.effects[1],
            Effect::Call(FunctionCall { argument: Argument::Identifier(arg), .. }) if arg == "bell"
        ));
        assert_eq!(first.text.as_ref().unwrap().text, "You go left.");
        assert!(choices.choices[1].effects.is_empty());
        assert!(choices.choices[1].text.is_none());
    }

    #[test]
    fn if_with_else_and_nesting() {
        let program = parse(concat!(
            "IF has_key {\n",
            "  TEXT { The door opens. }\n",
            "  IF alarmed { EFFECTS { alarm = true } } \n",
            "} ELSE {\n",
            "  TEXT { Locked. }\n",
            "}\n",
        ))
        .unwrap();
        let if_statement = match &program.blocks[0] {
            Block::If(if_statement) => if_statement,
            other => panic!("expected if, got {:?}", other),
        };
        assert_eq!(if_statement.predicate.name, "has_key");
        assert_eq!(if_statement.then_blocks.len(), 2);
        assert!(matches!(if_statement.then_blocks[1], Block::If(_)));
        assert_eq!(if_statement.else_blocks.len(), 1);
    }

    #[test]
    fn bare_definitions_and_calls_at_top_level() {
        let program = parse("score = 0\nGOTO(start)\n").unwrap();
        assert!(matches!(
            &program.blocks[0],
            Block::Var(VariableDefinition { value: Value::Integer(0), .. })
        ));
        assert!(matches!(
            &program.blocks[1],
            Block::Call(FunctionCall { argument: Argument::Identifier(arg), .. }) if arg == "start"
        ));
    }

    #[test]
    fn literal_typing_applies_to_quoted_strings() {
        let program = parse("EFFECTS { a = \"5\" b = \"true\" c = \"left\" }").unwrap();
        let effects = match &program.blocks[0] {
            Block::Effects(block) => &block.effects,
            other => panic!("expected effects, got {:?}", other),
        };
        let values: Vec<_> = effects
            .iter()
            .map(|effect| match effect {
                Effect::Var(def) => def.value.clone(),
                other => panic!("expected variable definitions, got {:?}", other),
            })
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Integer(5),
                Value::Boolean(true),
                Value::Text("left".into())
            ]
        );
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(matches!(parse(""), Err(ParserError::EmptyDocument)));
        assert!(matches!(parse("  \n "), Err(ParserError::EmptyDocument)));
    }

    #[test]
    fn empty_choices_is_an_error() {
        assert!(matches!(
            parse("CHOICES { }"),
            Err(ParserError::EmptyChoices { .. })
        ));
    }

    #[test]
    fn unknown_header_is_an_error() {
        assert!(matches!(
            parse("SCENE { }"),
            Err(ParserError::UnknownHeader { word, .. }) if word == "SCENE"
        ));
    }

    #[test]
    fn missing_close_brace_is_an_error() {
        assert!(matches!(
            parse("EFFECTS { x = 1 "),
            Err(ParserError::UnexpectedToken {
                expected: TokenTypeName::CloseBrace,
                ..
            })
        ));
    }

    #[test]
    fn label_must_be_an_identifier() {
        assert!(matches!(
            parse("TEXT [not a label!] { hi }"),
            Err(ParserError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn variable_value_must_be_a_literal() {
        assert!(matches!(
            parse("EFFECTS { x = y }"),
            Err(ParserError::ExpectedLiteral { .. })
        ));
    }

    #[test]
    fn empty_if_body_is_an_error() {
        assert!(matches!(
            parse("IF ready { }"),
            Err(ParserError::ExpectedBlock { .. })
        ));
    }
}
