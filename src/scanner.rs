use crate::{
    source::{SourceOffset, SourceSpan},
    source_reference::SourceReference,
};
use miette::Diagnostic;
use std::{iter::Peekable, num::ParseIntError, str::CharIndices};
use strum::EnumDiscriminants;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ScannerError {
    #[error("Unexpected character: {character:?}")]
    UnexpectedCharacter {
        character: char,
        #[label("Character found here")]
        at: SourceOffset,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Unterminated string")]
    UnterminatedString {
        #[label("String starts here")]
        at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Unterminated bracket text, expected a closing `]`")]
    UnterminatedBracket {
        #[label("Opening bracket here")]
        at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Unterminated TEXT block, expected a closing `}}`")]
    UnterminatedTextBlock {
        #[label("Text runs to the end of the script")]
        at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Integer literal is too large")]
    IntegerOutOfRange {
        #[label("This number does not fit a 64-bit integer")]
        at: SourceSpan,
        #[source]
        cause: ParseIntError,
        #[source_code]
        source_code: SourceReference,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub span: SourceSpan,
    pub token_type: TokenType,
}

impl Token {
    pub fn new(span: SourceSpan, token_type: TokenType) -> Self {
        Self { span, token_type }
    }
}

#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(TokenTypeName))]
pub enum TokenType {
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Equal,
    Text,
    Effects,
    Choice,
    Choices,
    If,
    Else,
    True,
    False,
    Number(i64),
    String(String),
    /// `[` … `]` content with escapes applied. Serves both block labels and
    /// choice descriptions; the parser decides which from position.
    BracketText(String),
    /// The raw body of a `TEXT` block, everything between its braces.
    RawText(String),
    Identifier(String),
    Eof,
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '.'
}

/// What the next call to `next` should produce. `TEXT` bodies are not token
/// soup: once the scanner has seen a `TEXT` keyword and its opening brace, it
/// captures everything up to the closing brace as a single `RawText` token.
enum Mode {
    Normal,
    RawBody,
}

pub struct Scanner<'a> {
    source: &'a str,
    source_reference: SourceReference,
    chars: Peekable<CharIndices<'a>>,
    at_end: bool,
    current_offset: usize,
    current_token_start_offset: usize,
    mode: Mode,
    raw_body_pending: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, source_reference: SourceReference) -> Self {
        Self {
            source,
            source_reference,
            chars: source.char_indices().peekable(),
            at_end: false,
            current_offset: 0,
            current_token_start_offset: 0,
            mode: Mode::Normal,
            raw_body_pending: false,
        }
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((offset, ch)) = self.chars.next() {
            self.current_offset = offset;
            Some(ch)
        } else {
            self.at_end = true;
            None
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn advance_while<F: Fn(char) -> bool>(&mut self, check: F) {
        loop {
            match self.peek() {
                Some(ch) if check(ch) => {
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn begin_token(&mut self) {
        self.current_token_start_offset = self.current_offset;
    }

    fn yield_token(&self, token_type: TokenType) -> Token {
        Token::new(
            (self.current_token_start_offset..=self.current_offset).into(),
            token_type,
        )
    }

    fn scan_raw_body(&mut self) -> Result<Token, ScannerError> {
        let start = self.current_offset + 1;
        let mut body = String::new();
        loop {
            match self.peek() {
                Some('}') => {
                    self.mode = Mode::Normal;
                    return Ok(Token::new((start..start + body.len()).into(), TokenType::RawText(body)));
                }
                Some(_) => {
                    // advance() cannot return None after a successful peek
                    body.push(self.advance().unwrap());
                }
                None => {
                    self.at_end = true;
                    return Err(ScannerError::UnterminatedTextBlock {
                        at: (start..self.source.len()).into(),
                        source_code: self.source_reference.clone(),
                    });
                }
            }
        }
    }

    fn scan_bracket_text(&mut self) -> Result<Token, ScannerError> {
        let mut text = String::new();
        loop {
            match self.advance() {
                Some(']') => return Ok(self.yield_token(TokenType::BracketText(text))),
                Some('\\') => match self.advance() {
                    Some(ch) => text.push(ch),
                    None => break,
                },
                Some(ch) => text.push(ch),
                None => break,
            }
        }
        Err(ScannerError::UnterminatedBracket {
            at: (self.current_token_start_offset..self.source.len()).into(),
            source_code: self.source_reference.clone(),
        })
    }

    fn scan_string(&mut self) -> Result<Token, ScannerError> {
        let mut string_value = String::new();
        loop {
            string_value.push(match self.advance() {
                Some('"') => return Ok(self.yield_token(TokenType::String(string_value))),
                Some('\\') => match self.advance() {
                    Some('n') => '\n',
                    Some('r') => '\r',
                    Some('t') => '\t',
                    Some('\\') => '\\',
                    Some('"') => '"',
                    Some(ch) => ch,
                    None => break,
                },
                // Strings are single-line; a raw newline means the closing
                // quote is missing.
                Some('\n') | None => break,
                Some(ch) => ch,
            });
        }
        Err(ScannerError::UnterminatedString {
            at: (self.current_token_start_offset..=self.current_offset).into(),
            source_code: self.source_reference.clone(),
        })
    }

    fn scan_number(&mut self) -> Result<Token, ScannerError> {
        let start = self.current_offset;
        self.advance_while(|ch| ch.is_ascii_digit());
        let digits = &self.source[start..=self.current_offset];
        match digits.parse::<i64>() {
            Ok(number) => Ok(self.yield_token(TokenType::Number(number))),
            Err(cause) => Err(ScannerError::IntegerOutOfRange {
                at: (start..=self.current_offset).into(),
                cause,
                source_code: self.source_reference.clone(),
            }),
        }
    }

    fn scan_word(&mut self) -> Token {
        let start = self.current_offset;
        self.advance_while(is_identifier_char);
        let word = &self.source[start..=self.current_offset];
        match word {
            "TEXT" => {
                self.raw_body_pending = true;
                self.yield_token(TokenType::Text)
            }
            "EFFECTS" => self.yield_token(TokenType::Effects),
            "CHOICE" => self.yield_token(TokenType::Choice),
            "CHOICES" => self.yield_token(TokenType::Choices),
            "IF" => self.yield_token(TokenType::If),
            "ELSE" => self.yield_token(TokenType::Else),
            "true" => self.yield_token(TokenType::True),
            "false" => self.yield_token(TokenType::False),
            _ => self.yield_token(TokenType::Identifier(word.to_string())),
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_end {
            return None;
        }

        if let Mode::RawBody = self.mode {
            return Some(self.scan_raw_body());
        }

        self.advance_while(|ch| ch.is_whitespace());

        let next = self.advance();
        self.begin_token();
        Some(match next {
            None => Ok(self.yield_token(TokenType::Eof)),
            Some('{') => {
                if self.raw_body_pending {
                    self.raw_body_pending = false;
                    self.mode = Mode::RawBody;
                }
                Ok(self.yield_token(TokenType::OpenBrace))
            }
            Some('}') => Ok(self.yield_token(TokenType::CloseBrace)),
            Some('(') => Ok(self.yield_token(TokenType::OpenParen)),
            Some(')') => Ok(self.yield_token(TokenType::CloseParen)),
            Some('=') => Ok(self.yield_token(TokenType::Equal)),
            Some('[') => self.scan_bracket_text(),
            Some('"') => self.scan_string(),
            Some(ch) if ch.is_ascii_digit() => self.scan_number(),
            Some(ch) if is_identifier_char(ch) => Ok(self.scan_word()),
            Some(ch) => Err(ScannerError::UnexpectedCharacter {
                character: ch,
                at: self.current_offset.into(),
                source_code: self.source_reference.clone(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<TokenType> {
        Scanner::new(source, SourceReference::new("test", source))
            .map(|token| token.expect("scan error").token_type)
            .collect()
    }

    #[test]
    fn scans_effects_tokens() {
        assert_eq!(
            scan("EFFECTS { dir = \"left\" visited = true count = 3 ring() }"),
            vec![
                TokenType::Effects,
                TokenType::OpenBrace,
                TokenType::Identifier("dir".into()),
                TokenType::Equal,
                TokenType::String("left".into()),
                TokenType::Identifier("visited".into()),
                TokenType::Equal,
                TokenType::True,
                TokenType::Identifier("count".into()),
                TokenType::Equal,
                TokenType::Number(3),
                TokenType::Identifier("ring".into()),
                TokenType::OpenParen,
                TokenType::CloseParen,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn text_body_is_one_raw_token() {
        assert_eq!(
            scan("TEXT [intro] {\n  You wake up.\n\n  It is dark.\n}"),
            vec![
                TokenType::Text,
                TokenType::BracketText("intro".into()),
                TokenType::OpenBrace,
                TokenType::RawText("\n  You wake up.\n\n  It is dark.\n".into()),
                TokenType::CloseBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn text_body_may_be_empty() {
        assert_eq!(
            scan("TEXT {}"),
            vec![
                TokenType::Text,
                TokenType::OpenBrace,
                TokenType::RawText("".into()),
                TokenType::CloseBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn raw_mode_only_applies_to_text_blocks() {
        assert_eq!(
            scan("EFFECTS { x = 1 } TEXT { x = 1 }"),
            vec![
                TokenType::Effects,
                TokenType::OpenBrace,
                TokenType::Identifier("x".into()),
                TokenType::Equal,
                TokenType::Number(1),
                TokenType::CloseBrace,
                TokenType::Text,
                TokenType::OpenBrace,
                TokenType::RawText(" x = 1 ".into()),
                TokenType::CloseBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn bracket_text_allows_escapes_and_newlines() {
        assert_eq!(
            scan("[Go left \\[carefully\\]\nand slowly]"),
            vec![
                TokenType::BracketText("Go left [carefully]\nand slowly".into()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            scan(r#""a\nb\t\"c\"""#),
            vec![TokenType::String("a\nb\t\"c\"".into()), TokenType::Eof]
        );
    }

    #[test]
    fn identifiers_allow_underscore_and_dot() {
        assert_eq!(
            scan("player.has_key"),
            vec![TokenType::Identifier("player.has_key".into()), TokenType::Eof]
        );
    }

    #[test]
    fn unterminated_text_block_is_an_error() {
        let mut scanner = Scanner::new("TEXT { oops", SourceReference::new("test", "TEXT { oops"));
        assert!(matches!(
            scanner.nth(2),
            Some(Err(ScannerError::UnterminatedTextBlock { .. }))
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let source = "x = \"oops\nEFFECTS";
        let mut scanner = Scanner::new(source, SourceReference::new("test", source));
        assert!(matches!(
            scanner.nth(2),
            Some(Err(ScannerError::UnterminatedString { .. }))
        ));
    }

    #[test]
    fn huge_integer_is_an_error() {
        let source = "99999999999999999999999999";
        let mut scanner = Scanner::new(source, SourceReference::new("test", source));
        assert!(matches!(
            scanner.next(),
            Some(Err(ScannerError::IntegerOutOfRange { .. }))
        ));
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let mut scanner = Scanner::new("@", SourceReference::new("test", "@"));
        assert!(matches!(
            scanner.next(),
            Some(Err(ScannerError::UnexpectedCharacter { character: '@', .. }))
        ));
    }
}
