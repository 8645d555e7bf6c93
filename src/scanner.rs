use crate::source::{SourceOffset, SourceSpan};
use derive_new::new;
use log::debug;
use miette::Diagnostic;
use std::{collections::VecDeque, str::CharIndices};
use strum::EnumDiscriminants;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ScannerError {
    #[error("Unexpected character: {character:?}")]
    UnexpectedCharacter {
        character: char,
        #[label("Character found here")]
        at: SourceOffset,
    },
    #[error("Unterminated string")]
    UnterminatedString {
        #[label("String starts here")]
        at: SourceSpan,
    },
    #[error("Unexpected letter after number literal")]
    LetterAfterNumber {
        character: char,
        #[label("Letter found here")]
        at: SourceOffset,
    },
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct Token {
    pub span: SourceSpan,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(TokenTypeName))]
pub enum TokenType {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Question,
    Minus,
    MinusEqual,
    Plus,
    PlusEqual,
    Slash,
    SlashEqual,
    Star,
    StarEqual,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    EqualGreater,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Identifier(String),
    String(String),
    Number(f64),
    And,
    Break,
    Class,
    Const,
    Continue,
    Else,
    False,
    For,
    Fun,
    If,
    In,
    Inherits,
    Nil,
    Or,
    Return,
    Static,
    Super,
    This,
    True,
    Var,
    While,
    Eof,
}

/// Lexer for Ivy source text. Yields tokens and recoverable scan errors as
/// an iterator; the driver decides whether any error makes the program
/// unrunnable.
pub struct Scanner<'a> {
    source: &'a str,
    iterator: CharIndices<'a>,
    buffered: VecDeque<(usize, char)>,
    at_end: bool,
    current_offset: usize,
    current_token_start_offset: usize,
    pending_errors: VecDeque<ScannerError>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        debug!("scanning {} bytes of source", source.len());
        Self {
            source,
            iterator: source.char_indices(),
            buffered: VecDeque::new(),
            at_end: false,
            current_offset: 0,
            current_token_start_offset: 0,
            pending_errors: VecDeque::new(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((offset, ch)) = self.buffered.pop_front().or_else(|| self.iterator.next()) {
            self.current_offset = offset;
            Some(ch)
        } else {
            self.at_end = true;
            None
        }
    }

    fn advance_while<F: Fn(char) -> bool>(&mut self, check: F) {
        loop {
            match self.peek(1) {
                Some(ch) if check(ch) => {
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn peek(&mut self, offset: usize) -> Option<char> {
        assert!(offset > 0);
        for _ in self.buffered.len()..offset {
            if let Some(entry) = self.iterator.next() {
                self.buffered.push_back(entry);
            } else {
                return None;
            }
        }
        self.buffered.get(offset - 1).map(|entry| entry.1)
    }

    fn consume(&mut self, target_ch: char) -> bool {
        if self.peek(1) == Some(target_ch) {
            self.advance();
            true
        } else {
            false
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

    fn yield_conditional_token(
        &mut self,
        target_ch: char,
        token_if_found: TokenType,
        token_if_not_found: TokenType,
    ) -> Token {
        let token = if self.consume(target_ch) {
            token_if_found
        } else {
            token_if_not_found
        };
        self.yield_token(token)
    }

    // Caller has consumed "/*". Block comments nest.
    fn skip_block_comment(&mut self) {
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                Some('/') if self.peek(1) == Some('*') => {
                    self.advance();
                    depth += 1;
                }
                Some('*') if self.peek(1) == Some('/') => {
                    self.advance();
                    depth -= 1;
                }
                Some(_) => {}
                None => return,
            }
        }
    }

    fn scan_string(&mut self) -> Result<Token, ScannerError> {
        // No escape processing: characters appear in the literal verbatim,
        // newlines included.
        let literal_start = self.current_offset + 1;
        loop {
            match self.advance() {
                Some('"') => {
                    let literal = self.source[literal_start..self.current_offset].to_string();
                    return Ok(self.yield_token(TokenType::String(literal)));
                }
                Some(_) => {}
                None => {
                    return Err(ScannerError::UnterminatedString {
                        at: (self.current_token_start_offset..self.current_offset).into(),
                    })
                }
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let num_start = self.current_offset;
        self.advance_while(|ch| ch.is_ascii_digit());
        if self.peek(1) == Some('.') && self.peek(2).map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
            self.advance_while(|ch| ch.is_ascii_digit());
        }

        let number: f64 = self.source[num_start..=self.current_offset].parse().unwrap();

        if let Some(ch) = self.peek(1) {
            if ch.is_alphabetic() || ch == '_' {
                self.pending_errors.push_back(ScannerError::LetterAfterNumber {
                    character: ch,
                    at: (self.current_offset + 1).into(),
                });
            }
        }

        self.yield_token(TokenType::Number(number))
    }

    fn scan_word(&mut self) -> Token {
        let word_start = self.current_offset;
        self.advance_while(|ch| matches!(ch, 'a'..='z' | 'A'..='Z' | '_' | '0'..='9'));
        let word = &self.source[word_start..=self.current_offset];
        let token_type = match word {
            "and" => TokenType::And,
            "break" => TokenType::Break,
            "class" => TokenType::Class,
            "const" => TokenType::Const,
            "continue" => TokenType::Continue,
            "else" => TokenType::Else,
            "false" => TokenType::False,
            "for" => TokenType::For,
            "function" => TokenType::Fun,
            "if" => TokenType::If,
            "in" => TokenType::In,
            "inherits" => TokenType::Inherits,
            "nil" => TokenType::Nil,
            "or" => TokenType::Or,
            "return" => TokenType::Return,
            "static" => TokenType::Static,
            "super" => TokenType::Super,
            "this" => TokenType::This,
            "true" => TokenType::True,
            "var" => TokenType::Var,
            "while" => TokenType::While,
            _ => TokenType::Identifier(word.to_string()),
        };
        self.yield_token(token_type)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending_errors.pop_front() {
            return Some(Err(error));
        }

        if self.at_end {
            return None;
        }

        loop {
            self.advance_while(|ch| ch.is_whitespace());

            let next = self.advance();
            self.begin_token();
            return Some(match next {
                None => Ok(self.yield_token(TokenType::Eof)),
                Some('(') => Ok(self.yield_token(TokenType::OpenParen)),
                Some(')') => Ok(self.yield_token(TokenType::CloseParen)),
                Some('{') => Ok(self.yield_token(TokenType::OpenBrace)),
                Some('}') => Ok(self.yield_token(TokenType::CloseBrace)),
                Some(',') => Ok(self.yield_token(TokenType::Comma)),
                Some('.') => Ok(self.yield_token(TokenType::Dot)),
                Some(';') => Ok(self.yield_token(TokenType::Semicolon)),
                Some(':') => Ok(self.yield_token(TokenType::Colon)),
                Some('?') => Ok(self.yield_token(TokenType::Question)),
                Some('-') => {
                    Ok(self.yield_conditional_token('=', TokenType::MinusEqual, TokenType::Minus))
                }
                Some('+') => {
                    Ok(self.yield_conditional_token('=', TokenType::PlusEqual, TokenType::Plus))
                }
                Some('*') => {
                    Ok(self.yield_conditional_token('=', TokenType::StarEqual, TokenType::Star))
                }
                Some('!') => {
                    Ok(self.yield_conditional_token('=', TokenType::BangEqual, TokenType::Bang))
                }
                Some('<') => {
                    Ok(self.yield_conditional_token('=', TokenType::LessEqual, TokenType::Less))
                }
                Some('>') => {
                    Ok(self.yield_conditional_token('=', TokenType::GreaterEqual, TokenType::Greater))
                }
                Some('=') => {
                    if self.consume('=') {
                        Ok(self.yield_token(TokenType::EqualEqual))
                    } else if self.consume('>') {
                        Ok(self.yield_token(TokenType::EqualGreater))
                    } else {
                        Ok(self.yield_token(TokenType::Equal))
                    }
                }
                Some('/') => {
                    if self.consume('/') {
                        loop {
                            match self.peek(1) {
                                Some('\n') | None => break,
                                _ => self.advance(),
                            };
                        }
                        continue;
                    } else if self.consume('*') {
                        self.skip_block_comment();
                        continue;
                    } else if self.consume('=') {
                        Ok(self.yield_token(TokenType::SlashEqual))
                    } else {
                        Ok(self.yield_token(TokenType::Slash))
                    }
                }
                Some('"') => self.scan_string(),
                Some(ch) if ch.is_ascii_digit() => Ok(self.scan_number()),
                Some('a'..='z' | 'A'..='Z' | '_') => Ok(self.scan_word()),
                Some(ch) => Err(ScannerError::UnexpectedCharacter {
                    character: ch,
                    at: self.current_offset.into(),
                }),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token_types(source: &str) -> Vec<TokenType> {
        Scanner::new(source)
            .map(|result| result.expect("unexpected scan error").token_type)
            .collect()
    }

    #[test]
    fn punctuation_and_operators() {
        assert_eq!(
            token_types("+ += - -= * *= / /= => ? : == != <="),
            vec![
                TokenType::Plus,
                TokenType::PlusEqual,
                TokenType::Minus,
                TokenType::MinusEqual,
                TokenType::Star,
                TokenType::StarEqual,
                TokenType::Slash,
                TokenType::SlashEqual,
                TokenType::EqualGreater,
                TokenType::Question,
                TokenType::Colon,
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::LessEqual,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            token_types("class Widget inherits Base static function __init__ in"),
            vec![
                TokenType::Class,
                TokenType::Identifier("Widget".to_string()),
                TokenType::Inherits,
                TokenType::Identifier("Base".to_string()),
                TokenType::Static,
                TokenType::Fun,
                TokenType::Identifier("__init__".to_string()),
                TokenType::In,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn strings_take_characters_verbatim() {
        assert_eq!(
            token_types(r#""a\nb""#),
            vec![
                TokenType::String("a\\nb".to_string()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let results: Vec<_> = Scanner::new("\"oops").collect();
        assert!(matches!(
            results[0],
            Err(ScannerError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn nested_block_comments() {
        assert_eq!(
            token_types("1 /* outer /* inner */ still outer */ 2"),
            vec![
                TokenType::Number(1.0),
                TokenType::Number(2.0),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn letter_after_number_is_an_error() {
        let results: Vec<_> = Scanner::new("12ab").collect();
        assert!(matches!(
            results[0],
            Ok(Token {
                token_type: TokenType::Number(n),
                ..
            }) if n == 12.0
        ));
        assert!(matches!(
            results[1],
            Err(ScannerError::LetterAfterNumber { character: 'a', .. })
        ));
    }

    #[test]
    fn number_needs_digit_after_dot() {
        assert_eq!(
            token_types("12.add"),
            vec![
                TokenType::Number(12.0),
                TokenType::Dot,
                TokenType::Identifier("add".to_string()),
                TokenType::Eof,
            ]
        );
    }
}
