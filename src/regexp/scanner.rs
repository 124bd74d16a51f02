//! Pattern scanner feeding the LR parser.
//!
//! Every pattern character becomes one token. The metacharacters
//! `( ) [ ] - + * ^ |` are their own token kinds; everything else is a `ch`
//! token carrying its code point. A backslash makes the next character
//! literal, or introduces one of `\n`, `\t`, `\r` and `\uXXXX`.

use log::warn;

use super::grammar::{Symbol, Value};
use crate::automaton::CODE_MAX;
use crate::parser::{Token, TokenSource};
use crate::Error;

const ESCAPE: char = '\\';

/// Token kind of a pattern character.
const CH: &str = "ch";

pub(crate) struct Scanner<'a> {
    pattern: &'a str,
    index: usize,
    last_index: usize,
    dot_matches_any: bool,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(pattern: &'a str, dot_matches_any: bool) -> Self {
        Self {
            pattern,
            index: 0,
            last_index: 0,
            dot_matches_any,
        }
    }

    fn next_rune(&mut self) -> Option<char> {
        let c = self.pattern[self.index..].chars().next()?;
        self.index += c.len_utf8();
        Some(c)
    }

    fn code_of(&self, c: char) -> Result<u32, Error> {
        let code = c as u32;
        if code > CODE_MAX {
            return Err(Error::CodePointOutOfRange {
                code,
                position: self.last_index,
            });
        }
        Ok(code)
    }

    /// Decode the escape whose backslash was just consumed.
    fn read_escape(&mut self) -> Result<u32, Error> {
        let position = self.last_index;
        let c = self.next_rune().ok_or(Error::UnexpectedEof)?;
        if c == 'u' {
            return self.read_hex4(position);
        }
        match check_single_char_escape(c) {
            Some(literal) => Ok(literal as u32),
            None => Err(Error::InvalidEscape {
                escape: c,
                position,
            }),
        }
    }

    fn read_hex4(&mut self, position: usize) -> Result<u32, Error> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = self
                .next_rune()
                .ok_or(Error::UnexpectedEof)?
                .to_digit(16)
                .ok_or(Error::InvalidEscape {
                    escape: 'u',
                    position,
                })?;
            code = code * 16 + digit;
        }
        Ok(code)
    }
}

/// Characters that stand for themselves after a backslash, plus the
/// control-character escapes.
fn check_single_char_escape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '(' | ')' | '[' | ']' | '-' | '+' | '*' | '^' | '|' | '.' | '/' | ESCAPE => Some(c),
        _ => None,
    }
}

impl TokenSource<Value> for Scanner<'_> {
    type Error = Error;

    fn next_token(&mut self) -> Result<Token<Value>, Error> {
        let pattern = self.pattern;
        self.last_index = self.index;
        let Some(c) = self.next_rune() else {
            return Ok(Token::end());
        };
        let text = &pattern[self.last_index..self.index];

        let token = match c {
            '(' | ')' | '[' | ']' | '-' | '+' | '*' | '^' | '|' => {
                Token::new(text, Value::Empty, text)
            }
            '.' if self.dot_matches_any => Token::new(CH, Value::Char(Symbol::Wildcard), text),
            ESCAPE => {
                let code = self.read_escape()?;
                let text = &pattern[self.last_index..self.index];
                Token::new(CH, Value::Char(Symbol::Code(code)), text)
            }
            _ => Token::new(CH, Value::Char(Symbol::Code(self.code_of(c)?)), text),
        };
        Ok(token)
    }

    fn on_error(&mut self, message: &str) {
        warn!(
            "pattern {:?}, offset {}: {message}",
            self.pattern, self.last_index
        );
    }
}
