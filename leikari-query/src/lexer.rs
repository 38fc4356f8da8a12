/*
    Leikari
    Copyright (C) 2021 Quickwit Inc.

    Leikari is offered under the AGPL v3.0 and as commercial software.
    For commercial licensing, contact us at hello@quickwit.io.

    AGPL:
    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as
    published by the Free Software Foundation, either version 3 of the
    License, or (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

use crate::token::{lookup_keyword, Token};

/// Byte-wise scanner over a filter expression.
///
/// The grammar is ASCII; anything outside it surfaces as [`Token::Illegal`]
/// and makes the parser fail with the offending lexeme.
pub(crate) struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            position: 0,
        }
    }

    fn ch(&self) -> u8 {
        *self.input.get(self.position).unwrap_or(&0)
    }

    fn peek(&self) -> u8 {
        *self.input.get(self.position + 1).unwrap_or(&0)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    pub(crate) fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let token = match self.ch() {
            0 => Token::Eof,
            b'=' => {
                if self.peek() == b'=' {
                    self.advance();
                    Token::Eq
                } else {
                    Token::Illegal("=".to_string())
                }
            }
            b'!' => {
                if self.peek() == b'=' {
                    self.advance();
                    Token::Ne
                } else {
                    Token::Illegal("!".to_string())
                }
            }
            b'>' => {
                if self.peek() == b'=' {
                    self.advance();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            b'<' => {
                if self.peek() == b'=' {
                    self.advance();
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            b'&' => {
                if self.peek() == b'&' {
                    self.advance();
                    Token::And
                } else {
                    Token::Illegal("&".to_string())
                }
            }
            b'|' => {
                if self.peek() == b'|' {
                    self.advance();
                    Token::Or
                } else {
                    Token::Illegal("|".to_string())
                }
            }
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'\'' => return self.read_string(),
            ch if is_letter(ch) => return self.read_word(),
            ch if is_digit(ch) => return self.read_number(),
            ch => Token::Illegal((ch as char).to_string()),
        };

        self.advance();
        token
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch(), b' ' | b'\t' | b'\n' | b'\r') {
            self.advance();
        }
    }

    /// An identifier or reserved word: a letter followed by letters, digits
    /// and `.` path separators.
    fn read_word(&mut self) -> Token {
        let start = self.position;
        while is_letter(self.ch()) || is_digit(self.ch()) || self.ch() == b'.' {
            self.advance();
        }
        let word = self.slice(start, self.position);
        lookup_keyword(&word).unwrap_or(Token::Ident(word))
    }

    fn read_number(&mut self) -> Token {
        let start = self.position;
        while is_digit(self.ch()) || self.ch() == b'.' {
            self.advance();
        }
        let num = self.slice(start, self.position);
        if num.contains('.') {
            Token::Float(num)
        } else {
            Token::Int(num)
        }
    }

    /// A `'…'` string literal. The body has no escape semantics; a missing
    /// closing quote is illegal.
    fn read_string(&mut self) -> Token {
        self.advance();
        let start = self.position;
        while self.ch() != b'\'' && self.ch() != 0 {
            self.advance();
        }
        let body = self.slice(start, self.position);
        if self.ch() == 0 {
            return Token::Illegal(format!("'{}", body));
        }
        self.advance();
        Token::Str(body)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.input[start..end]).into_owned()
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_uppercase()
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}
