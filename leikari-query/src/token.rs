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

/// A lexical token of the filter language.
///
/// Literal-carrying variants keep the raw lexeme so parse errors can point
/// at the offending text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// A character sequence the lexer could not make sense of.
    Illegal(String),
    Eof,

    Ident(String),
    Int(String),
    Float(String),
    Bool(bool),
    Str(String),

    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,

    And,
    Or,

    Not,
    Pr,

    LParen,
    RParen,
}

/// Binding strength of infix operators: `OR < AND < comparisons`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Lowest,
    Or,
    And,
    Compare,
}

impl Token {
    pub(crate) fn precedence(&self) -> Precedence {
        match self {
            Token::Or => Precedence::Or,
            Token::And => Precedence::And,
            Token::Eq
            | Token::Ne
            | Token::Co
            | Token::Sw
            | Token::Ew
            | Token::Gt
            | Token::Ge
            | Token::Lt
            | Token::Le => Precedence::Compare,
            _ => Precedence::Lowest,
        }
    }

    /// The lexeme as written, for error messages.
    pub(crate) fn literal(&self) -> String {
        match self {
            Token::Illegal(s) => s.clone(),
            Token::Eof => "<eof>".to_string(),
            Token::Ident(s) => s.clone(),
            Token::Int(s) => s.clone(),
            Token::Float(s) => s.clone(),
            Token::Bool(b) => b.to_string(),
            Token::Str(s) => format!("'{}'", s),
            Token::Eq => "EQ".to_string(),
            Token::Ne => "NE".to_string(),
            Token::Co => "CO".to_string(),
            Token::Sw => "SW".to_string(),
            Token::Ew => "EW".to_string(),
            Token::Gt => "GT".to_string(),
            Token::Ge => "GE".to_string(),
            Token::Lt => "LT".to_string(),
            Token::Le => "LE".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Not => "NOT".to_string(),
            Token::Pr => "PR".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

/// Resolves reserved words. Operator words are case-insensitive; the bool
/// literals are reserved in lowercase only.
pub(crate) fn lookup_keyword(ident: &str) -> Option<Token> {
    if ident == "true" {
        return Some(Token::Bool(true));
    }
    if ident == "false" {
        return Some(Token::Bool(false));
    }
    let token = match ident.to_ascii_uppercase().as_str() {
        "EQ" => Token::Eq,
        "NE" => Token::Ne,
        "CO" => Token::Co,
        "SW" => Token::Sw,
        "EW" => Token::Ew,
        "GT" => Token::Gt,
        "GE" => Token::Ge,
        "LT" => Token::Lt,
        "LE" => Token::Le,
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "PR" => Token::Pr,
        _ => return None,
    };
    Some(token)
}
