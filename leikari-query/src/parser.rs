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

use thiserror::Error;

use crate::lexer::Lexer;
use crate::node::{CompareOp, Literal, Node};
use crate::token::{Precedence, Token};

/// Failure to lex or parse a filter expression, carrying the offending
/// lexeme where there is one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no valid query defined")]
    Empty,
    #[error("illegal token '{0}'")]
    Illegal(String),
    #[error("could not parse '{0}'")]
    NoParser(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected trailing '{0}'")]
    UnexpectedToken(String),
    #[error("identifier expected, found '{0}'")]
    ExpectedIdentifier(String),
    #[error("literal value expected, found '{0}'")]
    ExpectedValue(String),
    #[error("missing close paren")]
    MissingCloseParen,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Parses a filter expression into its AST.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(input);
    if parser.cur == Token::Eof {
        return Err(ParseError::Empty);
    }
    let node = parser.parse_node(Precedence::Lowest)?;
    match &parser.peek {
        Token::Eof => Ok(node),
        Token::Illegal(lexeme) => Err(ParseError::Illegal(lexeme.clone())),
        other => Err(ParseError::UnexpectedToken(other.literal())),
    }
}

/// Pratt parser with one token of lookahead: a prefix rule per operand kind
/// and an infix rule per operator, climbing `OR < AND < comparisons`.
struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    peek: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let cur = lexer.next_token();
        let peek = lexer.next_token();
        Parser { lexer, cur, peek }
    }

    fn next_token(&mut self) {
        self.cur = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn parse_node(&mut self, precedence: Precedence) -> Result<Node, ParseError> {
        let mut left = self.parse_prefix()?;
        while precedence < self.peek.precedence() {
            self.next_token();
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Node, ParseError> {
        match self.cur.clone() {
            Token::Ident(name) => Ok(Node::Ident(name)),
            Token::Int(lit) => {
                let value = lit
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidNumber(lit.clone()))?;
                Ok(Node::Value(Literal::Int(value)))
            }
            Token::Float(lit) => {
                let value = lit
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(lit.clone()))?;
                Ok(Node::Value(Literal::Float(value)))
            }
            Token::Bool(value) => Ok(Node::Value(Literal::Bool(value))),
            Token::Str(body) => Ok(Node::Value(Literal::Str(body))),
            Token::LParen => self.parse_group(),
            Token::Not => self.parse_not(),
            Token::Pr => self.parse_pr(),
            Token::Illegal(lexeme) => Err(ParseError::Illegal(lexeme)),
            Token::Eof => Err(ParseError::UnexpectedEnd),
            other => Err(ParseError::NoParser(other.literal())),
        }
    }

    fn parse_group(&mut self) -> Result<Node, ParseError> {
        self.next_token();
        if self.cur == Token::RParen {
            return Err(ParseError::UnexpectedEnd);
        }
        let inner = self.parse_node(Precedence::Lowest)?;
        if self.peek != Token::RParen {
            return Err(ParseError::MissingCloseParen);
        }
        self.next_token();
        Ok(Node::group(inner))
    }

    /// `NOT expr`: per the grammar the operand is a whole expression, so
    /// negation extends to the end of the enclosing (sub-)expression.
    fn parse_not(&mut self) -> Result<Node, ParseError> {
        self.next_token();
        let operand = self.parse_node(Precedence::Lowest)?;
        Ok(Node::not(operand))
    }

    fn parse_pr(&mut self) -> Result<Node, ParseError> {
        self.next_token();
        match self.cur.clone() {
            Token::Ident(name) => Ok(Node::pr(name)),
            other => Err(ParseError::ExpectedIdentifier(other.literal())),
        }
    }

    fn parse_infix(&mut self, left: Node) -> Result<Node, ParseError> {
        let token = self.cur.clone();
        self.next_token();
        let right = self.parse_node(token.precedence())?;

        let op = match token {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Co => CompareOp::Co,
            Token::Sw => CompareOp::Sw,
            Token::Ew => CompareOp::Ew,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::And => return Ok(left.and(right)),
            Token::Or => return Ok(left.or(right)),
            other => return Err(ParseError::NoParser(other.literal())),
        };

        let ident = match left {
            Node::Ident(name) => name,
            other => return Err(ParseError::ExpectedIdentifier(other.to_string())),
        };
        let value = match right {
            Node::Value(value) => value,
            other => return Err(ParseError::ExpectedValue(other.to_string())),
        };
        Ok(Node::Compare { ident, op, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PrefixOp;

    #[test]
    fn test_parse_comparison() {
        assert_eq!(parse("iso EQ 'DE'").unwrap(), Node::eq("iso", "DE"));
        assert_eq!(parse("population > 1000").unwrap(), Node::gt("population", 1000i64));
        assert_eq!(parse("area <= 2.5").unwrap(), Node::le("area", 2.5));
        assert_eq!(parse("active == true").unwrap(), Node::eq("active", true));
        assert_eq!(parse("name != 'X'").unwrap(), Node::ne("name", "X"));
    }

    #[test]
    fn test_parse_symbol_and_word_ops_agree() {
        assert_eq!(parse("a == 1").unwrap(), parse("a EQ 1").unwrap());
        assert_eq!(parse("a >= 1").unwrap(), parse("a ge 1").unwrap());
    }

    #[test]
    fn test_parse_and_binds_tighter_than_or() {
        let node = parse("a EQ 1 OR b EQ 2 AND c EQ 3").unwrap();
        assert_eq!(
            node,
            Node::eq("a", 1i64).or(Node::eq("b", 2i64).and(Node::eq("c", 3i64)))
        );
    }

    #[test]
    fn test_parse_logical_left_associative() {
        let node = parse("a EQ 1 AND b EQ 2 AND c EQ 3").unwrap();
        assert_eq!(
            node,
            Node::eq("a", 1i64).and(Node::eq("b", 2i64)).and(Node::eq("c", 3i64))
        );
    }

    #[test]
    fn test_parse_group() {
        let node = parse("(a EQ 1 OR b EQ 2) AND c EQ 3").unwrap();
        assert_eq!(
            node,
            Node::group(Node::eq("a", 1i64).or(Node::eq("b", 2i64))).and(Node::eq("c", 3i64))
        );
    }

    #[test]
    fn test_parse_not_and_pr() {
        let node = parse("NOT iso EQ 'DE'").unwrap();
        assert_eq!(node, Node::not(Node::eq("iso", "DE")));

        let node = parse("PR capital AND iso EQ 'DE'").unwrap();
        assert_eq!(node, Node::pr("capital").and(Node::eq("iso", "DE")));
        match parse("PR 42") {
            Err(ParseError::ExpectedIdentifier(lit)) => assert_eq!(lit, "42"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unbalanced_parens() {
        assert_eq!(parse("(a EQ 1"), Err(ParseError::MissingCloseParen));
        assert_eq!(
            parse("a EQ 1)"),
            Err(ParseError::UnexpectedToken(")".to_string()))
        );
    }

    #[test]
    fn test_parse_ident_required_left_of_comparison() {
        assert!(matches!(parse("1 EQ 1"), Err(ParseError::ExpectedIdentifier(_))));
        assert!(matches!(parse("a EQ b"), Err(ParseError::ExpectedValue(_))));
    }

    #[test]
    fn test_parse_illegal_tokens() {
        assert_eq!(parse("a = 1"), Err(ParseError::Illegal("=".to_string())));
        assert_eq!(parse("a EQ 1 & b EQ 2"), Err(ParseError::Illegal("&".to_string())));
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("a AND"), Err(ParseError::UnexpectedEnd));
    }

    #[test]
    fn test_parse_dotted_path() {
        let node = parse("address.city SW 'Ber'").unwrap();
        assert_eq!(node, Node::starts_with("address.city", "Ber"));
    }

    #[test]
    fn test_round_trip_structural_equality() {
        let exprs = [
            "iso EQ 'DE'",
            "iso EQ 'DE' AND name SW 'G'",
            "a EQ 1 OR b EQ 2 AND c EQ 3",
            "(a EQ 1 OR b EQ 2) AND c EQ 3",
            "NOT a EQ 1 OR b EQ 2",
            "PR capital",
            "area LE 2.5 AND active EQ true",
            "n GE 10 AND (name CO 'x' OR name EW 'y')",
        ];
        for expr in &exprs {
            let node = parse(expr).unwrap();
            let pretty = node.to_string();
            let reparsed = parse(&pretty).unwrap();
            assert_eq!(node, reparsed, "round trip failed for {}", expr);
        }
    }

    #[test]
    fn test_group_preserved_in_ast() {
        let node = parse("(a EQ 1)").unwrap();
        match node {
            Node::Prefix {
                op: PrefixOp::Group,
                ..
            } => {}
            other => panic!("expected group, got {:?}", other),
        }
    }
}
