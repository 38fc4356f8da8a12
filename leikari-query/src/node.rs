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

use std::fmt;

/// A literal operand: the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{}", i),
            // An integral float keeps its decimal point so it re-lexes as a
            // float, not an int.
            Literal::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Str(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Str(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "EQ",
            CompareOp::Ne => "NE",
            CompareOp::Co => "CO",
            CompareOp::Sw => "SW",
            CompareOp::Ew => "EW",
            CompareOp::Gt => "GT",
            CompareOp::Ge => "GE",
            CompareOp::Lt => "LT",
            CompareOp::Le => "LE",
        };
        write!(f, "{}", op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Pr,
    /// A parenthesized sub-expression, kept as a node so pretty-printing
    /// preserves the authored shape.
    Group,
}

/// A parsed filter expression.
///
/// `Ident` and `Value` only occur as operands of a `Compare`; evaluating
/// either on its own is always false.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Ident(String),
    Value(Literal),
    Compare {
        ident: String,
        op: CompareOp,
        value: Literal,
    },
    Prefix {
        op: PrefixOp,
        node: Box<Node>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn ident(name: impl Into<String>) -> Node {
        Node::Ident(name.into())
    }

    pub fn value(v: impl Into<Literal>) -> Node {
        Node::Value(v.into())
    }

    pub fn compare(attr: impl Into<String>, op: CompareOp, v: impl Into<Literal>) -> Node {
        Node::Compare {
            ident: attr.into(),
            op,
            value: v.into(),
        }
    }

    pub fn eq(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Eq, v)
    }

    pub fn ne(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Ne, v)
    }

    pub fn contains(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Co, v)
    }

    pub fn starts_with(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Sw, v)
    }

    pub fn ends_with(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Ew, v)
    }

    pub fn gt(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Gt, v)
    }

    pub fn ge(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Ge, v)
    }

    pub fn lt(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Lt, v)
    }

    pub fn le(attr: impl Into<String>, v: impl Into<Literal>) -> Node {
        Node::compare(attr, CompareOp::Le, v)
    }

    /// Present: true when the field path resolves on the record.
    pub fn pr(attr: impl Into<String>) -> Node {
        Node::Prefix {
            op: PrefixOp::Pr,
            node: Box::new(Node::Ident(attr.into())),
        }
    }

    pub fn not(node: Node) -> Node {
        Node::Prefix {
            op: PrefixOp::Not,
            node: Box::new(node),
        }
    }

    pub fn group(node: Node) -> Node {
        Node::Prefix {
            op: PrefixOp::Group,
            node: Box::new(node),
        }
    }

    pub fn and(self, other: Node) -> Node {
        Node::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Node) -> Node {
        Node::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Ident(name) => write!(f, "{}", name),
            Node::Value(v) => write!(f, "{}", v),
            Node::Compare { ident, op, value } => write!(f, "{} {} {}", ident, op, value),
            Node::Prefix {
                op: PrefixOp::Group,
                node,
            } => write!(f, "({})", node),
            Node::Prefix {
                op: PrefixOp::Not,
                node,
            } => write!(f, "NOT {}", node),
            Node::Prefix {
                op: PrefixOp::Pr,
                node,
            } => write!(f, "PR {}", node),
            Node::Logical { op, left, right } => write!(f, "{} {} {}", left, op, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_comparison() {
        assert_eq!(Node::eq("iso", "DE").to_string(), "iso EQ 'DE'");
        assert_eq!(Node::gt("population", 1000i64).to_string(), "population GT 1000");
        assert_eq!(Node::le("area", 2.5).to_string(), "area LE 2.5");
        assert_eq!(Node::ne("active", true).to_string(), "active NE true");
    }

    #[test]
    fn test_display_integral_float_keeps_point() {
        assert_eq!(Node::eq("area", 3.0).to_string(), "area EQ 3.0");
    }

    #[test]
    fn test_display_composed() {
        let node = Node::eq("iso", "DE").and(Node::group(
            Node::starts_with("name", "G").or(Node::pr("capital")),
        ));
        assert_eq!(
            node.to_string(),
            "iso EQ 'DE' AND (name SW 'G' OR PR capital)"
        );
    }

    #[test]
    fn test_display_not() {
        assert_eq!(
            Node::not(Node::eq("iso", "DE")).to_string(),
            "NOT iso EQ 'DE'"
        );
    }
}
