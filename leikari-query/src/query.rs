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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node::Node;
use crate::parser::{parse, ParseError};

/// A paginated query over a collection: a filter expression plus an offset
/// and a page size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub from: usize,
    #[serde(default)]
    pub size: usize,
    #[serde(rename = "query")]
    pub expr: String,
}

impl Query {
    pub fn new(expr: impl Into<String>) -> Self {
        Query {
            from: 0,
            size: 0,
            expr: expr.into(),
        }
    }

    pub fn from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn parse(&self) -> Result<Node, ParseError> {
        parse(&self.expr)
    }
}

/// The answer to a [`Query`]: one page of matches plus the total match
/// count and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub from: usize,
    pub size: usize,
    pub count: usize,
    pub result: Vec<Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "millis")]
    pub took_ms: i64,
}

impl QueryResult {
    /// Pages the full match set: `result = matches[from..from + size]`,
    /// empty when `from` is past the end; `count` is always the total.
    pub fn paginate(query: &Query, matches: Vec<Value>) -> Self {
        let count = matches.len();
        let result: Vec<Value> = if query.from > count {
            Vec::new()
        } else {
            matches
                .into_iter()
                .skip(query.from)
                .take(query.size)
                .collect()
        };
        QueryResult {
            from: query.from,
            size: result.len(),
            count,
            result,
            timestamp: Utc::now(),
            took_ms: 0,
        }
    }

    pub fn with_took_ms(mut self, took_ms: i64) -> Self {
        self.took_ms = took_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "i": i })).collect()
    }

    #[test]
    fn test_paginate_first_page() {
        let result = QueryResult::paginate(&Query::new("i GE 0").size(3), matches(10));
        assert_eq!(result.count, 10);
        assert_eq!(result.size, 3);
        assert_eq!(result.result, vec![json!({"i": 0}), json!({"i": 1}), json!({"i": 2})]);
    }

    #[test]
    fn test_paginate_middle_and_tail() {
        let result = QueryResult::paginate(&Query::new("x").from(8).size(5), matches(10));
        assert_eq!(result.count, 10);
        assert_eq!(result.size, 2);
        assert_eq!(result.result, vec![json!({"i": 8}), json!({"i": 9})]);
    }

    #[test]
    fn test_paginate_from_past_end_is_empty() {
        let result = QueryResult::paginate(&Query::new("x").from(11).size(5), matches(10));
        assert_eq!(result.count, 10);
        assert_eq!(result.size, 0);
        assert!(result.result.is_empty());
    }

    #[test]
    fn test_paginate_zero_size_is_empty_with_count() {
        let result = QueryResult::paginate(&Query::new("x"), matches(4));
        assert_eq!(result.count, 4);
        assert!(result.result.is_empty());
    }

    #[test]
    fn test_query_serde_names() {
        let query: Query = serde_json::from_str(r#"{"query": "iso EQ 'DE'", "size": 10}"#).unwrap();
        assert_eq!(query.expr, "iso EQ 'DE'");
        assert_eq!(query.from, 0);
        assert_eq!(query.size, 10);
        assert!(query.parse().is_ok());
    }
}
