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

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::node::{CompareOp, Literal, LogicalOp, Node, PrefixOp};

/// Evaluates a filter expression against a record.
///
/// Records are `serde_json::Value` objects; field paths are dotted key
/// chains through nested objects. The serialized field names are
/// authoritative, so a struct serialized with lower-camel renames is matched
/// by its lower-camel names.
pub fn evaluate(node: &Node, record: &Value) -> bool {
    eval(node, record, None)
}

/// Like [`evaluate`], with an alias table that overrides individual path
/// segments (query name to record key).
pub fn evaluate_with(node: &Node, record: &Value, aliases: &HashMap<String, String>) -> bool {
    eval(node, record, Some(aliases))
}

/// Evaluates a filter expression against any serializable record. Returns
/// false when the record does not serialize to an object.
pub fn matches<T: Serialize>(node: &Node, record: &T) -> bool {
    match serde_json::to_value(record) {
        Ok(value) => evaluate(node, &value),
        Err(_) => false,
    }
}

/// Resolves a dotted field path against a record. Only objects are
/// navigable; a path leading into an array or scalar yields `None`.
pub fn resolve<'a>(path: &str, record: &'a Value) -> Option<&'a Value> {
    resolve_with(path, record, None)
}

fn resolve_with<'a>(
    path: &str,
    record: &'a Value,
    aliases: Option<&HashMap<String, String>>,
) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = record;
    for segment in path.split('.') {
        let key = aliases
            .and_then(|table| table.get(segment))
            .map(|alias| alias.as_str())
            .unwrap_or(segment);
        match current {
            Value::Object(fields) => {
                current = fields.get(key)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

fn eval(node: &Node, record: &Value, aliases: Option<&HashMap<String, String>>) -> bool {
    match node {
        Node::Compare { ident, op, value } => {
            match resolve_with(ident, record, aliases) {
                Some(field) => compare(field, *op, value),
                None => false,
            }
        }
        Node::Prefix {
            op: PrefixOp::Group,
            node,
        } => eval(node, record, aliases),
        Node::Prefix {
            op: PrefixOp::Not,
            node,
        } => !eval(node, record, aliases),
        Node::Prefix {
            op: PrefixOp::Pr,
            node,
        } => match node.as_ref() {
            Node::Ident(name) => resolve_with(name, record, aliases).is_some(),
            _ => false,
        },
        Node::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => eval(left, record, aliases) && eval(right, record, aliases),
        Node::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } => eval(left, record, aliases) || eval(right, record, aliases),
        // A bare identifier or literal is not a condition.
        Node::Ident(_) | Node::Value(_) => false,
    }
}

/// Coerces the field to the literal's type class, then compares. A failed
/// coercion compares false.
fn compare(field: &Value, op: CompareOp, literal: &Literal) -> bool {
    match literal {
        Literal::Int(b) => match field.as_i64() {
            Some(a) => compare_i64(a, op, *b),
            None => false,
        },
        Literal::Float(b) => match field.as_f64() {
            Some(a) => compare_f64(a, op, *b),
            None => false,
        },
        Literal::Bool(b) => match field.as_bool() {
            Some(a) => compare_bool(a, op, *b),
            None => false,
        },
        Literal::Str(b) => match field.as_str() {
            Some(a) => compare_str(a, op, b),
            None => false,
        },
    }
}

fn compare_i64(a: i64, op: CompareOp, b: i64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        // Substring operators work on the decimal rendering.
        CompareOp::Co => a.to_string().contains(&b.to_string()),
        CompareOp::Sw => a.to_string().starts_with(&b.to_string()),
        CompareOp::Ew => a.to_string().ends_with(&b.to_string()),
    }
}

fn compare_f64(a: f64, op: CompareOp, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Co => decimal(a).contains(&decimal(b)),
        CompareOp::Sw => decimal(a).starts_with(&decimal(b)),
        CompareOp::Ew => decimal(a).ends_with(&decimal(b)),
    }
}

fn decimal(x: f64) -> String {
    format!("{:.6}", x)
}

fn compare_bool(a: bool, op: CompareOp, b: bool) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Co | CompareOp::Sw | CompareOp::Ew => a == b,
        CompareOp::Ne | CompareOp::Gt | CompareOp::Lt => a != b,
        CompareOp::Ge | CompareOp::Le => true,
    }
}

fn compare_str(a: &str, op: CompareOp, b: &str) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Co => a.contains(b),
        CompareOp::Sw => a.starts_with(b),
        CompareOp::Ew => a.ends_with(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    fn check(expr: &str, record: &Value) -> bool {
        evaluate(&parse(expr).unwrap(), record)
    }

    #[test]
    fn test_eval_int_comparisons() {
        let record = json!({ "n": 42 });
        assert!(check("n EQ 42", &record));
        assert!(check("n NE 41", &record));
        assert!(check("n GT 41", &record));
        assert!(check("n GE 42", &record));
        assert!(check("n LT 43", &record));
        assert!(check("n LE 42", &record));
        assert!(!check("n GT 42", &record));
        assert!(check("n CO 2", &record));
        assert!(check("n SW 4", &record));
        assert!(check("n EW 2", &record));
        assert!(!check("n SW 2", &record));
    }

    #[test]
    fn test_eval_float_comparisons() {
        let record = json!({ "x": 2.5 });
        assert!(check("x EQ 2.5", &record));
        assert!(check("x GT 2.0", &record));
        assert!(check("x LE 2.5", &record));
        assert!(!check("x LT 2.5", &record));
        // 2.500000 starts with 2.5
        assert!(check("x SW 2.5", &record));
    }

    #[test]
    fn test_eval_int_field_coerces_to_float_class() {
        let record = json!({ "x": 3 });
        assert!(check("x EQ 3.0", &record));
        // The reverse does not hold: a float field has no int coercion.
        let record = json!({ "x": 3.0 });
        assert!(!check("x EQ 3", &record));
    }

    #[test]
    fn test_eval_bool_comparisons() {
        let record = json!({ "b": true });
        assert!(check("b EQ true", &record));
        assert!(check("b NE false", &record));
        assert!(check("b GT false", &record));
        assert!(!check("b GT true", &record));
        assert!(check("b GE false", &record));
        assert!(check("b LE true", &record));
        assert!(check("b CO true", &record));
    }

    #[test]
    fn test_eval_string_comparisons() {
        let record = json!({ "name": "Germany" });
        assert!(check("name EQ 'Germany'", &record));
        assert!(check("name NE 'France'", &record));
        assert!(check("name SW 'G'", &record));
        assert!(check("name EW 'many'", &record));
        assert!(check("name CO 'erm'", &record));
        assert!(check("name GT 'France'", &record));
        assert!(check("name LT 'Italy'", &record));
    }

    #[test]
    fn test_eval_type_mismatch_is_false() {
        let record = json!({ "n": "42" });
        assert!(!check("n EQ 42", &record));
        let record = json!({ "n": 42 });
        assert!(!check("n EQ '42'", &record));
    }

    #[test]
    fn test_eval_missing_field_is_false() {
        let record = json!({ "a": 1 });
        assert!(!check("b EQ 1", &record));
        assert!(!check("b NE 1", &record));
    }

    #[test]
    fn test_eval_dotted_path() {
        let record = json!({ "address": { "city": "Berlin", "geo": { "lat": 52 } } });
        assert!(check("address.city EQ 'Berlin'", &record));
        assert!(check("address.geo.lat EQ 52", &record));
        assert!(!check("address.street EQ 'x'", &record));
    }

    #[test]
    fn test_eval_arrays_not_navigable() {
        let record = json!({ "tags": ["a", "b"] });
        assert!(!check("tags.a EQ 'x'", &record));
        assert!(!check("tags EQ 'a'", &record));
        // The field itself is present though.
        assert!(check("PR tags", &record));
    }

    #[test]
    fn test_eval_presence() {
        let record = json!({ "capital": null, "name": "Germany" });
        assert!(check("PR name", &record));
        assert!(check("PR capital", &record));
        assert!(!check("PR iso", &record));
    }

    #[test]
    fn test_eval_not_and_logical() {
        let record = json!({ "iso": "DE", "population": 83 });
        assert!(check("iso EQ 'DE' AND population GT 80", &record));
        assert!(check("iso EQ 'FR' OR population GT 80", &record));
        assert!(!check("iso EQ 'FR' AND population GT 80", &record));
        assert!(check("NOT iso EQ 'FR'", &record));
        assert!(check("(iso EQ 'FR' OR iso EQ 'DE') AND population LE 83", &record));
    }

    #[test]
    fn test_eval_aliases_override() {
        let record = json!({ "countryCode": "DE" });
        let node = parse("iso EQ 'DE'").unwrap();
        assert!(!evaluate(&node, &record));
        let mut aliases = HashMap::new();
        aliases.insert("iso".to_string(), "countryCode".to_string());
        assert!(evaluate_with(&node, &record, &aliases));
    }

    #[test]
    fn test_matches_serializable_record() {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Country {
            iso_code: String,
            name: String,
        }
        let country = Country {
            iso_code: "DE".to_string(),
            name: "Germany".to_string(),
        };
        let node = parse("isoCode EQ 'DE' AND name SW 'G'").unwrap();
        assert!(matches(&node, &country));
    }
}
