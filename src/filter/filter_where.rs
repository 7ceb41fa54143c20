use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, QueryPairs, WhereNode};

pub struct FilterWhere;

impl FilterWhere {
    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Parse a JSON WHERE document into a condition tree.
    pub fn parse(where_data: &Value) -> Result<WhereNode, FilterError> {
        match where_data {
            Value::Null => Ok(WhereNode::And(vec![])),
            Value::Object(obj) => {
                let mut nodes = Vec::new();
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        Self::validate_column(key)?;
                        nodes.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(if nodes.len() == 1 { nodes.remove(0) } else { WhereNode::And(nodes) })
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<WhereNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let children = arr.iter().map(Self::parse).collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" { WhereNode::And(children) } else { WhereNode::Or(children) })
            }
            "$not" => Ok(WhereNode::Not(Box::new(Self::parse(value)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<WhereNode>, FilterError> {
        let mut out = Vec::new();
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    Self::validate_operand(operator, op_val)?;
                    out.push(WhereNode::Condition(FilterWhereInfo {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    }));
                }
            }
            // Implicit equality: { field: value }
            _ => out.push(WhereNode::Condition(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            })),
        }
        Ok(out)
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Neq,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$null" => FilterOp::Null,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn validate_operand(operator: FilterOp, data: &Value) -> Result<(), FilterError> {
        match operator {
            FilterOp::In if !data.is_array() => {
                Err(FilterError::InvalidOperatorData("$in requires an array".to_string()))
            }
            FilterOp::Null if !data.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$null requires true or false".to_string()))
            }
            FilterOp::Like | FilterOp::ILike if !data.is_string() => {
                Err(FilterError::InvalidOperatorData("pattern operators require a string".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        for part in column.split('.') {
            if !is_identifier(part) {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
            }
        }
        Ok(())
    }

    // --- REST rendering ---

    /// Render the tree as top-level query pairs.
    pub fn generate(node: &WhereNode) -> QueryPairs {
        let mut pairs = Vec::new();
        Self::generate_top(node, &mut pairs);
        pairs
    }

    fn generate_top(node: &WhereNode, pairs: &mut QueryPairs) {
        match node {
            WhereNode::And(children) => {
                for child in children {
                    Self::generate_top(child, pairs);
                }
            }
            WhereNode::Condition(info) => {
                pairs.push((info.column.clone(), Self::condition_value(info, false)));
            }
            WhereNode::Or(children) => {
                pairs.push(("or".to_string(), format!("({})", Self::join_nested(children))));
            }
            WhereNode::Not(inner) => match inner.as_ref() {
                WhereNode::Condition(info) => {
                    pairs.push((info.column.clone(), format!("not.{}", Self::condition_value(info, false))));
                }
                WhereNode::And(children) => {
                    pairs.push(("not.and".to_string(), format!("({})", Self::join_nested(children))));
                }
                WhereNode::Or(children) => {
                    pairs.push(("not.or".to_string(), format!("({})", Self::join_nested(children))));
                }
                // Double negation cancels out
                WhereNode::Not(inner2) => Self::generate_top(inner2, pairs),
            },
        }
    }

    fn join_nested(children: &[WhereNode]) -> String {
        children.iter().map(Self::nested).collect::<Vec<_>>().join(",")
    }

    fn nested(node: &WhereNode) -> String {
        match node {
            WhereNode::Condition(info) => format!("{}.{}", info.column, Self::condition_value(info, true)),
            WhereNode::And(children) => format!("and({})", Self::join_nested(children)),
            WhereNode::Or(children) => format!("or({})", Self::join_nested(children)),
            WhereNode::Not(inner) => match inner.as_ref() {
                WhereNode::Condition(info) => {
                    format!("{}.not.{}", info.column, Self::condition_value(info, true))
                }
                other => format!("not.{}", Self::nested(other)),
            },
        }
    }

    fn condition_value(info: &FilterWhereInfo, nested: bool) -> String {
        match info.operator {
            FilterOp::Eq if info.data.is_null() => "is.null".to_string(),
            FilterOp::Neq if info.data.is_null() => "not.is.null".to_string(),
            FilterOp::Null => {
                if info.data.as_bool().unwrap_or(true) { "is.null".to_string() } else { "not.is.null".to_string() }
            }
            FilterOp::In => {
                let items: Vec<String> = info
                    .data
                    .as_array()
                    .map(|arr| arr.iter().map(|v| rest_literal(v, true)).collect())
                    .unwrap_or_default();
                format!("in.({})", items.join(","))
            }
            FilterOp::Like | FilterOp::ILike => {
                let pattern = rest_like_pattern(info.data.as_str().unwrap_or_default());
                format!("{}.{}", info.operator.to_rest(), quote_if_needed(&pattern, nested))
            }
            _ => format!("{}.{}", info.operator.to_rest(), rest_literal(&info.data, nested)),
        }
    }

    // --- In-memory evaluation ---

    pub fn matches(node: &WhereNode, record: &Value) -> bool {
        match node {
            WhereNode::And(children) => children.iter().all(|c| Self::matches(c, record)),
            WhereNode::Or(children) => children.iter().any(|c| Self::matches(c, record)),
            WhereNode::Not(inner) => !Self::matches(inner, record),
            WhereNode::Condition(info) => Self::matches_condition(info, record),
        }
    }

    fn matches_condition(info: &FilterWhereInfo, record: &Value) -> bool {
        let field = lookup_path(record, &info.column);
        let is_null = field.map(Value::is_null).unwrap_or(true);

        match info.operator {
            FilterOp::Null => is_null == info.data.as_bool().unwrap_or(true),
            FilterOp::Eq if info.data.is_null() => is_null,
            FilterOp::Neq if info.data.is_null() => !is_null,
            _ if is_null => false,
            FilterOp::Eq => field.map(|f| values_equal(f, &info.data)).unwrap_or(false),
            FilterOp::Neq => field.map(|f| !values_equal(f, &info.data)).unwrap_or(false),
            FilterOp::Gt => ordering(field, &info.data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ordering(field, &info.data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => ordering(field, &info.data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(ordering(field, &info.data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Like | FilterOp::ILike => {
                let (Some(Value::String(text)), Some(pattern)) = (field, info.data.as_str()) else {
                    return false;
                };
                if info.operator == FilterOp::ILike {
                    like_match(&text.to_lowercase(), &pattern.to_lowercase())
                } else {
                    like_match(text, pattern)
                }
            }
            FilterOp::In => match (field, info.data.as_array()) {
                (Some(f), Some(options)) => options.iter().any(|o| values_equal(f, o)),
                _ => false,
            },
        }
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Follow a dotted path through nested objects.
pub(crate) fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn rest_literal(value: &Value, nested: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => quote_if_needed(s, nested),
        other => other.to_string(),
    }
}

// Inside or=(...) lists, reserved characters must be double-quoted.
fn quote_if_needed(s: &str, nested: bool) -> String {
    if nested && s.chars().any(|c| matches!(c, ',' | '(' | ')' | '"' | ':')) {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// Equality with numeric coercion: decimals travel as strings, filters often use numbers.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => false,
    }
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => match (x.parse::<f64>(), y.parse::<f64>()) {
            (Ok(nx), Ok(ny)) => nx.partial_cmp(&ny),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn ordering(field: Option<&Value>, data: &Value) -> Option<Ordering> {
    field.and_then(|f| compare_values(f, data))
}

/// Escape `text` so it matches literally inside a LIKE pattern.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// PostgREST spells the `%` wildcard as `*`. Escaped characters pass through.
fn rest_like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '%' => out.push('*'),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    Any,
    One,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            '%' | '*' => LikeToken::Any,
            '_' => LikeToken::One,
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// SQL LIKE semantics: `%` (or `*`) matches any run, `_` matches one char,
/// and a backslash makes the next char literal.
fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p = like_tokens(pattern);
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some(LikeToken::Any) => {
                star = Some((pi, ti));
                pi += 1;
                continue;
            }
            Some(LikeToken::One) => {
                ti += 1;
                pi += 1;
                continue;
            }
            Some(LikeToken::Literal(c)) if *c == t[ti] => {
                ti += 1;
                pi += 1;
                continue;
            }
            _ => {}
        }
        match star {
            Some((sp, st)) => {
                pi = sp + 1;
                ti = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }
    while p.get(pi) == Some(&LikeToken::Any) {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_implicit_equality_renders_eq() {
        let node = FilterWhere::parse(&json!({ "status": "open" })).unwrap();
        assert_eq!(FilterWhere::generate(&node), vec![("status".to_string(), "eq.open".to_string())]);
    }

    #[test]
    fn test_ilike_uses_star_wildcards() {
        let node = FilterWhere::parse(&json!({ "location": { "$ilike": "%Mumbai%" } })).unwrap();
        assert_eq!(FilterWhere::generate(&node), vec![("location".to_string(), "ilike.*Mumbai*".to_string())]);
    }

    #[test]
    fn test_or_renders_nested_list() {
        let node = FilterWhere::parse(&json!({
            "$or": [ { "status": "open" }, { "status": "in_progress" } ]
        }))
        .unwrap();
        assert_eq!(
            FilterWhere::generate(&node),
            vec![("or".to_string(), "(status.eq.open,status.eq.in_progress)".to_string())]
        );
    }

    #[test]
    fn test_not_and_in() {
        let node = FilterWhere::parse(&json!({
            "$not": { "status": { "$in": ["rejected", "accepted"] } }
        }))
        .unwrap();
        assert_eq!(
            FilterWhere::generate(&node),
            vec![("status".to_string(), "not.in.(rejected,accepted)".to_string())]
        );
    }

    #[test]
    fn test_rejects_unknown_operator() {
        let result = FilterWhere::parse(&json!({ "status": { "$regex": "op.*" } }));
        assert!(matches!(result, Err(FilterError::UnsupportedOperator(_))));
    }

    #[test]
    fn test_rejects_bad_column() {
        let result = FilterWhere::parse(&json!({ "status; drop": "open" }));
        assert!(matches!(result, Err(FilterError::InvalidColumn(_))));
    }

    #[test]
    fn test_matches_numeric_string_coercion() {
        let node = FilterWhere::parse(&json!({ "budget_min": { "$gte": 10000 } })).unwrap();
        assert!(FilterWhere::matches(&node, &json!({ "budget_min": "15000" })));
        assert!(!FilterWhere::matches(&node, &json!({ "budget_min": "5000" })));
    }

    #[test]
    fn test_matches_dotted_path() {
        let node = FilterWhere::parse(&json!({ "job.posted_by": "u1" })).unwrap();
        assert!(FilterWhere::matches(&node, &json!({ "job": { "posted_by": "u1" } })));
        assert!(!FilterWhere::matches(&node, &json!({ "job": null })));
    }

    #[test]
    fn test_like_matching() {
        assert!(like_match("navi mumbai", "%mumbai%"));
        assert!(like_match("mumbai", "mum_ai"));
        assert!(!like_match("pune", "%mumbai%"));
        assert!(like_match("anything", "*"));
    }

    #[test]
    fn test_escaped_wildcards_match_literally() {
        let pattern = format!("%{}%", escape_like("50%_off"));
        assert_eq!(pattern, "%50\\%\\_off%");
        assert!(like_match("shop 50%_off sale", &pattern));
        assert!(!like_match("shop 50 xoff sale", &pattern));
        assert!(!like_match("mumbai", &format!("%{}%", escape_like("%"))));
        assert!(like_match("a\\b", &escape_like("a\\b")));
    }

    #[test]
    fn test_escaped_wildcards_survive_rest_rendering() {
        let pattern = format!("%{}%", escape_like("5%"));
        let node = FilterWhere::parse(&json!({ "location": { "$ilike": pattern } })).unwrap();
        assert_eq!(FilterWhere::generate(&node), vec![("location".to_string(), "ilike.*5\\%*".to_string())]);
    }

    #[test]
    fn test_null_operator() {
        let node = FilterWhere::parse(&json!({ "image_url": { "$null": true } })).unwrap();
        assert!(FilterWhere::matches(&node, &json!({ "title": "x" })));
        assert!(!FilterWhere::matches(&node, &json!({ "image_url": "http://img" })));
    }
}
