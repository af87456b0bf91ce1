//! The fluent filter sublanguage (spec §4.2): a small sum type plus a
//! decorated-string front end so callers who only have a BaaS-style filter
//! key (`"status!"`, `"createdAt<"`, ...) can still build one.

use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Is,
    IsNot,
    Like,
    ILike,
    In,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl Filter {
    #[must_use]
    pub fn new(column: impl Into<String>, op: Op, value: Json) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    /// Parses the decorated-string form (spec §4.2 table). `NULL` operands
    /// flip `Eq`/`Ne` to `Is`/`IsNot` automatically, per the spec rule.
    #[must_use]
    pub fn parse(key: &str, value: Json) -> Self {
        let is_null = value.is_null();

        if let Some(col) = key.strip_prefix('!') {
            if let Some(col) = col.strip_suffix(":is") {
                return Self::new(col, Op::IsNot, value);
            }
            let op = if is_null { Op::IsNot } else { Op::Ne };
            return Self::new(col, op, value);
        }
        if let Some(col) = key.strip_suffix("~~") {
            return Self::new(col, Op::ILike, value);
        }
        if let Some(col) = key.strip_suffix('~') {
            return Self::new(col, Op::Like, value);
        }
        if let Some(col) = key.strip_suffix("[]") {
            return Self::new(col, Op::In, value);
        }
        if let Some(col) = key.strip_suffix("<=") {
            return Self::new(col, Op::Le, value);
        }
        if let Some(col) = key.strip_suffix(">=") {
            return Self::new(col, Op::Ge, value);
        }
        if let Some(col) = key.strip_suffix('<') {
            return Self::new(col, Op::Lt, value);
        }
        if let Some(col) = key.strip_suffix('>') {
            return Self::new(col, Op::Gt, value);
        }
        if let Some(col) = key.strip_suffix('?') {
            return Self::new(col, Op::Is, value);
        }
        let op = if is_null { Op::Is } else { Op::Eq };
        Self::new(key, op, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_column_is_eq() {
        let f = Filter::parse("status", json!("pending"));
        assert_eq!(f.column, "status");
        assert_eq!(f.op, Op::Eq);
    }

    #[test]
    fn bang_prefix_is_ne() {
        let f = Filter::parse("!status", json!("pending"));
        assert_eq!(f.column, "status");
        assert_eq!(f.op, Op::Ne);
    }

    #[test]
    fn null_value_switches_eq_to_is() {
        let f = Filter::parse("deletedAt", Json::Null);
        assert_eq!(f.op, Op::Is);
        let f = Filter::parse("!deletedAt", Json::Null);
        assert_eq!(f.op, Op::IsNot);
    }

    #[test]
    fn in_list_suffix() {
        let f = Filter::parse("status[]", json!(["pending", "failed"]));
        assert_eq!(f.column, "status");
        assert_eq!(f.op, Op::In);
    }

    #[test]
    fn case_insensitive_like_before_like() {
        let f = Filter::parse("title~~", json!("%foo%"));
        assert_eq!(f.column, "title");
        assert_eq!(f.op, Op::ILike);
    }

    #[test]
    fn not_is_suffix() {
        let f = Filter::parse("!coverPhotoId:is", Json::Null);
        assert_eq!(f.column, "coverPhotoId");
        assert_eq!(f.op, Op::IsNot);
    }
}
