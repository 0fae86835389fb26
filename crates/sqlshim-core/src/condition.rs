//! Condition maps and the WHERE-clause compiler.
//!
//! A [`Filter`] maps field names to a [`Condition`]: either a plain value
//! (equality) or an [`OperatorSet`] naming exactly one operator. The JSON form
//! matches what callers of the CRUD layer send:
//!
//! ```json
//! {
//!   "username": "alice",
//!   "age": { "between": [18, 65] },
//!   "deleted_at": { "isNull": true }
//! }
//! ```

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::error::{CompileError, Result};
use crate::ident::quote_identifier;
use crate::record::{deserialize_pairs, serialize_pairs};
use crate::value::{SqlValue, ToSqlValue};

/// Binary comparison operators, in the order they are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// Pattern match (LIKE)
    Like,
}

impl CompareOp {
    /// Key used for this operator in an operator object.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
        }
    }
}

/// An operator object. Exactly one field must be set when it is compiled.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorSet {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub eq: Option<SqlValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub neq: Option<SqlValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gt: Option<SqlValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gte: Option<SqlValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lt: Option<SqlValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lte: Option<SqlValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub like: Option<SqlValue>,
    /// Set membership; an empty list matches nothing.
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub in_list: Option<Vec<SqlValue>>,
    /// Inclusive range `[low, high]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub between: Option<(SqlValue, SqlValue)>,
    /// `true` for IS NULL, `false` for IS NOT NULL.
    #[serde(rename = "isNull", default, skip_serializing_if = "Option::is_none")]
    pub is_null: Option<bool>,
}

// An explicit `null` operand is a value, not an absent key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<SqlValue>, D::Error> {
    SqlValue::deserialize(deserializer).map(Some)
}

enum Predicate<'a> {
    Compare(CompareOp, &'a SqlValue),
    In(&'a [SqlValue]),
    Between(&'a SqlValue, &'a SqlValue),
    Null(bool),
}

impl OperatorSet {
    fn compare(&self, op: CompareOp) -> Option<&SqlValue> {
        match op {
            CompareOp::Eq => self.eq.as_ref(),
            CompareOp::Ne => self.neq.as_ref(),
            CompareOp::Gt => self.gt.as_ref(),
            CompareOp::Gte => self.gte.as_ref(),
            CompareOp::Lt => self.lt.as_ref(),
            CompareOp::Lte => self.lte.as_ref(),
            CompareOp::Like => self.like.as_ref(),
        }
    }

    fn predicates(&self) -> Vec<(&'static str, Predicate<'_>)> {
        const COMPARISONS: [CompareOp; 7] = [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Gt,
            CompareOp::Gte,
            CompareOp::Lt,
            CompareOp::Lte,
            CompareOp::Like,
        ];

        let mut found: Vec<(&'static str, Predicate<'_>)> = COMPARISONS
            .iter()
            .filter_map(|op| {
                self.compare(*op)
                    .map(|value| (op.key(), Predicate::Compare(*op, value)))
            })
            .collect();
        if let Some(values) = &self.in_list {
            found.push(("in", Predicate::In(values)));
        }
        if let Some((low, high)) = &self.between {
            found.push(("between", Predicate::Between(low, high)));
        }
        if let Some(is_null) = self.is_null {
            found.push(("isNull", Predicate::Null(is_null)));
        }
        found
    }
}

/// The condition attached to one field of a [`Filter`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Operator object.
    Operators(OperatorSet),
    /// Plain value, compared with `=`.
    Value(SqlValue),
}

impl Condition {
    /// Plain equality on a value.
    pub fn value<V: ToSqlValue>(value: V) -> Self {
        Self::Value(value.to_sql_value())
    }

    /// Single comparison operator.
    pub fn compare<V: ToSqlValue>(op: CompareOp, value: V) -> Self {
        let value = Some(value.to_sql_value());
        let mut set = OperatorSet::default();
        match op {
            CompareOp::Eq => set.eq = value,
            CompareOp::Ne => set.neq = value,
            CompareOp::Gt => set.gt = value,
            CompareOp::Gte => set.gte = value,
            CompareOp::Lt => set.lt = value,
            CompareOp::Lte => set.lte = value,
            CompareOp::Like => set.like = value,
        }
        Self::Operators(set)
    }

    /// `field = value`
    pub fn eq<V: ToSqlValue>(value: V) -> Self {
        Self::compare(CompareOp::Eq, value)
    }

    /// `field != value`
    pub fn neq<V: ToSqlValue>(value: V) -> Self {
        Self::compare(CompareOp::Ne, value)
    }

    /// `field > value`
    pub fn gt<V: ToSqlValue>(value: V) -> Self {
        Self::compare(CompareOp::Gt, value)
    }

    /// `field >= value`
    pub fn gte<V: ToSqlValue>(value: V) -> Self {
        Self::compare(CompareOp::Gte, value)
    }

    /// `field < value`
    pub fn lt<V: ToSqlValue>(value: V) -> Self {
        Self::compare(CompareOp::Lt, value)
    }

    /// `field <= value`
    pub fn lte<V: ToSqlValue>(value: V) -> Self {
        Self::compare(CompareOp::Lte, value)
    }

    /// `field LIKE pattern`, `%` and `_` as wildcards.
    pub fn like<V: ToSqlValue>(pattern: V) -> Self {
        Self::compare(CompareOp::Like, pattern)
    }

    /// `field IN (...)`
    pub fn in_list<V: ToSqlValue, I: IntoIterator<Item = V>>(values: I) -> Self {
        Self::Operators(OperatorSet {
            in_list: Some(values.into_iter().map(ToSqlValue::to_sql_value).collect()),
            ..OperatorSet::default()
        })
    }

    /// `field BETWEEN low AND high`, inclusive on both ends.
    pub fn between<L: ToSqlValue, H: ToSqlValue>(low: L, high: H) -> Self {
        Self::Operators(OperatorSet {
            between: Some((low.to_sql_value(), high.to_sql_value())),
            ..OperatorSet::default()
        })
    }

    /// `field IS NULL`
    #[must_use]
    pub fn is_null() -> Self {
        Self::null_check(true)
    }

    /// `field IS NOT NULL`
    #[must_use]
    pub fn is_not_null() -> Self {
        Self::null_check(false)
    }

    fn null_check(is_null: bool) -> Self {
        Self::Operators(OperatorSet {
            is_null: Some(is_null),
            ..OperatorSet::default()
        })
    }

    fn build(&self, field: &str, params: &mut Vec<SqlValue>) -> Result<String> {
        let column = quote_identifier(field)?;
        let set = match self {
            Self::Value(value) => {
                params.push(value.clone());
                return Ok(format!("{column} = ?"));
            }
            Self::Operators(set) => set,
        };

        let mut predicates = set.predicates();
        if predicates.len() > 1 {
            return Err(CompileError::AmbiguousCondition {
                field: field.to_string(),
                operators: predicates.iter().map(|(key, _)| *key).collect(),
            });
        }
        let Some((_, predicate)) = predicates.pop() else {
            return Err(CompileError::EmptyCondition(field.to_string()));
        };

        let sql = match predicate {
            Predicate::Compare(op, value) => {
                params.push(value.clone());
                format!("{column} {op} ?")
            }
            Predicate::In(values) => {
                let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
                params.extend(values.iter().cloned());
                format!("{column} IN ({})", placeholders.join(", "))
            }
            Predicate::Between(low, high) => {
                params.push(low.clone());
                params.push(high.clone());
                format!("{column} BETWEEN ? AND ?")
            }
            Predicate::Null(true) => format!("{column} IS NULL"),
            Predicate::Null(false) => format!("{column} IS NOT NULL"),
        };
        Ok(sql)
    }
}

impl From<SqlValue> for Condition {
    fn from(value: SqlValue) -> Self {
        Self::Value(value)
    }
}

impl From<OperatorSet> for Condition {
    fn from(set: OperatorSet) -> Self {
        Self::Operators(set)
    }
}

/// A condition map: per-field predicates joined with AND, in insertion order.
///
/// # Example
///
/// ```rust
/// use sqlshim_core::{Condition, Filter, compile_filter};
///
/// let filter = Filter::new()
///     .eq("status", "active")
///     .with("age", Condition::between(18, 65));
///
/// let (sql, params) = compile_filter(&filter).unwrap();
/// assert_eq!(sql, r#" WHERE "status" = ? AND "age" BETWEEN ? AND ?"#);
/// assert_eq!(params.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    /// Creates an empty filter (matches every row).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Adds a condition on a field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.push(field, condition);
        self
    }

    /// Adds a plain equality on a field.
    #[must_use]
    pub fn eq<V: ToSqlValue>(self, field: impl Into<String>, value: V) -> Self {
        self.with(field, Condition::value(value))
    }

    /// Adds a condition on a field.
    pub fn push(&mut self, field: impl Into<String>, condition: Condition) {
        self.conditions.push((field.into(), condition));
    }

    /// Number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Iterates over `(field, condition)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions
            .iter()
            .map(|(field, condition)| (field.as_str(), condition))
    }
}

impl<K: Into<String>> FromIterator<(K, Condition)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, Condition)>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_pairs(&self.conditions, serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Self {
            conditions: deserialize_pairs(deserializer)?,
        })
    }
}

/// Compiles a filter into a WHERE clause and its parameters.
///
/// The clause starts with a space (` WHERE ...`) so it can be appended to a
/// statement directly; an empty filter yields an empty string.
///
/// # Errors
///
/// Fails on an invalid field name or on an operator object that names zero or
/// several operators.
pub fn compile_filter(filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
    let mut params = Vec::new();
    let conditions = filter
        .iter()
        .map(|(field, condition)| condition.build(field, &mut params))
        .collect::<Result<Vec<_>>>()?;

    if conditions.is_empty() {
        return Ok((String::new(), params));
    }
    Ok((format!(" WHERE {}", conditions.join(" AND ")), params))
}
