//! JOIN clause compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ident::quote_identifier;

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
    /// FULL JOIN
    Full,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
        }
    }
}

/// Equality predicate of a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOn {
    pub left_field: String,
    pub right_field: String,
}

/// One join descriptor: `<kind> JOIN <table> ON <left> = <right>`.
///
/// Field references are not checked against any schema; a bad reference is
/// reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    #[serde(rename = "type")]
    pub kind: JoinKind,
    pub table: String,
    pub on: JoinOn,
}

impl Join {
    /// Creates a join descriptor.
    pub fn new(
        kind: JoinKind,
        table: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            on: JoinOn {
                left_field: left_field.into(),
                right_field: right_field.into(),
            },
        }
    }

    /// INNER JOIN shorthand.
    pub fn inner(
        table: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self::new(JoinKind::Inner, table, left_field, right_field)
    }

    /// LEFT JOIN shorthand.
    pub fn left(
        table: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self::new(JoinKind::Left, table, left_field, right_field)
    }

    fn to_sql(&self) -> Result<String> {
        Ok(format!(
            "{} JOIN {} ON {} = {}",
            self.kind,
            quote_identifier(&self.table)?,
            quote_identifier(&self.on.left_field)?,
            quote_identifier(&self.on.right_field)?,
        ))
    }
}

/// Compiles join descriptors into clauses separated by single spaces.
///
/// # Errors
///
/// Fails when a table or field name is not a valid identifier.
pub fn compile_joins(joins: &[Join]) -> Result<String> {
    let clauses = joins.iter().map(Join::to_sql).collect::<Result<Vec<_>>>()?;
    Ok(clauses.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_no_joins() {
        assert_eq!(compile_joins(&[]).unwrap(), "");
    }

    #[test]
    fn test_single_join() {
        let sql = compile_joins(&[Join::inner("posts", "users.id", "posts.user_id")]).unwrap();
        assert_eq!(
            sql,
            r#"INNER JOIN "posts" ON "users"."id" = "posts"."user_id""#
        );
    }

    #[test]
    fn test_joins_keep_order() {
        let sql = compile_joins(&[
            Join::left("posts", "users.id", "posts.user_id"),
            Join::new(JoinKind::Full, "tags", "posts.tag_id", "tags.id"),
        ])
        .unwrap();
        assert_eq!(
            sql,
            r#"LEFT JOIN "posts" ON "users"."id" = "posts"."user_id" FULL JOIN "tags" ON "posts"."tag_id" = "tags"."id""#
        );
    }

    #[test]
    fn test_rejects_bad_table() {
        let err = compile_joins(&[Join::inner("posts p", "a", "b")]).unwrap_err();
        assert_eq!(err, CompileError::InvalidIdentifier("posts p".to_string()));
    }

    #[test]
    fn test_json_descriptor() {
        let joins: Vec<Join> = serde_json::from_str(
            r#"[{"type": "RIGHT", "table": "orders", "on": {"leftField": "customers.id", "rightField": "orders.customer_id"}}]"#,
        )
        .unwrap();
        assert_eq!(
            joins,
            vec![Join::new(JoinKind::Right, "orders", "customers.id", "orders.customer_id")]
        );
    }
}
