//! Full statement compilation for the CRUD operations.
//!
//! Each function returns the SQL text and the parameters in placeholder order,
//! the same `(String, Vec<SqlValue>)` pair every compiler in this crate uses.

use serde::{Deserialize, Serialize};

use crate::condition::{compile_filter, Filter};
use crate::error::{CompileError, Result};
use crate::ident::{quote_column, quote_identifier};
use crate::join::{compile_joins, Join};
use crate::record::Record;
use crate::value::SqlValue;

/// Everything a SELECT takes besides the table name.
///
/// The default selects all columns with no join and no filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Columns to return; empty means `*`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Row filter.
    #[serde(default, rename = "where", skip_serializing_if = "Filter::is_empty")]
    pub filter: Filter,
    /// Joins, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Join>,
}

impl SelectQuery {
    /// Selects all columns.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
            filter: Filter::new(),
            joins: Vec::new(),
        }
    }

    /// Restricts the returned columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the row filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }
}

/// Compiles `INSERT INTO table (cols) VALUES (?, ...)`.
///
/// An empty record inserts a row made of column defaults.
///
/// # Errors
///
/// Fails on an invalid table or column name.
pub fn compile_insert(table: &str, record: &Record) -> Result<(String, Vec<SqlValue>)> {
    let table = quote_identifier(table)?;
    if record.is_empty() {
        return Ok((format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new()));
    }

    let columns = record
        .columns()
        .map(quote_identifier)
        .collect::<Result<Vec<_>>>()?;
    let placeholders = vec![SqlValue::placeholder(); record.len()];
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, record.values().cloned().collect()))
}

/// Compiles `SELECT cols FROM table [joins] [WHERE ...]`.
///
/// # Errors
///
/// Fails on an invalid identifier or an invalid condition.
pub fn compile_select(table: &str, query: &SelectQuery) -> Result<(String, Vec<SqlValue>)> {
    let columns = if query.columns.is_empty() {
        String::from("*")
    } else {
        query
            .columns
            .iter()
            .map(|c| quote_column(c))
            .collect::<Result<Vec<_>>>()?
            .join(", ")
    };

    let mut sql = format!("SELECT {columns} FROM {}", quote_identifier(table)?);
    let joins = compile_joins(&query.joins)?;
    if !joins.is_empty() {
        sql.push(' ');
        sql.push_str(&joins);
    }
    let (where_sql, params) = compile_filter(&query.filter)?;
    sql.push_str(&where_sql);
    Ok((sql, params))
}

/// Compiles `UPDATE table SET col = ?, ... [WHERE ...]`.
///
/// Parameters are the SET values followed by the WHERE values. An empty
/// filter updates every row.
///
/// # Errors
///
/// Fails on an invalid identifier, an invalid condition, or when `changes`
/// is empty.
pub fn compile_update(
    table: &str,
    changes: &Record,
    filter: &Filter,
) -> Result<(String, Vec<SqlValue>)> {
    let quoted_table = quote_identifier(table)?;
    if changes.is_empty() {
        return Err(CompileError::EmptyAssignments(table.to_string()));
    }

    let assignments = changes
        .columns()
        .map(|column| quote_identifier(column).map(|c| format!("{c} = ?")))
        .collect::<Result<Vec<_>>>()?;
    let (where_sql, where_params) = compile_filter(filter)?;

    let mut params: Vec<SqlValue> = changes.values().cloned().collect();
    params.extend(where_params);
    let sql = format!(
        "UPDATE {quoted_table} SET {}{where_sql}",
        assignments.join(", ")
    );
    Ok((sql, params))
}

/// Compiles `DELETE FROM table [WHERE ...]`. An empty filter deletes every row.
///
/// # Errors
///
/// Fails on an invalid identifier or an invalid condition.
pub fn compile_delete(table: &str, filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
    let table = quote_identifier(table)?;
    let (where_sql, params) = compile_filter(filter)?;
    Ok((format!("DELETE FROM {table}{where_sql}"), params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    #[test]
    fn test_insert() {
        let record = Record::new()
            .set("username", "testuser")
            .set("email", "test@example.com");
        let (sql, params) = compile_insert("test_users", &record).unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO "test_users" ("username", "email") VALUES (?, ?)"#
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("testuser".to_string()),
                SqlValue::Text("test@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_defaults_only() {
        let (sql, params) = compile_insert("events", &Record::new()).unwrap();
        assert_eq!(sql, r#"INSERT INTO "events" DEFAULT VALUES"#);
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_all() {
        let (sql, params) = compile_select("users", &SelectQuery::new()).unwrap();
        assert_eq!(sql, r#"SELECT * FROM "users""#);
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_columns_and_filter() {
        let query = SelectQuery::new()
            .columns(["id", "username"])
            .filter(Filter::new().with("username", Condition::eq("a")));
        let (sql, params) = compile_select("users", &query).unwrap();
        assert_eq!(
            sql,
            r#"SELECT "id", "username" FROM "users" WHERE "username" = ?"#
        );
        assert_eq!(params, vec![SqlValue::Text("a".to_string())]);
    }

    #[test]
    fn test_select_with_join() {
        let query = SelectQuery::new()
            .columns(["users.username", "posts.*"])
            .join(Join::inner("posts", "users.id", "posts.user_id"))
            .filter(Filter::new().with("posts.views", Condition::gt(10)));
        let (sql, params) = compile_select("users", &query).unwrap();
        assert_eq!(
            sql,
            r#"SELECT "users"."username", "posts".* FROM "users" INNER JOIN "posts" ON "users"."id" = "posts"."user_id" WHERE "posts"."views" > ?"#
        );
        assert_eq!(params, vec![SqlValue::Int(10)]);
    }

    #[test]
    fn test_update_param_order() {
        let changes = Record::new().set("email", "new@example.com").set("age", 31);
        let filter = Filter::new()
            .eq("username", "testuser")
            .with("age", Condition::lt(100));
        let (sql, params) = compile_update("users", &changes, &filter).unwrap();
        assert_eq!(
            sql,
            r#"UPDATE "users" SET "email" = ?, "age" = ? WHERE "username" = ? AND "age" < ?"#
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("new@example.com".to_string()),
                SqlValue::Int(31),
                SqlValue::Text("testuser".to_string()),
                SqlValue::Int(100),
            ]
        );
    }

    #[test]
    fn test_update_without_filter() {
        let (sql, _) =
            compile_update("users", &Record::new().set("active", false), &Filter::new()).unwrap();
        assert_eq!(sql, r#"UPDATE "users" SET "active" = ?"#);
    }

    #[test]
    fn test_update_requires_assignments() {
        assert_eq!(
            compile_update("users", &Record::new(), &Filter::new()),
            Err(CompileError::EmptyAssignments("users".to_string()))
        );
    }

    #[test]
    fn test_delete() {
        let (sql, params) =
            compile_delete("users", &Filter::new().with("id", Condition::in_list([1, 2]))).unwrap();
        assert_eq!(sql, r#"DELETE FROM "users" WHERE "id" IN (?, ?)"#);
        assert_eq!(params.len(), 2);

        let (sql, params) = compile_delete("users", &Filter::new()).unwrap();
        assert_eq!(sql, r#"DELETE FROM "users""#);
        assert!(params.is_empty());
    }

    #[test]
    fn test_rejects_bad_insert_column() {
        let record = Record::new().set("name) VALUES ('x'); --", 1);
        assert!(matches!(
            compile_insert("users", &record),
            Err(CompileError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_select_query_from_json() {
        let query: SelectQuery = serde_json::from_str(
            r#"{"columns": ["id"], "where": {"id": {"gte": 2}}, "joins": []}"#,
        )
        .unwrap();
        let (sql, params) = compile_select("users", &query).unwrap();
        assert_eq!(sql, r#"SELECT "id" FROM "users" WHERE "id" >= ?"#);
        assert_eq!(params, vec![SqlValue::Int(2)]);
    }
}
