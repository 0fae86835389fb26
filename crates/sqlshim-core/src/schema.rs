//! Table schemas and the CREATE TABLE compiler.
//!
//! Schemas can be built in code or deserialized from JSON:
//!
//! ```json
//! {
//!   "name": "users",
//!   "columns": [
//!     { "name": "id", "type": "INTEGER", "primaryKey": true, "autoIncrement": true },
//!     { "name": "username", "type": "TEXT", "nullable": false, "unique": true },
//!     { "name": "created_at", "type": "DATETIME", "default": "CURRENT_TIMESTAMP" }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::error::{CompileError, Result};
use crate::ident::{quote_identifier, validate_type};
use crate::value::SqlValue;

/// Default value for a column.
///
/// Literals are rendered escaped; the keyword variants render verbatim. There
/// is deliberately no variant carrying arbitrary SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default, stored as 1/0.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    Text(String),
    /// Blob default.
    Blob(Vec<u8>),
    /// `CURRENT_TIMESTAMP`
    CurrentTimestamp,
    /// `CURRENT_DATE`
    CurrentDate,
    /// `CURRENT_TIME`
    CurrentTime,
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Integer(n) => SqlValue::Int(*n).to_sql_inline(),
            Self::Float(f) => SqlValue::Float(*f).to_sql_inline(),
            Self::Text(s) => SqlValue::Text(s.clone()).to_sql_inline(),
            Self::Blob(b) => SqlValue::Blob(b.clone()).to_sql_inline(),
            Self::CurrentTimestamp => String::from("CURRENT_TIMESTAMP"),
            Self::CurrentDate => String::from("CURRENT_DATE"),
            Self::CurrentTime => String::from("CURRENT_TIME"),
        }
    }

    fn keyword(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "CURRENT_TIMESTAMP" => Some(Self::CurrentTimestamp),
            "CURRENT_DATE" => Some(Self::CurrentDate),
            "CURRENT_TIME" => Some(Self::CurrentTime),
            _ => None,
        }
    }
}

impl From<SqlValue> for DefaultValue {
    /// Text naming one of the `CURRENT_*` keywords becomes that keyword.
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Bool(b) => Self::Bool(b),
            SqlValue::Int(n) => Self::Integer(n),
            SqlValue::Float(f) => Self::Float(f),
            SqlValue::Text(s) => Self::keyword(&s).unwrap_or(Self::Text(s)),
            SqlValue::Blob(b) => Self::Blob(b),
        }
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Blob(b) => serializer.serialize_bytes(b),
            keyword => serializer.serialize_str(&keyword.to_sql()),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        SqlValue::deserialize(deserializer).map(Self::from)
    }
}

const fn yes() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_true(value: &bool) -> bool {
    *value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Definition of one column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Declared engine type, e.g. `INTEGER` or `VARCHAR(255)`.
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Whether this column is the primary key.
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Whether this column auto-increments. Only meaningful on an
    /// `INTEGER PRIMARY KEY` under SQLite.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    /// Whether the column allows NULL values.
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub nullable: bool,
    /// Whether this column has a UNIQUE constraint.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl ColumnDefinition {
    /// Creates a nullable column with no constraints.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            auto_increment: false,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    /// Sets PRIMARY KEY.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets AUTOINCREMENT.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    fn to_sql(&self) -> Result<String> {
        validate_type(&self.name, &self.sql_type)?;
        let mut def = format!("{} {}", quote_identifier(&self.name)?, self.sql_type.trim());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if self.auto_increment {
            def.push_str(" AUTOINCREMENT");
        }
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(&default.to_sql());
        }
        Ok(def)
    }
}

/// A table name plus its ordered columns.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    /// Creates a schema with no columns yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }
}

/// Compiles a schema into `CREATE TABLE IF NOT EXISTS`.
///
/// Running the statement against an existing table of the same name is a
/// no-op, whatever its columns are.
///
/// # Errors
///
/// Fails when the schema has no columns, repeats a column name, or carries an
/// invalid identifier or type.
pub fn compile_create_table(schema: &TableSchema) -> Result<String> {
    let table = quote_identifier(&schema.name)?;
    if schema.columns.is_empty() {
        return Err(CompileError::EmptySchema(schema.name.clone()));
    }

    let mut seen = HashSet::new();
    let mut defs = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(CompileError::DuplicateColumn {
                table: schema.name.clone(),
                column: column.name.clone(),
            });
        }
        defs.push(column.to_sql()?);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        defs.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("users")
            .column(
                ColumnDefinition::new("id", "INTEGER")
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnDefinition::new("username", "TEXT").not_null().unique())
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            compile_create_table(&users()).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "username" TEXT NOT NULL UNIQUE)"#
        );
    }

    #[test]
    fn test_flag_order() {
        let schema = TableSchema::new("t").column(
            ColumnDefinition::new("c", "INTEGER")
                .default(DefaultValue::Integer(5))
                .unique()
                .not_null()
                .auto_increment()
                .primary_key(),
        );
        assert_eq!(
            compile_create_table(&schema).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "t" ("c" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL UNIQUE DEFAULT 5)"#
        );
    }

    #[test]
    fn test_defaults_are_escaped() {
        let schema = TableSchema::new("t")
            .column(ColumnDefinition::new("a", "TEXT").default(DefaultValue::Text("it's".into())))
            .column(ColumnDefinition::new("b", "DATETIME").default(DefaultValue::CurrentTimestamp))
            .column(ColumnDefinition::new("c", "BOOLEAN").default(DefaultValue::Bool(true)))
            .column(ColumnDefinition::new("d", "TEXT").default(DefaultValue::Null));
        assert_eq!(
            compile_create_table(&schema).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "t" ("a" TEXT DEFAULT 'it''s', "b" DATETIME DEFAULT CURRENT_TIMESTAMP, "c" BOOLEAN DEFAULT 1, "d" TEXT DEFAULT NULL)"#
        );
    }

    #[test]
    fn test_reserved_words_are_quoted() {
        let schema = TableSchema::new("order").column(ColumnDefinition::new("group", "TEXT"));
        assert_eq!(
            compile_create_table(&schema).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "order" ("group" TEXT)"#
        );
    }

    #[test]
    fn test_rejects_empty_schema() {
        assert_eq!(
            compile_create_table(&TableSchema::new("t")),
            Err(CompileError::EmptySchema("t".to_string()))
        );
    }

    #[test]
    fn test_rejects_name_with_spaces() {
        let schema = TableSchema::new("invalid table name with spaces")
            .column(ColumnDefinition::new("id", "INTEGER"));
        assert!(matches!(
            compile_create_table(&schema),
            Err(CompileError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let schema = users().column(ColumnDefinition::new("id", "TEXT"));
        assert_eq!(
            compile_create_table(&schema),
            Err(CompileError::DuplicateColumn {
                table: "users".to_string(),
                column: "id".to_string(),
            })
        );
    }

    #[test]
    fn test_rejects_injected_type() {
        let schema = TableSchema::new("t").column(ColumnDefinition::new("a", "TEXT); DROP TABLE x; --"));
        assert!(matches!(
            compile_create_table(&schema),
            Err(CompileError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_json_schema() {
        let schema: TableSchema = serde_json::from_str(
            r#"{
                "name": "users",
                "columns": [
                    {"name": "id", "type": "INTEGER", "primaryKey": true, "autoIncrement": true},
                    {"name": "username", "type": "TEXT", "nullable": false, "unique": true},
                    {"name": "email", "type": "TEXT", "nullable": false},
                    {"name": "created_at", "type": "DATETIME", "default": "CURRENT_TIMESTAMP"},
                    {"name": "bio", "type": "TEXT", "default": "n/a"}
                ]
            }"#,
        )
        .unwrap();
        assert!(schema.columns[0].nullable);
        assert!(!schema.columns[1].nullable);
        assert_eq!(schema.columns[3].default, Some(DefaultValue::CurrentTimestamp));
        assert_eq!(
            schema.columns[4].default,
            Some(DefaultValue::Text("n/a".to_string()))
        );
        assert_eq!(
            compile_create_table(&schema).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "username" TEXT NOT NULL UNIQUE, "email" TEXT NOT NULL, "created_at" DATETIME DEFAULT CURRENT_TIMESTAMP, "bio" TEXT DEFAULT 'n/a')"#
        );
    }

    #[test]
    fn test_json_blob_default() {
        let column: ColumnDefinition =
            serde_json::from_str(r#"{"name": "magic", "type": "BLOB", "default": [1, 2]}"#)
                .unwrap();
        assert_eq!(column.default, Some(DefaultValue::Blob(vec![1, 2])));
        let schema = TableSchema::new("files").column(column);
        assert_eq!(
            compile_create_table(&schema).unwrap(),
            r#"CREATE TABLE IF NOT EXISTS "files" ("magic" BLOB DEFAULT X'0102')"#
        );
    }
}
