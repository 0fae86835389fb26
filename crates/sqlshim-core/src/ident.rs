//! Identifier validation and quoting.
//!
//! Table and column names cannot be bound as parameters, so they are the one
//! place caller text lands in SQL. Every name is checked against an allow-list
//! and every part is double-quoted so reserved words such as `order` or
//! `group` still work.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CompileError, Result};

fn identifier_part() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid pattern"))
}

fn type_name() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_ (),]*$").expect("valid pattern"))
}

fn quote_part(part: &str, whole: &str) -> Result<String> {
    if identifier_part().is_match(part) {
        Ok(format!("\"{part}\""))
    } else {
        Err(CompileError::InvalidIdentifier(whole.to_string()))
    }
}

/// Validates and quotes a possibly qualified identifier.
///
/// `users` becomes `"users"` and `users.id` becomes `"users"."id"`.
///
/// # Errors
///
/// Returns [`CompileError::InvalidIdentifier`] when any dot-separated part is
/// empty or contains characters outside `[A-Za-z0-9_]`, or starts with a digit.
pub fn quote_identifier(name: &str) -> Result<String> {
    let parts = name
        .split('.')
        .map(|part| quote_part(part, name))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("."))
}

/// Quotes an entry of a SELECT column list.
///
/// Behaves like [`quote_identifier`] but also accepts `*` and `table.*`.
///
/// # Errors
///
/// Returns [`CompileError::InvalidIdentifier`] for anything else that fails
/// the allow-list.
pub fn quote_column(name: &str) -> Result<String> {
    if name == "*" {
        return Ok(String::from("*"));
    }
    match name.strip_suffix(".*") {
        Some(table) => Ok(format!("{}.*", quote_identifier(table)?)),
        None => quote_identifier(name),
    }
}

/// Checks a declared column type such as `INTEGER` or `VARCHAR(255)`.
pub(crate) fn validate_type(column: &str, sql_type: &str) -> Result<()> {
    if type_name().is_match(sql_type.trim()) {
        Ok(())
    } else {
        Err(CompileError::InvalidType {
            column: column.to_string(),
            sql_type: sql_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_plain_names() {
        assert_eq!(quote_identifier("users").unwrap(), "\"users\"");
        assert_eq!(quote_identifier("_private").unwrap(), "\"_private\"");
        assert_eq!(quote_identifier("order").unwrap(), "\"order\"");
    }

    #[test]
    fn test_quotes_each_part_of_qualified_names() {
        assert_eq!(quote_identifier("users.id").unwrap(), "\"users\".\"id\"");
        assert_eq!(
            quote_identifier("main.users.id").unwrap(),
            "\"main\".\"users\".\"id\""
        );
    }

    #[test]
    fn test_rejects_hostile_names() {
        for name in [
            "",
            "invalid table name with spaces",
            "users;",
            "a\"b",
            "users.",
            ".id",
            "1users",
            "users--",
            "naïve",
        ] {
            assert_eq!(
                quote_identifier(name),
                Err(CompileError::InvalidIdentifier(name.to_string())),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_column_wildcards() {
        assert_eq!(quote_column("*").unwrap(), "*");
        assert_eq!(quote_column("posts.*").unwrap(), "\"posts\".*");
        assert_eq!(quote_column("posts.title").unwrap(), "\"posts\".\"title\"");
        assert!(quote_column("*.*").is_err());
        assert!(quote_identifier("*").is_err());
    }

    #[test]
    fn test_type_names() {
        for ty in ["INTEGER", "TEXT", "VARCHAR(255)", "DECIMAL(10, 2)", "DOUBLE PRECISION"] {
            assert!(validate_type("c", ty).is_ok(), "{ty}");
        }
        for ty in ["", "TEXT; DROP TABLE x", "TEXT'", "-- x"] {
            assert!(validate_type("c", ty).is_err(), "{ty}");
        }
    }
}
