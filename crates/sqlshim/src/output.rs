//! Operation payloads and the uniform result envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Payload of a successful insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inserted {
    /// Row id assigned by the engine.
    pub id: i64,
}

/// Payload of a successful update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    /// Number of rows affected; zero when the filter matched nothing.
    pub changes: u64,
}

/// Payload of a status-only operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

/// The uniform `{success, data, error}` envelope.
///
/// Built from any operation result, so callers that prefer inspecting a flag
/// over matching on `Result` (or need JSON) get one shape for everything.
///
/// ```rust
/// use sqlshim::{DbError, Inserted, QueryResult};
///
/// let ok = QueryResult::from(Ok::<_, DbError>(Inserted { id: 1 }));
/// assert!(ok.success);
/// assert_eq!(ok.data, Some(serde_json::json!({"id": 1})));
///
/// let failed = QueryResult::from(Err::<Inserted, _>(DbError::NotConnected));
/// assert!(!failed.success);
/// assert_eq!(failed.error.as_deref(), Some("not connected to database"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Successful envelope without payload.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// Failed envelope.
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

impl<T: Serialize> From<Result<T>> for QueryResult {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(payload) => match serde_json::to_value(payload) {
                Ok(Value::Null) => Self::ok(),
                Ok(data) => Self {
                    success: true,
                    data: Some(data),
                    error: None,
                },
                Err(err) => Self::failure(err),
            },
            Err(err) => Self::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use serde_json::json;
    use sqlshim_core::{Row, SqlValue};

    #[test]
    fn test_unit_payload_has_no_data() {
        let result = QueryResult::from(Ok::<(), DbError>(()));
        assert_eq!(result, QueryResult::ok());
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"success": true}));
    }

    #[test]
    fn test_rows_payload() {
        let row: Row = [("id", SqlValue::Int(1)), ("username", SqlValue::Text("a".into()))]
            .into_iter()
            .collect();
        let result = QueryResult::from(Ok::<_, DbError>(vec![row]));
        assert_eq!(result.data, Some(json!([{"id": 1, "username": "a"}])));
    }

    #[test]
    fn test_changes_payload() {
        let result = QueryResult::from(Ok::<_, DbError>(Changes { changes: 0 }));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": true, "data": {"changes": 0}})
        );
    }

    #[test]
    fn test_failure_payload() {
        let result = QueryResult::from(Err::<Changes, _>(DbError::TransactionState(
            "already committed".into(),
        )));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": false, "error": "transaction error: already committed"})
        );
    }
}
