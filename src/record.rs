//! User record model and positional wire decoding.
//!
//! The remote sheet returns rows as positional arrays, not objects:
//! `[id, name, phone, email, password, role, createdAt]`. Rows are
//! converted into a tagged `UserRecord` right at the client boundary so
//! index arithmetic never leaks past this module. Absent or null cells
//! get documented defaults instead of failing the whole fetch.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role assigned to every self-registered account.
pub const DEFAULT_ROLE: &str = "user";

/// Read-side column positions in a user row.
const COL_ID: usize = 0;
const COL_NAME: usize = 1;
const COL_PHONE: usize = 2;
const COL_EMAIL: usize = 3;
const COL_PASSWORD: usize = 4;
const COL_ROLE: usize = 5;
const COL_CREATED_AT: usize = 6;

/// Record identifier. The sheet is inconsistent about whether ids are
/// numbers or strings, so both are accepted and preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&Value> for RecordId {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) if n.as_i64().is_some() => Self::Int(n.as_i64().unwrap_or(0)),
            other => Self::Text(cell_to_string(other)),
        }
    }
}

/// One registered account, as stored remotely and (when authenticated)
/// persisted locally as the session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: RecordId,
    pub name: String,
    pub phone: String,
    pub email: String,
    /// Plaintext, stored and compared as-is. That is the remote
    /// store's contract, not a choice this client gets to make.
    pub password: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl UserRecord {
    /// Decode one positional row, substituting defaults for absent or
    /// null cells (`role` → "user", `createdAt` → now, text fields →
    /// empty). Never fails: a short or sparse row yields a record that
    /// simply won't match any credentials.
    pub fn from_row(row: &[Value]) -> Self {
        Self {
            id: RecordId::from(cell(row, COL_ID)),
            name: cell_to_string(cell(row, COL_NAME)),
            phone: cell_to_string(cell(row, COL_PHONE)),
            email: cell_to_string(cell(row, COL_EMAIL)),
            password: cell_to_string(cell(row, COL_PASSWORD)),
            role: match cell(row, COL_ROLE) {
                Value::Null => DEFAULT_ROLE.to_string(),
                v => cell_to_string(v),
            },
            created_at: match cell(row, COL_CREATED_AT) {
                Value::Null => now_iso(),
                v => cell_to_string(v),
            },
        }
    }
}

fn cell(row: &[Value], idx: usize) -> &Value {
    row.get(idx).unwrap_or(&Value::Null)
}

/// Stringify a cell the way the sheet consumer does: numbers become
/// their decimal text (a numeric password must still match its typed
/// form), null becomes empty.
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Current time in ISO-8601 with millisecond precision (the default
/// used when a row is missing its createdAt cell).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
