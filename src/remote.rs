//! Remote record store client.
//!
//! Thin adapter over the opaque Apps Script endpoint backing the users
//! sheet. The script exposes two operations:
//! - `GET <base>?action=read` → `{ "data": [[id, name, phone, email,
//!   password, role, createdAt], ...] }`
//! - `POST <base>?_t=<millis>` with form fields `action=insert, id,
//!   name, phone, email, password, role, created_at` → `{ "status":
//!   "success" | other, "message"?: string }`
//!
//! The sheet enforces nothing: no uniqueness, no transactions, no
//! ordering guarantees beyond row order. The session manager's
//! correctness leans on this contract, so it is reproduced exactly.

use crate::error::{ClientError, Result};
use crate::record::UserRecord;
use async_trait::async_trait;
use chrono::Local;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Bounded wait for every remote call; expiry surfaces as a network
/// error rather than hanging the caller.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Literal status marker the script returns on a successful insert.
const STATUS_SUCCESS: &str = "success";

/// Access to the remote user records. The HTTP adapter implements
/// this; tests substitute an in-memory fake.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All user records, in the store's returned order.
    async fn fetch_all_users(&self) -> Result<Vec<UserRecord>>;

    /// Append one record. The store does not check for duplicates.
    async fn insert_user(&self, record: &UserRecord) -> Result<()>;
}

/// Envelope of the read endpoint.
#[derive(Debug, Deserialize)]
struct ReadResponse {
    data: Vec<Value>,
}

/// Envelope of the insert endpoint.
#[derive(Debug, Deserialize)]
struct InsertResponse {
    status: String,
    message: Option<String>,
}

/// HTTP adapter for the users sheet script.
pub struct SheetClient {
    base: String,
    http: reqwest::Client,
}

impl SheetClient {
    /// Build a client for the given script base URL.
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            base: base.into(),
            http,
        })
    }
}

#[async_trait]
impl RecordStore for SheetClient {
    async fn fetch_all_users(&self) -> Result<Vec<UserRecord>> {
        let resp = self
            .http
            .get(&self.base)
            .query(&[("action", "read")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "read request failed with status {}",
                resp.status()
            )));
        }

        let body: ReadResponse = resp.json().await?;
        Ok(decode_user_rows(&body.data))
    }

    async fn insert_user(&self, record: &UserRecord) -> Result<()> {
        // Cache-buster query param, matching what the script expects
        // from its existing clients.
        let cache_buster = Local::now().timestamp_millis().to_string();

        // Field order mirrors the storefront's registration form
        // exactly; the script reads them by name but the sheet has
        // only ever seen this order.
        let id = record.id.to_string();
        let form: [(&str, &str); 8] = [
            ("action", "insert"),
            ("id", &id),
            ("name", &record.name),
            ("phone", &record.phone),
            ("email", &record.email),
            ("password", &record.password),
            ("role", &record.role),
            ("created_at", &record.created_at),
        ];

        let resp = self
            .http
            .post(&self.base)
            .query(&[("_t", cache_buster.as_str())])
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "insert request failed with status {}",
                resp.status()
            )));
        }

        let body: InsertResponse = resp.json().await?;
        interpret_insert_response(body)?;

        tracing::info!(email = %record.email, "user record inserted");
        Ok(())
    }
}

/// Decode positional rows into tagged records. A row that is not an
/// array decodes to an empty (unmatchable) record rather than failing
/// the fetch, matching the tolerant read path of the storefront.
fn decode_user_rows(rows: &[Value]) -> Vec<UserRecord> {
    rows.iter()
        .map(|row| match row.as_array() {
            Some(cells) => UserRecord::from_row(cells),
            None => UserRecord::from_row(&[]),
        })
        .collect()
}

/// Anything other than the literal success marker is a rejection,
/// carrying the server message when one was supplied.
fn interpret_insert_response(body: InsertResponse) -> Result<()> {
    if body.status == STATUS_SUCCESS {
        Ok(())
    } else {
        Err(ClientError::RemoteRejection(
            body.message
                .unwrap_or_else(|| "registration failed, please try again".to_string()),
        ))
    }
}

/// Client-generated numeric id for a new record. The sheet's id column
/// holds numbers, so this stays numeric, but drawn from the full
/// positive `i64` range so collisions are negligible.
pub fn new_record_id() -> i64 {
    rand::thread_rng().gen_range(0..i64::MAX)
}

/// Fixed-width creation stamp for inserted records
/// (`MM/DD/YYYY, HH:MM:SS`, 24-hour local time).
pub fn new_record_stamp() -> String {
    Local::now().format("%m/%d/%Y, %H:%M:%S").to_string()
}
