//! Session lifecycle management.
//!
//! The `SessionManager` is the only stateful, policy-bearing component
//! in the client. It owns the in-memory session, is the sole writer of
//! the session store, and serializes all mutating operations behind a
//! single-slot async lock so rapid repeated triggers (double-tapped
//! login buttons) cannot interleave.
//!
//! State machine:
//! - `Uninitialized` → `restore()` → `Restoring` → `Authenticated` or
//!   `Anonymous` (storage read failures fail open to `Anonymous`).
//! - `Anonymous` → `authenticate()` → `Authenticated` on the first
//!   stored record whose email and password both match exactly.
//! - `register()` inserts a record remotely but never authenticates;
//!   the caller signs in separately.
//! - `logout()` always clears in-memory state, even when clearing the
//!   store fails; such failures land in the observable error field.

pub mod store;

use crate::error::{ClientError, Result};
use crate::record::{RecordId, UserRecord, DEFAULT_ROLE};
use crate::remote::{new_record_id, new_record_stamp, RecordStore};
use parking_lot::Mutex;
use std::sync::Arc;
use store::SessionStore;
use tokio::sync::Mutex as AsyncMutex;

/// Observable session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Before `restore()` has run.
    Uninitialized,
    /// Startup load of the persisted session is in flight.
    Restoring,
    /// A user is signed in.
    Authenticated(UserRecord),
    /// No user is signed in.
    Anonymous,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Shared observable cell: state, loading flag, last error message.
struct StateCell {
    state: SessionState,
    busy: bool,
    last_error: Option<String>,
}

/// Clears the loading flag on every exit path of an operation.
struct BusyGuard {
    cell: Arc<Mutex<StateCell>>,
}

impl BusyGuard {
    fn engage(cell: &Arc<Mutex<StateCell>>) -> Self {
        cell.lock().busy = true;
        Self { cell: cell.clone() }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.cell.lock().busy = false;
    }
}

/// Owns the session. Constructed explicitly and handed to consumers;
/// there is no ambient/global instance.
pub struct SessionManager<R: RecordStore> {
    remote: R,
    store: SessionStore,
    cell: Arc<Mutex<StateCell>>,
    /// Single-slot guard: at most one mutating operation at a time.
    op_guard: AsyncMutex<()>,
}

impl<R: RecordStore> SessionManager<R> {
    pub fn new(remote: R, store: SessionStore) -> Self {
        Self {
            remote,
            store,
            cell: Arc::new(Mutex::new(StateCell {
                state: SessionState::Uninitialized,
                busy: false,
                last_error: None,
            })),
            op_guard: AsyncMutex::new(()),
        }
    }

    // ── Observers ───────────────────────────────────────────────────

    /// Snapshot of the current state. Never blocks on in-flight
    /// operations.
    pub fn state(&self) -> SessionState {
        self.cell.lock().state.clone()
    }

    /// The currently signed-in user, if any.
    pub fn current_user(&self) -> Option<UserRecord> {
        match &self.cell.lock().state {
            SessionState::Authenticated(record) => Some(record.clone()),
            _ => None,
        }
    }

    /// Loading flag for the presentation layer: true while restore or a
    /// mutation is in flight.
    pub fn is_busy(&self) -> bool {
        self.cell.lock().busy
    }

    /// Message of the most recent failure, for observability. Cleared
    /// at the start of each operation.
    pub fn last_error(&self) -> Option<String> {
        self.cell.lock().last_error.clone()
    }

    // ── Lifecycle operations ────────────────────────────────────────

    /// Startup restore: load the persisted session, if any. Storage
    /// read failures fail open — the user simply starts signed out.
    pub async fn restore(&self) -> SessionState {
        let _op = self.op_guard.lock().await;
        let _busy = BusyGuard::engage(&self.cell);
        {
            let mut cell = self.cell.lock();
            cell.state = SessionState::Restoring;
            cell.last_error = None;
        }

        let state = match self.store.load() {
            Ok(Some(record)) => SessionState::Authenticated(record),
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load persisted session");
                self.cell.lock().last_error = Some(e.to_string());
                SessionState::Anonymous
            }
        };

        self.cell.lock().state = state.clone();
        state
    }

    /// Sign in: fetch all remote records and activate the first whose
    /// email and password both equal the input exactly (case-sensitive,
    /// no normalization). On success the record is persisted and
    /// returned; on exhaustion the state stays `Anonymous`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord> {
        let _op = self.op_guard.lock().await;
        let _busy = BusyGuard::engage(&self.cell);
        self.cell.lock().last_error = None;

        if email.is_empty() || password.is_empty() {
            return self.fail(ClientError::MissingField);
        }

        let users = match self.remote.fetch_all_users().await {
            Ok(users) => users,
            Err(e) => return self.fail(e),
        };

        // First match wins, in store order. Known risk: with duplicate
        // emails only the earliest row is ever reachable.
        let matched = users
            .into_iter()
            .find(|u| u.email == email && u.password == password);

        let record = match matched {
            Some(record) => record,
            None => return self.fail(ClientError::InvalidCredentials),
        };

        if let Err(e) = self.store.save(&record) {
            return self.fail(e);
        }

        self.cell.lock().state = SessionState::Authenticated(record.clone());
        tracing::info!(email = %record.email, role = %record.role, "signed in");
        Ok(record)
    }

    /// Create an account: synthesize a record (fresh numeric id, role
    /// fixed to "user", fixed-width creation stamp) and insert it
    /// remotely. Never signs the caller in — a successful registration
    /// is followed by an explicit `authenticate`.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<()> {
        let _op = self.op_guard.lock().await;
        let _busy = BusyGuard::engage(&self.cell);
        self.cell.lock().last_error = None;

        if name.is_empty() || email.is_empty() || phone.is_empty() || password.is_empty() {
            return self.fail(ClientError::MissingField);
        }

        let record = UserRecord {
            id: RecordId::Int(new_record_id()),
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: DEFAULT_ROLE.to_string(),
            created_at: new_record_stamp(),
        };

        if let Err(e) = self.remote.insert_user(&record).await {
            return self.fail(e);
        }

        tracing::info!(email = %record.email, "registration submitted");
        Ok(())
    }

    /// Sign out. In-memory state is always cleared; a storage failure
    /// is recorded in the error field but never blocks sign-out.
    /// Calling this while already signed out is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let _op = self.op_guard.lock().await;
        let _busy = BusyGuard::engage(&self.cell);
        {
            let mut cell = self.cell.lock();
            cell.state = SessionState::Anonymous;
            cell.last_error = None;
        }

        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
            self.cell.lock().last_error = Some(e.to_string());
        }
        Ok(())
    }

    /// Record a failure in the observable error field and return it.
    fn fail<T>(&self, err: ClientError) -> Result<T> {
        self.cell.lock().last_error = Some(err.to_string());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// In-memory record store standing in for the remote sheet.
    struct FakeStore {
        users: Mutex<Vec<UserRecord>>,
        fail_fetch: bool,
        reject_insert: Option<String>,
    }

    impl FakeStore {
        fn with_users(users: Vec<UserRecord>) -> Self {
            Self {
                users: Mutex::new(users),
                fail_fetch: false,
                reject_insert: None,
            }
        }

        fn failing() -> Self {
            Self {
                users: Mutex::new(Vec::new()),
                fail_fetch: true,
                reject_insert: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl RecordStore for FakeStore {
        async fn fetch_all_users(&self) -> Result<Vec<UserRecord>> {
            if self.fail_fetch {
                return Err(ClientError::Network("connection refused".into()));
            }
            Ok(self.users.lock().clone())
        }

        async fn insert_user(&self, record: &UserRecord) -> Result<()> {
            if let Some(msg) = &self.reject_insert {
                return Err(ClientError::RemoteRejection(msg.clone()));
            }
            self.users.lock().push(record.clone());
            Ok(())
        }
    }

    fn user(id: i64, email: &str, password: &str) -> UserRecord {
        UserRecord {
            id: RecordId::Int(id),
            name: format!("User {id}"),
            phone: "555-0100".into(),
            email: email.into(),
            password: password.into(),
            role: "user".into(),
            created_at: "01/01/2025, 09:00:00".into(),
        }
    }

    fn manager_with(
        tmp: &TempDir,
        remote: FakeStore,
    ) -> SessionManager<FakeStore> {
        let store = SessionStore::new(tmp.path().join("session.json"));
        SessionManager::new(remote, store)
    }

    #[tokio::test]
    async fn restore_without_persisted_session_is_anonymous() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![]));

        assert_eq!(mgr.state(), SessionState::Uninitialized);
        assert_eq!(mgr.restore().await, SessionState::Anonymous);
        assert!(!mgr.is_busy());
    }

    #[tokio::test]
    async fn authenticate_matching_credentials() {
        let tmp = TempDir::new().unwrap();
        let ann = user(1, "ann@x.com", "Secret1");
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![ann.clone()]));
        mgr.restore().await;

        let record = mgr.authenticate("ann@x.com", "Secret1").await.unwrap();
        assert_eq!(record, ann);
        assert_eq!(mgr.state(), SessionState::Authenticated(ann));
        assert!(mgr.last_error().is_none());
    }

    #[tokio::test]
    async fn authenticate_unknown_credentials_stays_anonymous() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![user(1, "ann@x.com", "Secret1")]));
        mgr.restore().await;

        let err = mgr.authenticate("ann@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));
        assert_eq!(mgr.state(), SessionState::Anonymous);
        assert!(mgr.last_error().is_some());
    }

    #[tokio::test]
    async fn authenticate_is_case_sensitive() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![user(1, "ann@x.com", "Secret1")]));
        mgr.restore().await;

        let err = mgr.authenticate("Ann@x.com", "Secret1").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));
    }

    #[tokio::test]
    async fn authenticate_blank_fields_never_touch_the_network() {
        let tmp = TempDir::new().unwrap();
        // A failing remote proves the validation short-circuits.
        let mgr = manager_with(&tmp, FakeStore::failing());
        mgr.restore().await;

        let err = mgr.authenticate("", "").await.unwrap_err();
        assert!(matches!(err, ClientError::MissingField));
    }

    #[tokio::test]
    async fn authenticate_network_failure_surfaces_and_stays_anonymous() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager_with(&tmp, FakeStore::failing());
        mgr.restore().await;

        let err = mgr.authenticate("ann@x.com", "Secret1").await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(mgr.state(), SessionState::Anonymous);
        assert!(mgr.last_error().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn duplicate_email_first_match_wins() {
        let tmp = TempDir::new().unwrap();
        let first = user(1, "dup@x.com", "FirstPw");
        let second = user(2, "dup@x.com", "SecondPw");
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![first.clone(), second]));
        mgr.restore().await;

        // The second record's password is unreachable behind the first.
        let err = mgr.authenticate("dup@x.com", "SecondPw").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));

        let record = mgr.authenticate("dup@x.com", "FirstPw").await.unwrap();
        assert_eq!(record, first);
    }

    #[tokio::test]
    async fn restart_restores_the_authenticated_session() {
        let tmp = TempDir::new().unwrap();
        let ann = user(1, "ann@x.com", "Secret1");

        let mgr = manager_with(&tmp, FakeStore::with_users(vec![ann.clone()]));
        mgr.restore().await;
        mgr.authenticate("ann@x.com", "Secret1").await.unwrap();

        // Fresh manager over the same storage simulates a process restart.
        let restarted = manager_with(&tmp, FakeStore::with_users(vec![]));
        assert_eq!(
            restarted.restore().await,
            SessionState::Authenticated(ann)
        );
    }

    #[tokio::test]
    async fn corrupt_persisted_session_fails_open() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("session.json"), "{definitely not json").unwrap();

        let mgr = manager_with(&tmp, FakeStore::with_users(vec![]));
        assert_eq!(mgr.restore().await, SessionState::Anonymous);
        assert!(mgr.last_error().is_none());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let ann = user(1, "ann@x.com", "Secret1");
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![ann]));
        mgr.restore().await;
        mgr.authenticate("ann@x.com", "Secret1").await.unwrap();

        mgr.logout().await.unwrap();
        assert_eq!(mgr.state(), SessionState::Anonymous);

        mgr.logout().await.unwrap();
        assert_eq!(mgr.state(), SessionState::Anonymous);
        assert!(mgr.last_error().is_none());
    }

    #[tokio::test]
    async fn logout_clears_memory_even_when_storage_fails() {
        let tmp = TempDir::new().unwrap();
        // A directory at the session path makes remove_file fail with
        // something other than NotFound.
        let path = tmp.path().join("session.json");
        std::fs::create_dir(&path).unwrap();

        let store = SessionStore::new(path);
        let mgr = SessionManager::new(FakeStore::with_users(vec![]), store);
        mgr.restore().await;

        assert!(mgr.logout().await.is_ok());
        assert_eq!(mgr.state(), SessionState::Anonymous);
        assert!(mgr.last_error().is_some());
    }

    #[tokio::test]
    async fn register_inserts_but_does_not_authenticate() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager_with(&tmp, FakeStore::with_users(vec![]));
        mgr.restore().await;

        mgr.register("Ann", "ann@x.com", "555-0100", "Secret1")
            .await
            .unwrap();
        assert_eq!(mgr.state(), SessionState::Anonymous);

        // The inserted record is now scannable: sign-in succeeds.
        let record = mgr.authenticate("ann@x.com", "Secret1").await.unwrap();
        assert_eq!(record.name, "Ann");
        assert_eq!(record.role, "user");
        assert!(mgr.state().is_authenticated());
    }

    #[tokio::test]
    async fn register_blank_field_is_rejected_locally() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager_with(&tmp, FakeStore::failing());
        mgr.restore().await;

        let err = mgr
            .register("Ann", "", "555-0100", "Secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingField));
    }

    #[tokio::test]
    async fn register_remote_rejection_passes_message_through() {
        let tmp = TempDir::new().unwrap();
        let remote = FakeStore {
            users: Mutex::new(Vec::new()),
            fail_fetch: false,
            reject_insert: Some("Email already registered".into()),
        };
        let mgr = manager_with(&tmp, remote);
        mgr.restore().await;

        let err = mgr
            .register("Ann", "ann@x.com", "555-0100", "Secret1")
            .await
            .unwrap_err();
        match err {
            ClientError::RemoteRejection(msg) => assert_eq!(msg, "Email already registered"),
            other => panic!("expected RemoteRejection, got {other:?}"),
        }
        assert_eq!(mgr.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn mutations_are_serialized_by_the_op_guard() {
        let tmp = TempDir::new().unwrap();
        let ann = user(1, "ann@x.com", "Secret1");
        let mgr = std::sync::Arc::new(manager_with(&tmp, FakeStore::with_users(vec![ann])));
        mgr.restore().await;

        // Hammer the manager from several tasks at once; the guard must
        // keep every outcome coherent (either a clean success or a
        // clean InvalidCredentials, never a torn state).
        let mut handles = Vec::new();
        for i in 0..8 {
            let mgr = mgr.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let _ = mgr.authenticate("ann@x.com", "Secret1").await;
                } else {
                    let _ = mgr.logout().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let state = mgr.state();
        assert!(
            state == SessionState::Anonymous || state.is_authenticated(),
            "state must settle on a coherent value, got {state:?}"
        );
        assert!(!mgr.is_busy());
    }
}
