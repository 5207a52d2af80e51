//! Session state: one in-process cell mirrored to durable storage.
//!
//! The cell is single-writer (only [`SessionStore::login`],
//! [`SessionStore::logout`] and [`SessionStore::restore`] mutate it) and
//! broadcast-to-many-readers; every update replaces the whole snapshot,
//! so readers never observe a half-written session. Durable storage is a
//! mirror, not a second source of truth — on conflict the in-memory
//! state wins until the next restore.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::Error;
use crate::types::User;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Snapshot of the current authentication state.
///
/// Authenticated iff the access token and the user record are both
/// present; the constructors make any other "authenticated" shape
/// unrepresentable.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    /// The signed-out session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: User,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user: Some(user),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }
}

/// The three values mirrored to durable storage at login.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct PersistedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Durable keeper of the persisted session.
///
/// Implementations distinguish *absence* (`Ok(None)`: nothing stored)
/// from *corruption* (`Err`: entries present but incomplete or
/// unparseable); restore clears the store in the second case only.
pub trait TokenStorage: Send + Sync + 'static {
    /// Load the persisted session, if one is stored in full.
    ///
    /// # Errors
    ///
    /// Any partially-present or unparseable state.
    fn load(&self) -> Result<Option<PersistedSession>, BoxError>;

    /// Persist all three values.
    ///
    /// # Errors
    ///
    /// Underlying storage failures.
    fn store(&self, session: &PersistedSession) -> Result<(), BoxError>;

    /// Remove every stored entry. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Underlying storage failures.
    fn clear(&self) -> Result<(), BoxError>;
}

// ── File-backed storage ────────────────────────────────────────────

const ACCESS_TOKEN_ENTRY: &str = "access_token";
const REFRESH_TOKEN_ENTRY: &str = "refresh_token";
const USER_ENTRY: &str = "user.json";

/// [`TokenStorage`] keeping the three entries as files under an
/// application-controlled directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_entry(&self, name: &str) -> Result<Option<String>, BoxError> {
        match std::fs::read_to_string(self.dir.join(name)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_entry(&self, name: &str) -> Result<(), BoxError> {
        match std::fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>, BoxError> {
        let access_token = self.read_entry(ACCESS_TOKEN_ENTRY)?;
        let refresh_token = self.read_entry(REFRESH_TOKEN_ENTRY)?;
        let user = self.read_entry(USER_ENTRY)?;

        match (access_token, refresh_token, user) {
            (None, None, None) => Ok(None),
            (Some(access_token), Some(refresh_token), Some(user)) => {
                let user: User =
                    serde_json::from_str(&user).map_err(|e| format!("user record: {e}"))?;
                Ok(Some(PersistedSession {
                    access_token,
                    refresh_token,
                    user,
                }))
            }
            _ => Err("partial session entries on disk".into()),
        }
    }

    fn store(&self, session: &PersistedSession) -> Result<(), BoxError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(ACCESS_TOKEN_ENTRY), &session.access_token)?;
        std::fs::write(self.dir.join(REFRESH_TOKEN_ENTRY), &session.refresh_token)?;
        let user = serde_json::to_string(&session.user)?;
        std::fs::write(self.dir.join(USER_ENTRY), user)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), BoxError> {
        self.remove_entry(ACCESS_TOKEN_ENTRY)?;
        self.remove_entry(REFRESH_TOKEN_ENTRY)?;
        self.remove_entry(USER_ENTRY)?;
        Ok(())
    }
}

// ── In-memory storage ──────────────────────────────────────────────

/// [`TokenStorage`] holding the session in process memory only.
///
/// For tests and ephemeral sessions that should not outlive the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>, BoxError> {
        Ok(self.slot.lock().clone())
    }

    fn store(&self, session: &PersistedSession) -> Result<(), BoxError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), BoxError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

// ── Session store ──────────────────────────────────────────────────

/// Owner of the session cell. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    cell: RwLock<Session>,
    storage: Arc<dyn TokenStorage>,
    restored: AtomicBool,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: impl TokenStorage) -> Self {
        Self::with_storage(Arc::new(storage))
    }

    #[must_use]
    pub fn with_storage(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                cell: RwLock::new(Session::anonymous()),
                storage,
                restored: AtomicBool::new(false),
            }),
        }
    }

    /// Read durable storage once at startup and publish the result.
    ///
    /// A complete persisted session is published as authenticated;
    /// anything less — nothing stored, a missing entry, an unparseable
    /// user record — publishes the anonymous session, clearing the
    /// store when it held corrupt state. Subsequent calls are no-ops.
    pub fn restore(&self) {
        if self.inner.restored.swap(true, Ordering::SeqCst) {
            tracing::debug!("session restore requested more than once");
            return;
        }
        match self.inner.storage.load() {
            Ok(Some(persisted)) => {
                tracing::info!(user = %persisted.user.id, "session restored from storage");
                *self.inner.cell.write() = Session::authenticated(
                    persisted.access_token,
                    persisted.refresh_token,
                    persisted.user,
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session state");
                if let Err(e) = self.inner.storage.clear() {
                    tracing::warn!(error = %e, "failed to clear corrupt session storage");
                }
            }
        }
    }

    /// Publish a freshly-obtained session, mirroring it to durable
    /// storage first.
    ///
    /// The in-memory session is published even when the mirror write
    /// fails — memory wins over the stale durable copy — and the
    /// storage failure is still reported so the caller can surface it.
    ///
    /// # Errors
    ///
    /// [`Error::Storage`] when the durable mirror could not be written.
    pub fn login(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: User,
    ) -> Result<(), Error> {
        let persisted = PersistedSession {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            user,
        };
        let mirrored = self.inner.storage.store(&persisted);
        tracing::info!(user = %persisted.user.id, "session established");
        *self.inner.cell.write() = Session::authenticated(
            persisted.access_token,
            persisted.refresh_token,
            persisted.user,
        );
        mirrored.map_err(|e| Error::Storage(e.to_string()))
    }

    /// Clear durable storage and publish the anonymous session.
    ///
    /// Idempotent. A storage failure is logged and swallowed: teardown
    /// must always leave the process signed out.
    pub fn logout(&self) {
        if let Err(e) = self.inner.storage.clear() {
            tracing::warn!(error = %e, "failed to clear session storage during logout");
        }
        let mut cell = self.inner.cell.write();
        if cell.is_authenticated() {
            tracing::info!("session cleared");
        }
        *cell = Session::anonymous();
    }

    /// Whole-session snapshot.
    #[must_use]
    pub fn current(&self) -> Session {
        self.inner.cell.read().clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.cell.read().access_token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.cell.read().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.cell.read().is_authenticated()
    }
}

// ── Session events ─────────────────────────────────────────────────

/// Listener for session-level signals raised by the request gateway.
///
/// One top-level listener should own user notification and navigation;
/// the gateway itself stays free of any UI dependency. Both methods
/// default to no-ops.
pub trait SessionEvents: Send + Sync + 'static {
    /// The backend rejected the session mid-use. The store has already
    /// been logged out when this fires; fires once per 401 response.
    fn session_expired(&self) {}

    /// The backend refused an action for the signed-in account (403).
    /// The session itself is still valid.
    fn access_denied(&self, message: &str) {
        let _ = message;
    }
}

/// Listener that ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}
