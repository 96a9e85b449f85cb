// Session gate: the authenticated session, its revocation signal, and the
// cached copy that survives restarts.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::db::DurableStore;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An already-issued bearer credential for one account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: i64,
    #[serde(default)]
    pub email: Option<String>,
    pub credential: String,
}

// Keeps the credential out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("credential", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Revocation
// ---------------------------------------------------------------------------

/// Sending half: whoever owns the credential flips this when it is revoked.
#[derive(Debug, Clone)]
pub struct RevocationHandle(Arc<watch::Sender<bool>>);

/// Receiving half, cloned into the remote adapter and the app loop.
#[derive(Debug, Clone)]
pub struct RevocationSignal(watch::Receiver<bool>);

/// Create a linked handle/signal pair in the not-revoked state.
pub fn revocation_pair() -> (RevocationHandle, RevocationSignal) {
    let (tx, rx) = watch::channel(false);
    (RevocationHandle(Arc::new(tx)), RevocationSignal(rx))
}

impl RevocationHandle {
    pub fn revoke(&self) {
        // send_replace never fails, even with no receivers left.
        self.0.send_replace(true);
    }

    pub fn signal(&self) -> RevocationSignal {
        RevocationSignal(self.0.subscribe())
    }
}

impl RevocationSignal {
    pub fn is_revoked(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once the session is revoked. Never resolves if the handle is
    /// dropped without revoking.
    pub async fn revoked(&mut self) {
        if self.0.wait_for(|revoked| *revoked).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The two states of the session transition controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { account_id: i64 },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

// ---------------------------------------------------------------------------
// SessionGate
// ---------------------------------------------------------------------------

/// Holds the current session (if any) and remembers it in the durable store
/// so a restart resumes signed in.
pub struct SessionGate {
    store: Arc<dyn DurableStore>,
    key: String,
    current: Option<(Session, RevocationHandle)>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        SessionGate {
            store,
            key: key.into(),
            current: None,
        }
    }

    /// Load the cached session, if one was saved. A corrupted entry is
    /// logged, removed, and treated as no session.
    pub fn restore(&mut self) -> Option<(Session, RevocationSignal)> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cached session: {e:#}");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                info!("Restored cached session for account {}", session.account_id);
                let signal = self.install(session.clone());
                Some((session, signal))
            }
            Err(e) => {
                warn!("Discarding corrupted cached session: {e}");
                if let Err(e) = self.store.remove(&self.key) {
                    warn!("Failed to remove corrupted session entry: {e:#}");
                }
                None
            }
        }
    }

    /// Record a newly acquired session, persist it, and return its signal.
    /// Any previous session is revoked first.
    pub fn open(&mut self, session: Session) -> RevocationSignal {
        if let Some((_, handle)) = self.current.take() {
            handle.revoke();
        }
        match serde_json::to_string(&session) {
            Ok(json) => {
                if let Err(e) = self.store.set(&self.key, &json) {
                    warn!("Failed to cache session: {e:#}");
                }
            }
            Err(e) => warn!("Failed to serialize session: {e}"),
        }
        self.install(session)
    }

    /// Revoke the current session without forgetting it yet. The
    /// controller's next step observes the signal and logs out.
    pub fn revoke(&self) {
        if let Some((session, handle)) = &self.current {
            info!("Revoking session for account {}", session.account_id);
            handle.revoke();
        }
    }

    /// Forget the session: revoke it and drop the cached copy.
    pub fn close(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.revoke();
        }
        if let Err(e) = self.store.remove(&self.key) {
            warn!("Failed to clear cached session: {e:#}");
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref().map(|(s, _)| s)
    }

    /// A fresh receiver for the current session's revocation, if any.
    pub fn signal(&self) -> Option<RevocationSignal> {
        self.current.as_ref().map(|(_, h)| h.signal())
    }

    /// A handle that lets another task revoke the current session.
    pub fn handle(&self) -> Option<RevocationHandle> {
        self.current.as_ref().map(|(_, h)| h.clone())
    }

    fn install(&mut self, session: Session) -> RevocationSignal {
        let (handle, signal) = revocation_pair();
        self.current = Some((session, handle));
        signal
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
