// Session transition controller: switches the roster between anonymous
// (local) and authenticated (remote) persistence.

use std::sync::Arc;

use tracing::{info, warn};

use crate::db::DurableStore;
use crate::draw::DrawResult;
use crate::error::RosterError;
use crate::persistence::{LocalAdapter, PersistenceAdapter, RemoteAdapter, RosterService};
use crate::player::{Player, PlayerId};
use crate::session::{RevocationHandle, RevocationSignal, Session, SessionGate, SessionState};
use crate::store::RosterStore;

/// Two-state machine (`Anonymous`, `Authenticated`) that owns the roster
/// store and the session gate.
///
/// The adapter inside the store always matches the current state:
///
/// ```text
///              login (remote load ok)
///  Anonymous ─────────────────────────► Authenticated
///      ▲                                      │
///      └──────────────────────────────────────┘
///        logout / credential rejected / revoked
/// ```
///
/// Entering `Authenticated` replaces the local roster wholesale with the
/// account's; nothing local is uploaded. Entering `Anonymous` from
/// `Authenticated` starts an empty local roster, in memory and on disk;
/// account data is never kept locally.
pub struct SessionController {
    store: RosterStore,
    gate: SessionGate,
    durable: Arc<dyn DurableStore>,
    roster_key: String,
    service: Arc<dyn RosterService>,
    state: SessionState,
}

impl SessionController {
    pub fn new(
        durable: Arc<dyn DurableStore>,
        roster_key: impl Into<String>,
        session_key: impl Into<String>,
        service: Arc<dyn RosterService>,
        team_size: usize,
    ) -> Self {
        let roster_key = roster_key.into();
        let adapter =
            PersistenceAdapter::Local(LocalAdapter::new(durable.clone(), roster_key.clone()));
        SessionController {
            store: RosterStore::new(adapter, team_size),
            gate: SessionGate::new(durable.clone(), session_key),
            durable,
            roster_key,
            service,
            state: SessionState::Anonymous,
        }
    }

    /// Start-up: resume a cached session if there is one, otherwise load the
    /// local roster.
    ///
    /// A cached session the service rejects falls back to anonymous mode.
    /// Any other failure keeps the session: the controller starts
    /// authenticated with an empty roster, returns the error, and `refresh`
    /// retries the load.
    pub async fn init(&mut self) -> Result<SessionState, RosterError> {
        if let Some((session, signal)) = self.gate.restore() {
            let account_id = session.account_id;
            let mut adapter =
                PersistenceAdapter::Remote(RemoteAdapter::new(self.service.clone(), session, signal));
            match adapter.load().await {
                Ok(players) => {
                    info!("Resumed session for account {account_id} with {} players", players.len());
                    self.activate(adapter, players, account_id);
                    return Ok(self.state.clone());
                }
                Err(RosterError::SessionExpired) => {
                    warn!("Cached session for account {account_id} was rejected");
                    self.gate.close();
                }
                Err(e) => {
                    warn!("Could not load roster for cached session {account_id}: {e}");
                    self.activate(adapter, Vec::new(), account_id);
                    return Err(e);
                }
            }
        }

        match self.store.init().await {
            Ok(count) => info!("Anonymous roster loaded with {count} players"),
            Err(e) => warn!("Failed to load local roster: {e}"),
        }
        Ok(self.state.clone())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Anonymous → Authenticated`. The account roster is loaded first; if
    /// that fails the controller stays anonymous with its roster untouched.
    /// Logging in while already authenticated logs out first.
    pub async fn login(&mut self, session: Session) -> Result<usize, RosterError> {
        if self.state.is_authenticated() {
            info!("Switching accounts; logging out current session first");
            self.enter_anonymous();
        }
        let signal = self.gate.open(session.clone());
        self.enter_authenticated(session, signal).await
    }

    /// `Authenticated → Anonymous` on explicit request. No-op when already
    /// anonymous.
    pub fn logout(&mut self) {
        if self.state.is_authenticated() {
            info!("Logging out");
            self.enter_anonymous();
        }
    }

    /// Apply a pending revocation. Returns `true` if this caused a
    /// transition to `Anonymous`.
    pub fn poll_revocation(&mut self) -> bool {
        let revoked = self
            .gate
            .signal()
            .is_some_and(|signal| signal.is_revoked());
        if revoked && self.state.is_authenticated() {
            warn!("Session revoked; returning to anonymous mode");
            self.enter_anonymous();
            return true;
        }
        false
    }

    async fn enter_authenticated(
        &mut self,
        session: Session,
        signal: RevocationSignal,
    ) -> Result<usize, RosterError> {
        let account_id = session.account_id;
        let mut adapter =
            PersistenceAdapter::Remote(RemoteAdapter::new(self.service.clone(), session, signal));

        match adapter.load().await {
            Ok(players) => {
                let count = players.len();
                self.activate(adapter, players, account_id);
                Ok(count)
            }
            Err(e) => {
                warn!("Login for account {account_id} failed during roster load: {e}");
                self.gate.close();
                Err(e)
            }
        }
    }

    fn activate(&mut self, adapter: PersistenceAdapter, players: Vec<Player>, account_id: i64) {
        self.store.reset(adapter, players);
        self.state = SessionState::Authenticated { account_id };
        info!("Authenticated as account {account_id}");
    }

    fn enter_anonymous(&mut self) {
        self.gate.close();
        let mut local = LocalAdapter::new(self.durable.clone(), self.roster_key.clone());
        // If the clear fails, show what is still stored so memory and disk agree.
        let players = match local.persist_whole_roster(&[]) {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!("Failed to clear local roster: {e:#}");
                local.load()
            }
        };
        self.store.reset(PersistenceAdapter::Local(local), players);
        self.state = SessionState::Anonymous;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &RosterStore {
        &self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.gate.current()
    }

    /// Receiver the app loop can wait on to notice revocation while idle.
    pub fn revocation_signal(&self) -> Option<RevocationSignal> {
        self.gate.signal()
    }

    /// Lets another task revoke the current session.
    pub fn revocation_handle(&self) -> Option<RevocationHandle> {
        self.gate.handle()
    }

    // -----------------------------------------------------------------------
    // Roster operations
    // -----------------------------------------------------------------------

    pub async fn add(&mut self, name: &str, skill_level: i64) -> Result<Player, RosterError> {
        self.ensure_session()?;
        let result = self.store.add(name, skill_level).await;
        self.settle(result)
    }

    pub async fn update_skill(&mut self, id: PlayerId, value: i64) -> Result<Player, RosterError> {
        self.ensure_session()?;
        let result = self.store.update_skill(id, value).await;
        self.settle(result)
    }

    pub async fn set_presence(&mut self, id: PlayerId, present: bool) -> Result<Player, RosterError> {
        self.ensure_session()?;
        let result = self.store.set_presence(id, present).await;
        self.settle(result)
    }

    pub async fn remove(&mut self, id: PlayerId) -> Result<Player, RosterError> {
        self.ensure_session()?;
        let result = self.store.remove(id).await;
        self.settle(result)
    }

    /// Re-fetch the account roster. Only meaningful when authenticated.
    pub async fn refresh(&mut self) -> Result<usize, RosterError> {
        if !self.state.is_authenticated() {
            return Err(RosterError::NotAuthenticated);
        }
        self.ensure_session()?;
        let result = self.store.refresh().await;
        self.settle(result)
    }

    pub fn set_team_size(&mut self, team_size: usize) -> Result<(), RosterError> {
        self.store.set_team_size(team_size)
    }

    pub fn set_team_label(&mut self, index: usize, label: &str) -> Result<(), RosterError> {
        self.store.set_team_label(index, label)
    }

    /// Draw with `team_size`, or the store's selected size when `None`.
    pub fn request_draw(&mut self, team_size: Option<usize>) -> Result<&DrawResult, RosterError> {
        let team_size = team_size.unwrap_or_else(|| self.store.team_size());
        self.store.request_draw(team_size)
    }

    /// A revocation that arrived while idle must not let the next mutation
    /// fall through to the local roster.
    fn ensure_session(&mut self) -> Result<(), RosterError> {
        if self.poll_revocation() {
            return Err(RosterError::SessionExpired);
        }
        Ok(())
    }

    fn settle<T>(&mut self, result: Result<T, RosterError>) -> Result<T, RosterError> {
        if let Err(RosterError::SessionExpired) = &result {
            if self.state.is_authenticated() {
                warn!("Session expired during roster operation");
                self.enter_anonymous();
            }
        }
        result
    }
}
