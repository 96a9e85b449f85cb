// Remote persistence: one authenticated round trip per mutation, results
// applied only after the service confirms.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RosterError, ServiceError};
use crate::player::{Player, PlayerId, SkillLevel, SourceMode};
use crate::session::{RevocationSignal, Session};

// ---------------------------------------------------------------------------
// Service contract
// ---------------------------------------------------------------------------

/// A player record as the roster service returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlayer {
    pub id: i64,
    pub name: String,
    pub level: i64,
    #[serde(default = "default_present")]
    pub present: bool,
}

fn default_present() -> bool {
    true
}

impl RemotePlayer {
    pub fn into_player(self) -> Result<Player, ServiceError> {
        let skill_level = SkillLevel::new(self.level).map_err(|e| {
            ServiceError::Decode(format!("player {} has invalid level: {e}", self.id))
        })?;
        Ok(Player {
            id: PlayerId(self.id),
            name: self.name,
            skill_level,
            present: self.present,
            source: SourceMode::Remote,
        })
    }
}

/// Partial update sent to the service. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

impl PlayerPatch {
    pub fn presence(present: bool) -> Self {
        PlayerPatch {
            present: Some(present),
            level: None,
        }
    }

    pub fn skill(skill_level: SkillLevel) -> Self {
        PlayerPatch {
            present: None,
            level: Some(skill_level.get()),
        }
    }
}

/// The account-scoped roster store behind the bearer credential.
#[async_trait]
pub trait RosterService: Send + Sync {
    async fn list_players(&self, session: &Session) -> Result<Vec<RemotePlayer>, ServiceError>;

    async fn create_player(
        &self,
        session: &Session,
        name: &str,
        level: u8,
    ) -> Result<RemotePlayer, ServiceError>;

    async fn update_player(
        &self,
        session: &Session,
        id: i64,
        patch: &PlayerPatch,
    ) -> Result<RemotePlayer, ServiceError>;

    async fn delete_player(&self, session: &Session, id: i64) -> Result<(), ServiceError>;
}

// ---------------------------------------------------------------------------
// RemoteAdapter
// ---------------------------------------------------------------------------

/// Authenticated-mode adapter bound to one session.
pub struct RemoteAdapter {
    service: Arc<dyn RosterService>,
    session: Session,
    revocation: RevocationSignal,
}

impl RemoteAdapter {
    pub fn new(
        service: Arc<dyn RosterService>,
        session: Session,
        revocation: RevocationSignal,
    ) -> Self {
        RemoteAdapter {
            service,
            session,
            revocation,
        }
    }

    pub fn account_id(&self) -> i64 {
        self.session.account_id
    }

    /// Fetch every player on the account, in service order. Records with an
    /// out-of-range level are skipped with a warning.
    pub async fn load(&self) -> Result<Vec<Player>, RosterError> {
        self.ensure_active()?;
        let result = self.service.list_players(&self.session).await;
        let remote = self.settle(result, None)?;

        let players: Vec<Player> = remote
            .into_iter()
            .filter_map(|r| match r.into_player() {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Skipping remote player: {e}");
                    None
                }
            })
            .collect();
        info!(
            "Loaded {} players for account {}",
            players.len(),
            self.session.account_id
        );
        Ok(players)
    }

    pub async fn create(&self, name: &str, skill_level: SkillLevel) -> Result<Player, RosterError> {
        self.ensure_active()?;
        let result = self
            .service
            .create_player(&self.session, name, skill_level.get())
            .await;
        let player = self.settle(result, None)?.into_player()?;
        debug!("Service created player {} ({})", player.id, player.name);
        Ok(player)
    }

    pub async fn update(&self, id: PlayerId, patch: &PlayerPatch) -> Result<Player, RosterError> {
        self.ensure_active()?;
        let result = self.service.update_player(&self.session, id.0, patch).await;
        let player = self.settle(result, Some(id))?.into_player()?;
        debug!("Service updated player {} with {:?}", id, patch);
        Ok(player)
    }

    pub async fn delete(&self, id: PlayerId) -> Result<(), RosterError> {
        self.ensure_active()?;
        let result = self.service.delete_player(&self.session, id.0).await;
        self.settle(result, Some(id))?;
        debug!("Service deleted player {}", id);
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), RosterError> {
        if self.revocation.is_revoked() {
            return Err(RosterError::SessionExpired);
        }
        Ok(())
    }

    /// Map a finished round trip onto a roster outcome. A revocation that
    /// landed while the request was in flight wins over whatever the service
    /// answered, so the result is never applied.
    fn settle<T>(
        &self,
        result: Result<T, ServiceError>,
        id: Option<PlayerId>,
    ) -> Result<T, RosterError> {
        if self.revocation.is_revoked() {
            info!("Session revoked during request; discarding result");
            return Err(RosterError::SessionExpired);
        }
        match result {
            Ok(value) => Ok(value),
            Err(ServiceError::Unauthorized) => {
                warn!(
                    "Roster service rejected credential for account {}",
                    self.session.account_id
                );
                Err(RosterError::SessionExpired)
            }
            Err(ServiceError::NotFound) => match id {
                Some(id) => Err(RosterError::NotFound(id)),
                None => Err(RosterError::Service(ServiceError::NotFound)),
            },
            Err(e) => {
                warn!("Roster service call failed: {e}");
                Err(RosterError::Service(e))
            }
        }
    }
}
