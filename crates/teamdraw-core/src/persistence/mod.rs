// Persistence adapter selected by session state.

pub mod local;
pub mod remote;

use crate::error::RosterError;
use crate::player::{Player, PlayerId, SkillLevel, SourceMode};

pub use local::LocalAdapter;
pub use remote::{PlayerPatch, RemoteAdapter, RemotePlayer, RosterService};

/// Where roster mutations go: local storage in anonymous mode, the account's
/// roster service in authenticated mode.
///
/// Each mutation returns the confirmed record; the roster store applies it
/// only on `Ok`. The local variant confirms immediately.
pub enum PersistenceAdapter {
    Local(LocalAdapter),
    Remote(RemoteAdapter),
}

impl PersistenceAdapter {
    pub fn mode(&self) -> SourceMode {
        match self {
            PersistenceAdapter::Local(_) => SourceMode::Local,
            PersistenceAdapter::Remote(_) => SourceMode::Remote,
        }
    }

    pub async fn load(&mut self) -> Result<Vec<Player>, RosterError> {
        match self {
            PersistenceAdapter::Local(local) => Ok(local.load()),
            PersistenceAdapter::Remote(remote) => remote.load().await,
        }
    }

    pub async fn add(&mut self, name: String, skill_level: SkillLevel) -> Result<Player, RosterError> {
        match self {
            PersistenceAdapter::Local(local) => Ok(local.create(name, skill_level)),
            PersistenceAdapter::Remote(remote) => remote.create(&name, skill_level).await,
        }
    }

    pub async fn update_skill(
        &mut self,
        current: &Player,
        skill_level: SkillLevel,
    ) -> Result<Player, RosterError> {
        match self {
            PersistenceAdapter::Local(_) => Ok(Player {
                skill_level,
                ..current.clone()
            }),
            PersistenceAdapter::Remote(remote) => {
                remote
                    .update(current.id, &PlayerPatch::skill(skill_level))
                    .await
            }
        }
    }

    pub async fn set_presence(
        &mut self,
        current: &Player,
        present: bool,
    ) -> Result<Player, RosterError> {
        match self {
            PersistenceAdapter::Local(_) => Ok(Player {
                present,
                ..current.clone()
            }),
            PersistenceAdapter::Remote(remote) => {
                remote
                    .update(current.id, &PlayerPatch::presence(present))
                    .await
            }
        }
    }

    pub async fn remove(&mut self, id: PlayerId) -> Result<(), RosterError> {
        match self {
            PersistenceAdapter::Local(_) => Ok(()),
            PersistenceAdapter::Remote(remote) => remote.delete(id).await,
        }
    }

    /// Write-through hook after a confirmed mutation. Only the local variant
    /// stores anything; the remote service already holds the change.
    pub fn persist_whole_roster(&self, players: &[Player]) -> Result<(), RosterError> {
        match self {
            PersistenceAdapter::Local(local) => local
                .persist_whole_roster(players)
                .map_err(|e| RosterError::Storage(format!("{e:#}"))),
            PersistenceAdapter::Remote(_) => Ok(()),
        }
    }
}
