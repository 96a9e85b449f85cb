// Local persistence: the whole roster serialized as JSON under one key.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::db::DurableStore;
use crate::player::{Player, PlayerId, SkillLevel, SourceMode};

/// Anonymous-mode adapter. Mutations confirm immediately; every change is
/// written through as a full roster re-serialize.
pub struct LocalAdapter {
    store: Arc<dyn DurableStore>,
    key: String,
    last_id: i64,
}

impl LocalAdapter {
    pub fn new(store: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        LocalAdapter {
            store,
            key: key.into(),
            last_id: 0,
        }
    }

    /// Read the stored roster. A missing entry is an empty roster; a corrupt
    /// one is logged, removed, and also treated as empty.
    pub fn load(&mut self) -> Vec<Player> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read local roster: {e:#}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Player>>(&raw) {
            Ok(players) => {
                self.last_id = players.iter().map(|p| p.id.0).max().unwrap_or(0);
                debug!("Loaded {} players from local storage", players.len());
                players
            }
            Err(e) => {
                warn!("Local roster is corrupted, starting empty: {e}");
                if let Err(e) = self.store.remove(&self.key) {
                    warn!("Failed to remove corrupted local roster: {e:#}");
                }
                Vec::new()
            }
        }
    }

    /// Mint a new local record. Ids are millisecond timestamps, bumped so
    /// they stay strictly increasing.
    pub fn create(&mut self, name: String, skill_level: SkillLevel) -> Player {
        let now = chrono::Utc::now().timestamp_millis();
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        Player::new(PlayerId(id), name, skill_level, SourceMode::Local)
    }

    /// Write the full roster under the adapter's key.
    pub fn persist_whole_roster(&self, players: &[Player]) -> anyhow::Result<()> {
        let json = serde_json::to_string(players).context("failed to serialize local roster")?;
        self.store
            .set(&self.key, &json)
            .context("failed to write local roster")?;
        debug!("Wrote {} players to local storage", players.len());
        Ok(())
    }
}
