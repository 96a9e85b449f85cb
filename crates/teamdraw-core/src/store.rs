// Roster store: the in-session player list, team settings, and the most
// recent draw.

use tracing::{debug, info};

use crate::draw::{self, DrawResult, TeamLabels};
use crate::error::RosterError;
use crate::persistence::PersistenceAdapter;
use crate::player::{validate_name, validate_skill_level, Player, PlayerId, SourceMode, ValidationError};

/// Owns the authoritative player list for the active session.
///
/// Mutations take `&mut self`, so a second mutation cannot start until the
/// first (including its remote round trip) has finished. Every mutation is
/// confirm-then-apply: the adapter confirms, the local write-through
/// succeeds, then memory changes. A failed call leaves the roster untouched.
pub struct RosterStore {
    players: Vec<Player>,
    team_size: usize,
    team_labels: TeamLabels,
    adapter: PersistenceAdapter,
    last_draw: Option<DrawResult>,
    /// Set by any roster mutation after a draw; cleared by the next draw.
    draw_stale: bool,
}

impl RosterStore {
    /// An empty store. Call [`RosterStore::init`] to load the adapter's roster.
    pub fn new(adapter: PersistenceAdapter, team_size: usize) -> Self {
        RosterStore {
            players: Vec::new(),
            team_size: team_size.max(1),
            team_labels: TeamLabels::new(),
            adapter,
            last_draw: None,
            draw_stale: false,
        }
    }

    /// Replace memory with whatever the active adapter holds.
    pub async fn init(&mut self) -> Result<usize, RosterError> {
        let players = self.adapter.load().await?;
        let count = players.len();
        self.players = players;
        self.discard_draw();
        info!("Roster initialized with {} players ({:?})", count, self.mode());
        Ok(count)
    }

    /// Swap in a new adapter together with its roster, discarding everything
    /// held for the previous session.
    pub fn reset(&mut self, adapter: PersistenceAdapter, players: Vec<Player>) {
        debug!(
            "Resetting roster: {:?} -> {:?}, {} players",
            self.mode(),
            adapter.mode(),
            players.len()
        );
        self.adapter = adapter;
        self.players = players;
        self.discard_draw();
    }

    /// Reload the roster from the active adapter, replacing memory wholesale.
    pub async fn refresh(&mut self) -> Result<usize, RosterError> {
        let players = self.adapter.load().await?;
        let count = players.len();
        self.players = players;
        self.invalidate_draw();
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> SourceMode {
        self.adapter.mode()
    }

    pub fn list(&self) -> &[Player] {
        &self.players
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn present_count(&self) -> usize {
        self.players.iter().filter(|p| p.present).count()
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    /// How many full teams the present players can form at the current size.
    pub fn possible_team_count(&self) -> usize {
        self.present_count() / self.team_size
    }

    pub fn team_labels(&self) -> &TeamLabels {
        &self.team_labels
    }

    /// The last draw, unless the roster changed since it was made.
    pub fn current_draw(&self) -> Option<&DrawResult> {
        if self.draw_stale {
            None
        } else {
            self.last_draw.as_ref()
        }
    }

    pub fn is_draw_stale(&self) -> bool {
        self.draw_stale
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn set_team_size(&mut self, team_size: usize) -> Result<(), RosterError> {
        if team_size == 0 {
            return Err(ValidationError::InvalidTeamSize.into());
        }
        if team_size != self.team_size {
            self.team_size = team_size;
            self.invalidate_draw();
        }
        Ok(())
    }

    /// Name the team at `index` for upcoming draws. A blank label restores
    /// the default.
    pub fn set_team_label(&mut self, index: usize, label: &str) -> Result<(), RosterError> {
        if index >= self.possible_team_count() {
            return Err(ValidationError::TeamIndexOutOfRange { index }.into());
        }
        let label = label.trim();
        if label.is_empty() {
            self.team_labels.remove(&index);
        } else {
            self.team_labels.insert(index, label.to_string());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a player at the end of the roster.
    pub async fn add(&mut self, name: &str, skill_level: i64) -> Result<Player, RosterError> {
        let name = validate_name(name)?;
        let skill_level = validate_skill_level(skill_level)?;

        let player = self.adapter.add(name, skill_level).await?;
        let mut next = self.players.clone();
        next.push(player.clone());
        self.commit(next)?;
        info!("Added player {} ({}) skill {}", player.name, player.id, player.skill_level);
        Ok(player)
    }

    pub async fn update_skill(&mut self, id: PlayerId, value: i64) -> Result<Player, RosterError> {
        let skill_level = validate_skill_level(value)?;
        let idx = self.index_of(id)?;

        let updated = self
            .adapter
            .update_skill(&self.players[idx], skill_level)
            .await?;
        let mut next = self.players.clone();
        next[idx] = updated.clone();
        self.commit(next)?;
        info!("Player {} skill set to {}", id, skill_level);
        Ok(updated)
    }

    /// Mark a player present or absent. Setting the current value again is
    /// a successful no-op and does not touch the draw.
    pub async fn set_presence(&mut self, id: PlayerId, present: bool) -> Result<Player, RosterError> {
        let idx = self.index_of(id)?;
        if self.players[idx].present == present {
            return Ok(self.players[idx].clone());
        }

        let updated = self
            .adapter
            .set_presence(&self.players[idx], present)
            .await?;
        let mut next = self.players.clone();
        next[idx] = updated.clone();
        self.commit(next)?;
        info!("Player {} marked {}", id, if present { "present" } else { "absent" });
        Ok(updated)
    }

    /// Permanently remove a player. Unknown ids report `NotFound`.
    pub async fn remove(&mut self, id: PlayerId) -> Result<Player, RosterError> {
        let idx = self.index_of(id)?;

        self.adapter.remove(id).await?;
        let mut next = self.players.clone();
        let removed = next.remove(idx);
        self.commit(next)?;
        info!("Removed player {} ({})", removed.name, id);
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Draw
    // -----------------------------------------------------------------------

    /// Draw teams from the current roster. On failure the previous draw and
    /// the roster are left as they were.
    pub fn request_draw(&mut self, team_size: usize) -> Result<&DrawResult, RosterError> {
        let result = draw::draw_with_labels(&self.players, team_size, &self.team_labels)?;
        info!(
            "Drew {} teams of {} with {} reserves (spread {})",
            result.teams.len(),
            team_size,
            result.reserves.len(),
            result.skill_spread()
        );
        self.draw_stale = false;
        let current = self.last_draw.insert(result);
        Ok(&*current)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn index_of(&self, id: PlayerId) -> Result<usize, RosterError> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or(RosterError::NotFound(id))
    }

    /// After a confirmed mutation: write `next` through, then make it the
    /// roster and mark the draw stale. A failed write leaves memory as it was.
    fn commit(&mut self, next: Vec<Player>) -> Result<(), RosterError> {
        self.adapter.persist_whole_roster(&next)?;
        self.players = next;
        self.invalidate_draw();
        Ok(())
    }

    fn invalidate_draw(&mut self) {
        if self.last_draw.is_some() && !self.draw_stale {
            debug!("Roster changed; previous draw is stale");
            self.draw_stale = true;
        }
    }

    fn discard_draw(&mut self) {
        self.last_draw = None;
        self.draw_stale = false;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
