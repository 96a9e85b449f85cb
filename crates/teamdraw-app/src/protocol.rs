// Messages between the console front end and the application loop.

use teamdraw_core::draw::DrawResult;
use teamdraw_core::player::{Player, PlayerId, SkillLevel, SourceMode};
use teamdraw_core::session::SessionState;

/// A request from the organizer, handled to completion before the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Add { name: String, skill_level: SkillLevel },
    SetSkill { id: PlayerId, skill_level: i64 },
    Present(PlayerId),
    Absent(PlayerId),
    Remove(PlayerId),
    SetTeamSize(usize),
    /// `index` is zero-based.
    LabelTeam { index: usize, label: String },
    /// `None` draws with the selected team size.
    Draw { team_size: Option<usize> },
    List,
    Share,
    Login {
        account_id: i64,
        credential: String,
        email: Option<String>,
    },
    Logout,
    Refresh,
    Help,
    Quit,
}

/// Point-in-time view of the roster for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    pub players: Vec<Player>,
    pub mode: SourceMode,
    pub team_size: usize,
    pub present_count: usize,
    pub possible_team_count: usize,
    pub draw_stale: bool,
}

/// Output from the application loop to the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    Roster(RosterSnapshot),
    Draw(DrawResult),
    ShareText(String),
    SessionStatus(SessionState),
    Notice(String),
    Error(String),
}
