// Plain-text rendering of UiUpdate messages for the console.

use teamdraw_core::draw::DrawResult;
use teamdraw_core::player::SourceMode;
use teamdraw_core::session::SessionState;

use crate::protocol::{RosterSnapshot, UiUpdate};

pub fn render(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Roster(snapshot) => render_roster(snapshot),
        UiUpdate::Draw(result) => render_draw(result),
        UiUpdate::ShareText(text) => text.trim_end().to_string(),
        UiUpdate::SessionStatus(SessionState::Anonymous) => {
            "[session] anonymous (roster kept on this device)".to_string()
        }
        UiUpdate::SessionStatus(SessionState::Authenticated { account_id }) => {
            format!("[session] signed in to account {account_id}")
        }
        UiUpdate::Notice(message) => message.clone(),
        UiUpdate::Error(message) => format!("error: {message}"),
    }
}

fn render_roster(snapshot: &RosterSnapshot) -> String {
    let source = match snapshot.mode {
        SourceMode::Local => "local",
        SourceMode::Remote => "account",
    };
    let mut out = format!(
        "Roster ({source}): {} players, {} present, team size {}, {} full teams possible",
        snapshot.players.len(),
        snapshot.present_count,
        snapshot.team_size,
        snapshot.possible_team_count
    );
    if snapshot.draw_stale {
        out.push_str("\n(roster changed since the last draw)");
    }
    for player in &snapshot.players {
        out.push_str(&format!(
            "\n  {:>15}  {:<24} skill {}  {}",
            player.id.0,
            player.name,
            player.skill_level,
            if player.present { "present" } else { "absent" }
        ));
    }
    out
}

fn render_draw(result: &DrawResult) -> String {
    let mut out = String::new();
    for team in &result.teams {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{} (total {})", team.label, team.skill_total));
        for member in &team.members {
            out.push_str(&format!("\n  {} ({})", member.name, member.skill_level));
        }
    }
    if !result.reserves.is_empty() {
        out.push_str("\nReserves");
        for reserve in &result.reserves {
            out.push_str(&format!("\n  {} ({})", reserve.name, reserve.skill_level));
        }
    }
    out.push_str(&format!("\nSkill spread: {}", result.skill_spread()));
    out
}
