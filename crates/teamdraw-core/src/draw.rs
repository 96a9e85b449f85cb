// Balanced team draw: deterministic snake draft over present players.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::player::Player;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("team size must be at least 1")]
    InvalidTeamSize,

    #[error("need at least {team_size} present players to form a team, have {present} ({missing} missing)")]
    InsufficientPlayers {
        present: usize,
        team_size: usize,
        missing: usize,
    },
}

/// One team produced by a draw. Members are in pick order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub label: String,
    pub members: Vec<Player>,
    pub skill_total: u32,
}

/// Teams plus the present players left out of them. Recomputed from scratch
/// on every draw; never merged with an earlier result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawResult {
    pub teams: Vec<Team>,
    pub reserves: Vec<Player>,
}

/// Organizer-supplied team names keyed by team position.
pub type TeamLabels = BTreeMap<usize, String>;

/// Default label for the team at `index` (zero-based).
pub fn default_label(index: usize) -> String {
    format!("Team {}", index + 1)
}

// ---------------------------------------------------------------------------
// Draw
// ---------------------------------------------------------------------------

/// Draw teams of `team_size` with default labels.
pub fn draw(players: &[Player], team_size: usize) -> Result<DrawResult, DrawError> {
    draw_with_labels(players, team_size, &TeamLabels::new())
}

/// Split the present players of `players` into `floor(present / team_size)`
/// teams of exactly `team_size`, plus reserves.
///
/// Players are ranked by skill, highest first, with ties kept in roster
/// order. The top `teams * team_size` are handed out in snake order
/// (0, 1, .., n-1, n-1, .., 1, 0, 0, 1, ..) so the boundary team always gets
/// two consecutive picks at a turn. Everyone below the cut is a reserve.
pub fn draw_with_labels(
    players: &[Player],
    team_size: usize,
    labels: &TeamLabels,
) -> Result<DrawResult, DrawError> {
    if team_size == 0 {
        return Err(DrawError::InvalidTeamSize);
    }

    let mut ranked: Vec<&Player> = players.iter().filter(|p| p.present).collect();
    let present = ranked.len();
    if present < team_size {
        return Err(DrawError::InsufficientPlayers {
            present,
            team_size,
            missing: team_size - present,
        });
    }

    let num_teams = present / team_size;
    let required = num_teams * team_size;

    // sort_by is stable: equal skills keep roster order.
    ranked.sort_by(|a, b| b.skill_level.cmp(&a.skill_level));
    let (drafted, reserves) = ranked.split_at(required);

    let mut teams: Vec<Team> = (0..num_teams)
        .map(|i| Team {
            label: labels
                .get(&i)
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| default_label(i)),
            members: Vec::with_capacity(team_size),
            skill_total: 0,
        })
        .collect();

    let last = num_teams as isize - 1;
    let mut direction: isize = 1;
    let mut index: isize = 0;

    for player in drafted {
        let team = &mut teams[index as usize];
        team.members.push((*player).clone());
        team.skill_total += u32::from(player.skill_level.get());

        index += direction;
        if index > last {
            index = last;
            direction = -1;
        } else if index < 0 {
            index = 0;
            direction = 1;
        }
    }

    Ok(DrawResult {
        teams,
        reserves: reserves.iter().map(|p| (*p).clone()).collect(),
    })
}

impl DrawResult {
    /// Largest difference in skill total between any two teams.
    pub fn skill_spread(&self) -> u32 {
        let max = self.teams.iter().map(|t| t.skill_total).max().unwrap_or(0);
        let min = self.teams.iter().map(|t| t.skill_total).min().unwrap_or(0);
        max - min
    }

    /// Plain-text rendering for pasting into a group chat.
    pub fn share_text(&self) -> String {
        let mut text = String::new();
        for (i, team) in self.teams.iter().enumerate() {
            text.push_str(&format!("*{}*\n", team.label));
            for member in &team.members {
                text.push_str(&member.name);
                text.push('\n');
            }
            if i + 1 < self.teams.len() {
                text.push('\n');
            }
        }

        if !self.reserves.is_empty() {
            text.push_str("\n*Reserves*\n");
            for reserve in &self.reserves {
                text.push_str(&reserve.name);
                text.push('\n');
            }
        }

        text
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerId, SkillLevel, SourceMode};

    fn player(id: i64, name: &str, skill: i64) -> Player {
        Player::new(
            PlayerId(id),
            name.to_string(),
            SkillLevel::new(skill).unwrap(),
            SourceMode::Local,
        )
    }

    fn names(players: &[Player]) -> Vec<&str> {
        players.iter().map(|p| p.name.as_str()).collect()
    }

    fn six_players() -> Vec<Player> {
        vec![
            player(1, "A", 5),
            player(2, "B", 4),
            player(3, "C", 3),
            player(4, "D", 2),
            player(5, "E", 1),
            player(6, "F", 1),
        ]
    }

    /// Round-robin over the same ranking, for comparison with the snake.
    fn round_robin_spread(players: &[Player], team_size: usize) -> u32 {
        let mut ranked: Vec<&Player> = players.iter().filter(|p| p.present).collect();
        ranked.sort_by(|a, b| b.skill_level.cmp(&a.skill_level));
        let num_teams = ranked.len() / team_size;
        let mut totals = vec![0u32; num_teams];
        for (i, p) in ranked.iter().take(num_teams * team_size).enumerate() {
            totals[i % num_teams] += u32::from(p.skill_level.get());
        }
        totals.iter().max().unwrap() - totals.iter().min().unwrap()
    }

    #[test]
    fn six_players_two_teams_of_three() {
        let result = draw(&six_players(), 3).unwrap();

        assert_eq!(result.teams.len(), 2);
        assert_eq!(names(&result.teams[0].members), vec!["A", "D", "E"]);
        assert_eq!(names(&result.teams[1].members), vec!["B", "C", "F"]);
        assert_eq!(result.teams[0].skill_total, 8);
        assert_eq!(result.teams[1].skill_total, 8);
        assert!(result.reserves.is_empty());
    }

    #[test]
    fn seventh_player_becomes_sole_reserve() {
        let mut players = six_players();
        players.push(player(7, "G", 1));

        let result = draw(&players, 3).unwrap();

        assert_eq!(result.teams.len(), 2);
        // E, F and G all have skill 1; G was added last so it drops out.
        assert_eq!(names(&result.reserves), vec!["G"]);
    }

    #[test]
    fn reserve_tie_broken_by_roster_order() {
        let players = vec![
            player(1, "Late", 2),
            player(2, "Top", 5),
            player(3, "Early", 2),
        ];

        let result = draw(&players, 2).unwrap();

        assert_eq!(names(&result.teams[0].members), vec!["Top", "Late"]);
        assert_eq!(names(&result.reserves), vec!["Early"]);
    }

    #[test]
    fn insufficient_players_reports_missing_count() {
        let players = vec![player(1, "A", 3), player(2, "B", 3)];

        let err = draw(&players, 5).unwrap_err();

        assert_eq!(
            err,
            DrawError::InsufficientPlayers {
                present: 2,
                team_size: 5,
                missing: 3,
            }
        );
    }

    #[test]
    fn absent_players_are_ignored() {
        let mut players = six_players();
        players[0].present = false;
        players[1].present = false;

        let result = draw(&players, 2).unwrap();

        let drafted: Vec<&str> = result
            .teams
            .iter()
            .flat_map(|t| t.members.iter().map(|p| p.name.as_str()))
            .collect();
        assert!(!drafted.contains(&"A"));
        assert!(!drafted.contains(&"B"));
        assert_eq!(drafted.len(), 4);
    }

    #[test]
    fn absent_players_can_cause_insufficient() {
        let mut players = six_players();
        for p in players.iter_mut().skip(1) {
            p.present = false;
        }

        assert!(matches!(
            draw(&players, 2),
            Err(DrawError::InsufficientPlayers { present: 1, .. })
        ));
    }

    #[test]
    fn zero_team_size_rejected() {
        assert_eq!(draw(&six_players(), 0), Err(DrawError::InvalidTeamSize));
    }

    #[test]
    fn team_size_one_puts_everyone_in_own_team() {
        let result = draw(&six_players(), 1).unwrap();
        assert_eq!(result.teams.len(), 6);
        assert!(result.teams.iter().all(|t| t.members.len() == 1));
        assert!(result.reserves.is_empty());
    }

    #[test]
    fn single_team_takes_everyone_above_cut() {
        let result = draw(&six_players(), 4).unwrap();
        assert_eq!(result.teams.len(), 1);
        assert_eq!(names(&result.teams[0].members), vec!["A", "B", "C", "D"]);
        assert_eq!(names(&result.reserves), vec!["E", "F"]);
    }

    #[test]
    fn three_teams_follow_snake_order() {
        let players: Vec<Player> = (0..9)
            .map(|i| player(i, &format!("P{i}"), 5 - (i / 2).min(4)))
            .collect();

        let result = draw(&players, 3).unwrap();

        // Order 0,1,2,2,1,0,0,1,2 over P0..P8.
        assert_eq!(names(&result.teams[0].members), vec!["P0", "P5", "P6"]);
        assert_eq!(names(&result.teams[1].members), vec!["P1", "P4", "P7"]);
        assert_eq!(names(&result.teams[2].members), vec!["P2", "P3", "P8"]);
    }

    #[test]
    fn every_present_player_appears_exactly_once() {
        let players: Vec<Player> = (0..23)
            .map(|i| {
                let mut p = player(i, &format!("P{i}"), (i % 5) + 1);
                p.present = i % 7 != 0;
                p
            })
            .collect();

        for team_size in 1..=8 {
            let result = draw(&players, team_size).unwrap();
            let mut seen: Vec<PlayerId> = result
                .teams
                .iter()
                .flat_map(|t| t.members.iter().map(|p| p.id))
                .chain(result.reserves.iter().map(|p| p.id))
                .collect();
            seen.sort();
            let mut expected: Vec<PlayerId> =
                players.iter().filter(|p| p.present).map(|p| p.id).collect();
            expected.sort();
            assert_eq!(seen, expected, "team_size={team_size}");
            assert!(result.teams.iter().all(|t| t.members.len() == team_size));
        }
    }

    #[test]
    fn draw_is_deterministic() {
        let players: Vec<Player> = (0..17)
            .map(|i| player(i, &format!("P{i}"), (i * 3 % 5) + 1))
            .collect();

        let first = draw(&players, 4).unwrap();
        let second = draw(&players, 4).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn spread_within_worst_case_bound_and_no_worse_than_round_robin() {
        let players: Vec<Player> = (0..20)
            .map(|i| player(i, &format!("P{i}"), ((i * 7) % 5) + 1))
            .collect();

        for team_size in 2..=5 {
            let result = draw(&players, team_size).unwrap();
            let drafted: Vec<u32> = result
                .teams
                .iter()
                .flat_map(|t| t.members.iter().map(|p| u32::from(p.skill_level.get())))
                .collect();
            let max = *drafted.iter().max().unwrap();
            let min = *drafted.iter().min().unwrap();

            assert!(result.skill_spread() <= team_size as u32 * (max - min));
            assert!(result.skill_spread() <= round_robin_spread(&players, team_size));
        }
    }

    #[test]
    fn skill_totals_match_members() {
        let result = draw(&six_players(), 2).unwrap();
        for team in &result.teams {
            let sum: u32 = team
                .members
                .iter()
                .map(|p| u32::from(p.skill_level.get()))
                .sum();
            assert_eq!(team.skill_total, sum);
        }
    }

    #[test]
    fn custom_labels_override_defaults() {
        let mut labels = TeamLabels::new();
        labels.insert(1, "Blue".to_string());
        labels.insert(0, "   ".to_string());

        let result = draw_with_labels(&six_players(), 3, &labels).unwrap();

        assert_eq!(result.teams[0].label, "Team 1");
        assert_eq!(result.teams[1].label, "Blue");
    }

    #[test]
    fn share_text_lists_teams_and_reserves() {
        let mut players = six_players();
        players.push(player(7, "G", 1));

        let text = draw(&players, 3).unwrap().share_text();

        assert_eq!(
            text,
            "*Team 1*\nA\nD\nE\n\n*Team 2*\nB\nC\nF\n\n*Reserves*\nG\n"
        );
    }

    #[test]
    fn share_text_without_reserves_has_no_reserve_section() {
        let text = draw(&six_players(), 3).unwrap().share_text();
        assert!(!text.contains("Reserves"));
        assert!(text.ends_with("F\n"));
    }
}
