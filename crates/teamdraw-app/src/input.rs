// Console line parsing.
//
// Turns one line typed by the organizer into a UserCommand, or an InputError
// carrying the usage string for the command that was misused.

use thiserror::Error;

use teamdraw_core::player::{PlayerId, SkillLevel, ValidationError};

use crate::protocol::UserCommand;

pub const HELP: &str = "\
commands:
  add <name>[, skill]        add a player (numeric skill 1-5, default 3)
  skill <id> <level>         change a player's skill level
  present <id> | absent <id> mark attendance
  remove <id>                delete a player
  size <n>                   players per team
  label <team#> [name]       name a team (blank restores the default)
  draw [size]                draw balanced teams
  share                      text of the current draw
  list                       show the roster
  login <account> <token> [email]
  logout | refresh | help | quit";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "add" => parse_add(rest)?,
        "skill" => {
            const USAGE: &str = "skill <id> <level>";
            let mut args = rest.split_whitespace();
            let id = parse_id(args.next(), USAGE)?;
            let skill_level = args
                .next()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(InputError::Usage(USAGE))?;
            UserCommand::SetSkill { id, skill_level }
        }
        "present" => UserCommand::Present(parse_id(single(rest), "present <id>")?),
        "absent" => UserCommand::Absent(parse_id(single(rest), "absent <id>")?),
        "remove" | "rm" => UserCommand::Remove(parse_id(single(rest), "remove <id>")?),
        "size" => {
            let n = single(rest)
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or(InputError::Usage("size <n>"))?;
            UserCommand::SetTeamSize(n)
        }
        "label" => parse_label(rest)?,
        "draw" => {
            let team_size = match single(rest) {
                None if rest.is_empty() => None,
                Some(s) => Some(s.parse::<usize>().map_err(|_| InputError::Usage("draw [size]"))?),
                None => return Err(InputError::Usage("draw [size]")),
            };
            UserCommand::Draw { team_size }
        }
        "list" | "ls" => UserCommand::List,
        "share" => UserCommand::Share,
        "login" => parse_login(rest)?,
        "logout" => UserCommand::Logout,
        "refresh" => UserCommand::Refresh,
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(cmd))
}

/// `add <name>[, skill]`. The text after the last comma is the skill only
/// when it is a number; otherwise it stays part of the name and the skill
/// falls back to the default.
fn parse_add(rest: &str) -> Result<UserCommand, InputError> {
    let (name, skill_level) = match rest.rsplit_once(',') {
        Some((name, skill)) if skill.trim().parse::<i64>().is_ok() => {
            (name.trim(), SkillLevel::parse_input(skill)?)
        }
        _ => (rest, SkillLevel::default()),
    };
    if name.is_empty() {
        return Err(InputError::Usage("add <name>[, skill]"));
    }
    Ok(UserCommand::Add {
        name: name.to_string(),
        skill_level,
    })
}

/// `label <team#> [name]`, with teams numbered from 1 as displayed.
fn parse_label(rest: &str) -> Result<UserCommand, InputError> {
    const USAGE: &str = "label <team#> [name]";
    let (number, label) = match rest.split_once(char::is_whitespace) {
        Some((number, label)) => (number, label.trim()),
        None => (rest, ""),
    };
    let index = match number.parse::<usize>() {
        Ok(n) if n >= 1 => n - 1,
        _ => return Err(InputError::Usage(USAGE)),
    };
    Ok(UserCommand::LabelTeam {
        index,
        label: label.to_string(),
    })
}

fn parse_login(rest: &str) -> Result<UserCommand, InputError> {
    const USAGE: &str = "login <account> <token> [email]";
    let mut args = rest.split_whitespace();
    let account_id = args
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(InputError::Usage(USAGE))?;
    let credential = args.next().ok_or(InputError::Usage(USAGE))?.to_string();
    let email = args.next().map(String::from);
    if args.next().is_some() {
        return Err(InputError::Usage(USAGE));
    }
    Ok(UserCommand::Login {
        account_id,
        credential,
        email,
    })
}

fn parse_id(arg: Option<&str>, usage: &'static str) -> Result<PlayerId, InputError> {
    arg.and_then(|s| s.parse::<i64>().ok())
        .map(PlayerId)
        .ok_or(InputError::Usage(usage))
}

/// The argument if there is exactly one.
fn single(rest: &str) -> Option<&str> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next()) {
        (Some(arg), None) => Some(arg),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> UserCommand {
        parse_command(line).unwrap().unwrap()
    }

    fn skill(n: i64) -> SkillLevel {
        SkillLevel::new(n).unwrap()
    }

    // -- add --

    #[test]
    fn add_with_skill() {
        assert_eq!(
            parse("add Ana Souza, 4"),
            UserCommand::Add {
                name: "Ana Souza".into(),
                skill_level: skill(4)
            }
        );
    }

    #[test]
    fn add_without_skill_uses_default() {
        assert_eq!(
            parse("add Bia"),
            UserCommand::Add {
                name: "Bia".into(),
                skill_level: skill(3)
            }
        );
    }

    #[test]
    fn add_with_non_numeric_suffix_keeps_it_in_the_name() {
        assert_eq!(
            parse("add Smith, Jr"),
            UserCommand::Add {
                name: "Smith, Jr".into(),
                skill_level: skill(3)
            }
        );
    }

    #[test]
    fn add_uses_only_the_last_comma_for_skill() {
        assert_eq!(
            parse("add Smith, Jr, 5"),
            UserCommand::Add {
                name: "Smith, Jr".into(),
                skill_level: skill(5)
            }
        );
    }

    #[test]
    fn add_with_out_of_range_skill_is_rejected() {
        assert_eq!(
            parse_command("add Caio, 7"),
            Err(InputError::Invalid(ValidationError::SkillOutOfRange(7)))
        );
    }

    #[test]
    fn add_without_name_is_usage_error() {
        assert!(matches!(parse_command("add"), Err(InputError::Usage(_))));
        assert!(matches!(parse_command("add , 3"), Err(InputError::Usage(_))));
    }

    // -- id commands --

    #[test]
    fn id_commands() {
        assert_eq!(parse("present 17"), UserCommand::Present(PlayerId(17)));
        assert_eq!(parse("absent 17"), UserCommand::Absent(PlayerId(17)));
        assert_eq!(parse("rm 17"), UserCommand::Remove(PlayerId(17)));
        assert_eq!(
            parse("skill 17 5"),
            UserCommand::SetSkill {
                id: PlayerId(17),
                skill_level: 5
            }
        );
    }

    #[test]
    fn skill_value_is_passed_through_for_validation() {
        assert_eq!(
            parse("skill 17 9"),
            UserCommand::SetSkill {
                id: PlayerId(17),
                skill_level: 9
            }
        );
        assert!(matches!(parse_command("skill 17 high"), Err(InputError::Usage(_))));
    }

    #[test]
    fn bad_id_is_usage_error() {
        assert!(matches!(parse_command("present"), Err(InputError::Usage(_))));
        assert!(matches!(parse_command("remove abc"), Err(InputError::Usage(_))));
        assert!(matches!(parse_command("absent 1 2"), Err(InputError::Usage(_))));
    }

    // -- team settings and draw --

    #[test]
    fn size_and_draw() {
        assert_eq!(parse("size 5"), UserCommand::SetTeamSize(5));
        assert_eq!(parse("draw"), UserCommand::Draw { team_size: None });
        assert_eq!(parse("draw 4"), UserCommand::Draw { team_size: Some(4) });
        assert!(matches!(parse_command("draw four"), Err(InputError::Usage(_))));
        assert!(matches!(parse_command("size"), Err(InputError::Usage(_))));
    }

    #[test]
    fn label_is_one_based() {
        assert_eq!(
            parse("label 2 Blue Shirts"),
            UserCommand::LabelTeam {
                index: 1,
                label: "Blue Shirts".into()
            }
        );
        assert_eq!(
            parse("label 1"),
            UserCommand::LabelTeam {
                index: 0,
                label: String::new()
            }
        );
        assert!(matches!(parse_command("label 0 Red"), Err(InputError::Usage(_))));
    }

    // -- session --

    #[test]
    fn login_with_and_without_email() {
        assert_eq!(
            parse("login 42 tok"),
            UserCommand::Login {
                account_id: 42,
                credential: "tok".into(),
                email: None
            }
        );
        assert_eq!(
            parse("login 42 tok org@example.com"),
            UserCommand::Login {
                account_id: 42,
                credential: "tok".into(),
                email: Some("org@example.com".into())
            }
        );
        assert!(matches!(parse_command("login tok"), Err(InputError::Usage(_))));
    }

    // -- misc --

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse("LIST"), UserCommand::List);
        assert_eq!(parse("Quit"), UserCommand::Quit);
    }

    #[test]
    fn blank_line_is_none() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn unknown_verb() {
        assert_eq!(
            parse_command("shuffle"),
            Err(InputError::Unknown("shuffle".into()))
        );
    }
}
