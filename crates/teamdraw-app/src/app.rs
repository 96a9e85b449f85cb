// Application orchestrator: the single actor that owns the session
// controller.
//
// Commands arrive over an mpsc channel and are handled one at a time to
// completion, so a second roster mutation never starts while the first is
// still waiting on the roster service. The loop also watches the current
// session's revocation signal and signs out when it fires while idle.

use tokio::sync::mpsc;
use tracing::{info, warn};

use teamdraw_core::controller::SessionController;
use teamdraw_core::error::RosterError;
use teamdraw_core::player::PlayerId;
use teamdraw_core::session::{RevocationSignal, Session};

use crate::input::HELP;
use crate::protocol::{RosterSnapshot, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub controller: SessionController,
}

impl AppState {
    pub fn new(controller: SessionController) -> Self {
        Self { controller }
    }

    pub fn roster_snapshot(&self) -> RosterSnapshot {
        let store = self.controller.store();
        RosterSnapshot {
            players: store.list().to_vec(),
            mode: store.mode(),
            team_size: store.team_size(),
            present_count: store.present_count(),
            possible_team_count: store.possible_team_count(),
            draw_stale: store.is_draw_stale(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run until `Quit` arrives or the command channel closes.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");
    send_session(&state, &ui_tx).await;

    loop {
        // Re-subscribed every pass: login and logout swap the session.
        let mut revocation = state.controller.revocation_signal();

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = wait_revoked(&mut revocation) => {
                if state.controller.poll_revocation() {
                    let _ = ui_tx
                        .send(UiUpdate::Notice("Session revoked; signed out".into()))
                        .await;
                    send_session(&state, &ui_tx).await;
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn wait_revoked(signal: &mut Option<RevocationSignal>) {
    match signal {
        Some(signal) => signal.revoked().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Command handling
// ---------------------------------------------------------------------------

async fn handle_user_command(state: &mut AppState, cmd: UserCommand, ui_tx: &mpsc::Sender<UiUpdate>) {
    match cmd {
        UserCommand::Add { name, skill_level } => {
            let result = state
                .controller
                .add(&name, i64::from(skill_level.get()))
                .await
                .map(|p| format!("Added {} (id {}, skill {})", p.name, p.id, p.skill_level));
            report_mutation(state, result, ui_tx).await;
        }
        UserCommand::SetSkill { id, skill_level } => {
            let result = state
                .controller
                .update_skill(id, skill_level)
                .await
                .map(|p| format!("{} is now skill {}", p.name, p.skill_level));
            report_mutation(state, result, ui_tx).await;
        }
        UserCommand::Present(id) => set_presence(state, id, true, ui_tx).await,
        UserCommand::Absent(id) => set_presence(state, id, false, ui_tx).await,
        UserCommand::Remove(id) => {
            let result = state
                .controller
                .remove(id)
                .await
                .map(|p| format!("Removed {}", p.name));
            report_mutation(state, result, ui_tx).await;
        }
        UserCommand::SetTeamSize(team_size) => {
            let result = state
                .controller
                .set_team_size(team_size)
                .map(|()| format!("Team size set to {team_size}"));
            report_mutation(state, result, ui_tx).await;
        }
        UserCommand::LabelTeam { index, label } => {
            let result = state.controller.set_team_label(index, &label).map(|()| {
                if label.trim().is_empty() {
                    format!("Team {} label reset", index + 1)
                } else {
                    format!("Team {} will be called {}", index + 1, label.trim())
                }
            });
            match result {
                Ok(message) => send_notice(ui_tx, message).await,
                Err(e) => send_error(state, e, ui_tx).await,
            }
        }
        UserCommand::Draw { team_size } => {
            let result = state.controller.request_draw(team_size).cloned();
            match result {
                Ok(result) => {
                    let _ = ui_tx.send(UiUpdate::Draw(result)).await;
                }
                Err(e) => send_error(state, e, ui_tx).await,
            }
        }
        UserCommand::List => {
            let _ = ui_tx.send(UiUpdate::Roster(state.roster_snapshot())).await;
        }
        UserCommand::Share => match state.controller.store().current_draw() {
            Some(draw) => {
                let _ = ui_tx.send(UiUpdate::ShareText(draw.share_text())).await;
            }
            None => {
                let _ = ui_tx
                    .send(UiUpdate::Error(
                        "No current draw to share; run `draw` first".into(),
                    ))
                    .await;
            }
        },
        UserCommand::Login {
            account_id,
            credential,
            email,
        } => {
            let session = Session {
                account_id,
                email,
                credential,
            };
            match state.controller.login(session).await {
                Ok(count) => {
                    send_notice(ui_tx, format!("Signed in to account {account_id} ({count} players)")).await;
                    send_session(state, ui_tx).await;
                }
                Err(e) => {
                    warn!("Login failed: {e}");
                    let _ = ui_tx.send(UiUpdate::Error(format!("Login failed: {e}"))).await;
                }
            }
        }
        UserCommand::Logout => {
            if state.controller.state().is_authenticated() {
                state.controller.logout();
                send_notice(ui_tx, "Signed out".into()).await;
                send_session(state, ui_tx).await;
            } else {
                send_notice(ui_tx, "Not signed in".into()).await;
            }
        }
        UserCommand::Refresh => {
            let result = state
                .controller
                .refresh()
                .await
                .map(|count| format!("Roster refreshed ({count} players)"));
            report_mutation(state, result, ui_tx).await;
        }
        UserCommand::Help => send_notice(ui_tx, HELP.into()).await,
        // Handled by the loop.
        UserCommand::Quit => {}
    }
}

async fn set_presence(state: &mut AppState, id: PlayerId, present: bool, ui_tx: &mpsc::Sender<UiUpdate>) {
    let result = state
        .controller
        .set_presence(id, present)
        .await
        .map(|p| format!("{} is {}", p.name, if p.present { "present" } else { "absent" }));
    report_mutation(state, result, ui_tx).await;
}

/// After a roster change: a notice plus a fresh snapshot, or the error.
async fn report_mutation(
    state: &AppState,
    result: Result<String, RosterError>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match result {
        Ok(message) => {
            send_notice(ui_tx, message).await;
            let _ = ui_tx.send(UiUpdate::Roster(state.roster_snapshot())).await;
        }
        Err(e) => send_error(state, e, ui_tx).await,
    }
}

/// Report a failure. An expired session has already been signed out by the
/// controller, so the new status and the cleared roster follow the error.
async fn send_error(state: &AppState, err: RosterError, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx.send(UiUpdate::Error(err.to_string())).await;
    if err.is_session_expired() {
        send_session(state, ui_tx).await;
    }
}

async fn send_notice(ui_tx: &mpsc::Sender<UiUpdate>, message: String) {
    let _ = ui_tx.send(UiUpdate::Notice(message)).await;
}

async fn send_session(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::SessionStatus(state.controller.state().clone()))
        .await;
    let _ = ui_tx.send(UiUpdate::Roster(state.roster_snapshot())).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use teamdraw_core::db::{DurableStore, LocalDb};
    use teamdraw_core::error::ServiceError;
    use teamdraw_core::persistence::{PlayerPatch, RemotePlayer, RosterService};
    use teamdraw_core::player::{SkillLevel, SourceMode};
    use teamdraw_core::session::SessionState;

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    /// Single-account service; `reject` makes every call Unauthorized.
    #[derive(Default)]
    struct StubService {
        players: Mutex<Vec<RemotePlayer>>,
        reject: Mutex<bool>,
    }

    impl StubService {
        fn check(&self) -> Result<(), ServiceError> {
            if *self.reject.lock().unwrap() {
                Err(ServiceError::Unauthorized)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RosterService for StubService {
        async fn list_players(&self, _: &Session) -> Result<Vec<RemotePlayer>, ServiceError> {
            self.check()?;
            Ok(self.players.lock().unwrap().clone())
        }

        async fn create_player(
            &self,
            _: &Session,
            name: &str,
            level: u8,
        ) -> Result<RemotePlayer, ServiceError> {
            self.check()?;
            let mut players = self.players.lock().unwrap();
            let player = RemotePlayer {
                id: players.len() as i64 + 1,
                name: name.to_string(),
                level: i64::from(level),
                present: true,
            };
            players.push(player.clone());
            Ok(player)
        }

        async fn update_player(
            &self,
            _: &Session,
            id: i64,
            patch: &PlayerPatch,
        ) -> Result<RemotePlayer, ServiceError> {
            self.check()?;
            let mut players = self.players.lock().unwrap();
            let player = players
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(ServiceError::NotFound)?;
            if let Some(present) = patch.present {
                player.present = present;
            }
            if let Some(level) = patch.level {
                player.level = i64::from(level);
            }
            Ok(player.clone())
        }

        async fn delete_player(&self, _: &Session, id: i64) -> Result<(), ServiceError> {
            self.check()?;
            self.players.lock().unwrap().retain(|p| p.id != id);
            Ok(())
        }
    }

    fn test_state(service: Arc<StubService>) -> AppState {
        let durable: Arc<dyn DurableStore> = Arc::new(LocalDb::open(":memory:").unwrap());
        AppState::new(SessionController::new(durable, "roster", "session", service, 2))
    }

    struct Harness {
        cmd_tx: mpsc::Sender<UserCommand>,
        ui_rx: mpsc::Receiver<UiUpdate>,
        handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    }

    impl Harness {
        /// Spawn the loop and consume the initial status and roster.
        async fn start(state: AppState) -> Self {
            let (cmd_tx, cmd_rx) = mpsc::channel(16);
            let (ui_tx, ui_rx) = mpsc::channel(64);
            let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
            let mut harness = Harness {
                cmd_tx,
                ui_rx,
                handle,
            };
            assert!(matches!(harness.next().await, UiUpdate::SessionStatus(_)));
            assert!(matches!(harness.next().await, UiUpdate::Roster(_)));
            harness
        }

        async fn send(&self, cmd: UserCommand) {
            self.cmd_tx.send(cmd).await.unwrap();
        }

        async fn next(&mut self) -> UiUpdate {
            self.ui_rx.recv().await.expect("ui channel closed")
        }

        async fn next_roster(&mut self) -> RosterSnapshot {
            loop {
                if let UiUpdate::Roster(snapshot) = self.next().await {
                    return snapshot;
                }
            }
        }

        async fn add(&mut self, name: &str, skill: i64) {
            self.send(UserCommand::Add {
                name: name.into(),
                skill_level: SkillLevel::new(skill).unwrap(),
            })
            .await;
            assert!(matches!(self.next().await, UiUpdate::Notice(_)));
            assert!(matches!(self.next().await, UiUpdate::Roster(_)));
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_then_list_shows_player() {
        let mut h = Harness::start(test_state(Arc::default())).await;

        h.add("Ana", 4).await;
        h.send(UserCommand::List).await;

        let snapshot = h.next_roster().await;
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, "Ana");
        assert_eq!(snapshot.mode, SourceMode::Local);
        assert_eq!(snapshot.present_count, 1);
    }

    #[tokio::test]
    async fn draw_and_share() {
        let mut h = Harness::start(test_state(Arc::default())).await;
        for (name, skill) in [("A", 5), ("B", 4), ("C", 3), ("D", 2)] {
            h.add(name, skill).await;
        }

        h.send(UserCommand::Draw { team_size: None }).await;
        let UiUpdate::Draw(result) = h.next().await else {
            panic!("expected draw result");
        };
        assert_eq!(result.teams.len(), 2);
        assert_eq!(result.teams[0].skill_total, 7);
        assert_eq!(result.teams[1].skill_total, 7);

        h.send(UserCommand::Share).await;
        let UiUpdate::ShareText(text) = h.next().await else {
            panic!("expected share text");
        };
        assert!(text.starts_with("*Team 1*\nA\nD\n"));
    }

    #[tokio::test]
    async fn draw_with_too_few_players_reports_error() {
        let mut h = Harness::start(test_state(Arc::default())).await;
        h.add("Ana", 4).await;

        h.send(UserCommand::Draw { team_size: Some(3) }).await;

        let UiUpdate::Error(message) = h.next().await else {
            panic!("expected error");
        };
        assert!(message.contains("2 missing"));
    }

    #[tokio::test]
    async fn share_without_draw_is_error() {
        let mut h = Harness::start(test_state(Arc::default())).await;

        h.send(UserCommand::Share).await;

        assert!(matches!(h.next().await, UiUpdate::Error(_)));
    }

    #[tokio::test]
    async fn login_switches_to_account_roster() {
        let service = Arc::new(StubService::default());
        service.players.lock().unwrap().push(RemotePlayer {
            id: 1,
            name: "Remote Ana".into(),
            level: 5,
            present: true,
        });
        let mut h = Harness::start(test_state(service)).await;
        h.add("Local Bia", 2).await;

        h.send(UserCommand::Login {
            account_id: 8,
            credential: "tok".into(),
            email: None,
        })
        .await;

        assert!(matches!(h.next().await, UiUpdate::Notice(_)));
        assert_eq!(
            h.next().await,
            UiUpdate::SessionStatus(SessionState::Authenticated { account_id: 8 })
        );
        let snapshot = h.next_roster().await;
        assert_eq!(snapshot.mode, SourceMode::Remote);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, "Remote Ana");
    }

    #[tokio::test]
    async fn rejected_credential_signs_out_with_empty_roster() {
        let service = Arc::new(StubService::default());
        let mut state = test_state(service.clone());
        state.controller.login(Session {
            account_id: 8,
            email: None,
            credential: "tok".into(),
        })
        .await
        .unwrap();
        let mut h = Harness::start(state).await;

        *service.reject.lock().unwrap() = true;
        h.send(UserCommand::Add {
            name: "Duda".into(),
            skill_level: SkillLevel::default(),
        })
        .await;

        assert!(matches!(h.next().await, UiUpdate::Error(_)));
        assert_eq!(h.next().await, UiUpdate::SessionStatus(SessionState::Anonymous));
        let snapshot = h.next_roster().await;
        assert!(snapshot.players.is_empty());
        assert_eq!(snapshot.mode, SourceMode::Local);
    }

    #[tokio::test]
    async fn idle_revocation_signs_out() {
        let mut state = test_state(Arc::default());
        state.controller.login(Session {
            account_id: 8,
            email: None,
            credential: "tok".into(),
        })
        .await
        .unwrap();
        let handle = state.controller.revocation_handle().unwrap();
        let mut h = Harness::start(state).await;

        handle.revoke();

        assert!(matches!(h.next().await, UiUpdate::Notice(_)));
        assert_eq!(h.next().await, UiUpdate::SessionStatus(SessionState::Anonymous));
    }

    #[tokio::test]
    async fn refresh_while_anonymous_is_error() {
        let mut h = Harness::start(test_state(Arc::default())).await;

        h.send(UserCommand::Refresh).await;

        let UiUpdate::Error(message) = h.next().await else {
            panic!("expected error");
        };
        assert!(message.contains("authenticated"));
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let h = Harness::start(test_state(Arc::default())).await;

        h.send(UserCommand::Quit).await;

        h.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closing_command_channel_stops_the_loop() {
        let Harness { cmd_tx, handle, .. } = Harness::start(test_state(Arc::default())).await;

        drop(cmd_tx);

        handle.await.unwrap().unwrap();
    }
}
