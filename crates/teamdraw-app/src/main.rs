// Team draw entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the local database
// 4. Build the roster service client and session controller
// 5. Restore the cached session or load the local roster
// 6. Spawn the app loop and the console printer
// 7. Read commands from stdin until quit or EOF

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use teamdraw_app::app::{self, AppState};
use teamdraw_app::input::{self, HELP};
use teamdraw_app::protocol::UserCommand;
use teamdraw_app::render::render;
use teamdraw_core::config;
use teamdraw_core::controller::SessionController;
use teamdraw_core::db::{DurableStore, LocalDb};
use teamdraw_remote::HttpRosterService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Team draw starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: team size {}, roster service {}",
        config.draw.default_team_size, config.remote.base_url
    );

    let db_path = config.storage.resolve_db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = open_db(&db_path)?;
    info!("Database opened at {}", db_path.display());

    let service = Arc::new(HttpRosterService::new(config.remote.base_url.clone()));
    let mut controller = SessionController::new(
        db,
        config.storage.roster_key.clone(),
        config.storage.session_key.clone(),
        service,
        config.draw.default_team_size,
    );
    match controller.init().await {
        Ok(session_state) => info!("Starting in {:?} mode", session_state),
        Err(e) => {
            warn!("Signed in, but the account roster could not be loaded: {e}");
            println!("error: {e} (use `refresh` to retry)");
        }
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, AppState::new(controller)).await {
            error!("Application loop error: {}", e);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            println!("{}", render(&update));
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match input::parse_command(&line) {
            Ok(Some(cmd)) => {
                let quit = cmd == UserCommand::Quit;
                if cmd_tx.send(cmd).await.is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => println!("error: {e}"),
        }
    }

    // EOF without `quit` closes the channel, which also stops the loop.
    drop(cmd_tx);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
        let _ = printer.await;
    })
    .await;

    info!("Team draw shut down cleanly");
    Ok(())
}

fn open_db(path: &Path) -> anyhow::Result<Arc<dyn DurableStore>> {
    let db = LocalDb::open(&path.to_string_lossy()).context("failed to open database")?;
    Ok(Arc::new(db))
}

/// Initialize tracing to log to a file so stdout stays clean for commands.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("teamdraw.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("teamdraw=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
