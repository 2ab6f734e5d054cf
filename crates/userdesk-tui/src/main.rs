//! userdesk - a terminal console for a user-management REST API.
//!
//! Log in, then list, search, view, edit and delete users. Every protected
//! screen checks the stored session before it renders.

mod app;
mod ui;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use userdesk_core::auth::{validate_token, Clock, FileSessionStore, SessionStore, SystemClock};
use userdesk_core::config::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name inside the data directory
const LOG_FILE: &str = "userdesk.log";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a file in the data
/// directory. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if std::fs::create_dir_all(log_dir).is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring unreadable config: {}", e);
            Config::default()
        }
    };
    let data_dir = config
        .data_dir()
        .unwrap_or_else(|_| std::env::temp_dir().join("userdesk"));

    let _log_guard = init_tracing(&data_dir);
    info!("userdesk starting");

    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(data_dir));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        return run_command(&args[1], store.as_ref(), clock.as_ref());
    }

    let mut app = App::new(config, store, clock)?;
    match Config::default_path() {
        Ok(path) => app = app.with_config_path(path),
        Err(e) => warn!(error = %e, "Config changes will not be saved"),
    }
    app.start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("userdesk shutting down");
    Ok(())
}

/// Non-interactive commands
fn run_command(command: &str, store: &dyn SessionStore, clock: &dyn Clock) -> Result<()> {
    println!("{}", command_output(command, store, clock)?);
    Ok(())
}

/// The line a command prints
fn command_output(command: &str, store: &dyn SessionStore, clock: &dyn Clock) -> Result<String> {
    match command {
        "--session-status" => {
            // Same check the route guard runs; an invalid session is cleared
            let verdict = validate_token(store, clock.now_millis());
            Ok(verdict
                .message()
                .unwrap_or_else(|| "Session valid".to_string()))
        }
        "--logout" => {
            store.clear()?;
            Ok("Logged out successfully".to_string())
        }
        "--help" | "-h" => Ok("Usage: userdesk [--session-status | --logout]".to_string()),
        other => anyhow::bail!("Unknown argument: {} (try --help)", other),
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ignore key release events on platforms that report them
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
