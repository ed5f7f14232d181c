mod api;
mod app;
mod config;
mod error;
mod files;
mod ingest;
mod models;
mod parser;
mod session;
mod store;
mod ui;
mod views;

use crate::api::StoreClient;
use crate::app::App;
use crate::config::Config;
use crate::error::{AppError, ConfigError};
use crate::session::Session;
use crate::store::RemoteStore;
use crate::ui::run_app;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// The UI owns the terminal, so logs only go to a file.
fn init_tracing(config: &Config) -> Result<WorkerGuard, ConfigError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(&config.logging.level)
            .map_err(|e| ConfigError::Logging(e.to_string()))?,
    };

    let dir = config.log_directory();
    std::fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::never(dir, "taskpad.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

async fn open_session(store: &StoreClient, config: &Config) -> Session {
    let theme = config.ui.theme;
    let (Some(email), Some(password)) = (&config.account.email, &config.account.password) else {
        info!("no account configured, continuing as guest");
        return Session::new(None, theme);
    };

    if let Err(err) = store.sign_in(email, password).await {
        warn!("sign in failed, continuing as guest: {}", err);
        return Session::new(None, theme);
    }
    match store.current_user().await {
        Ok(user) => Session::new(user, theme),
        Err(err) => {
            warn!("could not load current user: {}", err);
            Session::new(None, theme)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = config::default_path();
    let config = Config::load(config_path.as_deref())?;
    let _guard = init_tracing(&config)?;

    let store = StoreClient::new(
        &config.backend.url,
        &config.backend.anon_key,
        Duration::from_secs(config.backend.timeout_secs),
    )?;
    let session = open_session(&store, &config).await;
    info!(user = session.display_name(), "starting");

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let app = App::new(session, config, config_path);

    let res = run_app(&mut terminal, app, &store).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
