//! `cask` — terminal UI for the Cask beer catalog.
//!
//! # Usage
//!
//! ```
//! cask --url https://backend.example.com --key <apikey> --user <uuid>
//! cask --config ~/.config/cask/config.toml
//! ```

mod app;
mod ui;

use std::{io, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use app::App;
use cask_core::{
  session::{Rater, Session},
  store::CatalogStore,
};
use cask_store_http::{HttpConfig, HttpStore};
use clap::Parser;
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cask", about = "Terminal UI for the Cask beer catalog")]
struct Args {
  /// Path to a TOML config file (url, api_key, user_id, display_name).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the backend.
  #[arg(long, env = "CASK_URL")]
  url: Option<String>,

  /// Backend API key.
  #[arg(long, env = "CASK_API_KEY")]
  key: Option<String>,

  /// Rater UUID. Omit to browse as a guest (rating disabled).
  #[arg(long, env = "CASK_USER")]
  user: Option<Uuid>,

  /// Display name for the rater.
  #[arg(long)]
  name: Option<String>,

  /// Append tracing output to this file (the TUI owns the terminal).
  #[arg(long, value_name = "FILE")]
  log_file: Option<std::path::PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:     String,
  #[serde(default)]
  api_key: String,
  user_id:      Option<Uuid>,
  display_name: Option<String>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log_file {
    let file = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(
        EnvFilter::try_from_default_env()
          .unwrap_or_else(|_| EnvFilter::new("info")),
      )
      .with_writer(Mutex::new(file))
      .with_ansi(false)
      .init();
  }

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:8000".to_string());
  let api_key = args
    .key
    .or_else(|| (!file_cfg.api_key.is_empty()).then(|| file_cfg.api_key.clone()))
    .unwrap_or_default();
  let user_id = args.user.or(file_cfg.user_id);
  let display_name = args.name.or(file_cfg.display_name);

  let rater = user_id.map(|id| Rater {
    id,
    name: display_name,
    anonymous: false,
  });

  let store = HttpStore::new(HttpConfig::new(base_url, api_key))
    .context("building HTTP store")?;
  let mut app = App::new(store, Session::new(rater));

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Load initial data. Failures degrade to an empty list plus a status
  // message; they never abort the UI.
  app.load_initial().await;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

/// One logical thread of control: user keys and feed deliveries are applied
/// one at a time, between frames, so the collections are never mutated
/// concurrently.
async fn run_event_loop<S: CatalogStore>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<S>,
) -> Result<()> {
  loop {
    app.drain_feeds();

    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(evt) = maybe_event {
      match evt {
        Event::Key(key) => {
          let cont = app.handle_key(key).await?;
          if !cont {
            break;
          }
        }
        Event::Resize(_, _) => {
          // Terminal will redraw on next iteration.
        }
        _ => {}
      }
    }
  }

  Ok(())
}
