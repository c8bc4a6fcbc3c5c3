//! `circle` — terminal profile viewer for the Circle social API.
//!
//! # Usage
//!
//! ```text
//! circle 65f1c0ffee --url http://localhost:3000 --token <jwt>
//! circle --config ~/.config/circle/config.toml
//! ```
//!
//! Without a user id the viewer's own profile is opened.

mod app;
mod client;
mod ui;

use std::{
  io,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use circle_core::{session::ViewerSession, source::ProfileSource, user::UserId};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
  },
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:3000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "circle", about = "Terminal profile viewer for Circle")]
struct Args {
  /// Id of the user whose profile to open (default: your own).
  #[arg(value_name = "USER_ID")]
  user_id: Option<String>,

  /// Path to a TOML config file (url, token, log_file).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the Circle server (default: http://localhost:3000).
  #[arg(long, env = "CIRCLE_URL")]
  url: Option<String>,

  /// Bearer token for the API.
  #[arg(long, env = "CIRCLE_TOKEN")]
  token: Option<String>,

  /// Append logs to this file. `RUST_LOG` controls the level.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  token:    String,
  #[serde(default)]
  log_file: Option<PathBuf>,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve_config(args: &Args, file: &ConfigFile) -> ApiConfig {
  let pick = |flag: &Option<String>, from_file: &str| {
    flag
      .clone()
      .or_else(|| (!from_file.is_empty()).then(|| from_file.to_string()))
  };
  ApiConfig {
    base_url: pick(&args.url, &file.url)
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    token:    pick(&args.token, &file.token).unwrap_or_default(),
  }
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
  // Writing to the terminal would corrupt the TUI.
  let Some(path) = log_file else {
    return Ok(());
  };
  let file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_ansi(false)
    .with_writer(Mutex::new(file))
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  init_tracing(args.log_file.as_deref().or(file_cfg.log_file.as_deref()))?;

  let api_config = resolve_config(&args, &file_cfg);
  let base_url = api_config.base_url.clone();
  let client = Arc::new(ApiClient::new(api_config)?);
  let session = ViewerSession::new();

  // No id on the command line: log in and open our own profile.
  let subject = match args.user_id.as_deref().map(UserId::new) {
    Some(id) => Some(id),
    None => {
      let me = client
        .fetch_viewer()
        .await
        .context("fetching the logged-in user")?;
      let id = me.id.clone();
      session.login(me);
      Some(id)
    }
  };
  info!(subject = ?subject, %base_url, "starting");

  let mut app = App::new(client, session, subject, base_url);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Run the event loop; restore terminal even on error.
  app.mount();
  let run_result = run_event_loop(&mut terminal, &mut app).await;
  app.shutdown();

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<ApiClient>,
) -> Result<()> {
  loop {
    app.tick();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    match maybe_event {
      Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
        if !app.handle_key(key) {
          break;
        }
      }
      // Resizes and everything else are picked up by the next redraw.
      _ => {}
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_file_then_defaults() {
    let file: ConfigFile = toml::from_str(
      r#"
        url = "https://circle.example"
        token = "from-file"
      "#,
    )
    .unwrap();

    let cfg = resolve_config(&Args::default(), &file);
    assert_eq!(cfg, ApiConfig {
      base_url: "https://circle.example".into(),
      token:    "from-file".into(),
    });

    let args = Args {
      token: Some("from-flag".into()),
      ..Args::default()
    };
    let cfg = resolve_config(&args, &file);
    assert_eq!(cfg.token, "from-flag");
    assert_eq!(cfg.base_url, "https://circle.example");
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = resolve_config(&Args::default(), &ConfigFile::default());
    assert_eq!(cfg.base_url, DEFAULT_URL);
    assert!(cfg.token.is_empty());
  }

  #[test]
  fn args_parse_positional_user_id() {
    let args = Args::try_parse_from(["circle", "u1", "--url", "http://x"])
      .unwrap();
    assert_eq!(args.user_id.as_deref(), Some("u1"));
    assert_eq!(args.url.as_deref(), Some("http://x"));
  }
}
