//! Narrative adventure terminal client.
//!
//! Build a character, then play through a story generated by the backend by
//! picking (or typing) one choice at a time.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for scripting:
//!
//! ```bash
//! printf '#begin\n#name Kael\n#race Elf\n#class Rogue\n#background Orphan\n#submit\n#start\n1\n' \
//!     | cargo run -p adventure -- --headless
//! ```

mod app;
mod events;
mod headless;
mod ui;

use adventure_core::{spawn_worker, CharacterOptionsCache, StoryBackend, ViewStateMachine};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io::{self, stdout};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use story_api::{ApiConfig, StoryApi};
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

const LOG_FILE_VAR: &str = "ADVENTURE_LOG";
const DEFAULT_LOG_FILE: &str = "adventure.log";

#[derive(Parser)]
#[command(
    name = "adventure",
    about = "Terminal client for the narrative adventure game",
    version
)]
struct Args {
    /// Backend base URL, without the /api prefix (overrides ADVENTURE_BACKEND_URL)
    #[arg(long)]
    url: Option<String>,

    /// Run in headless mode (line protocol on stdin/stdout, no TUI)
    #[arg(long)]
    headless: bool,

    /// Probe the backend and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match args.url {
        Some(url) => ApiConfig::new(url).with_env_timeouts()?,
        None => match ApiConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                eprintln!("Set it in a .env file, export it, or pass --url <URL>.");
                std::process::exit(1);
            }
        },
    };

    init_tracing(args.headless || args.check)?;
    tracing::info!(base_url = %config.base_url, "Starting adventure client");

    let api = StoryApi::new(config)?;

    if args.check {
        let health = api.health().await?;
        println!("Backend OK at {}: {}", api.base_url(), health.message);
        return Ok(());
    }

    let backend: Arc<dyn StoryBackend> = Arc::new(api);

    if args.headless {
        return headless::run_headless(backend).await.map_err(|e| e.into());
    }

    let options = Arc::new(CharacterOptionsCache::new(Arc::clone(&backend)));
    let (request_tx, completion_rx) = spawn_worker(backend, options);
    let app = App::new(ViewStateMachine::new(), request_tx, completion_rx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

/// Install the tracing subscriber.
///
/// The TUI owns the screen, so it logs to a file; the line modes log to stderr.
fn init_tracing(to_stderr: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        let path = std::env::var(LOG_FILE_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| format!("Cannot open log file {path}: {e}"))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        // Commit whatever the worker finished since the last frame
        app.drain_completions();

        terminal.draw(|f| render(f, &app))?;

        // Poll for events with timeout for the loading spinner
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            match handle_event(&mut app, ev) {
                EventResult::Quit => break,
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    Ok(())
}
