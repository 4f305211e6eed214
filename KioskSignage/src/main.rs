//! Kiosk signage client.
//!
//! Fetches the active playlist from the signage server and rotates it
//! full-screen in the terminal, launching external viewers for video and
//! PDF files when they are configured.

mod options;
mod screen;
mod ui;
mod viewer;

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use kioskconfig::Config;
use kioskdisplay::{DisplayConfigExt, DisplayEngine, MediaKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::options::{USAGE, parse_args};
use crate::screen::TerminalScreen;
use crate::ui::{App, command_for};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Restore the terminal even on panic
    std::panic::set_hook(Box::new(|panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        eprintln!("\n\nKioskSignage panicked: {panic_info}");
    }));

    let cli = parse_args(env::args().skip(1))?;
    if cli.help {
        println!("{USAGE}");
        process::exit(0);
    }

    let config = Arc::new(
        Config::load_config(cli.config_dir.as_deref().unwrap_or(""))
            .context("Cannot load configuration")?,
    );
    init_tracing(&config)?;

    let mut builder = config.rest_source_builder()?;
    if let Some(url) = &cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(timeout) = cli.timeout {
        builder = builder.timeout(timeout);
    }
    let source = builder.build().context("Invalid playlist source settings")?;
    let server = source.base_url().to_string();

    let mut options = config.engine_options()?;
    if cli.paused {
        options.start_playing = false;
    }
    let refresh = match cli.refresh {
        Some(period) => (!period.is_zero()).then_some(period),
        None => config.get_refresh_interval()?,
    };

    let mut screen = TerminalScreen::new();
    for kind in [MediaKind::Video, MediaKind::Pdf] {
        if let Some(template) = config.get_player_command(&kind)? {
            info!(kind = %kind, template = %template, "External viewer configured");
            screen = screen.with_player(kind, template);
        }
    }

    info!(
        server = %server,
        display_id = %config.get_display_id()?,
        start_playing = options.start_playing,
        refresh_secs = refresh.map(|p| p.as_secs()),
        "Starting kiosk"
    );

    let engine = DisplayEngine::new(screen, options);
    let app = App::new(engine, Box::new(source), server);
    run_app(app, refresh).await?;

    println!("Goodbye.");
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let _ = tracing_log::LogTracer::init();

    let level = config.get_log_min_level()?.to_lowercase();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = config.get_log_file()?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(log_writer(&log_file))
        .try_init();
    Ok(())
}

/// The terminal belongs to the UI: logs go to a file, or nowhere.
fn log_writer(path: &Path) -> BoxMakeWriter {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let shared = SharedLogWriter::new(file);
            BoxMakeWriter::new(move || shared.clone())
        }
        Err(err) => {
            eprintln!("Cannot open {} for logs: {err}. Logging disabled.", path.display());
            BoxMakeWriter::new(io::sink)
        }
    }
}

#[derive(Clone)]
struct SharedLogWriter {
    inner: Arc<Mutex<File>>,
}

impl SharedLogWriter {
    fn new(file: File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }
}

impl Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?;
        guard.flush()
    }
}

async fn run_app(mut app: App, refresh: Option<Duration>) -> Result<()> {
    let terminal = setup_terminal()?;
    let mut guard = TerminalGuard { terminal };
    let mut events = EventStream::new();
    let mut refresh = refresh.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    guard.terminal.draw(|f| app.draw(f))?;
    app.reload().await;

    let result: Result<()> = async {
        loop {
            guard.terminal.draw(|f| app.draw(f))?;

            tokio::select! {
                event = app.engine.next_timer() => app.engine.on_timer(event),
                input = events.next() => match input {
                    Some(Ok(Event::Key(key))) => {
                        if let Some(command) = command_for(key) {
                            if app.handle_command(command).await {
                                break;
                            }
                        }
                    }
                    // resize and the rest: redraw on the next iteration
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("Terminal input failed"),
                    None => break,
                },
                _ = next_refresh(&mut refresh) => app.refresh().await,
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok(())
    }
    .await;

    // viewers are stopped before the terminal is handed back
    app.engine.deactivate();
    result
}

async fn next_refresh(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

/// Restores the terminal on every exit path
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
