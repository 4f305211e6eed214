//! Kiosk screen: state, key handling and drawing.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use kioskdisplay::{DisplayEngine, DisplayStatus, PlaylistSource, Surface};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use tracing::{info, warn};

use crate::screen::TerminalScreen;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    TogglePlay,
    Next,
    Previous,
    Reload,
    Quit,
}

pub fn command_for(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Command::Quit);
    }
    match key.code {
        KeyCode::Char(' ') => Some(Command::TogglePlay),
        KeyCode::Char('n') | KeyCode::Right => Some(Command::Next),
        KeyCode::Char('p') | KeyCode::Left => Some(Command::Previous),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Reload),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

pub struct App {
    pub engine: DisplayEngine<TerminalScreen>,
    source: Box<dyn PlaylistSource>,
    server: String,
    status_line: String,
}

impl App {
    pub fn new(
        engine: DisplayEngine<TerminalScreen>,
        source: Box<dyn PlaylistSource>,
        server: String,
    ) -> Self {
        Self {
            engine,
            source,
            server,
            status_line: "Starting...".to_string(),
        }
    }

    /// Explicit reload: a failure replaces the rotation with the
    /// "unavailable" placeholder.
    pub async fn reload(&mut self) {
        match self.engine.reload_from(self.source.as_ref()).await {
            Ok(()) => {
                let count = self.engine.state().items().len();
                self.status_line = format!("Playlist loaded: {count} file(s)");
            }
            Err(err) => {
                self.status_line = format!("Cannot load playlist from {}: {err}", self.server);
            }
        }
    }

    /// Periodic refresh: failures keep the current rotation running.
    pub async fn refresh(&mut self) {
        match self.engine.refresh_from(self.source.as_ref()).await {
            Ok(true) => {
                let count = self.engine.state().items().len();
                self.status_line = format!("Playlist updated: {count} file(s)");
            }
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "Playlist refresh failed");
                self.status_line = format!("Refresh failed, keeping current playlist: {err}");
            }
        }
    }

    /// Returns `true` when the application should exit.
    pub async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::TogglePlay => {
                let playing = self.engine.toggle_play_pause();
                self.status_line = if playing { "Playing" } else { "Paused" }.to_string();
            }
            Command::Next => self.engine.next(),
            Command::Previous => self.engine.previous(),
            Command::Reload => {
                info!("Manual reload requested");
                self.reload().await;
            }
            Command::Quit => {
                self.engine.deactivate();
                return true;
            }
        }
        false
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let status = self.engine.status();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(f.size());

        self.draw_header(f, chunks[0], &status);
        self.draw_content(f, chunks[1]);
        f.render_widget(build_progress_gauge(&status), chunks[2]);
        draw_help_strip(f, chunks[3]);

        let line = Paragraph::new(self.status_line.as_str()).style(Style::default().fg(Color::Gray));
        f.render_widget(line, chunks[4]);
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, status: &DisplayStatus) {
        let name = status
            .display_name
            .clone()
            .unwrap_or_else(|| "<no file>".to_string());
        let text = vec![
            Line::from(vec![Span::styled(
                format!("Showing : {name}"),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(format!(
                "State   : {}  {}  |  Server {}",
                state_label(status),
                position_label(status),
                self.server
            )),
        ];
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Kiosk"))
            .alignment(Alignment::Left);
        f.render_widget(paragraph, area);
    }

    fn draw_content(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let screen = self.engine.screen();
        let lines = match screen.current() {
            Some(surface) => surface_lines(surface, screen.has_viewer()),
            None => vec![Line::from("(display inactive)")],
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Content"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }
}

fn state_label(status: &DisplayStatus) -> &'static str {
    match (status.active, status.is_empty, status.playing) {
        (false, _, _) => "Stopped",
        (true, true, _) => "Idle",
        (true, false, true) => "Playing",
        (true, false, false) => "Paused",
    }
}

fn position_label(status: &DisplayStatus) -> String {
    match status.position {
        Some((index, len)) => format!("{index}/{len}"),
        None => "-/-".to_string(),
    }
}

/// Text shown in the content panel for a mounted surface.
pub fn surface_lines(surface: &Surface, viewer_running: bool) -> Vec<Line<'static>> {
    let viewer = if viewer_running {
        "external viewer running"
    } else {
        "no external viewer"
    };
    match surface {
        Surface::Video(video) => vec![
            Line::from(format!("Video: {}", video.title)),
            Line::from(format!("Source: {}", video.source_ref)),
            Line::from(format!(
                "Autoplay {} | Muted {} | Controls {} | {viewer}",
                on_off(video.autoplay),
                on_off(video.muted),
                on_off(video.controls)
            )),
        ],
        Surface::PdfViewer { title, source_ref } => vec![
            Line::from(format!("PDF: {title}")),
            Line::from(format!("Source: {source_ref}")),
            Line::from(viewer),
        ],
        Surface::DocumentCard {
            title,
            source_ref,
            kind_label,
            open_label,
        } => vec![
            Line::from(format!("[{kind_label}] {title}")),
            Line::from(format!("{open_label}: {source_ref}")),
        ],
        Surface::Placeholder { message, .. } => vec![
            Line::from(""),
            Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::DarkGray),
            )),
        ],
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

pub fn gauge_label(status: &DisplayStatus) -> String {
    if status.is_empty {
        return "--".to_string();
    }
    format!(
        "{}s remaining ({:.0}%)",
        status.remaining_seconds,
        status.completion_ratio * 100.0
    )
}

fn build_progress_gauge(status: &DisplayStatus) -> Gauge<'static> {
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(status.completion_ratio.clamp(0.0, 1.0))
        .label(gauge_label(status))
}

fn draw_help_strip(f: &mut ratatui::Frame<'_>, area: Rect) {
    let paragraph = Paragraph::new(Line::from(
        "Space=Play/Pause  n/→=Next  p/←=Previous  r=Reload  q/Esc=Quit",
    ))
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(paragraph, area);
}
