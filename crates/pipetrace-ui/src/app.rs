//! Main application state and TUI event loop for the pipeline inspector.
//!
//! [`App`] owns the [`Session`], the active filter and theme, and the
//! connection indicator. Transport events and key presses are each applied as
//! one unit between two redraws.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use pipetrace_core::models::{Direction, FrameEvent};
use pipetrace_core::settings::validate_endpoint;
use pipetrace_core::time_utils::TimestampFormatter;
use pipetrace_data::view::{base_name, search_types};
use pipetrace_data::{
    ingest, FrameCriteria, FrameRef, PathStep, ProjectionCache, Session, TimelineEntry,
};
use pipetrace_runtime::{Envelope, Transport, TransportEvent};

use crate::components::header::Header;
use crate::components::indicators::{ConnectionState, FilterIndicator, Notice};
use crate::frames_view;
use crate::path_view;
use crate::themes::Theme;
use crate::topology_view::{self, TopologyRow};

/// How long a processor stays highlighted after receiving frames.
pub const FLASH_DURATION: Duration = Duration::from_millis(150);

const TICK_RATE: Duration = Duration::from_millis(50);
const MAX_NOTICES: usize = 5;

/// First visible line so that `cursor_line` stays inside a viewport of
/// `height` lines.
pub fn scroll_offset(cursor_line: usize, height: usize) -> u16 {
    let offset = if height == 0 {
        cursor_line
    } else {
        cursor_line.saturating_sub(height - 1)
    };
    u16::try_from(offset).unwrap_or(u16::MAX)
}

// ── Panel / InputMode / Command ───────────────────────────────────────────────

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Topology,
    Frames,
    Path,
}

impl Panel {
    fn next(self) -> Self {
        match self {
            Panel::Topology => Panel::Frames,
            Panel::Frames => Panel::Path,
            Panel::Path => Panel::Topology,
        }
    }

    fn previous(self) -> Self {
        match self {
            Panel::Topology => Panel::Path,
            Panel::Frames => Panel::Topology,
            Panel::Path => Panel::Frames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Editing the endpoint URL; holds the edit buffer.
    EditUrl(String),
    /// Type filter popup; holds the search query and list cursor.
    TypeFilter { query: String, cursor: usize },
}

/// Side effects requested by a key press, carried out by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(url::Url),
    Disconnect,
    Replay(PathBuf),
    Quit,
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the inspector TUI.
pub struct App {
    pub theme: Theme,
    pub timestamps: TimestampFormatter,
    pub session: Session,
    pub criteria: FrameCriteria,
    pub focus: Panel,
    pub connection: ConnectionState,
    /// Endpoint used by the connect action.
    pub url: String,
    pub input: InputMode,
    /// Capture file offered by the replay action.
    pub replay_path: Option<PathBuf>,
    pub settle: Duration,
    pub should_quit: bool,

    cache: ProjectionCache,
    topology_cursor: usize,
    frame_cursor: usize,
    seen_lens: HashMap<String, usize>,
    flashes: HashMap<String, Instant>,
    notices: VecDeque<Notice>,
}

impl App {
    /// Construct a new application with the given configuration.
    pub fn new(theme_name: &str, timezone: &str, url: String) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            timestamps: TimestampFormatter::new(timezone),
            session: Session::new(),
            criteria: FrameCriteria::all(),
            focus: Panel::Topology,
            connection: ConnectionState::Disconnected,
            url,
            input: InputMode::Normal,
            replay_path: None,
            settle: Duration::from_millis(300),
            should_quit: false,
            cache: ProjectionCache::new(),
            topology_cursor: 0,
            frame_cursor: 0,
            seen_lens: HashMap::new(),
            flashes: HashMap::new(),
            notices: VecDeque::new(),
        }
    }

    pub fn with_replay(mut self, path: Option<PathBuf>, settle: Duration) -> Self {
        self.replay_path = path;
        self.settle = settle;
        self
    }

    // ── Public event loop ─────────────────────────────────────────────────────

    /// Run the inspector TUI, applying transport events from `rx`.
    ///
    /// Uses `crossterm::event::poll` (synchronous, short timeout) so that the
    /// terminal event loop stays on the current thread while buffers arrive
    /// on the async channel via `try_recv`.
    ///
    /// `initial` commands (connect on start, replay a file) run before the
    /// first frame is drawn. The loop exits on `q` or `Ctrl+C`.
    pub async fn run(
        &mut self,
        mut transport: Transport,
        mut rx: mpsc::Receiver<Envelope>,
        initial: Vec<Command>,
    ) -> io::Result<()> {
        for command in initial {
            self.execute(command, &mut transport);
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = loop {
            self.refresh_flashes(Instant::now());
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(TICK_RATE) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if let Some(command) = self.handle_key(key) {
                            self.execute(command, &mut transport);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            // Drain pending transport events (non-blocking).
            loop {
                match rx.try_recv() {
                    Ok(envelope) => self.handle_envelope(envelope, &transport),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        self.should_quit = true;
                        break;
                    }
                }
            }

            if self.should_quit {
                break Ok(());
            }
        };

        transport.disconnect();

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn execute(&mut self, command: Command, transport: &mut Transport) {
        match command {
            Command::Connect(url) => {
                self.url = url.to_string();
                self.connection = ConnectionState::Connecting;
                transport.connect(&url);
            }
            Command::Disconnect => {
                transport.disconnect();
                self.connection = ConnectionState::Disconnected;
            }
            Command::Replay(path) => {
                self.connection = ConnectionState::Replaying;
                self.push_notice(Notice::info(format!("Replaying {}", path.display())));
                transport.replay(path, self.settle);
            }
            Command::Quit => self.should_quit = true,
        }
    }

    /// Apply one transport event. Events from a superseded source are dropped.
    pub fn handle_envelope(&mut self, envelope: Envelope, transport: &Transport) {
        if !transport.is_current(&envelope) {
            debug!(generation = envelope.generation, "dropping stale transport event");
            return;
        }

        match envelope.event {
            TransportEvent::Connected => {
                self.connection = ConnectionState::Connected;
                self.push_notice(Notice::info(format!("Connected to {}", self.url)));
            }
            TransportEvent::Buffer { bytes, encoding } => {
                if let Err(e) = ingest(&mut self.session, &bytes, encoding) {
                    self.push_notice(Notice::warning(format!("Dropped buffer: {e}")));
                }
                self.clamp_cursors();
            }
            TransportEvent::Disconnected { reason } => {
                if self.connection == ConnectionState::Replaying {
                    return;
                }
                self.connection = ConnectionState::Disconnected;
                match reason {
                    Some(r) => self.push_notice(Notice::error(format!("Disconnected: {r}"))),
                    None => self.push_notice(Notice::info("Disconnected")),
                }
            }
            TransportEvent::ResetRequested => {
                self.session.reset_session();
                self.topology_cursor = 0;
                self.frame_cursor = 0;
            }
            TransportEvent::Failed(reason) => {
                self.connection = ConnectionState::Disconnected;
                self.push_notice(Notice::error(reason));
            }
        }
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    /// Handle one key press. Returns a command for the event loop when the
    /// key asks for a transport action or for quitting.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Command::Quit);
        }

        match std::mem::replace(&mut self.input, InputMode::Normal) {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::EditUrl(buffer) => self.handle_url_key(key, buffer),
            InputMode::TypeFilter { query, cursor } => {
                self.handle_type_filter_key(key, query, cursor);
                None
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Command::Quit),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(true),
            KeyCode::Home => self.focus_path_edge(false),
            KeyCode::End => self.focus_path_edge(true),
            KeyCode::Enter => self.activate(),
            KeyCode::Esc => {
                self.session.selection_coordinator().clear();
            }
            KeyCode::Char('1') => self.criteria.toggle_event(FrameEvent::Push),
            KeyCode::Char('2') => self.criteria.toggle_event(FrameEvent::Process),
            KeyCode::Char('3') => self.criteria.toggle_direction(Direction::Upstream),
            KeyCode::Char('4') => self.criteria.toggle_direction(Direction::Downstream),
            KeyCode::Char('f') => {
                self.input = InputMode::TypeFilter {
                    query: String::new(),
                    cursor: 0,
                }
            }
            KeyCode::Char('d') => {
                self.theme = self.theme.toggled();
                info!(theme = self.theme.name, "theme toggled");
            }
            KeyCode::Char('u') => self.input = InputMode::EditUrl(self.url.clone()),
            KeyCode::Char('c') => {
                let url = self.url.clone();
                return self.connect_command(&url);
            }
            KeyCode::Char('x') => return Some(Command::Disconnect),
            KeyCode::Char('r') => match &self.replay_path {
                Some(path) => return Some(Command::Replay(path.clone())),
                None => self.push_notice(Notice::warning(
                    "No capture file; start with --replay <FILE>",
                )),
            },
            _ => {}
        }
        self.sync_frame_cursor();
        None
    }

    fn handle_url_key(&mut self, key: KeyEvent, mut buffer: String) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => return self.connect_command(&buffer),
            KeyCode::Backspace => {
                buffer.pop();
                self.input = InputMode::EditUrl(buffer);
            }
            KeyCode::Char(c) => {
                buffer.push(c);
                self.input = InputMode::EditUrl(buffer);
            }
            _ => self.input = InputMode::EditUrl(buffer),
        }
        None
    }

    fn connect_command(&mut self, raw: &str) -> Option<Command> {
        match validate_endpoint(raw) {
            Ok(url) => Some(Command::Connect(url)),
            Err(e) => {
                self.push_notice(Notice::error(e.to_string()));
                None
            }
        }
    }

    fn handle_type_filter_key(&mut self, key: KeyEvent, mut query: String, mut cursor: usize) {
        let vocabulary = self.cache.available_types(&self.session);
        let matches = search_types(&vocabulary, &query);

        match key.code {
            KeyCode::Esc => return,
            KeyCode::Up => cursor = cursor.saturating_sub(1),
            KeyCode::Down => cursor = (cursor + 1).min(matches.len().saturating_sub(1)),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(t) = matches.get(cursor) {
                    self.criteria.toggle_type(t);
                }
            }
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.criteria.select_all(matches.iter().copied());
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.criteria.clear_types();
            }
            KeyCode::Backspace => {
                query.pop();
                cursor = 0;
            }
            KeyCode::Char(c) => {
                query.push(c);
                cursor = 0;
            }
            _ => {}
        }
        self.input = InputMode::TypeFilter { query, cursor };
    }

    // ── Navigation ────────────────────────────────────────────────────────────

    fn move_cursor(&mut self, down: bool) {
        match self.focus {
            Panel::Topology => {
                let len = topology_view::topology_rows(&self.session).len();
                self.topology_cursor = step(self.topology_cursor, len, down);
            }
            Panel::Frames => {
                let len = self.visible_frames().len();
                self.frame_cursor = step(self.frame_cursor, len, down);
            }
            Panel::Path => {
                let direction = if down { PathStep::Next } else { PathStep::Previous };
                if self.session.selection_coordinator().navigate(&self.criteria, direction) {
                    self.sync_topology_cursor();
                }
            }
        }
    }

    fn focus_path_edge(&mut self, last: bool) {
        if self.focus != Panel::Path {
            return;
        }
        let index = if last {
            self.timeline().len().saturating_sub(1)
        } else {
            0
        };
        if self
            .session
            .selection_coordinator()
            .focus_path_entry(&self.criteria, index)
        {
            self.sync_topology_cursor();
        }
    }

    fn activate(&mut self) {
        match self.focus {
            Panel::Topology => {
                let rows = topology_view::topology_rows(&self.session);
                if let Some(row) = rows.get(self.topology_cursor) {
                    self.session.selection_coordinator().select_processor(&row.id);
                    self.frame_cursor = 0;
                }
            }
            Panel::Frames => {
                let frames = self.visible_frames();
                if let Some(f) = frames.get(self.frame_cursor) {
                    self.session.selection_coordinator().toggle_frame(f);
                }
            }
            Panel::Path => {}
        }
    }

    /// Filtered frames of the selected processor.
    pub fn visible_frames(&mut self) -> Vec<FrameRef> {
        match self.session.selection().processor().map(str::to_string) {
            Some(id) => self
                .cache
                .filtered_frames(&self.session, &id, &self.criteria)
                .to_vec(),
            None => Vec::new(),
        }
    }

    fn timeline(&mut self) -> Vec<TimelineEntry> {
        match self.session.selection().path_name().map(str::to_string) {
            Some(name) => self
                .cache
                .frame_path_timeline(&self.session, &name, &self.criteria)
                .to_vec(),
            None => Vec::new(),
        }
    }

    /// Put the topology cursor on the selected processor.
    fn sync_topology_cursor(&mut self) {
        let Some(selected) = self.session.selection().processor() else {
            return;
        };
        if let Some(i) = topology_view::topology_rows(&self.session)
            .iter()
            .position(|r| r.id == selected)
        {
            self.topology_cursor = i;
        }
        self.sync_frame_cursor();
    }

    /// Put the frame cursor on the selected frame when it is visible.
    fn sync_frame_cursor(&mut self) {
        let Some(seq) = self.session.selection().frame().map(|f| f.seq) else {
            self.clamp_cursors();
            return;
        };
        if let Some(i) = self.visible_frames().iter().position(|f| f.seq == seq) {
            self.frame_cursor = i;
        }
        self.clamp_cursors();
    }

    fn clamp_cursors(&mut self) {
        let rows = topology_view::topology_rows(&self.session).len();
        self.topology_cursor = self.topology_cursor.min(rows.saturating_sub(1));
        let frames = self.visible_frames().len();
        self.frame_cursor = self.frame_cursor.min(frames.saturating_sub(1));
    }

    pub fn topology_cursor(&self) -> usize {
        self.topology_cursor
    }

    pub fn frame_cursor(&self) -> usize {
        self.frame_cursor
    }

    // ── Traffic flash ─────────────────────────────────────────────────────────

    /// Diff log lengths against the previous refresh and start a flash for
    /// every processor whose log grew.
    pub fn refresh_flashes(&mut self, now: Instant) {
        let mut lens = HashMap::with_capacity(self.seen_lens.len());
        for (id, log) in self.session.logs() {
            let len = log.len();
            if len > self.seen_lens.get(id).copied().unwrap_or(0) {
                self.flashes.insert(id.to_string(), now);
            }
            lens.insert(id.to_string(), len);
        }
        self.seen_lens = lens;
        self.flashes
            .retain(|_, started| now.saturating_duration_since(*started) < FLASH_DURATION);
    }

    pub fn flashing(&self, now: Instant) -> HashSet<String> {
        self.flashes
            .iter()
            .filter(|(_, started)| now.saturating_duration_since(**started) < FLASH_DURATION)
            .map(|(id, _)| id.clone())
            .collect()
    }

    // ── Notices ───────────────────────────────────────────────────────────────

    pub fn push_notice(&mut self, notice: Notice) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.back()
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, body, filter_area, notice_area, help_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);
        let [topology_area, frames_area, path_area] = Layout::horizontal([
            Constraint::Percentage(28),
            Constraint::Percentage(42),
            Constraint::Percentage(30),
        ])
        .areas(body);

        // ── Header ────────────────────────────────────────────────────────────
        let (endpoint, editing) = match &self.input {
            InputMode::EditUrl(buffer) => (buffer.as_str(), true),
            _ => (self.url.as_str(), false),
        };
        let header = Header {
            connection: self.connection,
            endpoint,
            editing,
            timezone: self.timestamps.timezone().name(),
            processors: self.session.topology().processors().len(),
            frames: self.session.total_frames(),
            width: area.width,
            theme: &self.theme,
        };
        frame.render_widget(Paragraph::new(Text::from(header.to_lines())), header_area);

        // ── Topology ──────────────────────────────────────────────────────────
        let rows: Vec<TopologyRow> = topology_view::topology_rows(&self.session);
        let flashing = self.flashing(Instant::now());
        let cursor = (self.focus == Panel::Topology).then_some(self.topology_cursor);
        let lines =
            topology_view::build_topology_lines(&self.session, &rows, cursor, &flashing, &self.theme);
        let height = usize::from(topology_area.height.saturating_sub(2));
        topology_view::render_topology(
            frame,
            topology_area,
            lines,
            topology_view::topology_title(&self.session),
            scroll_offset(self.topology_cursor, height),
            self.focus == Panel::Topology,
            &self.theme,
        );

        // ── Frames ────────────────────────────────────────────────────────────
        let frames = self.visible_frames();
        let frames_title = match self.session.selection().processor() {
            Some(id) => {
                let name = self.session.processor(id).map_or(id, |p| p.name.as_str());
                format!(" Frames: {name} ({}/{}) ", frames.len(), self.session.log_len(id))
            }
            None => " Frames ".to_string(),
        };
        let cursor = (self.focus == Panel::Frames).then_some(self.frame_cursor);
        let content = frames_view::build_frame_lines(
            &frames,
            self.session.selection(),
            cursor,
            &self.timestamps,
            &self.theme,
        );
        frames_view::render_frames(
            frame,
            frames_area,
            content,
            frames_title,
            self.focus == Panel::Frames,
            &self.theme,
        );

        // ── Path ──────────────────────────────────────────────────────────────
        let timeline = self.timeline();
        let (lines, focus_index) =
            path_view::build_path_lines(&self.session, &timeline, &self.timestamps, &self.theme);
        path_view::render_path(
            frame,
            path_area,
            lines,
            focus_index,
            path_view::path_title(&self.session),
            self.focus == Panel::Path,
            &self.theme,
        );

        // ── Footer ────────────────────────────────────────────────────────────
        frame.render_widget(
            Paragraph::new(FilterIndicator::new(&self.criteria, &self.theme).to_line()),
            filter_area,
        );
        if let Some(notice) = self.latest_notice() {
            frame.render_widget(Paragraph::new(notice.to_line(&self.theme)), notice_area);
        }
        frame.render_widget(Paragraph::new(self.help_line()), help_area);

        if let InputMode::TypeFilter { query, cursor } = &self.input {
            let (query, cursor) = (query.clone(), *cursor);
            self.render_type_filter(frame, area, &query, cursor);
        }
    }

    fn help_line(&self) -> Line<'static> {
        let text = match self.input {
            InputMode::Normal => {
                "tab panel · ↑↓ move · enter select · esc clear · c connect · x disconnect · u url · r replay · d theme · q quit"
            }
            InputMode::EditUrl(_) => "enter connect · esc cancel",
            InputMode::TypeFilter { .. } => {
                "type to search · space toggle · ctrl+a select all · ctrl+r clear · esc close"
            }
        };
        Line::from(Span::styled(text, self.theme.dim))
    }

    fn render_type_filter(&mut self, frame: &mut Frame, area: Rect, query: &str, cursor: usize) {
        let vocabulary = self.cache.available_types(&self.session);
        let lines = build_type_filter_lines(&vocabulary, query, cursor, &self.criteria, &self.theme);

        let popup = centered(area, 40, 60);
        let height = usize::from(popup.height.saturating_sub(2));
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_focused)
            .title(format!(" Frame types: {query}▏ "));
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .scroll((scroll_offset(cursor, height), 0)),
            popup,
        );
    }
}

/// Rows of the type filter popup: every vocabulary entry matching `query`,
/// with a checkbox for membership in the criteria's type set.
pub fn build_type_filter_lines<'a>(
    vocabulary: &[String],
    query: &str,
    cursor: usize,
    criteria: &FrameCriteria,
    theme: &'a Theme,
) -> Vec<Line<'a>> {
    let matches = search_types(vocabulary, query);
    if matches.is_empty() {
        return vec![Line::from(Span::styled("No frame types", theme.dim))];
    }
    matches
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let checked = criteria.types.contains(base_name(t));
            let mut line = Line::from(vec![
                Span::styled(if checked { "[x] " } else { "[ ] " }, theme.label),
                Span::styled(t.to_string(), theme.text),
            ]);
            if i == cursor {
                line = line.style(theme.cursor);
            }
            line
        })
        .collect()
}

fn step(cursor: usize, len: usize, down: bool) -> usize {
    if len == 0 {
        0
    } else if down {
        (cursor + 1).min(len - 1)
    } else {
        cursor.saturating_sub(1)
    }
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let scale = |len: u16, percent: u16| (u32::from(len) * u32::from(percent) / 100) as u16;
    let width = scale(area.width, percent_x);
    let height = scale(area.height, percent_y);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pipetrace_data::decoder::Encoding;
    use pipetrace_data::FocusState;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn json_lines(values: &[serde_json::Value]) -> Vec<u8> {
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes()
    }

    fn scenario_buffer() -> Vec<u8> {
        json_lines(&[
            json!({
                "type": "pipeline",
                "processors": [
                    {"id": "a", "name": "STT", "parent": null, "type": "service"},
                    {"id": "b", "name": "LLM", "parent": null, "type": "service"}
                ],
                "connections": [{"from": "a", "to": "b"}]
            }),
            json!({"type": "frame", "id": 1, "name": "TextFrame#1", "from": "a",
                   "event": "push", "direction": "downstream", "timestamp": 100, "payload": null}),
            json!({"type": "frame", "id": 2, "name": "TextFrame#1", "from": "b",
                   "event": "process", "direction": "downstream", "timestamp": 150, "payload": null}),
        ])
    }

    fn envelope(transport: &Transport, event: TransportEvent) -> Envelope {
        Envelope {
            generation: transport.generation(),
            event,
        }
    }

    fn loaded_app() -> (App, Transport) {
        let (transport, _rx) = Transport::new();
        let mut app = App::new("dark", "UTC", "ws://localhost:9090".to_string());
        app.handle_envelope(
            envelope(
                &transport,
                TransportEvent::Buffer {
                    bytes: scenario_buffer(),
                    encoding: Encoding::JsonLines,
                },
            ),
            &transport,
        );
        (app, transport)
    }

    // ── Creation ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_creation_defaults() {
        let app = App::new("light", "UTC", "ws://localhost:9090".to_string());
        assert_eq!(app.theme.name, "light");
        assert_eq!(app.focus, Panel::Topology);
        assert_eq!(app.connection, ConnectionState::Disconnected);
        assert_eq!(app.input, InputMode::Normal);
        assert!(app.criteria.is_match_all());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(9, 10), 0);
        assert_eq!(scroll_offset(15, 10), 6);
        assert_eq!(scroll_offset(3, 0), 3);
    }

    // ── Transport events ──────────────────────────────────────────────────────

    #[test]
    fn test_buffer_event_populates_session() {
        let (app, _t) = loaded_app();
        assert_eq!(app.session.topology().processors().len(), 2);
        assert_eq!(app.session.total_frames(), 2);
        assert_eq!(app.session.frame_path("TextFrame#1"), ["a", "b"]);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let (transport, _rx) = Transport::new();
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        let stale = Envelope {
            generation: transport.generation() + 1,
            event: TransportEvent::Buffer {
                bytes: scenario_buffer(),
                encoding: Encoding::JsonLines,
            },
        };
        app.handle_envelope(stale, &transport);
        assert_eq!(app.session.total_frames(), 0);
    }

    #[test]
    fn test_bad_buffer_raises_notice_and_keeps_session() {
        let (mut app, transport) = loaded_app();
        app.handle_envelope(
            envelope(
                &transport,
                TransportEvent::Buffer {
                    bytes: vec![0xc1],
                    encoding: Encoding::MsgPack,
                },
            ),
            &transport,
        );
        assert_eq!(app.session.total_frames(), 2);
        let notice = app.latest_notice().unwrap();
        assert!(notice.text.starts_with("Dropped buffer"), "got: {}", notice.text);
    }

    #[test]
    fn test_connection_lifecycle_events() {
        let (transport, _rx) = Transport::new();
        let mut app = App::new("dark", "UTC", "ws://x".to_string());

        app.handle_envelope(envelope(&transport, TransportEvent::Connected), &transport);
        assert_eq!(app.connection, ConnectionState::Connected);

        app.handle_envelope(
            envelope(
                &transport,
                TransportEvent::Disconnected {
                    reason: Some("reset by peer".to_string()),
                },
            ),
            &transport,
        );
        assert_eq!(app.connection, ConnectionState::Disconnected);
        assert!(app.latest_notice().unwrap().text.contains("reset by peer"));
    }

    #[test]
    fn test_reset_requested_clears_session() {
        let (mut app, transport) = loaded_app();
        app.handle_envelope(envelope(&transport, TransportEvent::ResetRequested), &transport);
        assert_eq!(app.session.total_frames(), 0);
        assert!(app.session.topology().is_empty());
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_quit_keys() {
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(app.handle_key(ctrl('c')), Some(Command::Quit));
    }

    #[test]
    fn test_tab_cycles_panels() {
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Panel::Frames);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Panel::Path);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Panel::Topology);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.focus, Panel::Path);
    }

    #[test]
    fn test_filter_toggle_keys() {
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        app.handle_key(key(KeyCode::Char('1')));
        app.handle_key(key(KeyCode::Char('4')));
        assert!(!app.criteria.push);
        assert!(app.criteria.process);
        assert!(app.criteria.upstream);
        assert!(!app.criteria.downstream);
    }

    #[test]
    fn test_theme_toggle_key() {
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.theme.name, "light");
    }

    #[test]
    fn test_select_processor_frame_and_navigate_path() {
        let (mut app, _t) = loaded_app();

        // Topology cursor starts on "a".
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.session.selection().state(), FocusState::ProcessorFocused);
        assert_eq!(app.session.selection().processor(), Some("a"));

        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.session.selection().state(), FocusState::FrameFocused);
        assert_eq!(app.session.selection().frame().map(|f| f.id), Some(1));

        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.session.selection().state(), FocusState::PathFocused);
        assert_eq!(app.session.selection().processor(), Some("b"));
        assert_eq!(app.topology_cursor(), 1);

        app.handle_key(key(KeyCode::Home));
        assert_eq!(app.session.selection().processor(), Some("a"));

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.session.selection().state(), FocusState::Idle);
    }

    #[test]
    fn test_url_edit_and_connect_command() {
        let mut app = App::new("dark", "UTC", "ws://localhost:9090".to_string());
        app.handle_key(key(KeyCode::Char('u')));
        assert_eq!(app.input, InputMode::EditUrl("ws://localhost:9090".to_string()));

        for _ in 0..4 {
            app.handle_key(key(KeyCode::Backspace));
        }
        for c in "8765".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        match app.handle_key(key(KeyCode::Enter)) {
            Some(Command::Connect(url)) => assert_eq!(url.as_str(), "ws://localhost:8765/"),
            other => panic!("expected Connect, got {other:?}"),
        }
        assert_eq!(app.input, InputMode::Normal);
    }

    #[test]
    fn test_invalid_url_gives_notice() {
        let mut app = App::new("dark", "UTC", "http://nope".to_string());
        assert_eq!(app.handle_key(key(KeyCode::Char('c'))), None);
        assert!(app.latest_notice().unwrap().text.contains("Invalid endpoint URL"));
    }

    #[test]
    fn test_disconnect_and_replay_keys() {
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        assert_eq!(app.handle_key(key(KeyCode::Char('x'))), Some(Command::Disconnect));

        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), None);
        assert!(app.latest_notice().unwrap().text.contains("--replay"));

        let mut app = app.with_replay(Some(PathBuf::from("/tmp/cap.bin")), Duration::ZERO);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('r'))),
            Some(Command::Replay(PathBuf::from("/tmp/cap.bin")))
        );
    }

    #[test]
    fn test_type_filter_popup() {
        let (mut app, _t) = loaded_app();
        app.handle_key(key(KeyCode::Char('f')));
        for c in "text".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.criteria.types.contains("TextFrame"));

        app.handle_key(ctrl('r'));
        assert!(app.criteria.types.is_empty());

        app.handle_key(ctrl('a'));
        assert_eq!(app.criteria.types.len(), 1);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.input, InputMode::Normal);
    }

    #[test]
    fn test_type_filter_lines() {
        let theme = Theme::dark();
        let vocab = vec!["AudioFrame".to_string(), "TextFrame".to_string()];
        let criteria = FrameCriteria::with_types(["TextFrame"]);
        let lines = build_type_filter_lines(&vocab, "", 0, &criteria, &theme);
        let rows: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(rows, vec!["[ ] AudioFrame", "[x] TextFrame"]);
    }

    // ── Render (does not panic) ───────────────────────────────────────────────

    #[test]
    fn test_render_empty_app_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut app = App::new("dark", "UTC", "ws://localhost:9090".to_string());
        terminal.draw(|frame| app.render(frame)).unwrap();
    }

    #[test]
    fn test_render_with_selection_and_popup_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let (mut app, _t) = loaded_app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('f')));
        terminal.draw(|frame| app.render(frame)).unwrap();
    }

    #[test]
    fn test_render_tiny_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(10, 4)).unwrap();
        let (mut app, _t) = loaded_app();
        app.handle_key(key(KeyCode::Char('u')));
        terminal.draw(|frame| app.render(frame)).unwrap();
    }

    // ── Flash / notices ───────────────────────────────────────────────────────

    #[test]
    fn test_flash_on_log_growth_then_expires() {
        let (mut app, transport) = loaded_app();
        let t0 = Instant::now();
        app.refresh_flashes(t0);
        assert!(app.flashing(t0).contains("a"));

        let later = t0 + FLASH_DURATION + Duration::from_millis(1);
        app.refresh_flashes(later);
        assert!(app.flashing(later).is_empty());

        app.handle_envelope(
            envelope(
                &transport,
                TransportEvent::Buffer {
                    bytes: json_lines(&[json!({"type": "frame", "id": 3, "name": "X", "from": "b",
                        "event": "push", "direction": "upstream", "timestamp": 200})]),
                    encoding: Encoding::JsonLines,
                },
            ),
            &transport,
        );
        app.refresh_flashes(later);
        let flashing = app.flashing(later);
        assert!(flashing.contains("b"));
        assert!(!flashing.contains("a"));
    }

    #[test]
    fn test_notices_are_bounded() {
        let mut app = App::new("dark", "UTC", "ws://x".to_string());
        for i in 0..(MAX_NOTICES + 3) {
            app.push_notice(Notice::info(format!("n{i}")));
        }
        assert_eq!(app.notices.len(), MAX_NOTICES);
        assert_eq!(app.latest_notice().unwrap().text, format!("n{}", MAX_NOTICES + 2));
    }
}
