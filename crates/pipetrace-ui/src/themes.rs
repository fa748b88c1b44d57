use pipetrace_core::models::{Direction, FrameEvent, FrameKind};
use pipetrace_core::settings::detect_theme_name;
use ratatui::style::{Color, Modifier, Style};

/// Complete theme definition carrying all UI styles used by the inspector
/// panels and components.
#[derive(Debug, Clone)]
pub struct Theme {
    /// `"dark"` or `"light"`.
    pub name: &'static str,

    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub bold: Style,
    pub label: Style,
    pub value: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    pub info: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,

    // ── Panels ───────────────────────────────────────────────────────────────
    pub border: Style,
    pub border_focused: Style,
    /// Row under the keyboard cursor.
    pub cursor: Style,
    /// Selected processor or frame.
    pub selected: Style,
    /// Processor that just received frames.
    pub flash: Style,
    /// Log bucket for a processor missing from the topology.
    pub unlabeled: Style,

    // ── Frames ───────────────────────────────────────────────────────────────
    pub event_push: Style,
    pub event_process: Style,
    pub direction_upstream: Style,
    pub direction_downstream: Style,
    pub frame_highlighted: Style,
    pub frame_urgent: Style,
    pub payload: Style,

    // ── Connection pill ──────────────────────────────────────────────────────
    pub pill_connected: Style,
    pub pill_connecting: Style,
    pub pill_disconnected: Style,
    pub pill_replay: Style,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            name: "dark",

            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            bold: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),

            info: Style::default().fg(Color::Cyan),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            border: Style::default().fg(Color::DarkGray),
            border_focused: Style::default().fg(Color::Cyan),
            cursor: Style::default().bg(Color::DarkGray),
            selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            flash: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            unlabeled: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),

            event_push: Style::default().fg(Color::Green),
            event_process: Style::default().fg(Color::Blue),
            direction_upstream: Style::default().fg(Color::Magenta),
            direction_downstream: Style::default().fg(Color::Cyan),
            frame_highlighted: Style::default().fg(Color::Yellow),
            frame_urgent: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            payload: Style::default().fg(Color::Gray),

            pill_connected: Style::default().fg(Color::Black).bg(Color::Green),
            pill_connecting: Style::default().fg(Color::Black).bg(Color::Yellow),
            pill_disconnected: Style::default().fg(Color::White).bg(Color::Red),
            pill_replay: Style::default().fg(Color::Black).bg(Color::Cyan),
        }
    }

    /// Light-background terminal theme.
    ///
    /// Uses dark colours for text so that content remains legible against a
    /// white/light-grey terminal canvas.
    pub fn light() -> Self {
        Self {
            name: "light",

            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            separator: Style::default().fg(Color::Gray),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            bold: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),

            info: Style::default().fg(Color::Blue),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            border: Style::default().fg(Color::Gray),
            border_focused: Style::default().fg(Color::Blue),
            cursor: Style::default().bg(Color::Gray),
            selected: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            flash: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            unlabeled: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),

            event_push: Style::default().fg(Color::Green),
            event_process: Style::default().fg(Color::Blue),
            direction_upstream: Style::default().fg(Color::Magenta),
            direction_downstream: Style::default().fg(Color::DarkGray),
            frame_highlighted: Style::default().fg(Color::Magenta),
            frame_urgent: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            payload: Style::default().fg(Color::DarkGray),

            pill_connected: Style::default().fg(Color::White).bg(Color::Green),
            pill_connecting: Style::default().fg(Color::Black).bg(Color::Yellow),
            pill_disconnected: Style::default().fg(Color::White).bg(Color::Red),
            pill_replay: Style::default().fg(Color::White).bg(Color::Blue),
        }
    }

    /// Construct a theme by name. `"auto"` and unknown names follow the
    /// detected terminal background.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            _ => Self::from_name_detected(),
        }
    }

    fn from_name_detected() -> Self {
        match detect_theme_name() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// The other theme.
    pub fn toggled(&self) -> Self {
        match self.name {
            "light" => Self::dark(),
            _ => Self::light(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    pub fn event_style(&self, event: FrameEvent) -> Style {
        match event {
            FrameEvent::Push => self.event_push,
            FrameEvent::Process => self.event_process,
        }
    }

    pub fn direction_style(&self, direction: Direction) -> Style {
        match direction {
            Direction::Upstream => self.direction_upstream,
            Direction::Downstream => self.direction_downstream,
        }
    }

    /// Style for a frame's name column, depending on how it was marked.
    pub fn frame_name_style(&self, kind: FrameKind) -> Style {
        match kind {
            FrameKind::Standard => self.text,
            FrameKind::Highlighted => self.frame_highlighted,
            FrameKind::Urgent => self.frame_urgent,
        }
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.border_focused
        } else {
            self.border
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
