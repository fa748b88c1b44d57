use crate::components::indicators::{ConnectionPill, ConnectionState};
use crate::themes::Theme;
use pipetrace_core::formatting::format_count;
use ratatui::text::{Line, Span};

/// Application title shown on the first header line.
pub const TITLE: &str = "PIPETRACE";

/// Inspector header rendering three lines:
///
/// 1. Title, connection pill and endpoint.
/// 2. A separator as wide as the terminal.
/// 3. Theme, timezone and frame/processor totals in `[ … | … ]` format.
pub struct Header<'a> {
    pub connection: ConnectionState,
    /// Endpoint URL, or the in-progress edit buffer.
    pub endpoint: &'a str,
    pub editing: bool,
    pub timezone: &'a str,
    pub processors: usize,
    pub frames: usize,
    pub width: u16,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut title = vec![
            Span::styled(format!("{TITLE} "), self.theme.header),
            ConnectionPill::new(self.connection, self.theme).to_span(),
            Span::raw(" "),
        ];
        if self.editing {
            title.push(Span::styled("url: ", self.theme.warning));
            title.push(Span::styled(format!("{}▏", self.endpoint), self.theme.value));
        } else {
            title.push(Span::styled(self.endpoint.to_string(), self.theme.label));
        }

        vec![
            Line::from(title),
            Line::from(Span::styled(
                "─".repeat(usize::from(self.width.max(1))),
                self.theme.separator,
            )),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.theme.name, self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(self.timezone.to_string(), self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(
                    format!("{} processors", format_count(self.processors)),
                    self.theme.value,
                ),
                Span::styled(" | ", self.theme.label),
                Span::styled(
                    format!("{} frames", format_count(self.frames)),
                    self.theme.value,
                ),
                Span::styled(" ]", self.theme.label),
            ]),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
