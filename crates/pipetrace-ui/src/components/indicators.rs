use crate::themes::Theme;
use pipetrace_data::FrameCriteria;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

// ── ConnectionState / ConnectionPill ─────────────────────────────────────────

/// Where buffers are currently coming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Replaying,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Replaying => "replay",
        }
    }
}

/// Coloured status pill, e.g. `" ● connected "`.
pub struct ConnectionPill<'a> {
    pub state: ConnectionState,
    pub theme: &'a Theme,
}

impl<'a> ConnectionPill<'a> {
    pub fn new(state: ConnectionState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn style(&self) -> Style {
        match self.state {
            ConnectionState::Disconnected => self.theme.pill_disconnected,
            ConnectionState::Connecting => self.theme.pill_connecting,
            ConnectionState::Connected => self.theme.pill_connected,
            ConnectionState::Replaying => self.theme.pill_replay,
        }
    }

    pub fn to_span(&self) -> Span<'a> {
        let dot = match self.state {
            ConnectionState::Connected | ConnectionState::Replaying => "●",
            ConnectionState::Connecting => "◌",
            ConnectionState::Disconnected => "○",
        };
        Span::styled(format!(" {dot} {} ", self.state.label()), self.style())
    }
}

// ── FilterIndicator ──────────────────────────────────────────────────────────

/// Summary of the active frame filter:
///
/// `"[1] push  [2] process  [3] upstream  [4] downstream  types: all"`
///
/// Disabled toggles are dimmed.
pub struct FilterIndicator<'a> {
    pub criteria: &'a FrameCriteria,
    pub theme: &'a Theme,
}

impl<'a> FilterIndicator<'a> {
    pub fn new(criteria: &'a FrameCriteria, theme: &'a Theme) -> Self {
        Self { criteria, theme }
    }

    pub fn to_line(&self) -> Line<'a> {
        let toggles = [
            ("1", "push", self.criteria.push, self.theme.event_push),
            ("2", "process", self.criteria.process, self.theme.event_process),
            ("3", "upstream", self.criteria.upstream, self.theme.direction_upstream),
            ("4", "downstream", self.criteria.downstream, self.theme.direction_downstream),
        ];

        let mut spans = Vec::with_capacity(toggles.len() * 2 + 2);
        for (key, label, on, style) in toggles {
            spans.push(Span::styled(format!("[{key}] "), self.theme.dim));
            let style = if on { style } else { self.theme.dim };
            spans.push(Span::styled(format!("{label}  "), style));
        }

        spans.push(Span::styled("[f] types: ", self.theme.dim));
        let types = match self.criteria.types.len() {
            0 => "all".to_string(),
            1 => self
                .criteria
                .types
                .iter()
                .next()
                .cloned()
                .unwrap_or_default(),
            n => format!("{n} selected"),
        };
        spans.push(Span::styled(types, self.theme.value));

        Line::from(spans)
    }
}

// ── NoticeLine ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One operator-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    pub fn to_line<'a>(&self, theme: &Theme) -> Line<'a> {
        let (icon, style) = match self.level {
            NoticeLevel::Info => ("ℹ ", theme.info),
            NoticeLevel::Warning => ("⚠ ", theme.warning),
            NoticeLevel::Error => ("✖ ", theme.error),
        };
        Line::from(vec![
            Span::styled(icon, style),
            Span::styled(self.text.clone(), style),
        ])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::themes::Theme;
    use pipetrace_core::models::FrameEvent;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    // ── ConnectionPill ───────────────────────────────────────────────────────

    #[test]
    fn test_pill_text_per_state() {
        let theme = Theme::dark();
        assert_eq!(
            ConnectionPill::new(ConnectionState::Connected, &theme).to_span().content,
            " ● connected "
        );
        assert_eq!(
            ConnectionPill::new(ConnectionState::Disconnected, &theme).to_span().content,
            " ○ disconnected "
        );
        assert_eq!(
            ConnectionPill::new(ConnectionState::Replaying, &theme).to_span().content,
            " ● replay "
        );
    }

    #[test]
    fn test_pill_style_follows_state() {
        let theme = Theme::dark();
        let pill = ConnectionPill::new(ConnectionState::Connecting, &theme);
        assert_eq!(pill.style(), theme.pill_connecting);
        assert_eq!(pill.to_span().style, theme.pill_connecting);
    }

    // ── FilterIndicator ──────────────────────────────────────────────────────

    #[test]
    fn test_filter_indicator_all_on() {
        let theme = Theme::dark();
        let criteria = FrameCriteria::all();
        let line = FilterIndicator::new(&criteria, &theme).to_line();
        let content = text(&line);
        assert!(content.contains("[1] push"), "got: {content}");
        assert!(content.contains("[4] downstream"), "got: {content}");
        assert!(content.ends_with("types: all"), "got: {content}");
        assert_eq!(line.spans[1].style, theme.event_push);
    }

    #[test]
    fn test_filter_indicator_dims_disabled_toggle() {
        let theme = Theme::dark();
        let mut criteria = FrameCriteria::all();
        criteria.toggle_event(FrameEvent::Push);
        let line = FilterIndicator::new(&criteria, &theme).to_line();
        assert_eq!(line.spans[1].style, theme.dim);
    }

    #[test]
    fn test_filter_indicator_type_summary() {
        let theme = Theme::dark();
        let one = FrameCriteria::with_types(["TextFrame"]);
        assert!(text(&FilterIndicator::new(&one, &theme).to_line()).ends_with("TextFrame"));

        let two = FrameCriteria::with_types(["TextFrame", "AudioFrame"]);
        assert!(text(&FilterIndicator::new(&two, &theme).to_line()).ends_with("2 selected"));
    }

    // ── Notice ───────────────────────────────────────────────────────────────

    #[test]
    fn test_notice_line_levels() {
        let theme = Theme::dark();
        let line = Notice::error("boom").to_line(&theme);
        assert_eq!(text(&line), "✖ boom");
        assert_eq!(line.spans[1].style, theme.error);

        let line = Notice::info("hi").to_line(&theme);
        assert_eq!(line.spans[0].style, theme.info);
    }
}
