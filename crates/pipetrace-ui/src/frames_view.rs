//! Frame inspector panel: the filtered log of the selected processor.
//!
//! One row per frame, oldest first. The selected frame is followed by its
//! payload, pretty-printed and indented.

use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use pipetrace_core::formatting::{format_payload, payload_preview};
use pipetrace_core::models::{Direction, FrameEvent};
use pipetrace_core::time_utils::TimestampFormatter;
use pipetrace_data::{FrameRef, Selection};

use crate::themes::Theme;

/// Characters of payload shown inline on a collapsed row.
const PREVIEW_CHARS: usize = 48;

pub fn event_label(event: FrameEvent) -> &'static str {
    match event {
        FrameEvent::Push => "push",
        FrameEvent::Process => "proc",
    }
}

pub fn direction_arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Upstream => "↑",
        Direction::Downstream => "↓",
    }
}

/// Lines of the inspector plus the index of the line holding the cursor row,
/// used for scrolling.
pub struct FrameLines<'a> {
    pub lines: Vec<Line<'a>>,
    pub cursor_line: usize,
}

pub fn build_frame_lines<'a>(
    frames: &[FrameRef],
    selection: &Selection,
    cursor: Option<usize>,
    timestamps: &TimestampFormatter,
    theme: &'a Theme,
) -> FrameLines<'a> {
    if selection.processor().is_none() {
        return FrameLines {
            lines: vec![Line::from(Span::styled(
                "Select a processor to inspect its frames",
                theme.dim,
            ))],
            cursor_line: 0,
        };
    }
    if frames.is_empty() {
        return FrameLines {
            lines: vec![Line::from(Span::styled("No frames match the filter", theme.dim))],
            cursor_line: 0,
        };
    }

    let mut lines = Vec::with_capacity(frames.len());
    let mut cursor_line = 0;

    for (i, f) in frames.iter().enumerate() {
        let is_cursor = cursor == Some(i);
        let is_selected = selection.is_frame_selected(f);
        if is_cursor {
            cursor_line = lines.len();
        }

        let name_style = if is_selected {
            theme.selected
        } else {
            theme.frame_name_style(f.kind)
        };

        let mut line = Line::from(vec![
            Span::styled(if is_cursor { "▸ " } else { "  " }, theme.border_focused),
            Span::styled(timestamps.clock(f.timestamp), theme.dim),
            Span::raw(" "),
            Span::styled(format!("{:<4}", event_label(f.event)), theme.event_style(f.event)),
            Span::styled(
                format!(" {} ", direction_arrow(f.direction)),
                theme.direction_style(f.direction),
            ),
            Span::styled(f.name.clone(), name_style),
            Span::styled(format!("  {}", payload_preview(&f.payload, PREVIEW_CHARS)), theme.payload),
        ]);
        if is_cursor && !is_selected {
            line = line.style(theme.cursor);
        }
        lines.push(line);

        if is_selected {
            lines.push(Line::from(Span::styled(
                format!("    #{} · {}", f.id, timestamps.full(f.timestamp)),
                theme.label,
            )));
            for payload_line in format_payload(&f.payload).lines() {
                lines.push(Line::from(Span::styled(
                    format!("    {payload_line}"),
                    theme.payload,
                )));
            }
        }
    }

    FrameLines { lines, cursor_line }
}

pub fn render_frames(
    frame: &mut Frame,
    area: Rect,
    content: FrameLines<'_>,
    title: String,
    focused: bool,
    theme: &Theme,
) {
    let height = usize::from(area.height.saturating_sub(2));
    let scroll = crate::app::scroll_offset(content.cursor_line, height);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(focused))
        .title(title);
    let paragraph = Paragraph::new(Text::from(content.lines))
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}
