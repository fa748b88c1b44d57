//! Frame path panel: every processor the focused frame name passed through,
//! merged into one timeline.

use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use pipetrace_core::time_utils::{format_delta_ms, TimestampFormatter};
use pipetrace_data::{Session, TimelineEntry};

use crate::frames_view::{direction_arrow, event_label};
use crate::themes::Theme;

pub fn path_title(session: &Session) -> String {
    match session.selection().path_name() {
        Some(name) => {
            let hops = session.frame_path(name).len();
            format!(" Path: {name} ({hops} processors) ")
        }
        None => " Path ".to_string(),
    }
}

/// Build the timeline lines and the index of the focused entry.
///
/// Each row shows the offset from the first entry, so the spread of one
/// frame across the pipeline reads directly.
pub fn build_path_lines<'a>(
    session: &Session,
    timeline: &[TimelineEntry],
    timestamps: &TimestampFormatter,
    theme: &'a Theme,
) -> (Vec<Line<'a>>, Option<usize>) {
    let Some(focused) = session.selection().frame_path() else {
        return (
            vec![Line::from(Span::styled(
                "Select a frame to trace its path",
                theme.dim,
            ))],
            None,
        );
    };
    if timeline.is_empty() {
        return (
            vec![Line::from(Span::styled("No path entries match the filter", theme.dim))],
            None,
        );
    }

    let origin = timeline[0].frame.timestamp;
    let mut focus_index = None;

    let lines: Vec<Line<'a>> = timeline
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let f = &entry.frame;
            let is_focused = f.seq == focused.seq;
            if is_focused {
                focus_index = Some(i);
            }

            let (label, label_style) = match session.processor(&entry.processor) {
                Some(p) => (p.name.clone(), theme.text),
                None => (format!("? {}", entry.processor), theme.unlabeled),
            };

            Line::from(vec![
                Span::styled(if is_focused { "● " } else { "│ " }, theme.border_focused),
                Span::styled(timestamps.clock(f.timestamp), theme.dim),
                Span::styled(format!(" {:>8} ", format_delta_ms(origin, f.timestamp)), theme.label),
                Span::styled(
                    format!("{:<4}", event_label(f.event)),
                    theme.event_style(f.event),
                ),
                Span::styled(
                    format!(" {} ", direction_arrow(f.direction)),
                    theme.direction_style(f.direction),
                ),
                Span::styled(label, if is_focused { theme.selected } else { label_style }),
            ])
        })
        .collect();

    (lines, focus_index)
}

pub fn render_path(
    frame: &mut Frame,
    area: Rect,
    lines: Vec<Line<'_>>,
    focus_index: Option<usize>,
    title: String,
    focused: bool,
    theme: &Theme,
) {
    let height = usize::from(area.height.saturating_sub(2));
    let scroll = crate::app::scroll_offset(focus_index.unwrap_or(0), height);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(focused))
        .title(title);
    let paragraph = Paragraph::new(Text::from(lines)).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}
