//! Topology panel: the processor tree with per-processor frame counts.
//!
//! Processors are listed depth-first, children indented under their parent.
//! Log buckets for ids the topology does not know follow as `? <id>` rows.

use std::collections::HashSet;

use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use pipetrace_core::formatting::format_count;
use pipetrace_data::Session;

use crate::themes::Theme;

/// One selectable row of the topology panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyRow {
    pub id: String,
    pub depth: usize,
    /// Display name, `None` for an unlabeled bucket.
    pub name: Option<String>,
}

/// Rows in display order.
pub fn topology_rows(session: &Session) -> Vec<TopologyRow> {
    let topology = session.topology();
    let mut rows: Vec<TopologyRow> = topology
        .tree_order()
        .into_iter()
        .map(|(depth, p)| TopologyRow {
            id: p.id.clone(),
            depth,
            name: Some(p.name.clone()),
        })
        .collect();

    rows.extend(session.unlabeled_processors().iter().map(|id| TopologyRow {
        id: id.clone(),
        depth: 0,
        name: None,
    }));
    rows
}

/// Panel title including version metadata when the producer sent any.
pub fn topology_title(session: &Session) -> String {
    let versions = session
        .topology()
        .versions()
        .map(|v| {
            v.labelled()
                .into_iter()
                .map(|(label, value)| format!("{label} {value}"))
                .collect::<Vec<_>>()
                .join(" · ")
        })
        .filter(|s| !s.is_empty());

    match versions {
        Some(v) => format!(" Topology ({v}) "),
        None => " Topology ".to_string(),
    }
}

/// Build the panel lines.
///
/// `flashing` holds processors that received frames within the flash window.
pub fn build_topology_lines<'a>(
    session: &Session,
    rows: &[TopologyRow],
    cursor: Option<usize>,
    flashing: &HashSet<String>,
    theme: &'a Theme,
) -> Vec<Line<'a>> {
    if rows.is_empty() {
        return vec![Line::from(Span::styled(
            "Waiting for a pipeline topology…",
            theme.dim,
        ))];
    }

    let selected = session.selection().processor();
    let topology = session.topology();

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let is_selected = selected == Some(row.id.as_str());
            let is_cursor = cursor == Some(i);

            let marker = if is_cursor { "▸ " } else { "  " };
            let indent = "  ".repeat(row.depth);

            let name_style = if is_selected {
                theme.selected
            } else if flashing.contains(&row.id) {
                theme.flash
            } else if row.name.is_none() {
                theme.unlabeled
            } else {
                theme.text
            };

            let label = match &row.name {
                Some(name) => name.clone(),
                None => format!("? {}", row.id),
            };

            let mut spans = vec![
                Span::styled(marker, theme.border_focused),
                Span::raw(indent),
                Span::styled(label, name_style),
                Span::styled(
                    format!(" ({})", format_count(session.log_len(&row.id))),
                    theme.dim,
                ),
            ];

            let targets: Vec<&str> = topology
                .successors(&row.id)
                .map(|id| topology.processor(id).map_or(id, |p| p.name.as_str()))
                .collect();
            if !targets.is_empty() {
                spans.push(Span::styled(format!(" → {}", targets.join(", ")), theme.label));
            }

            let mut line = Line::from(spans);
            if is_cursor && !is_selected {
                line = line.style(theme.cursor);
            }
            line
        })
        .collect()
}

pub fn render_topology(
    frame: &mut Frame,
    area: Rect,
    lines: Vec<Line<'_>>,
    title: String,
    scroll: u16,
    focused: bool,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(focused))
        .title(title);
    let paragraph = Paragraph::new(Text::from(lines)).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}
