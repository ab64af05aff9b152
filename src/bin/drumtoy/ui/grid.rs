//! Grid widget - one line per row: step cells with playhead, then knobs

use drumtoy::engine::{Engine, RowStatus};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{knobs::knob_spans, Cursor};
use crate::feed::UiFeed;

const LABEL_WIDTH: usize = 8;

/// Render every row's pattern, playhead and knobs
pub fn render_grid(frame: &mut Frame, area: Rect, engine: &Engine, feed: &UiFeed, cursor: Cursor) {
    if area.height < 1 || area.width < 20 {
        return;
    }

    let mut lines = Vec::with_capacity(engine.len());
    for (index, row) in engine.rows().iter().enumerate() {
        let selected = index == cursor.row;
        let running = row.status() == RowStatus::Running;
        let playhead = feed.playhead(row.id());

        let mut spans = Vec::new();
        let label = format!("{:<width$}", row.id().to_string(), width = LABEL_WIDTH);
        spans.push(Span::styled(
            label,
            Style::default().fg(match (selected, running) {
                (true, _) => Color::Yellow,
                (false, true) => Color::White,
                (false, false) => Color::DarkGray,
            }),
        ));

        for (step, on) in row.pattern().iter().enumerate() {
            let mut style = Style::default().fg(if on { Color::Cyan } else { Color::DarkGray });
            if running && playhead == Some(step) {
                style = style.bg(Color::Rgb(60, 60, 20));
            }
            if selected && step == cursor.step {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(if on { " ■ " } else { " □ " }, style));
        }

        spans.push(Span::raw("   "));
        spans.extend(knob_spans(&row.controls(), selected.then_some(cursor.knob)));
        if !running {
            spans.push(Span::styled("  stopped", Style::default().fg(Color::DarkGray)));
        }

        lines.push(Line::from(spans));
    }

    if let Some((row, step, is_on)) = feed.last_toggle() {
        lines.push(Line::from(Span::styled(
            format!("{} step {} {}", row, step + 1, if is_on { "on" } else { "off" }),
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}
