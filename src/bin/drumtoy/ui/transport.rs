//! Transport bar widget - shows rows, audio state, and output level

use drumtoy::engine::{Engine, RowStatus};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_transport(
    frame: &mut Frame,
    area: Rect,
    engine: &Engine,
    backend: &str,
    bpm: f64,
    stats: &AudioStats,
) {
    let block = Block::default().title(" drumtoy ").borders(Borders::ALL);

    let running = engine
        .rows()
        .iter()
        .filter(|row| row.status() == RowStatus::Running)
        .count();
    let unlocked = engine.gate().is_unlocked();

    let line = Line::from(vec![
        Span::styled(
            format!(" Rows: {} ({} running)  ", engine.len(), running),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} ms/step  ", engine.config().rate.as_millis()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Note: {} @ {:.0} BPM  ", engine.config().note_length, bpm),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!(
                "Audio: {} {}  ",
                backend,
                if unlocked { "▶" } else { "waiting" }
            ),
            Style::default().fg(if unlocked { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
