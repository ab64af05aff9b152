//! Output oscilloscope

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

pub fn render_waveform(frame: &mut Frame, area: Rect, samples: &[f32]) {
    let block = Block::default().title(" Output ").borders(Borders::ALL);

    let len = samples.len().max(1) as f64;
    let points: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / len, s as f64))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let axis = |bounds| {
        Axis::default()
            .bounds(bounds)
            .style(Style::default().fg(Color::DarkGray))
    };
    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(axis([0.0, 1.0]))
        .y_axis(axis([-1.0, 1.0]));

    frame.render_widget(chart, area);
}
