//! Knob readouts

use drumtoy::control::{Knob, ParamKind, RowControls};
use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
};

/// Pointer glyphs from -135° (min) to +135° (max)
const POINTERS: [char; 7] = ['↙', '←', '↖', '↑', '↗', '→', '↘'];

pub fn pointer(knob: &Knob) -> char {
    let turn = (knob.rotation_degrees() + 135.0) / 270.0;
    let index = (turn * (POINTERS.len() - 1) as f32).round() as usize;
    POINTERS[index.min(POINTERS.len() - 1)]
}

/// `Mod ↑ 1000` style spans for a row's three knobs
pub fn knob_spans(controls: &RowControls, focused: Option<ParamKind>) -> Vec<Span<'static>> {
    ParamKind::ALL
        .iter()
        .map(|&kind| {
            let knob = controls.knob(kind);
            let mut style = Style::default().fg(Color::Magenta);
            if focused == Some(kind) {
                style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
            }
            Span::styled(
                format!("{} {} {:>6.1}  ", kind.label(), pointer(knob), knob.value()),
                style,
            )
        })
        .collect()
}
