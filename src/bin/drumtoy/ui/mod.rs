//! TUI module for drumtoy
//!
//! Draws every row's grid and knobs, the output waveform, and turns key
//! presses into engine calls.

mod grid;
mod knobs;
mod transport;
mod waveform;

use std::{rc::Rc, time::Duration};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use drumtoy::{
    control::ParamKind,
    engine::{Engine, RowId, RowStatus},
};
use log::warn;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use super::feed::UiFeed;

use grid::render_grid;
use transport::{render_transport, AudioStats};
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;
/// Redraw interval (~60fps)
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Drag delta per `+`/`-` press
const FINE_DELTA: f32 = 2.0;
/// Drag delta per `]`/`[` press
const COARSE_DELTA: f32 = 20.0;

/// Where the keyboard is pointing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub step: usize,
    pub knob: ParamKind,
}

/// UI application state
pub struct UiApp {
    engine: Engine,
    feed: Rc<UiFeed>,
    /// Sample tap from the audio callback, absent when silent
    audio_rx: Option<Consumer<f32>>,
    audio_buffer: Vec<f32>,
    backend: &'static str,
    bpm: f64,
    cursor: Cursor,
    /// Last error from a key action, shown in the help bar
    message: Option<String>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        engine: Engine,
        feed: Rc<UiFeed>,
        audio_rx: Option<Consumer<f32>>,
        backend: &'static str,
        bpm: f64,
    ) -> Self {
        Self {
            engine,
            feed,
            audio_rx,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            backend,
            bpm,
            cursor: Cursor {
                row: 0,
                step: 0,
                knob: ParamKind::ModulationDepth,
            },
            message: None,
            should_quit: false,
        }
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Run the UI event loop as a task beside the row loops
    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        while !self.should_quit {
            // Yield to the rows between frames
            frames.tick().await;

            self.poll_audio();
            terminal.draw(|frame| self.render(frame))?;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key).await;
                    }
                }
            }
        }

        Ok(())
    }

    /// Poll for new audio samples from ring buffer
    fn poll_audio(&mut self) {
        let Some(audio_rx) = self.audio_rx.as_mut() else {
            return;
        };
        while let Ok(sample) = audio_rx.pop() {
            self.audio_buffer.push(sample);
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let result = match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Up => {
                self.move_row(-1);
                Ok(())
            }
            KeyCode::Down => {
                self.move_row(1);
                Ok(())
            }
            KeyCode::Left => {
                self.move_step(-1);
                Ok(())
            }
            KeyCode::Right => {
                self.move_step(1);
                Ok(())
            }
            KeyCode::Tab => {
                self.cursor.knob = self.cursor.knob.next();
                Ok(())
            }
            KeyCode::Char(' ') | KeyCode::Enter => self
                .engine
                .toggle_step(self.selected(), self.cursor.step)
                .map(|_| ()),
            KeyCode::Char('+') | KeyCode::Char('=') => self.drag(FINE_DELTA),
            KeyCode::Char('-') | KeyCode::Char('_') => self.drag(-FINE_DELTA),
            KeyCode::Char(']') => self.drag(COARSE_DELTA),
            KeyCode::Char('[') => self.drag(-COARSE_DELTA),
            KeyCode::Char('a') => self.engine.add_default_row().map(|id| {
                self.cursor.row = id.0;
                self.clamp_step();
            }),
            KeyCode::Char('s') => self.toggle_running().await,
            _ => Ok(()),
        };

        self.message = match result {
            Ok(()) => None,
            Err(err) => {
                warn!("key {:?}: {}", key.code, err);
                Some(err.to_string())
            }
        };
    }

    fn selected(&self) -> RowId {
        RowId(self.cursor.row)
    }

    fn move_row(&mut self, by: isize) {
        let rows = self.engine.len();
        if rows == 0 {
            return;
        }
        self.cursor.row = (self.cursor.row as isize + by).rem_euclid(rows as isize) as usize;
        self.clamp_step();
    }

    fn move_step(&mut self, by: isize) {
        let Ok(row) = self.engine.row(self.selected()) else {
            return;
        };
        let steps = row.steps() as isize;
        self.cursor.step = (self.cursor.step as isize + by).rem_euclid(steps) as usize;
    }

    /// Rows can differ in length; keep the step cursor inside the new row
    fn clamp_step(&mut self) {
        if let Ok(row) = self.engine.row(self.selected()) {
            self.cursor.step = self.cursor.step.min(row.steps() - 1);
        }
    }

    fn drag(&mut self, delta: f32) -> Result<(), drumtoy::SequencerError> {
        self.engine
            .drag_parameter(self.selected(), self.cursor.knob, delta)
            .map(|_| ())
    }

    async fn toggle_running(&mut self) -> Result<(), drumtoy::SequencerError> {
        let id = self.selected();
        if self.engine.row(id)?.status() == RowStatus::Running {
            self.engine.stop_row(id).await
        } else {
            self.engine.start_row(id)
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let grid_height = self.engine.len() as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),           // Transport bar
                Constraint::Min(grid_height),    // Rows
                Constraint::Length(8),           // Waveform
                Constraint::Length(1),           // Help bar
            ])
            .split(area);

        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_transport(frame, chunks[0], &self.engine, self.backend, self.bpm, &stats);

        let grid_block = Block::default().title(" Rows ").borders(Borders::ALL);
        let grid_inner = grid_block.inner(chunks[1]);
        frame.render_widget(grid_block, chunks[1]);
        render_grid(frame, grid_inner, &self.engine, &self.feed, self.cursor);

        render_waveform(frame, chunks[2], &self.audio_buffer);

        let help = match &self.message {
            Some(message) => Paragraph::new(format!(" {}", message))
                .style(Style::default().fg(Color::Red)),
            None => Paragraph::new(
                " [←→↑↓] Move  [Space] Toggle  [Tab] Knob  [+/-] Turn  [[/]] Turn more  [A] Add row  [S] Stop/Start  [Q] Quit",
            )
            .style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(help, chunks[3]);
    }
}
