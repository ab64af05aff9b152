//! Row notifications collected for the UI to draw.

use std::cell::{Cell, RefCell};

use drumtoy::engine::{RowId, RowObserver};

/// Latest playhead of every row plus the last step toggle.
///
/// Written by row loops, read by the UI, all on the scheduler thread.
#[derive(Default)]
pub struct UiFeed {
    playheads: RefCell<Vec<Option<usize>>>,
    ticks: Cell<u64>,
    last_toggle: Cell<Option<(RowId, usize, bool)>>,
}

impl UiFeed {
    /// Step the row played most recently, if it has ticked yet
    pub fn playhead(&self, row: RowId) -> Option<usize> {
        self.playheads.borrow().get(row.0).copied().flatten()
    }

    /// Ticks seen across all rows
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    pub fn last_toggle(&self) -> Option<(RowId, usize, bool)> {
        self.last_toggle.get()
    }
}

impl RowObserver for UiFeed {
    fn on_step_advance(&self, row: RowId, step: usize) {
        let mut playheads = self.playheads.borrow_mut();
        if playheads.len() <= row.0 {
            playheads.resize(row.0 + 1, None);
        }
        playheads[row.0] = Some(step);
        self.ticks.set(self.ticks.get() + 1);
    }

    fn on_step_toggled(&self, row: RowId, step: usize, is_on: bool) {
        self.last_toggle.set(Some((row, step, is_on)));
    }
}
