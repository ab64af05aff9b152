//! Step pointer for one row.
//!
//! The pointer only moves forward by one and wraps at the row length; what
//! happens on a step never affects where the pointer goes next.

use crate::error::SequencerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepClock {
    position: usize,
    steps: usize,
}

impl StepClock {
    pub fn new(steps: usize) -> Result<Self, SequencerError> {
        Self::starting_at(steps, 0)
    }

    pub fn starting_at(steps: usize, position: usize) -> Result<Self, SequencerError> {
        if steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        if position >= steps {
            return Err(SequencerError::StepOutOfRange {
                step: position,
                steps,
            });
        }
        Ok(Self { position, steps })
    }

    /// Step the next tick will play
    pub fn current(&self) -> usize {
        self.position
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Move to the next step, wrapping at the end, and return it
    pub fn advance(&mut self) -> usize {
        self.position = (self.position + 1) % self.steps;
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}
