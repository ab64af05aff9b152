/*
Step Pattern
============

The on/off state of each step in a row. Index i of the pattern is step i of
the row, voice i of its bank and button i of the grid.

Only user interaction changes a pattern; the clock reads it once per tick and
never writes. Because a tick reads the pattern at the moment the pointer
arrives, a step switched on while the pointer is elsewhere is heard on its
next visit and never earlier.

Text form, used by the CLI and in logs:

    "..x..x.."   steps 2 and 5 on in an 8-step row
*/

use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPattern {
    steps: Vec<bool>,
}

impl StepPattern {
    /// All steps off
    pub fn new(len: usize) -> Result<Self, SequencerError> {
        if len == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        Ok(Self {
            steps: vec![false; len],
        })
    }

    /// Pattern with the listed steps switched on
    pub fn with_active(len: usize, active: &[usize]) -> Result<Self, SequencerError> {
        let mut pattern = Self::new(len)?;
        for &step in active {
            pattern.set(step, true)?;
        }
        Ok(pattern)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `None` when `step` is out of range
    pub fn get(&self, step: usize) -> Option<bool> {
        self.steps.get(step).copied()
    }

    /// Flip a step and return its new state
    pub fn toggle(&mut self, step: usize) -> Result<bool, SequencerError> {
        let steps = self.steps.len();
        let slot = self
            .steps
            .get_mut(step)
            .ok_or(SequencerError::StepOutOfRange { step, steps })?;
        *slot = !*slot;
        Ok(*slot)
    }

    pub fn set(&mut self, step: usize, on: bool) -> Result<(), SequencerError> {
        let steps = self.steps.len();
        let slot = self
            .steps
            .get_mut(step)
            .ok_or(SequencerError::StepOutOfRange { step, steps })?;
        *slot = on;
        Ok(())
    }

    /// Indices of the steps that are on, ascending
    pub fn active_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps
            .iter()
            .enumerate()
            .filter_map(|(step, &on)| on.then_some(step))
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.steps.iter().copied()
    }
}

impl fmt::Display for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for on in self.iter() {
            f.write_str(if on { "x" } else { "." })?;
        }
        Ok(())
    }
}

impl FromStr for StepPattern {
    type Err = SequencerError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let steps = text
            .trim()
            .chars()
            .map(|c| match c {
                'x' | 'X' | '#' | '1' => Ok(true),
                '.' | '-' | '0' => Ok(false),
                _ => Err(SequencerError::InvalidPattern(text.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if steps.is_empty() {
            return Err(SequencerError::ZeroSteps);
        }
        Ok(Self { steps })
    }
}
