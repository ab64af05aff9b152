//! Engine and row configuration.
//!
//! Both types are builders with sensible defaults:
//!
//! ```ignore
//! let config = EngineConfig::new()
//!     .steps(16)
//!     .rate(Duration::from_millis(120))
//!     .no_startup_rows()
//!     .startup_row(RowSpec::new(RowSeeds::new(500.0, 10.0, 100.0)));
//! ```

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    control::{ParamRanges, RowSeeds, DEFAULT_SENSITIVITY},
    error::SequencerError,
    sequencing::NoteLength,
};

pub const DEFAULT_STEPS: usize = 8;
pub const DEFAULT_RATE: Duration = Duration::from_millis(100);

/// Seeds used by the "add row" action
pub const ADD_ROW_SEEDS: RowSeeds = RowSeeds::new(500.0, 10.0, 100.0);

/// The four rows the toy opens with
pub const STARTUP_SEEDS: [RowSeeds; 4] = [
    RowSeeds::new(500.0, 10.0, 100.0),
    RowSeeds::new(500.0, 2200.0, 200.0),
    RowSeeds::new(540.0, 200.0, 500.0),
    RowSeeds::new(100.0, 100.0, 200.0),
];

/// How to build one row. Unset fields fall back to the engine's defaults.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSpec {
    pub seeds: RowSeeds,
    pub rate: Option<Duration>,
    pub steps: Option<usize>,
}

impl RowSpec {
    pub fn new(seeds: RowSeeds) -> Self {
        Self {
            seeds,
            rate: None,
            steps: None,
        }
    }

    pub fn rate(mut self, rate: Duration) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = Some(steps);
        self
    }
}

impl From<RowSeeds> for RowSpec {
    fn from(seeds: RowSeeds) -> Self {
        Self::new(seeds)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Steps per row unless a row overrides it
    pub steps: usize,
    /// Tick interval unless a row overrides it
    pub rate: Duration,
    /// Length of every triggered note
    pub note_length: NoteLength,
    /// Drag sensitivity for every knob
    pub sensitivity: f32,
    pub ranges: ParamRanges,
    /// Rows created by `Engine::spawn_startup_rows`
    pub startup_rows: Vec<RowSpec>,
    /// Seeds for `Engine::add_default_row`
    pub add_row_seeds: RowSeeds,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            rate: DEFAULT_RATE,
            note_length: NoteLength::SIXTEENTH,
            sensitivity: DEFAULT_SENSITIVITY,
            ranges: ParamRanges::default(),
            startup_rows: STARTUP_SEEDS.iter().copied().map(RowSpec::new).collect(),
            add_row_seeds: ADD_ROW_SEEDS,
        }
    }

    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn rate(mut self, rate: Duration) -> Self {
        self.rate = rate;
        self
    }

    pub fn note_length(mut self, note_length: NoteLength) -> Self {
        self.note_length = note_length;
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn ranges(mut self, ranges: ParamRanges) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn no_startup_rows(mut self) -> Self {
        self.startup_rows.clear();
        self
    }

    pub fn startup_row(mut self, spec: impl Into<RowSpec>) -> Self {
        self.startup_rows.push(spec.into());
        self
    }

    pub fn add_row_seeds(mut self, seeds: RowSeeds) -> Self {
        self.add_row_seeds = seeds;
        self
    }

    /// Steps and rate a row will actually use
    pub fn resolve(&self, spec: &RowSpec) -> (usize, Duration) {
        (
            spec.steps.unwrap_or(self.steps),
            spec.rate.unwrap_or(self.rate),
        )
    }

    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        if self.rate.is_zero() {
            return Err(SequencerError::ZeroRate);
        }
        if !(self.sensitivity.is_finite() && self.sensitivity > 0.0) {
            return Err(SequencerError::InvalidSensitivity(self.sensitivity));
        }
        self.ranges.validate()?;
        for spec in &self.startup_rows {
            self.validate_row(spec)?;
        }
        Ok(())
    }

    pub fn validate_row(&self, spec: &RowSpec) -> Result<(), SequencerError> {
        let (steps, rate) = self.resolve(spec);
        if steps == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        if rate.is_zero() {
            return Err(SequencerError::ZeroRate);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ParamRange;

    #[test]
    fn defaults_match_the_reference_toy() {
        let config = EngineConfig::default();
        assert_eq!(config.steps, 8);
        assert_eq!(config.rate, Duration::from_millis(100));
        assert_eq!(config.note_length, NoteLength::SIXTEENTH);
        assert_eq!(config.sensitivity, 0.5);
        assert_eq!(config.startup_rows.len(), 4);
        assert_eq!(config.startup_rows[1].seeds.carrier_frequency, 2200.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn row_overrides_win_over_engine_defaults() {
        let config = EngineConfig::new().steps(16);
        let spec = RowSpec::new(ADD_ROW_SEEDS).rate(Duration::from_millis(250));
        assert_eq!(config.resolve(&spec), (16, Duration::from_millis(250)));

        let spec = spec.steps(4);
        assert_eq!(config.resolve(&spec), (4, Duration::from_millis(250)));
    }

    #[test]
    fn bad_configuration_is_rejected() {
        assert_eq!(
            EngineConfig::new().steps(0).validate(),
            Err(SequencerError::ZeroSteps)
        );
        assert_eq!(
            EngineConfig::new().rate(Duration::ZERO).validate(),
            Err(SequencerError::ZeroRate)
        );
        assert_eq!(
            EngineConfig::new().sensitivity(0.0).validate(),
            Err(SequencerError::InvalidSensitivity(0.0))
        );

        let mut ranges = ParamRanges::default();
        ranges.carrier_frequency = ParamRange { min: 10.0, max: 1.0 };
        assert_eq!(
            EngineConfig::new().ranges(ranges).validate(),
            Err(SequencerError::InvalidRange { min: 10.0, max: 1.0 })
        );

        let zero_row = RowSpec::new(ADD_ROW_SEEDS).rate(Duration::ZERO);
        assert_eq!(
            EngineConfig::new().startup_row(zero_row).validate(),
            Err(SequencerError::ZeroRate)
        );
    }
}
