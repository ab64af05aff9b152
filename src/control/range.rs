/*
Drag-to-Value Mapping
=====================

A knob drag produces a signed delta (pointer travel, key presses, ...). The
mapping from delta to value is linear in the knob's range and clamped at
both ends:

    value = clamp(start + delta * sensitivity * (max - min) / 100, min, max)

With the default sensitivity of 0.5, a delta of 200 sweeps the full range.
`start` is the value when the drag began, so a drag is one continuous
gesture: moving back to delta 0 returns to the starting value.

Values past either end stick to that end. There is no wraparound.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ParamKind;
use crate::error::SequencerError;

pub const DEFAULT_SENSITIVITY: f32 = 0.5;

/// Map a drag delta onto a range. Pure; see the module notes.
pub fn drag_value(start: f32, delta: f32, range: ParamRange, sensitivity: f32) -> f32 {
    range.clamp(start + delta * sensitivity * range.span() / 100.0)
}

/// Closed interval `[min, max]` a parameter may take
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const MODULATION_DEPTH: ParamRange = ParamRange {
        min: 0.0,
        max: 2000.0,
    };
    pub const CARRIER_FREQUENCY: ParamRange = ParamRange {
        min: 1.0,
        max: 2000.0,
    };
    pub const MODULATOR_FREQUENCY: ParamRange = ParamRange {
        min: 0.0,
        max: 2000.0,
    };

    pub fn new(min: f32, max: f32) -> Result<Self, SequencerError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(SequencerError::InvalidRange {
                min: self.min,
                max: self.max,
            })
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Position of `value` within the range, 0.0 at min and 1.0 at max
    pub fn normalize(&self, value: f32) -> f32 {
        ((value - self.min) / self.span()).clamp(0.0, 1.0)
    }
}

/// One range per broadcast parameter
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRanges {
    pub modulation_depth: ParamRange,
    pub carrier_frequency: ParamRange,
    pub modulator_frequency: ParamRange,
}

impl ParamRanges {
    pub fn get(&self, kind: ParamKind) -> ParamRange {
        match kind {
            ParamKind::ModulationDepth => self.modulation_depth,
            ParamKind::CarrierFrequency => self.carrier_frequency,
            ParamKind::ModulatorFrequency => self.modulator_frequency,
        }
    }

    pub fn validate(&self) -> Result<(), SequencerError> {
        self.modulation_depth.validate()?;
        self.carrier_frequency.validate()?;
        self.modulator_frequency.validate()
    }
}

impl Default for ParamRanges {
    fn default() -> Self {
        Self {
            modulation_depth: ParamRange::MODULATION_DEPTH,
            carrier_frequency: ParamRange::CARRIER_FREQUENCY,
            modulator_frequency: ParamRange::MODULATOR_FREQUENCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: ParamRange = ParamRange::CARRIER_FREQUENCY;

    #[test]
    fn mapping_is_linear_inside_the_range() {
        // 1999 Hz span, 0.5 sensitivity: each unit of delta is 9.995 Hz
        let up = drag_value(1000.0, 10.0, RANGE, DEFAULT_SENSITIVITY);
        let down = drag_value(1000.0, -10.0, RANGE, DEFAULT_SENSITIVITY);
        assert!((up - 1099.95).abs() < 1e-3);
        assert!((down - 900.05).abs() < 1e-3);
        assert!(((up - 1000.0) + (down - 1000.0)).abs() < 1e-3);

        assert_eq!(drag_value(1000.0, 0.0, RANGE, DEFAULT_SENSITIVITY), 1000.0);
    }

    #[test]
    fn values_past_either_end_clamp_exactly() {
        for delta in [201.0, 500.0, 1e6, f32::MAX] {
            assert_eq!(drag_value(1000.0, delta, RANGE, DEFAULT_SENSITIVITY), RANGE.max);
        }
        for delta in [-201.0, -500.0, -1e6, f32::MIN] {
            assert_eq!(drag_value(1000.0, delta, RANGE, DEFAULT_SENSITIVITY), RANGE.min);
        }
    }

    #[test]
    fn sensitivity_scales_the_delta() {
        let range = ParamRange::new(0.0, 100.0).unwrap();
        assert_eq!(drag_value(0.0, 10.0, range, 1.0), 10.0);
        assert_eq!(drag_value(0.0, 10.0, range, 2.0), 20.0);
    }

    #[test]
    fn inverted_or_empty_ranges_are_rejected() {
        assert!(ParamRange::new(10.0, 10.0).is_err());
        assert!(ParamRange::new(10.0, 1.0).is_err());
        assert!(ParamRange::new(f32::NAN, 1.0).is_err());
        assert!(ParamRanges::default().validate().is_ok());
    }

    #[test]
    fn normalize_spans_zero_to_one() {
        let range = ParamRange::MODULATION_DEPTH;
        assert_eq!(range.normalize(0.0), 0.0);
        assert_eq!(range.normalize(1000.0), 0.5);
        assert_eq!(range.normalize(2000.0), 1.0);
        assert_eq!(range.normalize(5000.0), 1.0);
    }
}
