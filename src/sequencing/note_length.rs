use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

/// Largest number a token may carry, e.g. `"256n"` or `"256m"`
pub const MAX_TOKEN_VALUE: u32 = 256;

/// Musical note length represented as a rational fraction of a whole note.
/// All operations preserve exact ratios; conversion to seconds happens only
/// at the tone engine, against its tempo.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteLength {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, etc.)
    pub denominator: u32,
}

impl NoteLength {
    // Standard note values
    pub const WHOLE: NoteLength = NoteLength {
        numerator: 1,
        denominator: 1,
    };
    pub const HALF: NoteLength = NoteLength {
        numerator: 1,
        denominator: 2,
    };
    pub const QUARTER: NoteLength = NoteLength {
        numerator: 1,
        denominator: 4,
    };
    pub const EIGHTH: NoteLength = NoteLength {
        numerator: 1,
        denominator: 8,
    };
    pub const SIXTEENTH: NoteLength = NoteLength {
        numerator: 1,
        denominator: 16,
    };
    pub const THIRTY_SECOND: NoteLength = NoteLength {
        numerator: 1,
        denominator: 32,
    };

    /// Apply a dot: multiply length by 3/2
    pub const fn dotted(self) -> Self {
        NoteLength {
            numerator: self.numerator * 3,
            denominator: self.denominator * 2,
        }
    }

    /// Triplet: three notes in the time of two
    pub const fn triplet(self) -> Self {
        NoteLength {
            numerator: self.numerator * 2,
            denominator: self.denominator * 3,
        }
    }

    /// Reduce the fraction to lowest terms using GCD
    pub const fn reduce(self) -> Self {
        let gcd = const_gcd(self.numerator, self.denominator);
        NoteLength {
            numerator: self.numerator / gcd,
            denominator: self.denominator / gcd,
        }
    }

    /// Wall-clock length at a tempo in quarter notes per minute.
    ///
    /// A whole note is four beats: seconds = (n / d) * 4 * 60 / bpm
    pub fn to_seconds(&self, bpm: f64) -> f64 {
        let whole_notes = self.numerator as f64 / self.denominator as f64;
        whole_notes * 4.0 * 60.0 / bpm
    }
}

impl Default for NoteLength {
    fn default() -> Self {
        Self::SIXTEENTH
    }
}

/// Parses transport-style tokens: `"16n"`, dotted `"8n."`, triplet `"8t"`,
/// and `"1m"` for one 4/4 measure.
impl FromStr for NoteLength {
    type Err = SequencerError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || SequencerError::InvalidNoteLength(token.to_string());
        let trimmed = token.trim();

        let (body, dotted) = match trimmed.strip_suffix('.') {
            Some(body) => (body, true),
            None => (trimmed, false),
        };
        if body.len() < 2 {
            return Err(invalid());
        }
        let (digits, unit) = body.split_at(body.len() - 1);
        let value: u32 = digits.parse().map_err(|_| invalid())?;
        if value == 0 || value > MAX_TOKEN_VALUE || !value.is_power_of_two() {
            return Err(invalid());
        }

        let base = match unit {
            "n" => NoteLength {
                numerator: 1,
                denominator: value,
            },
            "t" => NoteLength {
                numerator: 1,
                denominator: value,
            }
            .triplet(),
            "m" if !dotted => NoteLength {
                numerator: value,
                denominator: 1,
            },
            _ => return Err(invalid()),
        };

        let length = if dotted { base.dotted() } else { base };
        Ok(length.reduce())
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let NoteLength {
            numerator,
            denominator,
        } = self.reduce();
        match numerator {
            1 => write!(f, "{}n", denominator),
            3 if denominator % 2 == 0 => write!(f, "{}n.", denominator / 2),
            _ => write!(f, "{}/{}", numerator, denominator),
        }
    }
}

/// Compute greatest common divisor (Euclidean algorithm)
/// Used to reduce fractions to lowest terms
const fn const_gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}
