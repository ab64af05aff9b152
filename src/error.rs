//! Error types shared across the crate.

use std::fmt;

use crate::{engine::RowId, tone::NodeId};

/// Errors reported by a tone engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ToneError {
    /// The node was never created, or has been disposed
    UnknownNode(NodeId),
    /// The node exists but is the wrong kind for this call
    WrongNodeKind { node: NodeId, expected: &'static str },
    /// The audio thread is not draining its command queue
    QueueFull,
    /// The audio device refused an operation
    Device(String),
}

impl fmt::Display for ToneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToneError::UnknownNode(node) => write!(f, "unknown tone node {}", node),
            ToneError::WrongNodeKind { node, expected } => {
                write!(f, "tone node {} is not {}", node, expected)
            }
            ToneError::QueueFull => write!(f, "tone command queue is full"),
            ToneError::Device(msg) => write!(f, "audio device error: {}", msg),
        }
    }
}

impl std::error::Error for ToneError {}

/// Errors from building or driving rows.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerError {
    /// A row or pattern was configured with no steps
    ZeroSteps,
    /// A row was configured with a zero tick rate
    ZeroRate,
    /// A parameter range with `min >= max` or non-finite bounds
    InvalidRange { min: f32, max: f32 },
    /// A knob sensitivity that is zero, negative, or not finite
    InvalidSensitivity(f32),
    /// A note length token that could not be parsed
    InvalidNoteLength(String),
    /// A pattern string containing something other than step marks
    InvalidPattern(String),
    /// A step index outside `[0, steps)`
    StepOutOfRange { step: usize, steps: usize },
    /// No row with this id exists in the engine
    UnknownRow(RowId),
    /// The row's loop is already running
    RowAlreadyRunning(RowId),
    /// The tone engine rejected a call
    Tone(ToneError),
}

impl fmt::Display for SequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerError::ZeroSteps => write!(f, "a row needs at least one step"),
            SequencerError::ZeroRate => write!(f, "tick rate must be greater than zero"),
            SequencerError::InvalidRange { min, max } => {
                write!(f, "invalid parameter range [{}, {}]", min, max)
            }
            SequencerError::InvalidSensitivity(value) => {
                write!(f, "knob sensitivity must be positive, got {}", value)
            }
            SequencerError::InvalidNoteLength(token) => {
                write!(f, "unrecognised note length {:?} (expected e.g. \"16n\", \"8n.\", \"8t\")", token)
            }
            SequencerError::InvalidPattern(pattern) => {
                write!(f, "invalid step pattern {:?} (use 'x' for on, '.' for off)", pattern)
            }
            SequencerError::StepOutOfRange { step, steps } => {
                write!(f, "step {} is out of range for a row of {} steps", step, steps)
            }
            SequencerError::UnknownRow(id) => write!(f, "no such row: {}", id),
            SequencerError::RowAlreadyRunning(id) => write!(f, "{} is already running", id),
            SequencerError::Tone(err) => write!(f, "tone engine: {}", err),
        }
    }
}

impl std::error::Error for SequencerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SequencerError::Tone(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ToneError> for SequencerError {
    fn from(err: ToneError) -> Self {
        SequencerError::Tone(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_errors_convert_and_keep_their_source() {
        let err: SequencerError = ToneError::QueueFull.into();
        assert_eq!(err, SequencerError::Tone(ToneError::QueueFull));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn messages_name_the_offending_values() {
        let err = SequencerError::StepOutOfRange { step: 9, steps: 8 };
        assert_eq!(err.to_string(), "step 9 is out of range for a row of 8 steps");

        let err = ToneError::WrongNodeKind {
            node: NodeId(3),
            expected: "an oscillator",
        };
        assert_eq!(err.to_string(), "tone node node#3 is not an oscillator");
    }
}
