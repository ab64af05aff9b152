// Purpose: Continuous controls for a row's voices.
// A knob turns a drag delta into a bounded value; the row then broadcasts
// that value to every voice in its bank.

pub mod knob;
pub mod range;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use knob::{Knob, RowControls, RowSeeds};
pub use range::{drag_value, ParamRange, ParamRanges, DEFAULT_SENSITIVITY};

/// The three broadcast parameters of a row
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKind {
    /// Gain between modulator and carrier frequency
    ModulationDepth,
    /// Carrier frequency (Hz)
    CarrierFrequency,
    /// Modulator frequency (Hz)
    ModulatorFrequency,
}

impl ParamKind {
    pub const ALL: [ParamKind; 3] = [
        ParamKind::ModulationDepth,
        ParamKind::CarrierFrequency,
        ParamKind::ModulatorFrequency,
    ];

    /// Short label shown under the knob
    pub fn label(self) -> &'static str {
        match self {
            ParamKind::ModulationDepth => "Mod",
            ParamKind::CarrierFrequency => "Freq",
            ParamKind::ModulatorFrequency => "Modulator",
        }
    }

    /// Next knob in display order, wrapping
    pub fn next(self) -> Self {
        match self {
            ParamKind::ModulationDepth => ParamKind::CarrierFrequency,
            ParamKind::CarrierFrequency => ParamKind::ModulatorFrequency,
            ParamKind::ModulatorFrequency => ParamKind::ModulationDepth,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
