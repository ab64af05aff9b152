use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{drag_value, ParamKind, ParamRange, ParamRanges, DEFAULT_SENSITIVITY};

/// Sweep of the knob indicator in degrees, centred on twelve o'clock
const ROTATION_SWEEP: f32 = 270.0;

/// Initial knob values for a new row
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSeeds {
    pub modulation_depth: f32,
    pub carrier_frequency: f32,
    pub modulator_frequency: f32,
}

impl RowSeeds {
    pub const fn new(modulation_depth: f32, carrier_frequency: f32, modulator_frequency: f32) -> Self {
        Self {
            modulation_depth,
            carrier_frequency,
            modulator_frequency,
        }
    }

    pub fn get(&self, kind: ParamKind) -> f32 {
        match kind {
            ParamKind::ModulationDepth => self.modulation_depth,
            ParamKind::CarrierFrequency => self.carrier_frequency,
            ParamKind::ModulatorFrequency => self.modulator_frequency,
        }
    }
}

/// A bounded continuous control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knob {
    kind: ParamKind,
    range: ParamRange,
    value: f32,
    sensitivity: f32,
    /// Value when the current drag began
    drag_origin: Option<f32>,
}

impl Knob {
    /// Create a knob. An initial value outside the range is kept as is (the
    /// indicator pins to the nearest end) and only clamped by the first move.
    pub fn new(kind: ParamKind, range: ParamRange, initial: f32) -> Self {
        if !range.contains(initial) {
            warn!(
                "{} seed {} is outside [{}, {}]; it will be clamped on the first move",
                kind, initial, range.min, range.max
            );
        }
        Self {
            kind,
            range,
            value: initial,
            sensitivity: DEFAULT_SENSITIVITY,
            drag_origin: None,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn range(&self) -> ParamRange {
        self.range
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// 0.0 at min, 1.0 at max
    pub fn normalized(&self) -> f32 {
        self.range.normalize(self.value)
    }

    /// Indicator angle: -135° at min through 0° to +135° at max
    pub fn rotation_degrees(&self) -> f32 {
        self.normalized() * ROTATION_SWEEP - ROTATION_SWEEP / 2.0
    }

    /// Remember the current value as the origin of a drag gesture
    pub fn begin_drag(&mut self) {
        self.drag_origin = Some(self.value);
    }

    /// Value a drag of `delta` would land on, where `delta` is the total
    /// travel since `begin_drag`. Without a drag in progress the current
    /// value is the origin.
    pub fn preview(&self, delta: f32) -> f32 {
        let origin = self.drag_origin.unwrap_or(self.value);
        drag_value(origin, delta, self.range, self.sensitivity)
    }

    /// Move to `preview(delta)`. Returns the new value.
    pub fn drag(&mut self, delta: f32) -> f32 {
        self.value = self.preview(delta);
        self.value
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    /// Jump straight to a value (clamped). Returns the stored value.
    pub fn set(&mut self, value: f32) -> f32 {
        self.value = self.range.clamp(value);
        self.value
    }
}

/// The three knobs attached to a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowControls {
    modulation: Knob,
    frequency: Knob,
    modulator: Knob,
}

impl RowControls {
    pub fn new(seeds: RowSeeds, ranges: &ParamRanges, sensitivity: f32) -> Self {
        let knob = |kind| Knob::new(kind, ranges.get(kind), seeds.get(kind)).with_sensitivity(sensitivity);
        Self {
            modulation: knob(ParamKind::ModulationDepth),
            frequency: knob(ParamKind::CarrierFrequency),
            modulator: knob(ParamKind::ModulatorFrequency),
        }
    }

    pub fn knob(&self, kind: ParamKind) -> &Knob {
        match kind {
            ParamKind::ModulationDepth => &self.modulation,
            ParamKind::CarrierFrequency => &self.frequency,
            ParamKind::ModulatorFrequency => &self.modulator,
        }
    }

    pub fn knob_mut(&mut self, kind: ParamKind) -> &mut Knob {
        match kind {
            ParamKind::ModulationDepth => &mut self.modulation,
            ParamKind::CarrierFrequency => &mut self.frequency,
            ParamKind::ModulatorFrequency => &mut self.modulator,
        }
    }

    /// Current values as seeds (e.g. to clone a row's sound)
    pub fn values(&self) -> RowSeeds {
        RowSeeds::new(
            self.modulation.value(),
            self.frequency.value(),
            self.modulator.value(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freq_knob(initial: f32) -> Knob {
        Knob::new(ParamKind::CarrierFrequency, ParamRange::CARRIER_FREQUENCY, initial)
    }

    #[test]
    fn drag_is_relative_to_the_gesture_origin() {
        let mut knob = Knob::new(
            ParamKind::ModulationDepth,
            ParamRange::MODULATION_DEPTH,
            1000.0,
        );
        knob.begin_drag();
        assert_eq!(knob.drag(10.0), 1100.0);
        assert_eq!(knob.drag(20.0), 1200.0);
        // Back to zero travel is back to the origin
        assert_eq!(knob.drag(0.0), 1000.0);
        knob.end_drag();

        // A lone drag starts from wherever the knob is
        assert_eq!(knob.drag(10.0), 1100.0);
        assert_eq!(knob.drag(10.0), 1200.0);
    }

    #[test]
    fn out_of_range_seed_is_kept_until_the_first_move() {
        let mut knob = freq_knob(2200.0);
        assert_eq!(knob.value(), 2200.0);
        assert_eq!(knob.rotation_degrees(), 135.0);

        // Any move starts from the raw seed and lands back inside the range
        assert_eq!(knob.drag(-1.0), 2000.0);
        assert_eq!(freq_knob(0.0).drag(0.0), 1.0);
    }

    #[test]
    fn preview_does_not_move_the_knob() {
        let mut knob = freq_knob(1000.0);
        knob.begin_drag();
        let target = knob.preview(10.0);
        assert_eq!(knob.value(), 1000.0);
        assert_eq!(knob.set(target), target);
        assert_eq!(knob.drag(10.0), target);
    }

    #[test]
    fn rotation_covers_a_270_degree_sweep() {
        assert_eq!(freq_knob(1.0).rotation_degrees(), -135.0);
        assert_eq!(freq_knob(2000.0).rotation_degrees(), 135.0);

        let centre = Knob::new(ParamKind::ModulationDepth, ParamRange::MODULATION_DEPTH, 1000.0);
        assert_eq!(centre.rotation_degrees(), 0.0);
    }

    #[test]
    fn row_controls_take_their_seeds() {
        let controls = RowControls::new(
            RowSeeds::new(500.0, 10.0, 100.0),
            &ParamRanges::default(),
            DEFAULT_SENSITIVITY,
        );
        assert_eq!(controls.values(), RowSeeds::new(500.0, 10.0, 100.0));
        assert_eq!(controls.knob(ParamKind::CarrierFrequency).value(), 10.0);
    }
}
