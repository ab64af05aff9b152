use crate::{
    control::ParamKind,
    error::ToneError,
    sequencing::NoteLength,
    tone::{EnvelopeShape, NodeId, NodeKind, Port, SharedTone},
};

pub const DEFAULT_CARRIER_HZ: f32 = 440.0;
pub const DEFAULT_MODULATOR_HZ: f32 = 100.0;
pub const DEFAULT_MODULATION_DEPTH: f32 = 100.0;

/// Whether a voice's oscillators have been started.
///
/// Oscillators are started lazily on the first trigger and then run for the
/// life of the voice; only the envelope gates what is heard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorState {
    Uninitialized, // Nothing has been started yet
    Started,       // Both oscillators running, never restarted
}

/// Current parameter values of a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub carrier_frequency: f32,
    pub modulator_frequency: f32,
    pub modulation_depth: f32,
}

impl VoiceParams {
    pub fn get(&self, kind: ParamKind) -> f32 {
        match kind {
            ParamKind::ModulationDepth => self.modulation_depth,
            ParamKind::CarrierFrequency => self.carrier_frequency,
            ParamKind::ModulatorFrequency => self.modulator_frequency,
        }
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            carrier_frequency: DEFAULT_CARRIER_HZ,
            modulator_frequency: DEFAULT_MODULATOR_HZ,
            modulation_depth: DEFAULT_MODULATION_DEPTH,
        }
    }
}

/// Tone engine nodes owned by one voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceNodes {
    pub modulator: NodeId,
    pub modulation: NodeId,
    pub carrier: NodeId,
    pub envelope: NodeId,
}

/// One FM voice: modulator -> depth gain -> carrier frequency,
/// carrier -> envelope -> destination.
pub struct FmVoice {
    tone: SharedTone,
    nodes: VoiceNodes,
    params: VoiceParams,
    state: OscillatorState,
}

impl FmVoice {
    pub fn new(tone: SharedTone) -> Result<Self, ToneError> {
        let params = VoiceParams::default();
        let nodes = {
            let mut engine = tone.borrow_mut();
            let modulator = engine.create(NodeKind::Oscillator {
                frequency: params.modulator_frequency,
            })?;
            let modulation = engine.create(NodeKind::Gain {
                gain: params.modulation_depth,
            })?;
            let carrier = engine.create(NodeKind::Oscillator {
                frequency: params.carrier_frequency,
            })?;
            let envelope = engine.create(NodeKind::Envelope(EnvelopeShape::PLUCK))?;

            engine.connect(modulator, Port::Input(modulation))?;
            engine.connect(modulation, Port::Frequency(carrier))?;
            engine.connect(carrier, Port::Input(envelope))?;
            engine.connect(envelope, Port::Destination)?;

            VoiceNodes {
                modulator,
                modulation,
                carrier,
                envelope,
            }
        };

        Ok(Self {
            tone,
            nodes,
            params,
            state: OscillatorState::Uninitialized,
        })
    }

    pub fn set_modulator_frequency(&mut self, hz: f32) -> Result<(), ToneError> {
        self.tone.borrow_mut().set_frequency(self.nodes.modulator, hz)?;
        self.params.modulator_frequency = hz;
        Ok(())
    }

    pub fn set_modulation_depth(&mut self, gain: f32) -> Result<(), ToneError> {
        self.tone.borrow_mut().set_gain(self.nodes.modulation, gain)?;
        self.params.modulation_depth = gain;
        Ok(())
    }

    pub fn set_carrier_frequency(&mut self, hz: f32) -> Result<(), ToneError> {
        self.tone.borrow_mut().set_frequency(self.nodes.carrier, hz)?;
        self.params.carrier_frequency = hz;
        Ok(())
    }

    pub fn set(&mut self, kind: ParamKind, value: f32) -> Result<(), ToneError> {
        match kind {
            ParamKind::ModulationDepth => self.set_modulation_depth(value),
            ParamKind::CarrierFrequency => self.set_carrier_frequency(value),
            ParamKind::ModulatorFrequency => self.set_modulator_frequency(value),
        }
    }

    /// Sound the voice for `length`, starting the oscillators on first use
    pub fn trigger(&mut self, length: NoteLength) -> Result<(), ToneError> {
        let mut engine = self.tone.borrow_mut();

        if self.state == OscillatorState::Uninitialized {
            engine.start_oscillator(self.nodes.modulator)?;
            engine.start_oscillator(self.nodes.carrier)?;
            self.state = OscillatorState::Started;
        }

        engine.schedule_envelope(self.nodes.envelope, length)
    }

    /// Release every node this voice created
    pub fn dispose(self) -> Result<(), ToneError> {
        let mut engine = self.tone.borrow_mut();
        // Downstream first so nothing is left routed into a dead node
        engine.dispose(self.nodes.envelope)?;
        engine.dispose(self.nodes.carrier)?;
        engine.dispose(self.nodes.modulation)?;
        engine.dispose(self.nodes.modulator)
    }

    pub fn params(&self) -> VoiceParams {
        self.params
    }

    pub fn carrier_frequency(&self) -> f32 {
        self.params.carrier_frequency
    }

    pub fn modulator_frequency(&self) -> f32 {
        self.params.modulator_frequency
    }

    pub fn modulation_depth(&self) -> f32 {
        self.params.modulation_depth
    }

    pub fn nodes(&self) -> VoiceNodes {
        self.nodes
    }

    pub fn state(&self) -> OscillatorState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::tone::{RecordingTone, ToneCall};

    fn voice() -> (Rc<RefCell<RecordingTone>>, FmVoice) {
        let tone = Rc::new(RefCell::new(RecordingTone::new()));
        let voice = FmVoice::new(tone.clone()).unwrap();
        (tone, voice)
    }

    #[test]
    fn routes_modulator_into_carrier_frequency() {
        let (tone, voice) = voice();
        let nodes = voice.nodes();
        let calls = tone.borrow().calls().to_vec();

        assert!(calls.contains(&ToneCall::Connect(nodes.modulator, Port::Input(nodes.modulation))));
        assert!(calls.contains(&ToneCall::Connect(nodes.modulation, Port::Frequency(nodes.carrier))));
        assert!(calls.contains(&ToneCall::Connect(nodes.carrier, Port::Input(nodes.envelope))));
        assert!(calls.contains(&ToneCall::Connect(nodes.envelope, Port::Destination)));

        // Nothing is started at construction
        assert_eq!(tone.borrow().start_count(nodes.carrier), 0);
        assert_eq!(voice.state(), OscillatorState::Uninitialized);
    }

    #[test]
    fn oscillators_start_on_first_trigger_only() {
        let (tone, mut voice) = voice();
        let nodes = voice.nodes();

        for k in 1..=10 {
            voice.trigger(NoteLength::SIXTEENTH).unwrap();
            let tone = tone.borrow();
            assert_eq!(tone.start_count(nodes.modulator), 1, "after trigger {}", k);
            assert_eq!(tone.start_count(nodes.carrier), 1, "after trigger {}", k);
            assert_eq!(tone.envelope_triggers().len(), k);
        }
        assert_eq!(voice.state(), OscillatorState::Started);
    }

    #[test]
    fn setters_reach_the_right_nodes() {
        let (tone, mut voice) = voice();
        let nodes = voice.nodes();

        voice.set_carrier_frequency(220.0).unwrap();
        voice.set_modulator_frequency(55.0).unwrap();
        voice.set_modulation_depth(800.0).unwrap();

        assert_eq!(
            voice.params(),
            VoiceParams {
                carrier_frequency: 220.0,
                modulator_frequency: 55.0,
                modulation_depth: 800.0,
            }
        );
        let calls = tone.borrow().calls().to_vec();
        assert!(calls.contains(&ToneCall::SetFrequency(nodes.carrier, 220.0)));
        assert!(calls.contains(&ToneCall::SetFrequency(nodes.modulator, 55.0)));
        assert!(calls.contains(&ToneCall::SetGain(nodes.modulation, 800.0)));
    }

    #[test]
    fn failed_trigger_keeps_the_voice_usable() {
        let (tone, mut voice) = voice();
        tone.borrow_mut().fail_envelope(voice.nodes().envelope);

        assert!(voice.trigger(NoteLength::SIXTEENTH).is_err());
        // Oscillators were started before the envelope refused
        assert_eq!(voice.state(), OscillatorState::Started);
        assert!(voice.set_carrier_frequency(300.0).is_ok());
    }

    #[test]
    fn dispose_releases_all_nodes() {
        let (tone, voice) = voice();
        assert_eq!(tone.borrow().live_nodes(), 4);
        voice.dispose().unwrap();
        assert_eq!(tone.borrow().live_nodes(), 0);
    }
}
