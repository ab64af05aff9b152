use std::rc::Rc;

use crate::{
    control::ParamKind,
    error::{SequencerError, ToneError},
    sequencing::NoteLength,
    synth::voice::{FmVoice, VoiceParams},
    tone::SharedTone,
};

/// Fixed-size bank of voices, one per step of a row.
///
/// Broadcasts walk the bank in index order and visit every voice even when
/// one of them fails. A voice that failed keeps its previous value.
pub struct VoiceBank {
    voices: Vec<FmVoice>,
}

impl VoiceBank {
    pub fn new(tone: &SharedTone, size: usize) -> Result<Self, SequencerError> {
        if size == 0 {
            return Err(SequencerError::ZeroSteps);
        }
        let voices = (0..size)
            .map(|_| FmVoice::new(Rc::clone(tone)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { voices })
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voice(&self, index: usize) -> Result<&FmVoice, SequencerError> {
        self.voices.get(index).ok_or(SequencerError::StepOutOfRange {
            step: index,
            steps: self.voices.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &FmVoice> {
        self.voices.iter()
    }

    /// Snapshot of every voice's parameters, in index order
    pub fn params(&self) -> Vec<VoiceParams> {
        self.voices.iter().map(FmVoice::params).collect()
    }

    pub fn trigger(&mut self, index: usize, length: NoteLength) -> Result<(), SequencerError> {
        let steps = self.voices.len();
        let voice = self
            .voices
            .get_mut(index)
            .ok_or(SequencerError::StepOutOfRange { step: index, steps })?;
        voice.trigger(length)?;
        Ok(())
    }

    pub fn broadcast_modulation(&mut self, depth: f32) -> Result<(), ToneError> {
        self.broadcast(ParamKind::ModulationDepth, depth)
    }

    pub fn broadcast_frequency(&mut self, hz: f32) -> Result<(), ToneError> {
        self.broadcast(ParamKind::CarrierFrequency, hz)
    }

    pub fn broadcast_modulator(&mut self, hz: f32) -> Result<(), ToneError> {
        self.broadcast(ParamKind::ModulatorFrequency, hz)
    }

    /// Set `kind` on every voice. Returns the first error, if any.
    pub fn broadcast(&mut self, kind: ParamKind, value: f32) -> Result<(), ToneError> {
        let mut first_error = None;
        for voice in &mut self.voices {
            if let Err(err) = voice.set(kind, value) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Whether every voice holds the same value for `kind`
    pub fn is_uniform(&self, kind: ParamKind) -> bool {
        let mut values = self.voices.iter().map(|voice| voice.params().get(kind));
        match values.next() {
            Some(first) => values.all(|value| value == first),
            None => true,
        }
    }

    /// Release every voice's nodes
    pub fn dispose(self) -> Result<(), ToneError> {
        self.voices.into_iter().try_for_each(FmVoice::dispose)
    }
}
