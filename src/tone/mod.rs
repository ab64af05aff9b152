// Purpose: The boundary between the sequencer and whatever makes sound.
// Voices talk to a `ToneEngine` in terms of nodes and ports; the engine
// decides how (or whether) those become audio.

pub mod gate;
pub mod recording;
pub mod table;

use std::{cell::RefCell, fmt, rc::Rc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::ToneError, sequencing::NoteLength};

pub use gate::AudioGate;
pub use recording::{RecordingTone, ToneCall};
pub use table::NodeTable;

/// Handle to a node created by a tone engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Attack/decay/sustain/release shape of an amplitude envelope.
///
/// Times are in seconds, sustain is a level in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeShape {
    /// Short percussive shape every voice uses
    pub const PLUCK: EnvelopeShape = EnvelopeShape {
        attack: 0.01,
        decay: 0.2,
        sustain: 0.3,
        release: 0.1,
    };
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self::PLUCK
    }
}

/// What a node is when it is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Sine oscillator at a base frequency (Hz)
    Oscillator { frequency: f32 },
    /// Scales its summed inputs
    Gain { gain: f32 },
    /// Amplitude envelope over its summed inputs
    Envelope(EnvelopeShape),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Oscillator { .. } => "an oscillator",
            NodeKind::Gain { .. } => "a gain",
            NodeKind::Envelope(_) => "an envelope",
        }
    }
}

/// Where a node's output can be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    /// The audio input of a gain or envelope
    Input(NodeId),
    /// The frequency parameter of an oscillator (FM routing)
    Frequency(NodeId),
    /// The final output
    Destination,
}

/// Capability set the sequencer needs from an audio backend.
///
/// Every call is synchronous and fire-and-forget from the caller's point of
/// view; errors mean the backend could not accept the call at all.
pub trait ToneEngine {
    fn create(&mut self, kind: NodeKind) -> Result<NodeId, ToneError>;

    fn connect(&mut self, source: NodeId, sink: Port) -> Result<(), ToneError>;

    /// Start an oscillator running. Oscillators run until disposed.
    fn start_oscillator(&mut self, oscillator: NodeId) -> Result<(), ToneError>;

    fn set_frequency(&mut self, oscillator: NodeId, hz: f32) -> Result<(), ToneError>;

    fn set_gain(&mut self, gain: NodeId, value: f32) -> Result<(), ToneError>;

    /// Open the envelope and schedule its release after `length`
    fn schedule_envelope(&mut self, envelope: NodeId, length: NoteLength)
        -> Result<(), ToneError>;

    /// Allow audio to be heard. Called once per process by [`AudioGate`].
    fn unlock(&mut self) -> Result<(), ToneError>;

    /// Release a node. Routes into and out of it are dropped with it.
    fn dispose(&mut self, node: NodeId) -> Result<(), ToneError>;
}

/// Tone engine shared by every voice on the scheduler thread
pub type SharedTone = Rc<RefCell<dyn ToneEngine>>;
