//! In-memory tone engine.
//!
//! Keeps a log of every call it accepts. Used for headless runs when no audio
//! device is available, and by tests to observe exactly what voices asked for.

use std::collections::BTreeSet;

use log::debug;

use super::{NodeId, NodeKind, NodeTable, Port, ToneEngine};
use crate::{error::ToneError, sequencing::NoteLength};

/// One accepted call, in the order it was made
#[derive(Debug, Clone, PartialEq)]
pub enum ToneCall {
    Create(NodeId, NodeKind),
    Connect(NodeId, Port),
    Start(NodeId),
    SetFrequency(NodeId, f32),
    SetGain(NodeId, f32),
    Envelope(NodeId, NoteLength),
    Unlock,
    Dispose(NodeId),
}

#[derive(Debug)]
pub struct RecordingTone {
    table: NodeTable,
    calls: Vec<ToneCall>,
    keep_history: bool,
    fail_unlock: bool,
    failing_envelopes: BTreeSet<NodeId>,
    failing_oscillators: BTreeSet<NodeId>,
}

impl RecordingTone {
    pub fn new() -> Self {
        Self {
            table: NodeTable::new(),
            calls: Vec::new(),
            keep_history: true,
            fail_unlock: false,
            failing_envelopes: BTreeSet::new(),
            failing_oscillators: BTreeSet::new(),
        }
    }

    /// Validate calls but keep no history (for long-running silent sessions)
    pub fn untracked() -> Self {
        Self {
            keep_history: false,
            ..Self::new()
        }
    }

    /// Make `unlock` fail until switched back off
    pub fn fail_unlock(&mut self, fail: bool) {
        self.fail_unlock = fail;
    }

    /// Make every `schedule_envelope` on this node fail
    pub fn fail_envelope(&mut self, envelope: NodeId) {
        self.failing_envelopes.insert(envelope);
    }

    /// Make every `set_frequency` on this node fail
    pub fn fail_frequency(&mut self, oscillator: NodeId) {
        self.failing_oscillators.insert(oscillator);
    }

    /// Undo `fail_envelope` and `fail_frequency` for this node
    pub fn restore(&mut self, node: NodeId) {
        self.failing_envelopes.remove(&node);
        self.failing_oscillators.remove(&node);
    }

    pub fn calls(&self) -> &[ToneCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of live (created and not disposed) nodes
    pub fn live_nodes(&self) -> usize {
        self.table.len()
    }

    pub fn unlock_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ToneCall::Unlock))
            .count()
    }

    /// How many times `start_oscillator` was accepted for this node
    pub fn start_count(&self, oscillator: NodeId) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ToneCall::Start(id) if *id == oscillator))
            .count()
    }

    /// Envelopes that were triggered, in order
    pub fn envelope_triggers(&self) -> Vec<NodeId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ToneCall::Envelope(id, _) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: ToneCall) {
        debug!("tone: {:?}", call);
        if self.keep_history {
            self.calls.push(call);
        }
    }
}

impl Default for RecordingTone {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneEngine for RecordingTone {
    fn create(&mut self, kind: NodeKind) -> Result<NodeId, ToneError> {
        let id = self.table.allocate(kind);
        self.record(ToneCall::Create(id, kind));
        Ok(id)
    }

    fn connect(&mut self, source: NodeId, sink: Port) -> Result<(), ToneError> {
        self.table.check_route(source, sink)?;
        self.record(ToneCall::Connect(source, sink));
        Ok(())
    }

    fn start_oscillator(&mut self, oscillator: NodeId) -> Result<(), ToneError> {
        self.table.expect_oscillator(oscillator)?;
        self.record(ToneCall::Start(oscillator));
        Ok(())
    }

    fn set_frequency(&mut self, oscillator: NodeId, hz: f32) -> Result<(), ToneError> {
        self.table.expect_oscillator(oscillator)?;
        if self.failing_oscillators.contains(&oscillator) {
            return Err(ToneError::Device(format!(
                "oscillator {} refused a new frequency",
                oscillator
            )));
        }
        self.record(ToneCall::SetFrequency(oscillator, hz));
        Ok(())
    }

    fn set_gain(&mut self, gain: NodeId, value: f32) -> Result<(), ToneError> {
        self.table.expect_gain(gain)?;
        self.record(ToneCall::SetGain(gain, value));
        Ok(())
    }

    fn schedule_envelope(
        &mut self,
        envelope: NodeId,
        length: NoteLength,
    ) -> Result<(), ToneError> {
        self.table.expect_envelope(envelope)?;
        if self.failing_envelopes.contains(&envelope) {
            return Err(ToneError::Device(format!(
                "envelope {} refused to trigger",
                envelope
            )));
        }
        self.record(ToneCall::Envelope(envelope, length));
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), ToneError> {
        if self.fail_unlock {
            return Err(ToneError::Device("audio context is suspended".into()));
        }
        self.record(ToneCall::Unlock);
        Ok(())
    }

    fn dispose(&mut self, node: NodeId) -> Result<(), ToneError> {
        self.table.remove(node)?;
        self.record(ToneCall::Dispose(node));
        Ok(())
    }
}
