//! Control-side bookkeeping of live nodes.
//!
//! Both engines validate calls against a `NodeTable` before acting on them, so
//! a bad handle is reported to the caller instead of being silently dropped on
//! the audio thread.
//!
//! Freed ids are handed out again, lowest first, so the audio side's slot
//! table stays as small as the peak number of live nodes.

use std::collections::{BTreeMap, BTreeSet};

use super::{NodeId, NodeKind, Port};
use crate::error::ToneError;

#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: BTreeMap<NodeId, NodeKind>,
    free: BTreeSet<NodeId>,
    next_id: u32,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under the lowest free id
    pub fn allocate(&mut self, kind: NodeKind) -> NodeId {
        let id = self.free.pop_first().unwrap_or_else(|| {
            let id = NodeId(self.next_id);
            self.next_id += 1;
            id
        });
        self.nodes.insert(id, kind);
        id
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, ToneError> {
        self.nodes.get(&id).copied().ok_or(ToneError::UnknownNode(id))
    }

    pub fn expect_oscillator(&self, id: NodeId) -> Result<(), ToneError> {
        match self.kind(id)? {
            NodeKind::Oscillator { .. } => Ok(()),
            _ => Err(ToneError::WrongNodeKind {
                node: id,
                expected: "an oscillator",
            }),
        }
    }

    pub fn expect_gain(&self, id: NodeId) -> Result<(), ToneError> {
        match self.kind(id)? {
            NodeKind::Gain { .. } => Ok(()),
            _ => Err(ToneError::WrongNodeKind {
                node: id,
                expected: "a gain",
            }),
        }
    }

    pub fn expect_envelope(&self, id: NodeId) -> Result<(), ToneError> {
        match self.kind(id)? {
            NodeKind::Envelope(_) => Ok(()),
            _ => Err(ToneError::WrongNodeKind {
                node: id,
                expected: "an envelope",
            }),
        }
    }

    /// Check that `source` exists and `sink` can accept it
    pub fn check_route(&self, source: NodeId, sink: Port) -> Result<(), ToneError> {
        self.kind(source)?;
        match sink {
            Port::Destination => Ok(()),
            Port::Frequency(target) => self.expect_oscillator(target),
            Port::Input(target) => match self.kind(target)? {
                NodeKind::Oscillator { .. } => Err(ToneError::WrongNodeKind {
                    node: target,
                    expected: "a gain or envelope",
                }),
                _ => Ok(()),
            },
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Result<NodeKind, ToneError> {
        let kind = self.nodes.remove(&id).ok_or(ToneError::UnknownNode(id))?;
        self.free.insert(id);
        Ok(kind)
    }

    /// Ids handed out so far, live or free
    pub fn high_water(&self) -> u32 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::EnvelopeShape;

    #[test]
    fn freed_ids_are_reused_lowest_first() {
        let mut table = NodeTable::new();
        let ids: Vec<_> = (0..4)
            .map(|_| table.allocate(NodeKind::Gain { gain: 1.0 }))
            .collect();
        table.remove(ids[2]).unwrap();
        table.remove(ids[1]).unwrap();
        assert_eq!(table.kind(ids[1]), Err(ToneError::UnknownNode(ids[1])));
        assert_eq!(table.remove(ids[1]), Err(ToneError::UnknownNode(ids[1])));

        assert_eq!(table.allocate(NodeKind::Gain { gain: 1.0 }), ids[1]);
        assert_eq!(table.allocate(NodeKind::Gain { gain: 1.0 }), ids[2]);
        assert_eq!(table.allocate(NodeKind::Gain { gain: 1.0 }), NodeId(4));
        assert_eq!(table.high_water(), 5);
    }

    #[test]
    fn routes_are_checked_by_sink_kind() {
        let mut table = NodeTable::new();
        let osc = table.allocate(NodeKind::Oscillator { frequency: 440.0 });
        let gain = table.allocate(NodeKind::Gain { gain: 100.0 });
        let env = table.allocate(NodeKind::Envelope(EnvelopeShape::PLUCK));

        assert!(table.check_route(osc, Port::Input(gain)).is_ok());
        assert!(table.check_route(gain, Port::Frequency(osc)).is_ok());
        assert!(table.check_route(env, Port::Destination).is_ok());

        assert!(table.check_route(gain, Port::Input(osc)).is_err());
        assert!(table.check_route(osc, Port::Frequency(env)).is_err());
    }
}
