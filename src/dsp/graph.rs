/*
FM Tone Graph
=============

The audio-thread half of the cpal tone engine. The scheduler thread sends
`ToneCommand`s through a ring buffer; the graph applies them at the top of
each block and then renders sample by sample.

Nodes live in a slot table indexed by `NodeId`. Slots are allocated up front
and reused: `Create` fills a free slot, `Dispose` empties it again, and input
lists keep their capacity. The node table on the control side hands freed ids
out again, so the slot count tracks the peak number of live nodes.

Each sample is computed in three passes:

  1. Oscillators output sin(2π·phase) (0.0 until started).
  2. Gains and envelopes sum their inputs and scale them, in id order. A
     node reading a higher-id node sees that node's previous sample. Voices
     create their nodes upstream-first, so within a voice nothing lags.
  3. State advances: envelopes step, oscillator phases move by
     (base + Σ frequency inputs) / sample_rate.

Everything routed to the destination is summed and scaled by `OUTPUT_GAIN`.
*/

use crate::{
    dsp::envelope::Envelope,
    tone::{NodeId, NodeKind, Port},
};

/// Headroom for many voices summing into one output
pub const OUTPUT_GAIN: f32 = 0.2;

/// Slots allocated by `ToneGraph::new`
pub const DEFAULT_NODE_CAPACITY: usize = 1024;

/// Routes a slot can take before its input list has to grow
const INPUT_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneCommand {
    Create { id: NodeId, kind: NodeKind },
    Connect { source: NodeId, sink: Port },
    Start(NodeId),
    SetFrequency(NodeId, f32),
    SetGain(NodeId, f32),
    /// Open an envelope for `hold` seconds
    Trigger { envelope: NodeId, hold: f32 },
    Dispose(NodeId),
}

enum NodeState {
    Free,
    Oscillator {
        frequency: f32,
        phase: f32,
        running: bool,
    },
    Gain(f32),
    Envelope(Envelope),
}

struct GraphNode {
    state: NodeState,
    inputs: Vec<NodeId>,
    frequency_inputs: Vec<NodeId>,
    to_destination: bool,
    output: f32,
}

impl GraphNode {
    fn free() -> Self {
        Self {
            state: NodeState::Free,
            inputs: Vec::with_capacity(INPUT_CAPACITY),
            frequency_inputs: Vec::with_capacity(INPUT_CAPACITY),
            to_destination: false,
            output: 0.0,
        }
    }

    fn is_live(&self) -> bool {
        !matches!(self.state, NodeState::Free)
    }

    /// Empty the slot without giving up its allocations
    fn clear(&mut self) {
        self.state = NodeState::Free;
        self.inputs.clear();
        self.frequency_inputs.clear();
        self.to_destination = false;
        self.output = 0.0;
    }
}

pub struct ToneGraph {
    sample_rate: f32,
    nodes: Vec<GraphNode>,
}

impl ToneGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_capacity(sample_rate, DEFAULT_NODE_CAPACITY)
    }

    /// Pre-allocate `capacity` node slots. Ids past that still work but
    /// grow the table on the thread that applies the command.
    pub fn with_capacity(sample_rate: f32, capacity: usize) -> Self {
        Self {
            sample_rate,
            nodes: (0..capacity).map(|_| GraphNode::free()).collect(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_live()).count()
    }

    /// Number of slots, live or free
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Envelopes currently sounding
    pub fn active_envelopes(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(&node.state, NodeState::Envelope(env) if env.is_active()))
            .count()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id.0 as usize).filter(|node| node.is_live())
    }

    fn output_of(&self, id: NodeId) -> f32 {
        self.nodes.get(id.0 as usize).map_or(0.0, |node| node.output)
    }

    /// Apply one command. Commands naming unknown nodes are ignored; the
    /// sending side has already validated them.
    pub fn apply(&mut self, command: ToneCommand) {
        match command {
            ToneCommand::Create { id, kind } => {
                let state = match kind {
                    NodeKind::Oscillator { frequency } => NodeState::Oscillator {
                        frequency,
                        phase: 0.0,
                        running: false,
                    },
                    NodeKind::Gain { gain } => NodeState::Gain(gain),
                    NodeKind::Envelope(shape) => {
                        NodeState::Envelope(Envelope::new(shape, self.sample_rate))
                    }
                };
                let index = id.0 as usize;
                if self.nodes.len() <= index {
                    self.nodes.resize_with(index + 1, GraphNode::free);
                }
                let node = &mut self.nodes[index];
                node.clear();
                node.state = state;
            }
            ToneCommand::Connect { source, sink } => match sink {
                Port::Input(target) => {
                    if let Some(node) = self.node_mut(target) {
                        node.inputs.push(source);
                    }
                }
                Port::Frequency(target) => {
                    if let Some(node) = self.node_mut(target) {
                        node.frequency_inputs.push(source);
                    }
                }
                Port::Destination => {
                    if let Some(node) = self.node_mut(source) {
                        node.to_destination = true;
                    }
                }
            },
            ToneCommand::Start(id) => {
                if let Some(NodeState::Oscillator { running, .. }) =
                    self.node_mut(id).map(|node| &mut node.state)
                {
                    *running = true;
                }
            }
            ToneCommand::SetFrequency(id, hz) => {
                if let Some(NodeState::Oscillator { frequency, .. }) =
                    self.node_mut(id).map(|node| &mut node.state)
                {
                    *frequency = hz;
                }
            }
            ToneCommand::SetGain(id, value) => {
                if let Some(NodeState::Gain(gain)) = self.node_mut(id).map(|node| &mut node.state) {
                    *gain = value;
                }
            }
            ToneCommand::Trigger { envelope, hold } => {
                if let Some(NodeState::Envelope(env)) =
                    self.node_mut(envelope).map(|node| &mut node.state)
                {
                    env.trigger(hold);
                }
            }
            ToneCommand::Dispose(id) => {
                if let Some(node) = self.nodes.get_mut(id.0 as usize) {
                    node.clear();
                }
                for node in self.nodes.iter_mut().filter(|node| node.is_live()) {
                    node.inputs.retain(|&input| input != id);
                    node.frequency_inputs.retain(|&input| input != id);
                }
            }
        }
    }

    /// Render one mono sample
    pub fn next_sample(&mut self) -> f32 {
        // Pass 1
        for node in self.nodes.iter_mut() {
            if let NodeState::Oscillator { phase, running, .. } = node.state {
                node.output = if running {
                    (phase * std::f32::consts::TAU).sin()
                } else {
                    0.0
                };
            }
        }

        // Pass 2
        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            let scale = match &node.state {
                NodeState::Free | NodeState::Oscillator { .. } => continue,
                NodeState::Gain(gain) => *gain,
                NodeState::Envelope(env) => env.level(),
            };
            let input: f32 = node.inputs.iter().map(|&id| self.output_of(id)).sum();
            self.nodes[index].output = input * scale;
        }

        let mix: f32 = self
            .nodes
            .iter()
            .filter(|node| node.to_destination)
            .map(|node| node.output)
            .sum();

        // Pass 3
        let sample_rate = self.sample_rate;
        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            if !node.is_live() {
                continue;
            }
            let modulation: f32 = node
                .frequency_inputs
                .iter()
                .map(|&id| self.output_of(id))
                .sum();
            match &mut self.nodes[index].state {
                NodeState::Oscillator {
                    frequency,
                    phase,
                    running: true,
                } => {
                    *phase = (*phase + (*frequency + modulation) / sample_rate).rem_euclid(1.0);
                }
                NodeState::Envelope(env) => {
                    env.next_sample();
                }
                _ => {}
            }
        }

        (mix * OUTPUT_GAIN).clamp(-1.0, 1.0)
    }

    /// Render a block of mono samples
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
