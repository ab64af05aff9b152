// Purpose: A `ToneEngine` that actually makes sound.
// Calls are validated against a `NodeTable` on the scheduler thread, then
// pushed as `ToneCommand`s through an rtrb queue to a `ToneGraph` rendered
// inside the cpal output callback. The stream plays from the moment it is
// opened so the queue always drains; until `unlock` the callback applies
// commands but writes silence.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Stream,
};
use log::{error, info};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::{
    dsp::{ToneCommand, ToneGraph},
    error::ToneError,
    sequencing::NoteLength,
    tone::{NodeId, NodeKind, NodeTable, Port, ToneEngine},
    MAX_BLOCK_SIZE,
};

pub const DEFAULT_BPM: f64 = 120.0;

/// Commands the scheduler may queue between two audio callbacks
pub const COMMAND_CAPACITY: usize = 4096;
/// Capacity of the sample tap the UI reads from
pub const SCOPE_CAPACITY: usize = 16 * 1024;

/// Open a command queue between a control-side engine and an audio-side
/// renderer running at `sample_rate`.
pub fn tone_queue(sample_rate: f32) -> (QueuedTone, ToneRenderer) {
    let (commands, command_rx) = RingBuffer::<ToneCommand>::new(COMMAND_CAPACITY);
    let unlocked = Arc::new(AtomicBool::new(false));
    (
        QueuedTone {
            table: NodeTable::new(),
            commands,
            unlocked: Arc::clone(&unlocked),
            bpm: DEFAULT_BPM,
        },
        ToneRenderer {
            commands: command_rx,
            graph: ToneGraph::new(sample_rate),
            unlocked,
            scope: None,
            render_buf: vec![0.0; MAX_BLOCK_SIZE],
        },
    )
}

/// Control half: validates calls and queues them for the renderer
pub struct QueuedTone {
    table: NodeTable,
    commands: Producer<ToneCommand>,
    unlocked: Arc<AtomicBool>,
    bpm: f64,
}

impl QueuedTone {
    /// Tempo used to turn note lengths into seconds
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::Acquire)
    }

    /// Commands queued and not yet picked up by the renderer
    pub fn pending(&self) -> usize {
        COMMAND_CAPACITY - self.commands.slots()
    }

    fn send(&mut self, command: ToneCommand) -> Result<(), ToneError> {
        self.commands
            .push(command)
            .map_err(|_| ToneError::QueueFull)
    }
}

impl ToneEngine for QueuedTone {
    fn create(&mut self, kind: NodeKind) -> Result<NodeId, ToneError> {
        if self.commands.is_full() {
            return Err(ToneError::QueueFull);
        }
        let id = self.table.allocate(kind);
        self.send(ToneCommand::Create { id, kind })?;
        Ok(id)
    }

    fn connect(&mut self, source: NodeId, sink: Port) -> Result<(), ToneError> {
        self.table.check_route(source, sink)?;
        self.send(ToneCommand::Connect { source, sink })
    }

    fn start_oscillator(&mut self, oscillator: NodeId) -> Result<(), ToneError> {
        self.table.expect_oscillator(oscillator)?;
        self.send(ToneCommand::Start(oscillator))
    }

    fn set_frequency(&mut self, oscillator: NodeId, hz: f32) -> Result<(), ToneError> {
        self.table.expect_oscillator(oscillator)?;
        self.send(ToneCommand::SetFrequency(oscillator, hz))
    }

    fn set_gain(&mut self, gain: NodeId, value: f32) -> Result<(), ToneError> {
        self.table.expect_gain(gain)?;
        self.send(ToneCommand::SetGain(gain, value))
    }

    fn schedule_envelope(
        &mut self,
        envelope: NodeId,
        length: NoteLength,
    ) -> Result<(), ToneError> {
        self.table.expect_envelope(envelope)?;
        let hold = length.to_seconds(self.bpm) as f32;
        self.send(ToneCommand::Trigger { envelope, hold })
    }

    fn unlock(&mut self) -> Result<(), ToneError> {
        self.unlocked.store(true, Ordering::Release);
        Ok(())
    }

    fn dispose(&mut self, node: NodeId) -> Result<(), ToneError> {
        // Freed ids are reused, so the table is only updated once the
        // command is known to be queued
        if self.commands.is_full() {
            return Err(ToneError::QueueFull);
        }
        self.table.remove(node)?;
        self.send(ToneCommand::Dispose(node))
    }
}

/// Audio half: drains the queue and renders the graph
pub struct ToneRenderer {
    commands: Consumer<ToneCommand>,
    graph: ToneGraph,
    unlocked: Arc<AtomicBool>,
    scope: Option<Producer<f32>>,
    render_buf: Vec<f32>,
}

impl ToneRenderer {
    /// Copy every rendered mono sample into `scope`
    pub fn with_scope(mut self, scope: Producer<f32>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn graph(&self) -> &ToneGraph {
        &self.graph
    }

    /// Fill an interleaved buffer of `channels` channels. Queued commands
    /// are applied first, locked or not.
    pub fn process(&mut self, data: &mut [f32], channels: usize) {
        while let Ok(command) = self.commands.pop() {
            self.graph.apply(command);
        }

        if !self.unlocked.load(Ordering::Acquire) {
            data.fill(0.0);
            return;
        }

        let channels = channels.max(1);
        let total_frames = data.len() / channels;
        let mut frames_written = 0;
        while frames_written < total_frames {
            let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
            let block = &mut self.render_buf[..frames];
            self.graph.render(block);

            let out_off = frames_written * channels;
            for (i, &s) in block.iter().enumerate() {
                for ch in 0..channels {
                    data[out_off + i * channels + ch] = s;
                }
            }

            // Drop the rest of the block if the UI is behind
            if let Some(scope) = &mut self.scope {
                for &s in block.iter() {
                    if let Err(PushError::Full(_)) = scope.push(s) {
                        break;
                    }
                }
            }

            frames_written += frames;
        }
    }
}

pub struct CpalTone {
    queue: QueuedTone,
    sample_rate: f32,
    stream: Stream,
}

impl CpalTone {
    /// Open the default output device and start its stream.
    ///
    /// Returns the engine and the consumer end of a mono sample tap.
    pub fn open() -> Result<(Self, Consumer<f32>), ToneError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ToneError::Device("no default output device available".into()))?;
        let config = device
            .default_output_config()
            .map_err(|err| ToneError::Device(format!("failed to fetch output config: {}", err)))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(
            "audio device {:?}: {} Hz, {} channels",
            device.name().unwrap_or_default(),
            sample_rate,
            channels
        );

        let (queue, renderer) = tone_queue(sample_rate);
        let (scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);
        let mut renderer = renderer.with_scope(scope_tx);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| renderer.process(data, channels),
                |err| error!("audio stream error: {}", err),
                None,
            )
            .map_err(|err| ToneError::Device(format!("failed to build output stream: {}", err)))?;

        stream
            .play()
            .map_err(|err| ToneError::Device(format!("failed to start output stream: {}", err)))?;

        Ok((
            Self {
                queue,
                sample_rate,
                stream,
            },
            scope_rx,
        ))
    }

    /// Tempo used to turn note lengths into seconds
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.queue = self.queue.with_bpm(bpm);
        self
    }

    pub fn bpm(&self) -> f64 {
        self.queue.bpm()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl ToneEngine for CpalTone {
    fn create(&mut self, kind: NodeKind) -> Result<NodeId, ToneError> {
        self.queue.create(kind)
    }

    fn connect(&mut self, source: NodeId, sink: Port) -> Result<(), ToneError> {
        self.queue.connect(source, sink)
    }

    fn start_oscillator(&mut self, oscillator: NodeId) -> Result<(), ToneError> {
        self.queue.start_oscillator(oscillator)
    }

    fn set_frequency(&mut self, oscillator: NodeId, hz: f32) -> Result<(), ToneError> {
        self.queue.set_frequency(oscillator, hz)
    }

    fn set_gain(&mut self, gain: NodeId, value: f32) -> Result<(), ToneError> {
        self.queue.set_gain(gain, value)
    }

    fn schedule_envelope(
        &mut self,
        envelope: NodeId,
        length: NoteLength,
    ) -> Result<(), ToneError> {
        self.queue.schedule_envelope(envelope, length)
    }

    fn unlock(&mut self) -> Result<(), ToneError> {
        // Hosts that suspended the stream get it back here
        self.stream
            .play()
            .map_err(|err| ToneError::Device(format!("failed to resume output stream: {}", err)))?;
        self.queue.unlock()
    }

    fn dispose(&mut self, node: NodeId) -> Result<(), ToneError> {
        self.queue.dispose(node)
    }
}
