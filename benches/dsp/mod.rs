//! Benchmarks for the envelope generator and the FM tone graph.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumtoy::{
    dsp::{Envelope, ToneCommand, ToneGraph},
    tone::{EnvelopeShape, NodeId, NodeKind, Port},
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut env = Envelope::new(EnvelopeShape::PLUCK, SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("pluck", size), &size, |b, &size| {
            b.iter(|| {
                env.trigger(0.125);
                for _ in 0..size {
                    black_box(env.next_sample());
                }
            })
        });
    }

    group.finish();
}

/// Queue the commands for `voices` FM voices, all started and triggered
pub fn voices(graph: &mut ToneGraph, voices: u32) {
    for v in 0..voices {
        let base = v * 4;
        let (modulator, gain, carrier, env) =
            (NodeId(base), NodeId(base + 1), NodeId(base + 2), NodeId(base + 3));
        let commands = [
            ToneCommand::Create {
                id: modulator,
                kind: NodeKind::Oscillator { frequency: 100.0 },
            },
            ToneCommand::Create {
                id: gain,
                kind: NodeKind::Gain { gain: 500.0 },
            },
            ToneCommand::Create {
                id: carrier,
                kind: NodeKind::Oscillator {
                    frequency: 110.0 * (v + 1) as f32,
                },
            },
            ToneCommand::Create {
                id: env,
                kind: NodeKind::Envelope(EnvelopeShape::PLUCK),
            },
            ToneCommand::Connect {
                source: modulator,
                sink: Port::Input(gain),
            },
            ToneCommand::Connect {
                source: gain,
                sink: Port::Frequency(carrier),
            },
            ToneCommand::Connect {
                source: carrier,
                sink: Port::Input(env),
            },
            ToneCommand::Connect {
                source: env,
                sink: Port::Destination,
            },
            ToneCommand::Start(modulator),
            ToneCommand::Start(carrier),
            ToneCommand::Trigger {
                envelope: env,
                hold: 10.0,
            },
        ];
        for command in commands {
            graph.apply(command);
        }
    }
}

pub fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/graph");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        let mut graph = ToneGraph::new(SAMPLE_RATE);
        voices(&mut graph, 1);
        group.bench_with_input(BenchmarkId::new("one_voice", size), &size, |b, _| {
            b.iter(|| graph.render(black_box(&mut buffer)))
        });

        let mut graph = ToneGraph::new(SAMPLE_RATE);
        voices(&mut graph, 8);
        group.bench_with_input(BenchmarkId::new("one_row", size), &size, |b, _| {
            b.iter(|| graph.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}
