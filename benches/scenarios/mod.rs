//! Whole-toy scenarios: every startup voice sounding, and knob sweeps.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumtoy::{
    control::{drag_value, ParamRange, DEFAULT_SENSITIVITY},
    dsp::ToneGraph,
};

use crate::{dsp::voices, BLOCK_SIZES};

pub fn bench_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/rows");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        // Four startup rows of eight voices, all open
        let mut graph = ToneGraph::new(48_000.0);
        voices(&mut graph, 32);
        group.bench_with_input(BenchmarkId::new("startup_set", size), &size, |b, _| {
            b.iter(|| graph.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}

pub fn bench_drag(c: &mut Criterion) {
    let range = ParamRange::CARRIER_FREQUENCY;
    c.bench_function("scenarios/drag_sweep", |b| {
        b.iter(|| {
            let mut value = 1.0;
            for delta in -200..=200 {
                value = drag_value(black_box(value), delta as f32, range, DEFAULT_SENSITIVITY);
            }
            value
        })
    });
}
