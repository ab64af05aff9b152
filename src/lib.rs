#[cfg(feature = "rtrb")]
pub mod audio; // cpal-backed tone engine
pub mod control; // Knobs and drag-to-value mapping
pub mod dsp;
pub mod engine; // Row registry and per-row clock loops
pub mod error;
pub mod sequencing; // Step patterns, clocks, note lengths
pub mod synth; // FM voices and voice banks
pub mod tone; // Tone engine seam

pub use error::{SequencerError, ToneError};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
