//! Sample-level rendering for the audio backend.
//!
//! Nothing here knows about rows or patterns. The graph receives node
//! commands and renders the FM voices they describe.

/// Timed attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Node table and per-sample FM renderer.
pub mod graph;

pub use envelope::{Envelope, EnvelopeStage};
pub use graph::{ToneCommand, ToneGraph};
