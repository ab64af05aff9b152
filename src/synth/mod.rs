// Purpose: FM voices and the per-row banks that hold them
// A voice owns its tone engine nodes; a bank owns one voice per step.

pub mod bank;
pub mod voice;

pub use bank::VoiceBank;
pub use voice::{FmVoice, OscillatorState, VoiceNodes, VoiceParams};
