pub mod clock;
pub mod note_length;
pub mod pattern;

pub use clock::StepClock;
pub use note_length::NoteLength;
pub use pattern::StepPattern;
