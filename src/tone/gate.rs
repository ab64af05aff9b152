//! Process-wide "audio unlocked" flag.
//!
//! Any number of rows may ask for the unlock, in any order; the engine's
//! `unlock` runs once. A failed unlock leaves the gate closed so the next
//! caller tries again.

use std::rc::Rc;

use log::info;
use tokio::sync::OnceCell;

use super::SharedTone;
use crate::error::ToneError;

pub struct AudioGate {
    tone: SharedTone,
    unlocked: OnceCell<()>,
}

impl AudioGate {
    pub fn new(tone: SharedTone) -> Self {
        Self {
            tone,
            unlocked: OnceCell::new(),
        }
    }

    /// Unlock the tone engine if nobody has yet
    pub async fn ensure_unlocked(&self) -> Result<(), ToneError> {
        let tone = Rc::clone(&self.tone);
        self.unlocked
            .get_or_try_init(|| async move {
                tone.borrow_mut().unlock()?;
                info!("audio unlocked");
                Ok::<(), ToneError>(())
            })
            .await
            .map(|_| ())
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.initialized()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::tone::RecordingTone;

    #[tokio::test]
    async fn unlock_runs_once_for_many_callers() {
        let tone = Rc::new(RefCell::new(RecordingTone::new()));
        let gate = AudioGate::new(tone.clone());
        assert!(!gate.is_unlocked());

        for _ in 0..5 {
            gate.ensure_unlocked().await.unwrap();
        }

        assert!(gate.is_unlocked());
        assert_eq!(tone.borrow().unlock_count(), 1);
    }

    #[tokio::test]
    async fn failed_unlock_is_retried() {
        let tone = Rc::new(RefCell::new(RecordingTone::new()));
        tone.borrow_mut().fail_unlock(true);
        let gate = AudioGate::new(tone.clone());

        assert!(gate.ensure_unlocked().await.is_err());
        assert!(!gate.is_unlocked());

        tone.borrow_mut().fail_unlock(false);
        gate.ensure_unlocked().await.unwrap();
        assert!(gate.is_unlocked());
        assert_eq!(tone.borrow().unlock_count(), 1);
    }
}
