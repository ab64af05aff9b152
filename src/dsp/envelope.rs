use crate::{tone::EnvelopeShape, MIN_TIME};

/*
Timed ADSR Envelope
===================

A linear attack/decay/sustain/release generator whose gate is a duration
rather than a pair of note-on/note-off calls. `trigger(hold)` opens the gate
and counts `hold` seconds of samples; when the count runs out the envelope
releases on its own from wherever it is.

  Level
    1.0 ┐    ╱╲
        │   ╱  ╲______
    S   │  ╱          ╲
    0.0 └─╱────────────╲──→ Time
          |<-- hold -->|<R>|

Ramps are per-sample increments:

    increment = change / (seconds * sample_rate)

Release interpolates from the level at gate close down to exactly 0.0.
Retriggering restarts the attack from zero.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    shape: EnvelopeShape,
    sample_rate: f32,

    stage: EnvelopeStage,
    level: f32,

    /// Samples left before the gate closes
    hold_remaining: u32,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn new(shape: EnvelopeShape, sample_rate: f32) -> Self {
        Self {
            shape: EnvelopeShape {
                attack: shape.attack.max(MIN_TIME),
                decay: shape.decay.max(MIN_TIME),
                sustain: shape.sustain.clamp(0.0, 1.0),
                release: shape.release.max(MIN_TIME),
            },
            sample_rate,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            hold_remaining: 0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    /// Open the gate for `hold` seconds, then release
    pub fn trigger(&mut self, hold: f32) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.hold_remaining = (hold.max(0.0) * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
    }

    /// Close the gate now
    pub fn release(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        self.hold_remaining = 0;
        self.release_start_level = self.level;
        self.release_total_samples = (self.shape.release * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance one sample and return the new level
    pub fn next_sample(&mut self) -> f32 {
        if self.stage != EnvelopeStage::Idle && self.stage != EnvelopeStage::Release {
            if self.hold_remaining == 0 {
                self.release();
            } else {
                self.hold_remaining -= 1;
            }
        }

        match self.stage {
            EnvelopeStage::Idle => self.level = 0.0,

            EnvelopeStage::Attack => {
                self.level += 1.0 / (self.shape.attack * self.sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                let target = self.shape.sustain;
                self.level -= (1.0 - target) / (self.shape.decay * self.sample_rate);
                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => self.level = self.shape.sustain,

            EnvelopeStage::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}
