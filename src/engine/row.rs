/*
Row Loop
========

A row is one independently clocked pattern driving its own voice bank. Its
loop is a local task on the scheduler thread:

    ┌───────────────────────────────────────────────┐
    │ sleep(rate)            <- only timed suspend  │
    │ notify step advance                           │
    │ if pattern[step]:                             │
    │     ensure audio unlocked (once per process)  │
    │     trigger voice[step]                       │
    │ step = (step + 1) mod N                       │
    └───────────────────────────────────────────────┘

Everything after the sleep runs to completion before the next suspension, so
pattern toggles and knob moves made between ticks are always seen by the next
tick and never half-applied. Sleeps are relative, so slow ticks push later
ticks back (drift is accepted).

A failed trigger is logged and the loop carries on. Each row has its own stop
signal; dropping the `Row` also ends its loop.

Lifecycle:

    Idle ──start──> Running ──stop──> Stopped
                       ^                 │
                       └─────start───────┘
*/

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

use log::{debug, error, trace, warn};
use tokio::{sync::watch, task::JoinHandle, time};

use crate::{
    control::{Knob, ParamKind, RowControls},
    error::{SequencerError, ToneError},
    sequencing::{NoteLength, StepClock, StepPattern},
    synth::{VoiceBank, VoiceParams},
    tone::{AudioGate, SharedTone},
};

/// Position of a row in its engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Idle,    // Constructed, loop never started
    Running, // Loop active
    Stopped, // Loop ended by request
}

/// Notifications from rows to whoever draws them.
///
/// Called on the scheduler thread with no row state borrowed, so an observer
/// may read back into the engine.
pub trait RowObserver {
    /// The row is about to play `step`
    fn on_step_advance(&self, _row: RowId, _step: usize) {}

    /// A step was switched on or off
    fn on_step_toggled(&self, _row: RowId, _step: usize, _is_on: bool) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl RowObserver for NoopObserver {}

/// Everything the loop and the UI both touch
struct RowState {
    bank: VoiceBank,
    pattern: StepPattern,
    clock: StepClock,
    controls: RowControls,
    triggers: u64,
}

impl RowState {
    /// The step the pointer is on, and whether it should sound
    fn armed_step(&self) -> (usize, bool) {
        let step = self.clock.current();
        (step, self.pattern.get(step).unwrap_or(false))
    }

    fn fire(&mut self, step: usize, length: NoteLength) -> Result<(), SequencerError> {
        self.bank.trigger(step, length)?;
        self.triggers += 1;
        Ok(())
    }
}

struct RowTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct Row {
    id: RowId,
    rate: Duration,
    note_length: NoteLength,
    state: Rc<RefCell<RowState>>,
    observer: Rc<dyn RowObserver>,
    status: RowStatus,
    task: Option<RowTask>,
}

impl Row {
    /// Build a row with fresh voices and apply the knob values to them.
    pub(crate) fn new(
        id: RowId,
        tone: &SharedTone,
        steps: usize,
        rate: Duration,
        note_length: NoteLength,
        controls: RowControls,
        observer: Rc<dyn RowObserver>,
    ) -> Result<Self, SequencerError> {
        if rate.is_zero() {
            return Err(SequencerError::ZeroRate);
        }
        let pattern = StepPattern::new(steps)?;
        let clock = StepClock::new(steps)?;
        let mut bank = VoiceBank::new(tone, steps)?;
        for kind in ParamKind::ALL {
            bank.broadcast(kind, controls.knob(kind).value())?;
        }

        Ok(Self {
            id,
            rate,
            note_length,
            state: Rc::new(RefCell::new(RowState {
                bank,
                pattern,
                clock,
                controls,
                triggers: 0,
            })),
            observer,
            status: RowStatus::Idle,
            task: None,
        })
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn rate(&self) -> Duration {
        self.rate
    }

    pub fn note_length(&self) -> NoteLength {
        self.note_length
    }

    pub fn status(&self) -> RowStatus {
        self.status
    }

    pub fn steps(&self) -> usize {
        self.state.borrow().clock.steps()
    }

    /// Step the next tick will play
    pub fn current_step(&self) -> usize {
        self.state.borrow().clock.current()
    }

    pub fn pattern(&self) -> StepPattern {
        self.state.borrow().pattern.clone()
    }

    pub fn is_on(&self, step: usize) -> Result<bool, SequencerError> {
        let state = self.state.borrow();
        state.pattern.get(step).ok_or(SequencerError::StepOutOfRange {
            step,
            steps: state.pattern.len(),
        })
    }

    /// Voices triggered since the row was created
    pub fn trigger_count(&self) -> u64 {
        self.state.borrow().triggers
    }

    pub fn voice_params(&self) -> Vec<VoiceParams> {
        self.state.borrow().bank.params()
    }

    pub fn knob(&self, kind: ParamKind) -> Knob {
        *self.state.borrow().controls.knob(kind)
    }

    pub fn controls(&self) -> RowControls {
        self.state.borrow().controls
    }

    /// Flip a step; takes effect the next time the pointer reaches it.
    pub fn toggle_step(&self, step: usize) -> Result<bool, SequencerError> {
        let is_on = self.state.borrow_mut().pattern.toggle(step)?;
        debug!("{}: step {} {}", self.id, step, if is_on { "on" } else { "off" });
        self.observer.on_step_toggled(self.id, step, is_on);
        Ok(is_on)
    }

    pub fn set_step(&self, step: usize, on: bool) -> Result<(), SequencerError> {
        let changed = {
            let mut state = self.state.borrow_mut();
            let was_on = state.pattern.get(step);
            state.pattern.set(step, on)?;
            was_on != Some(on)
        };
        if changed {
            self.observer.on_step_toggled(self.id, step, on);
        }
        Ok(())
    }

    pub fn begin_drag(&self, kind: ParamKind) {
        self.state.borrow_mut().controls.knob_mut(kind).begin_drag();
    }

    /// Move a knob by `delta` (relative to the drag origin) and push the
    /// result to every voice. Returns the applied value.
    ///
    /// The knob only moves once every voice took the value. On failure the
    /// voices that did are put back, so the bank stays uniform.
    pub fn drag(&self, kind: ParamKind, delta: f32) -> Result<f32, SequencerError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let knob = state.controls.knob_mut(kind);
        let previous = knob.value();
        let value = knob.preview(delta);

        if let Err(err) = state.bank.broadcast(kind, value) {
            if let Err(rollback) = state.bank.broadcast(kind, previous) {
                error!("{}: {} left non-uniform: {}", self.id, kind, rollback);
            }
            return Err(err.into());
        }
        state.controls.knob_mut(kind).set(value);
        trace!("{}: {} -> {}", self.id, kind, value);
        Ok(value)
    }

    pub fn end_drag(&self, kind: ParamKind) {
        self.state.borrow_mut().controls.knob_mut(kind).end_drag();
    }

    /// Spawn the row's loop on the current `LocalSet`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet`.
    pub fn start(&mut self, gate: Rc<AudioGate>) -> Result<(), SequencerError> {
        if self.status == RowStatus::Running {
            return Err(SequencerError::RowAlreadyRunning(self.id));
        }

        let (stop, stop_rx) = watch::channel(false);
        let ticker = Ticker {
            id: self.id,
            rate: self.rate,
            note_length: self.note_length,
            state: Rc::clone(&self.state),
            gate,
            observer: Rc::clone(&self.observer),
        };
        let handle = tokio::task::spawn_local(ticker.run(stop_rx));

        self.task = Some(RowTask { stop, handle });
        self.status = RowStatus::Running;
        debug!("{}: started at {} ms per step", self.id, self.rate.as_millis());
        Ok(())
    }

    /// Signal the loop to stop and wait for it to finish its current tick.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        // The loop may already be gone; nothing to signal then
        let _ = task.stop.send(true);
        if let Err(err) = task.handle.await {
            error!("{}: loop ended abnormally: {}", self.id, err);
        }
        self.status = RowStatus::Stopped;
        debug!("{}: stopped", self.id);
    }

    /// Release the row's voices. The loop must already be stopped.
    pub(crate) fn dispose(self) -> Result<(), ToneError> {
        let id = self.id;
        match Rc::try_unwrap(self.state) {
            Ok(state) => state.into_inner().bank.dispose(),
            Err(_) => {
                warn!("{}: still in use, voices not disposed", id);
                Ok(())
            }
        }
    }
}

/// The loop's half of a row
struct Ticker {
    id: RowId,
    rate: Duration,
    note_length: NoteLength,
    state: Rc<RefCell<RowState>>,
    gate: Rc<AudioGate>,
    observer: Rc<dyn RowObserver>,
}

impl Ticker {
    async fn run(self, mut stop: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                // A stop request, or the row itself was dropped
                _ = stop.changed() => break,
                _ = time::sleep(self.rate) => {}
            }
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let (step, armed) = self.state.borrow().armed_step();
        trace!("{}: step {}", self.id, step);
        self.observer.on_step_advance(self.id, step);

        if armed {
            match self.gate.ensure_unlocked().await {
                Ok(()) => {
                    let fired = self.state.borrow_mut().fire(step, self.note_length);
                    if let Err(err) = fired {
                        warn!("{}: step {} failed to trigger: {}", self.id, step, err);
                    }
                }
                Err(err) => error!("{}: could not unlock audio: {}", self.id, err),
            }
        }

        self.state.borrow_mut().clock.advance();
    }
}
