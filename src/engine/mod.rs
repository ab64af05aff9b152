// Purpose: Owns every row and the tone engine they share.
// Rows are appended, never removed, and each runs its own clock loop as a
// local task. The engine is the single entry point for UI actions.

pub mod config;
pub mod row;

use std::rc::Rc;

use log::{error, info};

use crate::{
    control::{ParamKind, RowControls},
    error::SequencerError,
    tone::{AudioGate, SharedTone},
};

pub use crate::control::RowSeeds;
pub use config::{EngineConfig, RowSpec, ADD_ROW_SEEDS, DEFAULT_RATE, DEFAULT_STEPS, STARTUP_SEEDS};
pub use row::{NoopObserver, Row, RowId, RowObserver, RowStatus};

/// Registry of rows.
///
/// Everything here runs on one thread. Methods that start rows must be
/// called from inside a `tokio::task::LocalSet`.
pub struct Engine {
    config: EngineConfig,
    tone: SharedTone,
    gate: Rc<AudioGate>,
    observer: Rc<dyn RowObserver>,
    rows: Vec<Row>,
}

impl Engine {
    pub fn new(tone: SharedTone, config: EngineConfig) -> Result<Self, SequencerError> {
        config.validate()?;
        Ok(Self {
            config,
            gate: Rc::new(AudioGate::new(Rc::clone(&tone))),
            tone,
            observer: Rc::new(NoopObserver),
            rows: Vec::new(),
        })
    }

    /// Route step notifications to `observer`. Applies to rows added later.
    pub fn with_observer(mut self, observer: Rc<dyn RowObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gate(&self) -> &AudioGate {
        &self.gate
    }

    pub fn tone(&self) -> &SharedTone {
        &self.tone
    }

    /// Create and start every configured startup row
    pub fn spawn_startup_rows(&mut self) -> Result<Vec<RowId>, SequencerError> {
        let specs = self.config.startup_rows.clone();
        specs.into_iter().map(|spec| self.add_row(spec)).collect()
    }

    /// Create a row with the given seeds and the default rate, and start it.
    pub fn create_row(
        &mut self,
        modulation_depth: f32,
        carrier_frequency: f32,
        modulator_frequency: f32,
    ) -> Result<RowId, SequencerError> {
        self.add_row(RowSpec::new(RowSeeds::new(
            modulation_depth,
            carrier_frequency,
            modulator_frequency,
        )))
    }

    /// The "add row" action
    pub fn add_default_row(&mut self) -> Result<RowId, SequencerError> {
        self.add_row(RowSpec::new(self.config.add_row_seeds))
    }

    /// Create a row and start its loop.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet`.
    pub fn add_row(&mut self, spec: impl Into<RowSpec>) -> Result<RowId, SequencerError> {
        let id = self.add_idle_row(spec)?;
        self.start_row(id)?;
        Ok(id)
    }

    /// Create a row without starting it
    pub fn add_idle_row(&mut self, spec: impl Into<RowSpec>) -> Result<RowId, SequencerError> {
        let spec = spec.into();
        self.config.validate_row(&spec)?;
        let (steps, rate) = self.config.resolve(&spec);

        let id = RowId(self.rows.len());
        let controls = RowControls::new(spec.seeds, &self.config.ranges, self.config.sensitivity);
        let row = Row::new(
            id,
            &self.tone,
            steps,
            rate,
            self.config.note_length,
            controls,
            Rc::clone(&self.observer),
        )?;
        self.rows.push(row);

        info!(
            "{} created: {} steps at {} ms, seeds {:?}",
            id,
            steps,
            rate.as_millis(),
            spec.seeds
        );
        Ok(id)
    }

    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet`.
    pub fn start_row(&mut self, id: RowId) -> Result<(), SequencerError> {
        let gate = Rc::clone(&self.gate);
        self.row_mut(id)?.start(gate)
    }

    pub async fn stop_row(&mut self, id: RowId) -> Result<(), SequencerError> {
        self.row_mut(id)?.stop().await;
        Ok(())
    }

    pub fn row(&self, id: RowId) -> Result<&Row, SequencerError> {
        self.rows.get(id.0).ok_or(SequencerError::UnknownRow(id))
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut Row, SequencerError> {
        self.rows.get_mut(id.0).ok_or(SequencerError::UnknownRow(id))
    }

    /// Rows in creation order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn toggle_step(&self, id: RowId, step: usize) -> Result<bool, SequencerError> {
        self.row(id)?.toggle_step(step)
    }

    /// Move one knob of a row by `delta` from its current value and
    /// broadcast the result. Returns the applied value.
    pub fn drag_parameter(
        &self,
        id: RowId,
        kind: ParamKind,
        delta: f32,
    ) -> Result<f32, SequencerError> {
        let row = self.row(id)?;
        row.begin_drag(kind);
        let value = row.drag(kind, delta);
        row.end_drag(kind);
        value
    }

    /// Stop every loop and release every voice
    pub async fn shutdown(&mut self) {
        for row in &mut self.rows {
            row.stop().await;
        }
        for row in self.rows.drain(..) {
            let id = row.id();
            if let Err(err) = row.dispose() {
                error!("{}: failed to release voices: {}", id, err);
            }
        }
        info!("engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use tokio::{task::LocalSet, time};

    use super::*;
    use crate::tone::RecordingTone;

    fn engine(config: EngineConfig) -> (Rc<RefCell<RecordingTone>>, Engine) {
        let tone = Rc::new(RefCell::new(RecordingTone::new()));
        let engine = Engine::new(tone.clone(), config).unwrap();
        (tone, engine)
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let tone: SharedTone = Rc::new(RefCell::new(RecordingTone::new()));
        assert!(matches!(
            Engine::new(tone, EngineConfig::new().steps(0)),
            Err(SequencerError::ZeroSteps)
        ));
    }

    #[test]
    fn unknown_rows_fail_fast() {
        let (_, engine) = engine(EngineConfig::new().no_startup_rows());
        assert_eq!(
            engine.toggle_step(RowId(3), 0),
            Err(SequencerError::UnknownRow(RowId(3)))
        );
        assert!(engine.drag_parameter(RowId(0), ParamKind::ModulationDepth, 1.0).is_err());
    }

    #[test]
    fn idle_rows_take_ids_in_order() {
        let (_, mut engine) = engine(EngineConfig::new().no_startup_rows());
        let a = engine.add_idle_row(ADD_ROW_SEEDS).unwrap();
        let b = engine.add_idle_row(RowSpec::new(ADD_ROW_SEEDS).steps(16)).unwrap();

        assert_eq!((a, b), (RowId(0), RowId(1)));
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.row(b).unwrap().steps(), 16);
        assert_eq!(engine.row(a).unwrap().status(), RowStatus::Idle);
    }

    #[test]
    fn drag_parameter_moves_from_the_current_value() {
        let (_, mut engine) = engine(EngineConfig::new().no_startup_rows());
        let id = engine.add_idle_row(RowSeeds::new(1000.0, 10.0, 100.0)).unwrap();

        assert_eq!(engine.drag_parameter(id, ParamKind::ModulationDepth, 10.0), Ok(1100.0));
        assert_eq!(engine.drag_parameter(id, ParamKind::ModulationDepth, 10.0), Ok(1200.0));
        let row = engine.row(id).unwrap();
        assert!(row.voice_params().iter().all(|p| p.modulation_depth == 1200.0));
    }

    #[tokio::test(start_paused = true)]
    async fn startup_rows_run_and_shutdown_releases_everything() {
        LocalSet::new()
            .run_until(async {
                let (tone, mut engine) = engine(EngineConfig::default());
                let ids = engine.spawn_startup_rows().unwrap();
                assert_eq!(ids, vec![RowId(0), RowId(1), RowId(2), RowId(3)]);
                // Second row's 2200 Hz seed is above the knob range and is
                // still what its voices play
                let row = engine.row(RowId(1)).unwrap();
                assert!(row.voice_params().iter().all(|p| p.carrier_frequency == 2200.0));
                assert_eq!(row.knob(ParamKind::CarrierFrequency).rotation_degrees(), 135.0);

                assert_eq!(tone.borrow().live_nodes(), 4 * 8 * 4);
                time::sleep(Duration::from_millis(350)).await;

                engine.shutdown().await;
                assert!(engine.is_empty());
                assert_eq!(tone.borrow().live_nodes(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_row_leaves_other_rows_running() {
        LocalSet::new()
            .run_until(async {
                let (_, mut engine) = engine(EngineConfig::new().no_startup_rows());
                let a = engine.add_default_row().unwrap();
                let b = engine.add_default_row().unwrap();
                engine.toggle_step(a, 0).unwrap();
                engine.toggle_step(b, 0).unwrap();

                engine.stop_row(a).await.unwrap();
                time::sleep(Duration::from_millis(1_650)).await;

                assert_eq!(engine.row(a).unwrap().status(), RowStatus::Stopped);
                assert_eq!(engine.row(a).unwrap().trigger_count(), 0);
                assert_eq!(engine.row(b).unwrap().trigger_count(), 2);
                engine.shutdown().await;
            })
            .await;
    }
}
