use std::{cell::RefCell, rc::Rc, time::Duration};

use drumtoy::{
    control::ParamKind,
    engine::{Engine, EngineConfig, RowId, RowObserver},
    tone::RecordingTone,
};
use tokio::{task::LocalSet, time};

const RATE: Duration = Duration::from_millis(100);

fn engine() -> (Rc<RefCell<RecordingTone>>, Engine) {
    let tone = Rc::new(RefCell::new(RecordingTone::new()));
    let engine = Engine::new(tone.clone(), EngineConfig::new().rate(RATE).no_startup_rows()).unwrap();
    (tone, engine)
}

/// Move off the tick grid so test checks never coincide with a tick
async fn half_tick() {
    time::sleep(RATE / 2).await;
}

async fn ticks(ticks: u32) {
    time::sleep(RATE * ticks).await;
}

/// Snapshots how many envelopes had fired when each tick began
struct TriggerProbe {
    tone: Rc<RefCell<RecordingTone>>,
    counts: RefCell<Vec<usize>>,
}

impl TriggerProbe {
    fn new(tone: Rc<RefCell<RecordingTone>>) -> Rc<Self> {
        Rc::new(Self {
            tone,
            counts: RefCell::new(Vec::new()),
        })
    }

    /// Ticks (0-based) during which something fired
    fn firing_ticks(&self) -> Vec<usize> {
        let mut counts = self.counts.borrow().clone();
        counts.push(self.tone.borrow().envelope_triggers().len());
        counts
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1] > pair[0])
            .map(|(tick, _)| tick)
            .collect()
    }
}

impl RowObserver for TriggerProbe {
    fn on_step_advance(&self, _row: RowId, _step: usize) {
        let fired = self.tone.borrow().envelope_triggers().len();
        self.counts.borrow_mut().push(fired);
    }
}

#[tokio::test(start_paused = true)]
async fn sixteen_ticks_fire_exactly_the_enabled_steps() {
    LocalSet::new()
        .run_until(async {
            let (tone, engine) = engine();
            let probe = TriggerProbe::new(tone.clone());
            let mut engine = engine.with_observer(probe.clone());

            let row = engine.add_idle_row(drumtoy::engine::ADD_ROW_SEEDS).unwrap();
            engine.toggle_step(row, 2).unwrap();
            engine.toggle_step(row, 5).unwrap();
            engine.start_row(row).unwrap();

            half_tick().await;
            ticks(16).await;
            engine.stop_row(row).await.unwrap();

            assert_eq!(probe.counts.borrow().len(), 16);
            assert_eq!(probe.firing_ticks(), vec![2, 5, 10, 13]);

            assert_eq!(engine.row(row).unwrap().trigger_count(), 4);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn create_row_seeds_every_voice_before_any_tick() {
    LocalSet::new()
        .run_until(async {
            let (tone, mut engine) = engine();
            let row = engine.create_row(500.0, 10.0, 100.0).unwrap();

            let params = engine.row(row).unwrap().voice_params();
            assert_eq!(params.len(), 8);
            for voice in params {
                assert_eq!(voice.carrier_frequency, 10.0);
                assert_eq!(voice.modulation_depth, 500.0);
                assert_eq!(voice.modulator_frequency, 100.0);
            }
            // Nothing has been started or triggered yet
            assert!(tone.borrow().envelope_triggers().is_empty());
            assert_eq!(tone.borrow().unlock_count(), 0);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn step_enabled_behind_the_pointer_waits_for_its_next_visit() {
    LocalSet::new()
        .run_until(async {
            let (_, mut engine) = engine();
            let row = engine.add_default_row().unwrap();

            // Steps 0, 1, 2 have played; the pointer is on 3
            half_tick().await;
            ticks(3).await;
            assert_eq!(engine.row(row).unwrap().current_step(), 3);
            engine.toggle_step(row, 1).unwrap();

            // Ticks 3..=8 play steps 3..7 and 0
            ticks(6).await;
            assert_eq!(engine.row(row).unwrap().trigger_count(), 0);

            // Tick 9 is step 1
            ticks(1).await;
            assert_eq!(engine.row(row).unwrap().trigger_count(), 1);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn audio_unlocks_once_for_all_rows() {
    LocalSet::new()
        .run_until(async {
            let (tone, mut engine) = engine();
            for _ in 0..4 {
                let row = engine.add_default_row().unwrap();
                engine.toggle_step(row, 0).unwrap();
                engine.toggle_step(row, 4).unwrap();
            }

            half_tick().await;
            ticks(16).await;

            assert!(engine.gate().is_unlocked());
            assert_eq!(tone.borrow().unlock_count(), 1);
            assert_eq!(tone.borrow().envelope_triggers().len(), 4 * 4);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn failed_unlock_is_retried_on_a_later_tick() {
    LocalSet::new()
        .run_until(async {
            let (tone, mut engine) = engine();
            tone.borrow_mut().fail_unlock(true);
            let row = engine.add_default_row().unwrap();
            engine.toggle_step(row, 0).unwrap();

            half_tick().await;
            ticks(8).await;
            assert!(!engine.gate().is_unlocked());
            assert_eq!(engine.row(row).unwrap().trigger_count(), 0);
            // The loop kept going regardless
            assert_eq!(engine.row(row).unwrap().current_step(), 0);

            tone.borrow_mut().fail_unlock(false);
            ticks(8).await;
            assert!(engine.gate().is_unlocked());
            assert_eq!(engine.row(row).unwrap().trigger_count(), 1);
            assert_eq!(tone.borrow().unlock_count(), 1);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn one_failing_row_does_not_halt_another() {
    LocalSet::new()
        .run_until(async {
            let (tone, mut engine) = engine();
            let broken = engine.add_default_row().unwrap();
            let healthy = engine.add_default_row().unwrap();
            for row in [broken, healthy] {
                for step in 0..8 {
                    engine.toggle_step(row, step).unwrap();
                }
            }

            let voices = engine.row(broken).unwrap().voice_params().len();
            // Node ids are handed out voice by voice; every fourth is an envelope
            for voice in 0..voices {
                tone.borrow_mut()
                    .fail_envelope(drumtoy::tone::NodeId((voice * 4 + 3) as u32));
            }

            half_tick().await;
            ticks(8).await;
            assert_eq!(engine.row(broken).unwrap().trigger_count(), 0);
            assert_eq!(engine.row(healthy).unwrap().trigger_count(), 8);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn knob_moves_apply_before_the_next_trigger() {
    LocalSet::new()
        .run_until(async {
            let (tone, mut engine) = engine();
            let row = engine.add_default_row().unwrap();
            engine.toggle_step(row, 0).unwrap();

            half_tick().await;
            ticks(1).await;
            let value = engine
                .drag_parameter(row, ParamKind::CarrierFrequency, 10.0)
                .unwrap();
            assert!(value > 10.0);

            tone.borrow_mut().clear_calls();
            ticks(8).await;
            assert!(engine
                .row(row)
                .unwrap()
                .voice_params()
                .iter()
                .all(|voice| voice.carrier_frequency == value));
            assert_eq!(tone.borrow().envelope_triggers().len(), 1);
            engine.shutdown().await;
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_every_row_and_releases_every_node() {
    LocalSet::new()
        .run_until(async {
            let tone = Rc::new(RefCell::new(RecordingTone::new()));
            let mut engine = Engine::new(tone.clone(), EngineConfig::default()).unwrap();
            engine.spawn_startup_rows().unwrap();
            engine.add_default_row().unwrap();
            assert_eq!(tone.borrow().live_nodes(), 5 * 8 * 4);

            half_tick().await;
            ticks(4).await;
            engine.shutdown().await;

            assert!(engine.is_empty());
            assert_eq!(tone.borrow().live_nodes(), 0);
        })
        .await;
}
