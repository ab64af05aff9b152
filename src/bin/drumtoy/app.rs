//! Startup, headless mode, and shutdown

use std::{cell::RefCell, rc::Rc};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use drumtoy::{
    audio::CpalTone,
    engine::Engine,
    tone::{RecordingTone, SharedTone},
};
use log::{info, warn};
use rtrb::Consumer;

use super::{cli::Args, feed::UiFeed, ui::UiApp};

/// The tone engine in use and, for a real device, its sample tap
pub struct Backend {
    pub tone: SharedTone,
    pub scope: Option<Consumer<f32>>,
    pub label: &'static str,
}

impl Backend {
    fn open(args: &Args) -> Self {
        if !args.silent {
            match CpalTone::open() {
                Ok((tone, scope)) => {
                    return Self {
                        tone: Rc::new(RefCell::new(tone.with_bpm(args.bpm))),
                        scope: Some(scope),
                        label: "cpal",
                    };
                }
                Err(err) => warn!("{}; continuing without audio", err),
            }
        }
        Self {
            tone: Rc::new(RefCell::new(RecordingTone::untracked())),
            scope: None,
            label: "silent",
        }
    }
}

/// Build the engine, start the startup rows, then hand over to the UI or
/// the headless timer.
pub async fn run(args: Args) -> EyreResult<()> {
    let backend = Backend::open(&args);
    let feed = Rc::new(UiFeed::default());

    let mut engine = Engine::new(Rc::clone(&backend.tone), args.engine_config())
        .wrap_err("invalid engine configuration")?
        .with_observer(feed.clone());
    engine
        .spawn_startup_rows()
        .wrap_err("failed to create startup rows")?;

    for (row, pattern) in &args.pattern {
        let row = engine.row(*row)?;
        for step in pattern.active_steps() {
            row.set_step(step, true)
                .wrap_err_with(|| format!("--pattern for {}", row.id()))?;
        }
    }

    let result = if args.headless {
        headless(&engine, &feed, &args).await;
        Ok(())
    } else {
        let mut terminal = ratatui::init();
        let mut app = UiApp::new(engine, feed, backend.scope, backend.label, args.bpm);
        let result = app.run(&mut terminal).await;
        ratatui::restore();
        engine = app.into_engine();
        result
    };

    engine.shutdown().await;
    result
}

async fn headless(engine: &Engine, feed: &UiFeed, args: &Args) {
    info!(
        "headless: {} rows at {} ms, press Ctrl+C to stop",
        engine.len(),
        args.rate
    );
    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupted, shutting down"),
            Err(err) => {
                warn!("cannot listen for Ctrl+C: {}", err);
                std::future::pending::<()>().await
            }
        }
    };
    match args.duration {
        Some(duration) => tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = interrupted => {}
        },
        None => interrupted.await,
    }

    for row in engine.rows() {
        info!(
            "{}: pattern {} fired {} times",
            row.id(),
            row.pattern(),
            row.trigger_count()
        );
    }
    info!("{} ticks in total", feed.ticks());
}
