//! drumtoy - multi-row FM step sequencer in the terminal
//!
//! Run with: cargo run -- --help

mod app;
mod cli;
mod feed;
mod ui;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use tokio::task::LocalSet;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = cli::Args::parse();
    args.init_logging()?;

    // Rows, the UI and the tone engine all share one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()
        .wrap_err("failed to build the scheduler runtime")?;
    LocalSet::new().block_on(&runtime, app::run(args))
}
