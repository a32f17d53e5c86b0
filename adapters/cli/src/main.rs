#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that hosts the Sparse Life engine.
//!
//! `serve` speaks the JSON line protocol on stdin/stdout, `run` steps a grid
//! headlessly for a fixed number of generations, and `convert` turns RLE
//! patterns into protocol payloads. Diagnostics go to stderr.

mod config;
mod transport;

use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sparse_life_core::{Command, Event};
use sparse_life_host::EngineHandle;
use sparse_life_system_emitter::ChangeEmitter;
use sparse_life_system_protocol::Processor;
use sparse_life_wire::{decode, encode_cells, encode_command, DecodeError, Inbound};
use sparse_life_world::query;
use tracing::{debug, info, warn};

use crate::{config::EngineArgs, transport::LineTransport};

#[derive(Parser, Debug)]
#[command(name = "sparse-life", version, about = "Sparse Conway's Life engine")]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Read protocol messages from stdin and write notifications to stdout.
    Serve {
        #[command(flatten)]
        engine: EngineArgs,
        /// Start stepping as soon as the configured pattern is loaded.
        #[arg(long)]
        autostart: bool,
    },
    /// Step a grid for a fixed number of generations and print every change.
    Run {
        #[command(flatten)]
        engine: EngineArgs,
        /// Number of generations to compute.
        #[arg(long)]
        generations: u64,
    },
    /// Print an RLE pattern as protocol JSON.
    Convert {
        /// Pattern to convert.
        #[arg(value_name = "PATTERN")]
        input: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
        /// Emit a complete `init` message instead of a bare cell list.
        #[arg(long)]
        init: bool,
    },
}

/// Entry point for the Sparse Life command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Mode::Serve { engine, autostart } => serve(&engine, autostart),
        Mode::Run {
            engine,
            generations,
        } => run(&engine, generations),
        Mode::Convert {
            input,
            engine,
            init,
        } => convert(&input, &engine, init),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn serve(args: &EngineArgs, autostart: bool) -> Result<()> {
    let settings = args.resolve()?;
    let engine = EngineHandle::spawn(LineTransport::new(io::stdout()))
        .context("failed to start engine")?;

    if let Some(live_cells) = settings.live_cells {
        engine.send(Command::Init {
            config: settings.engine,
            live_cells,
        })?;
        if autostart {
            engine.send(Command::Start)?;
        }
    } else if autostart {
        warn!("--autostart ignored; no pattern configured");
    }

    info!("serving protocol on stdin/stdout");
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match decode(&line) {
            Ok(Inbound::Command { command, .. }) => engine.send(command)?,
            Ok(Inbound::Unknown { message_type }) => {
                warn!(%message_type, "ignoring unknown message type");
            }
            Err(error) => report_decode_error(&engine, &error)?,
        }
    }

    debug!("stdin closed; shutting down");
    engine.shutdown()?;
    Ok(())
}

fn report_decode_error(engine: &EngineHandle, error: &DecodeError) -> Result<()> {
    match error.command() {
        Some(command) => {
            warn!(%error, "malformed message");
            engine.report_malformed(command)?;
        }
        None => warn!(%error, "discarding unreadable message"),
    }
    Ok(())
}

fn run(args: &EngineArgs, generations: u64) -> Result<()> {
    let settings = args.resolve()?;
    let live_cells = settings.live_cells.unwrap_or_default();

    let mut processor = Processor::new();
    let mut emitter = ChangeEmitter::new();
    let mut transport = LineTransport::new(io::stdout().lock());
    let mut events: Vec<Event> = Vec::new();

    processor.handle(
        Command::Init {
            config: settings.engine,
            live_cells,
        },
        &mut events,
    );
    processor.handle(Command::Start, &mut events);
    if let Some(rejection) = events.iter().find_map(|event| match event {
        Event::CommandRejected { command, reason } => Some(format!("{command} rejected: {reason}")),
        _ => None,
    }) {
        bail!("{rejection}");
    }
    events.clear();

    // Each advance by exactly one interval triggers exactly one step.
    let interval = processor.tick_interval();
    for _ in 0..generations {
        processor.advance(interval, &mut events);
        let _ = emitter
            .handle(&events, &mut transport)
            .context("failed to write notifications")?;
        events.clear();
    }

    let engine = processor.engine();
    info!(
        generation = query::generation(engine),
        population = query::population(engine),
        notifications = emitter.delivered(),
        "run finished"
    );
    Ok(())
}

fn convert(pattern: &Path, args: &EngineArgs, init: bool) -> Result<()> {
    let settings = args.resolve()?;
    let live_cells = args.place_pattern(pattern, &settings.engine)?;

    let line = if init {
        encode_command(&Command::Init {
            config: settings.engine,
            live_cells,
        })
    } else {
        encode_cells(&live_cells)
    }
    .context("failed to encode pattern")?;

    println!("{line}");
    Ok(())
}
