#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Protocol state machine that validates host commands and drives the engine.
//!
//! The processor owns the grid engine and the scheduler. Commands arrive
//! through [`Processor::handle`], elapsed time through
//! [`Processor::advance`]; both append [`Event`] values describing what
//! happened. Because a single owner serializes both entry points, a step and
//! a cell edit can never overlap, and no tick can fire once `stop` has been
//! handled.

use std::time::Duration;

use sparse_life_core::{
    CellCoord, CellRequest, Command, CommandKind, EngineConfig, Event, HaltReason, ProtocolState,
    RejectionReason, DEFAULT_TICK_INTERVAL_MS,
};
use sparse_life_system_scheduler::Scheduler;
use sparse_life_world::{EngineError, GridEngine};
use tracing::{debug, error, info, warn};

/// Command processor owning one engine instance and its scheduler.
#[derive(Debug)]
pub struct Processor {
    engine: GridEngine,
    scheduler: Scheduler,
    state: ProtocolState,
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            engine: GridEngine::new(),
            scheduler: Scheduler::new(Duration::from_millis(DEFAULT_TICK_INTERVAL_MS)),
            state: ProtocolState::Uninitialized,
        }
    }
}

impl Processor {
    /// Creates an uninitialized processor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> ProtocolState {
        self.state
    }

    /// Read-only access to the engine for queries.
    #[must_use]
    pub const fn engine(&self) -> &GridEngine {
        &self.engine
    }

    /// Configured interval between scheduled steps.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    /// Time left until the next scheduled step, or `None` while not running.
    #[must_use]
    pub fn time_until_tick(&self) -> Option<Duration> {
        self.scheduler.remaining()
    }

    /// Validates and applies a host command.
    pub fn handle(&mut self, command: Command, out: &mut Vec<Event>) {
        let kind = command.kind();
        debug!(command = %kind, state = ?self.state, "handling command");

        if self.state == ProtocolState::Uninitialized && kind != CommandKind::Init {
            self.reject(kind, RejectionReason::NotInitialized, out);
            return;
        }

        match command {
            Command::Init { config, live_cells } => self.init(config, live_cells, out),
            Command::Start => self.start(out),
            Command::Stop => self.stop(out),
            Command::SetCells { cells } => self.set_cells(&cells, out),
            Command::UpdateSpeed { tick_interval_ms } => self.update_speed(tick_interval_ms, out),
        }
    }

    /// Feeds elapsed time to the scheduler and performs a step when one is due.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Event>) {
        if self.state != ProtocolState::Running {
            return;
        }
        if !self.scheduler.advance(dt) {
            return;
        }

        let mut changes = Vec::new();
        match self.engine.step(&mut changes) {
            Ok(generation) => out.push(Event::GenerationAdvanced {
                generation,
                changes,
            }),
            Err(error) => {
                error!(%error, "scheduled step failed; halting scheduler");
                self.teardown(out);
                out.push(Event::SchedulerHalted {
                    reason: HaltReason::EngineUninitialized,
                });
            }
        }
    }

    /// Records a host message that could not be decoded.
    ///
    /// A malformed `init` discards any existing grid, leaving the processor
    /// uninitialized until the host retries.
    pub fn reject_malformed(&mut self, command: CommandKind, out: &mut Vec<Event>) {
        if command == CommandKind::Init {
            self.teardown(out);
        }
        self.reject(command, RejectionReason::MalformedPayload, out);
    }

    /// Stops the scheduler because of a fatal condition outside the engine.
    ///
    /// The grid is kept; the host may `start` again or re-`init`.
    pub fn halt(&mut self, reason: HaltReason, out: &mut Vec<Event>) {
        warn!(%reason, "halting scheduler");
        self.scheduler.stop();
        if self.state == ProtocolState::Running {
            self.transition(ProtocolState::Stopped, out);
        }
        out.push(Event::SchedulerHalted { reason });
    }

    fn init(&mut self, config: EngineConfig, live_cells: Vec<CellCoord>, out: &mut Vec<Event>) {
        self.scheduler.stop();

        let Some(interval) = config.tick_interval() else {
            self.teardown(out);
            self.reject(CommandKind::Init, RejectionReason::InvalidTickInterval, out);
            return;
        };

        match self
            .engine
            .init(config.grid_width, config.grid_height, live_cells)
        {
            Ok(summary) => {
                self.scheduler.set_interval(interval);
                out.push(Event::Initialized {
                    dimensions: summary.dimensions,
                    population: summary.population,
                });
                self.transition(ProtocolState::Stopped, out);
            }
            Err(EngineError::InvalidDimensions { width, height }) => {
                self.teardown(out);
                self.reject(
                    CommandKind::Init,
                    RejectionReason::InvalidDimensions { width, height },
                    out,
                );
            }
            Err(EngineError::NotInitialized) => {
                self.teardown(out);
                self.reject(CommandKind::Init, RejectionReason::MalformedPayload, out);
            }
        }
    }

    fn start(&mut self, out: &mut Vec<Event>) {
        if self.state == ProtocolState::Running {
            debug!("start ignored; simulation already running");
            return;
        }
        self.scheduler.start();
        self.transition(ProtocolState::Running, out);
    }

    fn stop(&mut self, out: &mut Vec<Event>) {
        if self.state != ProtocolState::Running {
            debug!("stop ignored; simulation not running");
            return;
        }
        self.scheduler.stop();
        self.transition(ProtocolState::Stopped, out);
    }

    fn set_cells(&mut self, cells: &[CellRequest], out: &mut Vec<Event>) {
        let mut changes = Vec::new();
        match self.engine.set_cells(cells, &mut changes) {
            Ok(applied) => {
                debug!(requested = cells.len(), applied, "cells edited");
                out.push(Event::CellsEdited { changes });
            }
            Err(error) => {
                warn!(%error, "cell edit refused");
                self.reject(CommandKind::SetCells, RejectionReason::NotInitialized, out);
            }
        }
    }

    fn update_speed(&mut self, tick_interval_ms: u64, out: &mut Vec<Event>) {
        let Some(interval) = sparse_life_core::tick_interval_from_millis(tick_interval_ms) else {
            self.reject(CommandKind::UpdateSpeed, RejectionReason::InvalidTickInterval, out);
            return;
        };

        self.scheduler.set_interval(interval);
        info!(
            tick_interval_ms,
            restarted = self.scheduler.is_active(),
            "tick interval updated"
        );
        out.push(Event::TickIntervalChanged {
            tick_interval: interval,
        });
    }

    fn teardown(&mut self, out: &mut Vec<Event>) {
        self.scheduler.stop();
        self.engine.reset();
        self.transition(ProtocolState::Uninitialized, out);
    }

    fn transition(&mut self, state: ProtocolState, out: &mut Vec<Event>) {
        if self.state == state {
            return;
        }
        info!(from = ?self.state, to = ?state, "protocol state changed");
        self.state = state;
        out.push(Event::ProtocolStateChanged { state });
    }

    fn reject(&self, command: CommandKind, reason: RejectionReason, out: &mut Vec<Event>) {
        warn!(%command, %reason, "command rejected");
        out.push(Event::CommandRejected { command, reason });
    }
}
