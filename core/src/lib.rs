#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sparse Life engine.
//!
//! This crate defines the message surface that connects the host, the
//! authoritative grid engine, and the pure systems. Hosts submit [`Command`]
//! values describing desired mutations, the protocol processor validates them
//! and drives the grid engine, and the resulting [`Event`] values are turned
//! into outbound [`Notification`] messages by the change emitter. No state is
//! shared between host and engine beyond these values.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Grid width used when the host does not configure one (8000 px at 5 px per cell).
pub const DEFAULT_GRID_WIDTH: u32 = 1600;
/// Grid height used when the host does not configure one (2800 px at 5 px per cell).
pub const DEFAULT_GRID_HEIGHT: u32 = 560;
/// Tick interval used when the host does not configure one.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }
}

/// Width and height of the toroidal grid, both strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    width: u32,
    height: u32,
}

impl GridDimensions {
    /// Creates a dimension pair, returning `None` when either side is zero.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the cell lies within `[0, width) x [0, height)`.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// Wraps signed coordinates onto the torus.
    ///
    /// The engine never wraps on its own; hosts that place patterns across an
    /// edge use this before submitting cells.
    #[must_use]
    pub fn wrap(&self, x: i64, y: i64) -> CellCoord {
        let column = x.rem_euclid(i64::from(self.width));
        let row = y.rem_euclid(i64::from(self.height));
        // rem_euclid keeps both values inside the u32 bounds above.
        CellCoord::new(column as u32, row as u32)
    }
}

/// A cell whose alive/dead status differs between two observed states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellChange {
    cell: CellCoord,
    alive: bool,
}

impl CellChange {
    /// Creates a change record for the provided cell.
    #[must_use]
    pub const fn new(cell: CellCoord, alive: bool) -> Self {
        Self { cell, alive }
    }

    /// Cell whose state changed.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// State of the cell after the change.
    #[must_use]
    pub const fn alive(&self) -> bool {
        self.alive
    }
}

/// Host request to force a cell into the provided state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRequest {
    cell: CellCoord,
    alive: bool,
}

impl CellRequest {
    /// Creates a new mutation request.
    #[must_use]
    pub const fn new(cell: CellCoord, alive: bool) -> Self {
        Self { cell, alive }
    }

    /// Cell targeted by the request.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Requested state for the cell.
    #[must_use]
    pub const fn alive(&self) -> bool {
        self.alive
    }
}

/// Configuration carried by an `init` command.
///
/// Values are validated by the protocol processor rather than at
/// construction so that a host-supplied zero surfaces as a rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of grid columns.
    pub grid_width: u32,
    /// Number of grid rows.
    pub grid_height: u32,
    /// Milliseconds between scheduled generation steps.
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    /// Validated grid dimensions, if both sides are positive.
    #[must_use]
    pub const fn dimensions(&self) -> Option<GridDimensions> {
        GridDimensions::new(self.grid_width, self.grid_height)
    }

    /// Validated tick interval, if it is positive.
    #[must_use]
    pub const fn tick_interval(&self) -> Option<Duration> {
        tick_interval_from_millis(self.tick_interval_ms)
    }
}

/// Converts a host-supplied millisecond count into a positive interval.
#[must_use]
pub const fn tick_interval_from_millis(millis: u64) -> Option<Duration> {
    if millis == 0 {
        None
    } else {
        Some(Duration::from_millis(millis))
    }
}

/// Protocol state of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ProtocolState {
    /// No grid has been configured yet, or the last `init` failed.
    #[default]
    Uninitialized,
    /// A grid exists and the scheduler is idle.
    Stopped,
    /// A grid exists and the scheduler is ticking.
    Running,
}

/// Discriminant of a [`Command`], used when reporting rejections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `init` message.
    Init,
    /// `start` message.
    Start,
    /// `stop` message.
    Stop,
    /// `setCells` message.
    SetCells,
    /// `updateSpeed` message.
    UpdateSpeed,
}

impl CommandKind {
    /// Wire name of the message type.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::SetCells => "setCells",
            Self::UpdateSpeed => "updateSpeed",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Commands that express all permissible engine mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replaces the grid, the live set and the generation counter.
    Init {
        /// Grid size and tick cadence.
        config: EngineConfig,
        /// Cells alive in generation zero. Out-of-range entries are skipped.
        live_cells: Vec<CellCoord>,
    },
    /// Begins scheduled generation steps.
    Start,
    /// Cancels scheduled generation steps.
    Stop,
    /// Forces individual cells alive or dead.
    SetCells {
        /// Requested cell states, applied in order.
        cells: Vec<CellRequest>,
    },
    /// Changes the scheduler cadence.
    UpdateSpeed {
        /// Milliseconds between scheduled generation steps.
        tick_interval_ms: u64,
    },
}

impl Command {
    /// Discriminant of the command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Init { .. } => CommandKind::Init,
            Self::Start => CommandKind::Start,
            Self::Stop => CommandKind::Stop,
            Self::SetCells { .. } => CommandKind::SetCells,
            Self::UpdateSpeed { .. } => CommandKind::UpdateSpeed,
        }
    }
}

/// Reasons a command may be rejected by the protocol processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The command requires an initialized grid.
    NotInitialized,
    /// The requested grid has a zero-length side.
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The requested tick interval is zero.
    InvalidTickInterval,
    /// The host message could not be decoded into a command.
    MalformedPayload,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "engine is not initialized"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "grid dimensions {width}x{height} must be positive")
            }
            Self::InvalidTickInterval => write!(f, "tick interval must be positive"),
            Self::MalformedPayload => write!(f, "message payload is malformed"),
        }
    }
}

/// Reasons the scheduler may be halted without a `stop` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HaltReason {
    /// A step was attempted before grid dimensions were set.
    EngineUninitialized,
    /// A `stateChanges` notification could not be delivered.
    TransportFailed,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineUninitialized => write!(f, "step attempted before initialization"),
            Self::TransportFailed => write!(f, "state change delivery failed"),
        }
    }
}

/// Events broadcast by the protocol processor after handling input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a new grid replaced any previous one.
    Initialized {
        /// Dimensions of the new grid.
        dimensions: GridDimensions,
        /// Number of live cells accepted from the initial snapshot.
        population: usize,
    },
    /// Announces a protocol state transition.
    ProtocolStateChanged {
        /// State entered after processing input.
        state: ProtocolState,
    },
    /// Confirms that the scheduler cadence changed.
    TickIntervalChanged {
        /// New interval between scheduled steps.
        tick_interval: Duration,
    },
    /// Reports the outcome of one completed generation step.
    GenerationAdvanced {
        /// Generation reached by the step.
        generation: u64,
        /// Cells whose state differs from the previous generation.
        changes: Vec<CellChange>,
    },
    /// Reports the outcome of a `setCells` command.
    CellsEdited {
        /// Requests that actually changed cell membership.
        changes: Vec<CellChange>,
    },
    /// Reports that a command was refused.
    CommandRejected {
        /// Kind of the refused command.
        command: CommandKind,
        /// Specific reason the command was refused.
        reason: RejectionReason,
    },
    /// Reports that the scheduler stopped because of a fatal condition.
    SchedulerHalted {
        /// Condition that stopped the scheduler.
        reason: HaltReason,
    },
}

/// Messages delivered from the engine to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A non-empty batch of cell state changes.
    StateChanges {
        /// Generation produced by the step, absent for direct edits.
        generation: Option<u64>,
        /// Cells whose state changed.
        changes: Vec<CellChange>,
    },
    /// A rejected command or fatal engine condition.
    Error {
        /// Human readable description of the failure.
        message: String,
    },
}
