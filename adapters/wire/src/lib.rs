#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! JSON wire format for the host/engine message protocol.
//!
//! Every message is a single JSON object with a `type` tag. Decoding is
//! lenient per entry: a malformed cell inside an otherwise valid batch is
//! skipped and counted, never failing the whole message. Missing or mistyped
//! top-level fields fail the message with a [`DecodeError`] naming the
//! command, so the host can report it and, for `init`, discard the grid.

pub mod rle;

use serde::Serialize;
use serde_json::{Map, Value};
use sparse_life_core::{CellCoord, CellRequest, Command, CommandKind, EngineConfig, Notification};
use thiserror::Error;
use tracing::debug;

type Object = Map<String, Value>;

/// Failures raised while decoding a host message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message is not valid JSON.
    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The message is valid JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,
    /// The message lacks a string `type` tag.
    #[error("message has no `type` tag")]
    MissingType,
    /// A required field of a known message is absent or mistyped.
    #[error("`{command}` message has a missing or invalid `{field}` field")]
    Malformed {
        /// Message whose payload is malformed.
        command: CommandKind,
        /// Name of the offending field.
        field: &'static str,
    },
}

impl DecodeError {
    /// Kind of the known command the message was meant to carry, if any.
    #[must_use]
    pub const fn command(&self) -> Option<CommandKind> {
        match self {
            Self::Malformed { command, .. } => Some(*command),
            Self::InvalidJson(_) | Self::NotAnObject | Self::MissingType => None,
        }
    }
}

/// Successfully decoded host message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A protocol command.
    Command {
        /// Decoded command.
        command: Command,
        /// Number of malformed batch entries that were skipped.
        skipped: usize,
    },
    /// A well-formed message with an unrecognized `type`.
    Unknown {
        /// The unrecognized type tag.
        message_type: String,
    },
}

impl Inbound {
    fn command(command: Command, skipped: usize) -> Self {
        if skipped > 0 {
            debug!(command = %command.kind(), skipped, "skipped malformed entries");
        }
        Self::Command { command, skipped }
    }
}

/// Decodes a single host message.
pub fn decode(message: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(message)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let message_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    match message_type {
        "init" => decode_init(object),
        "start" => Ok(Inbound::command(Command::Start, 0)),
        "stop" => Ok(Inbound::command(Command::Stop, 0)),
        "setCells" => decode_set_cells(object),
        "updateSpeed" => {
            let tick_interval_ms = tick_interval(object, CommandKind::UpdateSpeed)?;
            Ok(Inbound::command(Command::UpdateSpeed { tick_interval_ms }, 0))
        }
        other => Ok(Inbound::Unknown {
            message_type: other.to_owned(),
        }),
    }
}

fn decode_init(object: &Object) -> Result<Inbound, DecodeError> {
    let malformed = |field| DecodeError::Malformed {
        command: CommandKind::Init,
        field,
    };

    let config = object
        .get("config")
        .and_then(Value::as_object)
        .ok_or(malformed("config"))?;
    let grid_width = u32_field(config, "gridSizeX").ok_or(malformed("gridSizeX"))?;
    let grid_height = u32_field(config, "gridSizeY").ok_or(malformed("gridSizeY"))?;
    let tick_interval_ms = tick_interval(config, CommandKind::Init)?;

    let (live_cells, skipped) = if let Some(cells) = object.get("initialLiveCells") {
        let entries = cells.as_array().ok_or(malformed("initialLiveCells"))?;
        sparse_cells(entries)
    } else if let Some(grid) = object.get("initialGameState") {
        let rows = grid.as_array().ok_or(malformed("initialGameState"))?;
        dense_cells(rows)
    } else {
        return Err(malformed("initialLiveCells"));
    };

    let command = Command::Init {
        config: EngineConfig {
            grid_width,
            grid_height,
            tick_interval_ms,
        },
        live_cells,
    };
    Ok(Inbound::command(command, skipped))
}

fn decode_set_cells(object: &Object) -> Result<Inbound, DecodeError> {
    let entries = object
        .get("cells")
        .and_then(Value::as_array)
        .ok_or(DecodeError::Malformed {
            command: CommandKind::SetCells,
            field: "cells",
        })?;

    let mut cells = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        let request = entry.as_object().and_then(|fields| {
            let cell = coord(fields)?;
            let alive = fields.get("alive")?.as_bool()?;
            Some(CellRequest::new(cell, alive))
        });
        match request {
            Some(request) => cells.push(request),
            None => skipped += 1,
        }
    }

    Ok(Inbound::command(Command::SetCells { cells }, skipped))
}

fn sparse_cells(entries: &[Value]) -> (Vec<CellCoord>, usize) {
    let mut cells = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        match entry.as_object().and_then(coord) {
            Some(cell) => cells.push(cell),
            None => skipped += 1,
        }
    }
    (cells, skipped)
}

/// Converts a row-major boolean grid (`grid[y][x]`) into live coordinates.
fn dense_cells(rows: &[Value]) -> (Vec<CellCoord>, usize) {
    let mut cells = Vec::new();
    let mut skipped = 0;
    for (y, row) in rows.iter().enumerate() {
        let (Some(columns), Ok(y)) = (row.as_array(), u32::try_from(y)) else {
            skipped += 1;
            continue;
        };
        for (x, value) in columns.iter().enumerate() {
            match (value.as_bool(), u32::try_from(x)) {
                (Some(true), Ok(x)) => cells.push(CellCoord::new(x, y)),
                (Some(false), _) => {}
                _ => skipped += 1,
            }
        }
    }
    (cells, skipped)
}

fn coord(fields: &Object) -> Option<CellCoord> {
    Some(CellCoord::new(u32_field(fields, "x")?, u32_field(fields, "y")?))
}

fn u32_field(fields: &Object, name: &str) -> Option<u32> {
    fields
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
}

/// Reads `tickIntervalMs`, accepting the legacy `gameSpeed` name.
fn tick_interval(fields: &Object, command: CommandKind) -> Result<u64, DecodeError> {
    fields
        .get("tickIntervalMs")
        .or_else(|| fields.get("gameSpeed"))
        .and_then(Value::as_u64)
        .ok_or(DecodeError::Malformed {
            command,
            field: "tickIntervalMs",
        })
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Outbound<'a> {
    StateChanges {
        #[serde(skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
        changes: Vec<WireChange>,
    },
    Error {
        message: &'a str,
    },
    Init {
        config: WireConfig,
        #[serde(rename = "initialLiveCells")]
        initial_live_cells: Vec<WireCell>,
    },
    Start,
    Stop,
    SetCells {
        cells: Vec<WireChange>,
    },
    UpdateSpeed {
        #[serde(rename = "tickIntervalMs")]
        tick_interval_ms: u64,
    },
}

#[derive(Serialize)]
struct WireCell {
    x: u32,
    y: u32,
}

#[derive(Serialize)]
struct WireChange {
    x: u32,
    y: u32,
    alive: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireConfig {
    grid_size_x: u32,
    grid_size_y: u32,
    tick_interval_ms: u64,
}

/// Encodes an engine notification as a single-line JSON message.
pub fn encode(notification: &Notification) -> Result<String, serde_json::Error> {
    let outbound = match notification {
        Notification::StateChanges {
            generation,
            changes,
        } => Outbound::StateChanges {
            generation: *generation,
            changes: changes
                .iter()
                .map(|change| WireChange {
                    x: change.cell().x(),
                    y: change.cell().y(),
                    alive: change.alive(),
                })
                .collect(),
        },
        Notification::Error { message } => Outbound::Error { message },
    };
    serde_json::to_string(&outbound)
}

/// Encodes a host command as a single-line JSON message.
pub fn encode_command(command: &Command) -> Result<String, serde_json::Error> {
    let outbound = match command {
        Command::Init { config, live_cells } => Outbound::Init {
            config: WireConfig {
                grid_size_x: config.grid_width,
                grid_size_y: config.grid_height,
                tick_interval_ms: config.tick_interval_ms,
            },
            initial_live_cells: live_cells
                .iter()
                .map(|cell| WireCell {
                    x: cell.x(),
                    y: cell.y(),
                })
                .collect(),
        },
        Command::Start => Outbound::Start,
        Command::Stop => Outbound::Stop,
        Command::SetCells { cells } => Outbound::SetCells {
            cells: cells
                .iter()
                .map(|request| WireChange {
                    x: request.cell().x(),
                    y: request.cell().y(),
                    alive: request.alive(),
                })
                .collect(),
        },
        Command::UpdateSpeed { tick_interval_ms } => Outbound::UpdateSpeed {
            tick_interval_ms: *tick_interval_ms,
        },
    };
    serde_json::to_string(&outbound)
}

/// Encodes a list of cells as a JSON array of `{x, y}` objects.
pub fn encode_cells(cells: &[CellCoord]) -> Result<String, serde_json::Error> {
    let wire: Vec<WireCell> = cells
        .iter()
        .map(|cell| WireCell {
            x: cell.x(),
            y: cell.y(),
        })
        .collect();
    serde_json::to_string(&wire)
}
