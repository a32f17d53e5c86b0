use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use sparse_life_core::{CellCoord, EngineConfig};
use sparse_life_wire::rle;
use tracing::{debug, info};

/// Settings read from a TOML configuration file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    engine: EngineConfig,
    pattern: Option<PathBuf>,
}

impl ConfigFile {
    fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        // Patterns are named relative to the file that mentions them.
        if let (Some(pattern), Some(base)) = (config.pattern.as_mut(), path.parent()) {
            if pattern.is_relative() {
                *pattern = base.join(&*pattern);
            }
        }
        debug!(path = %path.display(), ?config, "loaded config file");
        Ok(config)
    }
}

/// Grid and pattern options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub(crate) struct EngineArgs {
    /// TOML file supplying defaults for the options below.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Number of grid columns.
    #[arg(long)]
    width: Option<u32>,
    /// Number of grid rows.
    #[arg(long)]
    height: Option<u32>,
    /// Milliseconds between generation steps.
    #[arg(long = "tick-ms")]
    tick_ms: Option<u64>,
    /// RLE pattern loaded as generation zero.
    #[arg(long, value_name = "FILE")]
    pattern: Option<PathBuf>,
    /// Column of the pattern's top-left corner; centred when omitted.
    #[arg(long, allow_negative_numbers = true)]
    offset_x: Option<i64>,
    /// Row of the pattern's top-left corner; centred when omitted.
    #[arg(long, allow_negative_numbers = true)]
    offset_y: Option<i64>,
}

/// Fully resolved startup settings.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) engine: EngineConfig,
    pub(crate) live_cells: Option<Vec<CellCoord>>,
}

impl EngineArgs {
    /// Merges the config file, if any, with command-line overrides.
    pub(crate) fn resolve(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        self.merge(file)
    }

    fn merge(&self, file: ConfigFile) -> Result<Settings> {
        let mut engine = file.engine;
        if let Some(width) = self.width {
            engine.grid_width = width;
        }
        if let Some(height) = self.height {
            engine.grid_height = height;
        }
        if let Some(tick_ms) = self.tick_ms {
            engine.tick_interval_ms = tick_ms;
        }

        let live_cells = match self.pattern.as_ref().or(file.pattern.as_ref()) {
            Some(path) => Some(self.place_pattern(path, &engine)?),
            None => None,
        };

        Ok(Settings { engine, live_cells })
    }

    /// Loads an RLE pattern and wraps it onto the configured grid.
    pub(crate) fn place_pattern(
        &self,
        path: &Path,
        engine: &EngineConfig,
    ) -> Result<Vec<CellCoord>> {
        let Some(dimensions) = engine.dimensions() else {
            bail!(
                "grid dimensions {}x{} must be positive",
                engine.grid_width,
                engine.grid_height
            );
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read pattern {}", path.display()))?;
        let pattern = rle::parse(&text)
            .with_context(|| format!("failed to parse pattern {}", path.display()))?;

        let centre = |grid: u32, size: u32| (i64::from(grid) - i64::from(size)) / 2;
        let offset_x = self
            .offset_x
            .unwrap_or_else(|| centre(dimensions.width(), pattern.width()));
        let offset_y = self
            .offset_y
            .unwrap_or_else(|| centre(dimensions.height(), pattern.height()));

        let cells = pattern.placed(dimensions, offset_x, offset_y);
        info!(
            path = %path.display(),
            cells = cells.len(),
            offset_x,
            offset_y,
            "pattern placed"
        );
        Ok(cells)
    }
}
