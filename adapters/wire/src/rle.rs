//! Run-length encoded Life patterns.
//!
//! Supports the common subset of the format: `#` comment lines, an
//! `x = .., y = .., rule = ..` header, and a body of `b`/`o` runs separated
//! by `$` and terminated by `!`.

use sparse_life_core::{CellCoord, GridDimensions};
use thiserror::Error;
use tracing::warn;

/// Failures raised while parsing an RLE pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RleError {
    /// No `x = .., y = ..` header line was found.
    #[error("pattern has no `x = .., y = ..` header")]
    MissingHeader,
    /// The header line could not be parsed.
    #[error("malformed pattern header: {0}")]
    MalformedHeader(String),
    /// A run count is too large or not followed by a tag.
    #[error("invalid run count `{0}`")]
    InvalidRunCount(String),
    /// A live cell lies outside the box declared by the header.
    #[error("live cell ({x}, {y}) lies outside the declared {width}x{height} box")]
    OutOfBounds {
        /// Column of the offending cell.
        x: u32,
        /// Row of the offending cell.
        y: u32,
        /// Declared pattern width.
        width: u32,
        /// Declared pattern height.
        height: u32,
    },
}

/// Parsed pattern with cells relative to its top-left corner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    width: u32,
    height: u32,
    rule: Option<String>,
    cells: Vec<CellCoord>,
}

impl Pattern {
    /// Declared width of the pattern bounding box.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Declared height of the pattern bounding box.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Rule string from the header, if any.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    /// Live cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Live cells translated by the offset and wrapped onto the grid.
    #[must_use]
    pub fn placed(
        &self,
        dimensions: GridDimensions,
        offset_x: i64,
        offset_y: i64,
    ) -> Vec<CellCoord> {
        self.cells
            .iter()
            .map(|cell| {
                dimensions.wrap(
                    i64::from(cell.x()) + offset_x,
                    i64::from(cell.y()) + offset_y,
                )
            })
            .collect()
    }
}

/// Parses an RLE document.
pub fn parse(text: &str) -> Result<Pattern, RleError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines.next().ok_or(RleError::MissingHeader)?;
    let (width, height, rule) = parse_header(header)?;

    let mut cells = Vec::new();
    let mut x: u32 = 0;
    let mut y: u32 = 0;
    let mut run = String::new();

    'body: for line in lines {
        for token in line.chars() {
            if token.is_ascii_digit() {
                run.push(token);
                continue;
            }
            if token.is_whitespace() {
                continue;
            }

            let count = take_run(&mut run)?;
            match token {
                'b' | '.' => x = x.saturating_add(count),
                '$' => {
                    y = y.saturating_add(count);
                    x = 0;
                }
                '!' => break 'body,
                'o' | 'A'..='Z' => {
                    // The run must fit the declared box before anything is allocated.
                    let end = x.checked_add(count).filter(|&end| end <= width);
                    if end.is_none() || y >= height {
                        return Err(RleError::OutOfBounds {
                            x: x.saturating_add(count).saturating_sub(1),
                            y,
                            width,
                            height,
                        });
                    }
                    for _ in 0..count {
                        cells.push(CellCoord::new(x, y));
                        x = x.saturating_add(1);
                    }
                }
                other => warn!(token = %other, "ignoring unknown pattern token"),
            }
        }
    }

    if !run.is_empty() {
        return Err(RleError::InvalidRunCount(run));
    }

    Ok(Pattern {
        width,
        height,
        rule,
        cells,
    })
}

fn take_run(run: &mut String) -> Result<u32, RleError> {
    if run.is_empty() {
        return Ok(1);
    }
    let count = run
        .parse::<u32>()
        .map_err(|_| RleError::InvalidRunCount(run.clone()))?;
    run.clear();
    Ok(count)
}

fn parse_header(line: &str) -> Result<(u32, u32, Option<String>), RleError> {
    let mut width = None;
    let mut height = None;
    let mut rule = None;

    for field in line.split(',') {
        let Some((key, value)) = field.split_once('=') else {
            return Err(RleError::MalformedHeader(line.to_owned()));
        };
        let value = value.trim();
        match key.trim() {
            "x" => width = value.parse::<u32>().ok(),
            "y" => height = value.parse::<u32>().ok(),
            "rule" => rule = Some(value.to_owned()),
            _ => {}
        }
    }

    match (width, height) {
        (Some(width), Some(height)) => Ok((width, height, rule)),
        _ => Err(RleError::MalformedHeader(line.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, RleError};
    use sparse_life_core::CellCoord;

    #[test]
    fn run_counts_expand_across_rows() {
        let pattern = parse("x = 4, y = 3\n2o2b$$4o!").expect("valid pattern");
        let expected: Vec<_> = [(0, 0), (1, 0), (0, 2), (1, 2), (2, 2), (3, 2)]
            .into_iter()
            .map(|(x, y)| CellCoord::new(x, y))
            .collect();
        assert_eq!(pattern.cells(), expected.as_slice());
    }

    #[test]
    fn dangling_run_count_is_rejected() {
        assert_eq!(
            parse("x = 1, y = 1\no3"),
            Err(RleError::InvalidRunCount("3".to_owned()))
        );
    }

    #[test]
    fn body_without_header_is_rejected() {
        assert_eq!(parse("#C comment only\n"), Err(RleError::MissingHeader));
    }

    #[test]
    fn runs_past_the_declared_width_are_rejected() {
        assert_eq!(
            parse("x = 3, y = 1\n5000000o!"),
            Err(RleError::OutOfBounds {
                x: 4_999_999,
                y: 0,
                width: 3,
                height: 1,
            })
        );
    }

    #[test]
    fn rows_past_the_declared_height_are_rejected() {
        assert_eq!(
            parse("x = 2, y = 2\no$o$o!"),
            Err(RleError::OutOfBounds {
                x: 0,
                y: 2,
                width: 2,
                height: 2,
            })
        );
    }

    #[test]
    fn runs_filling_the_box_exactly_are_accepted() {
        let pattern = parse("x = 3, y = 2\n3o$b2o!").expect("fits the box");
        assert_eq!(pattern.cells().len(), 5);
    }
}
