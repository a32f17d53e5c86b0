use thiserror::Error;

/// Failures reported by the grid engine.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The requested grid has a zero-length side.
    #[error("grid dimensions {width}x{height} must be positive")]
    InvalidDimensions {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// The operation requires grid dimensions that were never set.
    #[error("grid engine used before initialization")]
    NotInitialized,
}
