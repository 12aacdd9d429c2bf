//! Error types for plate compilation.

use thiserror::Error;

/// Errors raised while constructing plate inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// A plate must be printed at least once.
    #[error("plate '{0}' has quantity 0")]
    ZeroQuantity(String),

    /// Estimated time is negative or not a number.
    #[error("plate '{plate}' has invalid estimated time: {seconds}")]
    InvalidTime {
        /// Plate name.
        plate: String,
        /// Offending value.
        seconds: f64,
    },

    /// Swap system name not recognized.
    #[error("unknown swap system '{0}' (expected none, swapmod, abpc or custom)")]
    UnknownSwapSystem(String),
}

/// Result type for plate operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
