//! Error type shared by every routine in the crate.

use crate::recording::RecordingState;

/// Errors returned by the planner routines.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum GeoError {
    /// A center/viewport was requested for zero points.
    #[error("no points to compute a region from")]
    EmptyInput,

    /// A coordinate is NaN, infinite or outside WGS84 ranges.
    #[error("invalid coordinate at index {index}: ({latitude}, {longitude})")]
    InvalidCoordinate {
        index: u32,
        latitude: f64,
        longitude: f64,
    },

    /// The address CSV could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A recorder transition was requested from a state that does not allow it.
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: RecordingState,
    },

    /// The geocoding client could not be built.
    #[error("HTTP client error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, GeoError>;
