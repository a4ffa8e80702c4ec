use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Validation errors surfaced by the conversion pipeline. All are fatal to
/// the current conversion; none produce partial output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Pitch outside 0-127, or a note name that does not parse.
    #[error("invalid pitch: {0}")]
    InvalidPitch(String),

    /// Unrecognized overlap policy token.
    #[error("unknown overlap policy: {0:?} (expected first, highest, lowest or loudest)")]
    InvalidPolicy(String),

    /// Unrecognized resample mode token.
    #[error("unknown resample mode: {0:?} (expected onset or sustain)")]
    InvalidMode(String),

    /// Instrument selection outside the available range.
    #[error("instrument index {index} out of range ({count} instruments)")]
    InvalidInstrumentIndex { index: usize, count: usize },

    /// Unrecognized musical grid token, or a malformed grid selection.
    #[error("invalid grid spec: {0}")]
    InvalidGridSpec(String),
}
