use thiserror::Error;

/// Outcome of a decode call that did not fail.
///
/// `Incomplete` is not an error: the input ended before the unit was
/// finished, and the caller should retry once at least the given number of
/// additional bytes is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Progress {
    /// The unit was decoded; holds the number of input bytes consumed.
    Complete(usize),
    /// More input is required; holds a lower bound on the missing bytes.
    Incomplete(usize),
}

impl Progress {
    #[inline]
    pub fn is_complete(self) -> bool {
        matches!(self, Progress::Complete(_))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena capacity exceeded: {requested} bytes requested, capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
}

/// Reasons a record could not be decoded.
///
/// Every variant aborts the current record. Fields written before the error
/// stay set, but the record must be discarded by the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },
    #[error("invalid unicode escape sequence at offset {offset}")]
    InvalidUnicodeEscape { offset: usize },
    #[error("invalid number at offset {offset}")]
    InvalidNumber { offset: usize },
    #[error("number out of range at offset {offset}")]
    NumberOverflow { offset: usize },
    #[error("unknown sex value at offset {offset}")]
    InvalidSex { offset: usize },
    #[error("unknown status value at offset {offset}")]
    InvalidStatus { offset: usize },
    #[error("like entry without both `id` and `ts` at offset {offset}")]
    IncompleteLike { offset: usize },
    #[error("nesting deeper than {limit} at offset {offset}")]
    DepthExceeded { limit: usize, offset: usize },
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl RecordError {
    /// `true` for errors where the token was well formed but its value is
    /// outside the accepted set.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            RecordError::InvalidSex { .. }
                | RecordError::InvalidStatus { .. }
                | RecordError::NumberOverflow { .. }
                | RecordError::IncompleteLike { .. }
        )
    }
}

/// Reasons a request head could not be decoded.
///
/// An unclassifiable request line is not an error; it decodes to
/// [`RequestKind::Invalid`](crate::RequestKind::Invalid).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("malformed content-length at offset {offset}")]
    InvalidContentLength { offset: usize },
    #[error(transparent)]
    Arena(#[from] ArenaError),
}
