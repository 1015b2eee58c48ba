//! Link result codes

/// Failure reported by a link call
///
/// `Timeout`, `StreamsChanged` and `Quit` are normal per-tick outcomes of
/// awaiting frame data rather than faults.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link has not been initialised
    #[error("link not initialised")]
    NotInitialised,

    /// The link was initialised twice
    #[error("link already initialised")]
    AlreadyInitialised,

    /// Unknown stream or camera handle
    #[error("invalid handle")]
    InvalidHandle,

    /// No more senders can be created
    #[error("maximum number of senders reached")]
    MaxSendersReached,

    /// Stream type does not support the call
    #[error("bad stream type")]
    BadStreamType,

    /// Requested item does not exist
    #[error("not found")]
    NotFound,

    /// Schema does not match the controller's
    #[error("incorrect schema")]
    IncorrectSchema,

    /// Arguments were rejected
    #[error("invalid parameters")]
    InvalidParameters,

    /// Output buffer too small; the size grew between query and fill
    #[error("buffer too small, {required} elements required")]
    BufferTooSmall {
        /// Elements needed to hold the result
        required: usize,
    },

    /// No frame arrived within the timeout
    #[error("timed out")]
    Timeout,

    /// Stream descriptions changed and must be re-read
    #[error("streams changed")]
    StreamsChanged,

    /// Link and host protocol versions differ
    #[error("incompatible link version")]
    IncompatibleVersion,

    /// The controller asked this process to quit
    #[error("quit requested")]
    Quit,

    /// Any other failure
    #[error("link call failed: {0}")]
    Unspecified(String),
}
