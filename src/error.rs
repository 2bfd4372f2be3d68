use std::time::Duration;
use thiserror::Error;

/// The distinguished failures a compiled sender may deliver to a caller's
/// callback.
///
/// `Unavailable` (below) is deliberately not a variant here: a strategy
/// that fails to compile never gets to invoke a callback at all, so it is
/// returned as its own sentinel type rather than threaded through this
/// enum.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No sender was selectable for this request at dispatch time (as
    /// opposed to compile time, where the same condition yields
    /// `Unavailable`). Raised by `sharding` when a request hashes to a
    /// hole left by a child that failed to compile.
    #[error("no sender available for this request")]
    NoSenderAvailable,

    /// `firstValidResult` exhausted every compiled child without
    /// producing a value the validator accepted, and the strategy was
    /// built `.with_no_valid_result_error(..)`.
    #[error("no valid result among {attempted} candidate(s)")]
    NoValidResult { attempted: usize },

    /// The underlying transport did not complete the request inside the
    /// requested timeout.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// The underlying connection closed before completing the request.
    #[error("connection closed")]
    ConnectionClosed,

    /// An opaque error surfaced by a host-provided `Sender`, propagated
    /// verbatim.
    #[error(transparent)]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Compile-time sentinel: no viable `Sender` could be produced from the
/// current pool snapshot.
///
/// Deliberately not a `DispatchError` variant: compilation never invokes
/// a callback, so this can never be mistaken for a runtime failure the
/// caller must handle via the callback contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "no senders available for this strategy")
    }
}

impl std::error::Error for Unavailable {}
