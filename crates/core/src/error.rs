//! Error types for idsets.

use alloc::string::String;
use core::fmt;

/// Result type alias for idsets operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for collection operations.
///
/// Everything else a collection does is a soft no-op: deleting an absent id,
/// re-adding an identical reference or addressing an unknown key never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `resume()` was called with no outstanding `pause()`.
    UnmatchedResume {
        /// Name of the collection, if it was configured with one.
        collection: Option<String>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnmatchedResume { collection: Some(name) } => {
                write!(f, "resume() called with no pause() pending on collection {}", name)
            }
            Error::UnmatchedResume { collection: None } => {
                write!(f, "resume() called with no pause() pending")
            }
        }
    }
}

impl Error {
    /// Creates an unmatched resume error.
    pub fn unmatched_resume(collection: Option<&str>) -> Self {
        Error::UnmatchedResume {
            collection: collection.map(String::from),
        }
    }
}
