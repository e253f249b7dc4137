//! Server error types.

use derive_more::{Display, Error, From};

/// Errors raised while serving connections.
///
/// None of these reach the game itself: a session loop that hits one either
/// drops the message or ends that session only.
#[derive(Debug, Display, Error, From)]
pub enum ServerError {
    /// Socket failure: bind, accept, or a peer going away.
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    /// A frame that is not a valid client message.
    #[display("Malformed message: {_0}")]
    Malformed(serde_json::Error),

    /// A frame longer than the protocol allows.
    #[display("Frame exceeds {limit} bytes")]
    #[from(ignore)]
    FrameTooLarge {
        /// Maximum frame length.
        limit: usize,
    },
}

impl ServerError {
    /// True when the offending frame was dropped and the stream can keep
    /// being read.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServerError::Malformed(_) | ServerError::FrameTooLarge { .. })
    }
}
