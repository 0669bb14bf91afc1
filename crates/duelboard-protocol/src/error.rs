//! Error types for the protocol layer.
//!
//! Each crate in Duelboard defines its own error enum. A `ProtocolError`
//! always means the bytes or the payload shape were wrong, never that a
//! room or connection was in the wrong state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame itself could not be decoded: not JSON, or not an
    /// object with an `event` name.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame named an event the server does not handle.
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// The frame was well formed but its `data` did not match the
    /// named event, e.g. a `move` without a `row`.
    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        /// Name of the event whose payload was rejected.
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Returns the event name this error is about, if it got that far.
    pub fn event(&self) -> Option<&str> {
        match self {
            Self::InvalidPayload { event, .. } => Some(event),
            Self::UnknownEvent(event) => Some(event),
            Self::Encode(_) | Self::Decode(_) => None,
        }
    }
}
