//! Unified error type for the Duelboard server.

use duelboard_protocol::ProtocolError;
use duelboard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuelboardError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A configuration value could not be parsed.
    #[error("invalid value for {key}: '{value}'")]
    Config { key: &'static str, value: String },

    /// Reading socket information failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let duel_err: DuelboardError = err.into();
        assert!(matches!(duel_err, DuelboardError::Transport(_)));
        assert!(duel_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownEvent("chat".into());
        let duel_err: DuelboardError = err.into();
        assert!(matches!(duel_err, DuelboardError::Protocol(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = DuelboardError::Config {
            key: "DUELBOARD_BOARD_SIZE",
            value: "big".into(),
        };
        assert_eq!(err.to_string(), "invalid value for DUELBOARD_BOARD_SIZE: 'big'");
    }
}
