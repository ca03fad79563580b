use thiserror::Error;

/// Failure reported by a [`PeerConnection`](crate::PeerConnection) or
/// [`DataChannel`](crate::DataChannel) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("operation rejected: {0}")]
    Rejected(String),
    #[error("connection closed")]
    Closed,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiatorError {
    #[error("no peer connection")]
    NoConnection,
    #[error("negotiator destroyed")]
    Destroyed,
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("invalid signal: {0}")]
    InvalidSignal(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("data channel error: {0}")]
    Channel(String),
    #[error("setup error: {0}")]
    Setup(String),
}

impl From<serde_json::Error> for NegotiatorError {
    fn from(err: serde_json::Error) -> Self {
        NegotiatorError::Decode(err.to_string())
    }
}

pub type Result<T, E = NegotiatorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_convert_transparently() {
        let err: NegotiatorError = ConnectionError::Rejected("bad sdp".into()).into();
        assert_eq!(err.to_string(), "operation rejected: bad sdp");
    }

    #[test]
    fn serde_errors_become_decode_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(NegotiatorError::from(err), NegotiatorError::Decode(_)));
    }
}
