use std::path::PathBuf;

use tokio_tungstenite::tungstenite;

/// Errors raised while establishing or holding the feed subscription.
///
/// Every variant except the startup ones (`LogFile`, `Config`) is retryable:
/// the watcher reports it and reconnects after the retry delay.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("feed closed by remote")]
    Closed,

    #[error("failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure from a [`crate::Feed`] that is not a websocket.
    /// `?` on an `io::Error` inside `Feed::connect` lands here, and refused
    /// or reset connections still count as unreachable.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl WatchError {
    /// True when the failure happened before any frame was exchanged, i.e.
    /// the host refused or dropped the TCP connection.
    pub fn is_unreachable(&self) -> bool {
        let io_err = match self {
            Self::Io(e) => e,
            Self::WebSocket(tungstenite::Error::Io(e)) => e,
            _ => return false,
        };
        matches!(
            io_err.kind(),
            std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotFound
        )
    }
}

/// A feed message that could not be turned into a [`crate::RequestEvent`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_connection_is_unreachable() {
        let err = WatchError::WebSocket(tungstenite::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        assert!(err.is_unreachable());
    }

    #[test]
    fn test_remote_close_is_not_unreachable() {
        assert!(!WatchError::Closed.is_unreachable());
        assert!(
            !WatchError::Io(std::io::Error::other("boom")).is_unreachable(),
            "generic io errors are not classified as unreachable"
        );
    }

    #[test]
    fn test_io_error_converts_for_custom_feeds() {
        fn dial() -> Result<(), WatchError> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            ))?;
            Ok(())
        }

        let err = dial().unwrap_err();
        assert!(matches!(err, WatchError::Io(_)));
        assert!(err.is_unreachable());
        assert_eq!(err.to_string(), "reset by peer");
    }

    #[test]
    fn test_log_file_message_names_path() {
        let err = WatchError::LogFile {
            path: PathBuf::from("/nope/rcw.log"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nope/rcw.log"));
    }
}
