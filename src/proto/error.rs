use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for pipedis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The two broad classes every [`Error`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The server explicitly rejected the operation.
    ///
    /// Not a bug and not a fault of the connection; the message is the
    /// server's literal reply text.
    Redis,
    /// Everything else: encode/decode bugs, I/O failures, timeouts and
    /// connection shutdown.
    System,
}

/// Errors that can occur when talking to a Redis server.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// An IO error occurred on the transport.
    #[error("IO error: {source}")]
    Io {
        /// The underlying IO error.
        source: Arc<io::Error>,
    },

    /// The reply stream violated the protocol. Always a bug-class condition.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// The server returned an error reply.
    #[error("server error: {message}")]
    Server {
        /// Error message from server.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },

    /// A connect, read or write deadline expired.
    #[error("operation timed out")]
    Timeout,

    /// The connection has been shut down; the request was not serviced.
    #[error("connection is shut down")]
    Shutdown,

    /// The future's value was already taken.
    #[error("future already consumed")]
    FutureConsumed,
}

impl Error {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Server { .. } => ErrorCategory::Redis,
            _ => ErrorCategory::System,
        }
    }

    /// Returns true if the server rejected the operation.
    pub fn is_redis_error(&self) -> bool {
        self.category() == ErrorCategory::Redis
    }

    /// Returns the error text without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Io { source } => source.to_string(),
            Error::Protocol { message }
            | Error::Server { message }
            | Error::InvalidArgument { message } => message.clone(),
            Error::Timeout => "operation timed out".to_string(),
            Error::Shutdown => "connection is shut down".to_string(),
            Error::FutureConsumed => "future already consumed".to_string(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: format!("BUG: {}", message.into()),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io {
            source: Arc::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let error = Error::from(io_err);
        assert!(error.to_string().contains("IO error"));
        assert_eq!(error.message(), "connection refused");
    }

    #[test]
    fn test_error_display_protocol() {
        let error = Error::protocol("expected size marker");
        assert_eq!(
            error.to_string(),
            "protocol error: BUG: expected size marker"
        );
    }

    #[test]
    fn test_error_display_server() {
        let error = Error::Server {
            message: "ERR wrong type".to_string(),
        };
        assert_eq!(error.to_string(), "server error: ERR wrong type");
        assert_eq!(error.message(), "ERR wrong type");
    }

    #[test]
    fn test_error_categories() {
        let server = Error::Server {
            message: "ERR".to_string(),
        };
        assert_eq!(server.category(), ErrorCategory::Redis);
        assert!(server.is_redis_error());

        for error in [
            Error::protocol("x"),
            Error::invalid_argument("x"),
            Error::Timeout,
            Error::Shutdown,
            Error::FutureConsumed,
            Error::from(io::Error::new(io::ErrorKind::Other, "x")),
        ] {
            assert_eq!(error.category(), ErrorCategory::System);
        }
    }

    #[test]
    fn test_error_chains_io_source() {
        let error = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        let source = error.source().expect("io error keeps its cause");
        assert_eq!(source.to_string(), "pipe");
        assert!(Error::Shutdown.source().is_none());
    }

    #[test]
    fn test_error_is_cloneable() {
        let error = Error::from(io::Error::new(io::ErrorKind::Other, "test"));
        let copy = error.clone();
        assert_eq!(error.to_string(), copy.to_string());
    }
}
