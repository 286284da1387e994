use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Flagged recipients are not errors; they are reported through
/// `ResponseOutcome::InvalidRecipients`.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported: {0}")]
    Domain(String),

    #[error("Malformed notification: {0}")]
    MalformedNotification(String),

    #[error("Dispatch error with code {code}: {message}")]
    Dispatch { code: u16, message: String },

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

/// Coarse classification used for log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidArgument,
    Domain,
    Malformed,
    Dispatch,
    Runtime,
    Client,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Domain => "domain",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Dispatch => "dispatch",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Client => "client",
        }
    }
}

impl PushError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PushError::Config(_) | PushError::Configuration(_) => ErrorKind::Configuration,
            PushError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PushError::Domain(_) => ErrorKind::Domain,
            PushError::MalformedNotification(_) => ErrorKind::Malformed,
            PushError::Dispatch { .. } => ErrorKind::Dispatch,
            PushError::Runtime(_) | PushError::Serialization(_) => ErrorKind::Runtime,
            PushError::Client(_) | PushError::Io(_) | PushError::Http(_) | PushError::Tls(_) => {
                ErrorKind::Client
            }
        }
    }

    /// Setup-time errors that are allowed to reach the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::InvalidArgument | ErrorKind::Domain
        )
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        PushError::InvalidArgument(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        PushError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PushError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PushError::invalid_argument("bad token").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            PushError::Dispatch {
                code: 401,
                message: "unauthorized".into()
            }
            .kind(),
            ErrorKind::Dispatch
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(PushError::from(io).kind(), ErrorKind::Client);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PushError::configuration("missing url").is_fatal());
        assert!(PushError::Domain("no handler".into()).is_fatal());
        assert!(!PushError::MalformedNotification("too long".into()).is_fatal());
        assert!(!PushError::Client("reset".into()).is_fatal());
    }

    #[test]
    fn test_dispatch_display() {
        let err = PushError::Dispatch {
            code: 406,
            message: "Quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "Dispatch error with code 406: Quota exceeded");
    }
}
