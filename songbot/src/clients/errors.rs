use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong below the `Option` boundary of the clients.
#[derive(Error, Debug)]
pub enum Error {
    /// The HTTP client failed before a response arrived.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Timeout or dropped connection.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Anything but 200.
    #[error("Provider answered with unexpected status: {0}")]
    UnexpectedStatus(StatusCode),

    /// Body did not match the expected JSON shape.
    #[error("Failed to decode provider response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A well-formed answer without the expected item.
    #[error("Nothing found: {0}")]
    NotFound(String),

    /// Unreadable or malformed configuration source.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Every reply strategy was rejected.
    #[error("Failed to deliver reply: {0}")]
    Delivery(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ConfigurationError(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_configuration_errors() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "config.json: permission denied",
        ));
        assert!(matches!(err, Error::ConfigurationError(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: config.json: permission denied"
        );
    }
}
