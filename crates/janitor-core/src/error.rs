use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or rejected credential. Raised before any side effect.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The remote store listing or delete call failed.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status used when the error is surfaced through an inbound trigger.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unauthenticated(_) => 401,
            Error::InvalidInput(_) => 400,
            Error::UpstreamUnavailable(_) => 502,
            Error::Persistence(_) | Error::Config(_) | Error::Io(_) => 500,
        }
    }

    /// The message without the variant prefix, used in per-file outcome reports.
    pub fn detail(&self) -> String {
        match self {
            Error::Unauthenticated(msg)
            | Error::UpstreamUnavailable(msg)
            | Error::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
