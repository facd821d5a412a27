use std::io;

/// Acquisition failures raised by the probe collaborators.
///
/// Checks catch these themselves and downgrade to an `Unknown` outcome;
/// anything that escapes a check is a bug and aborts the battery run.
#[derive(thiserror::Error, Debug)]
pub enum PotcheckError {
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("http error: {0}")]
    Http(String),
    #[error("probe failed: {0}")]
    Probe(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for PotcheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PotcheckError::Timeout
        } else if err.is_connect() {
            PotcheckError::Network(err.to_string())
        } else {
            PotcheckError::Http(err.to_string())
        }
    }
}
