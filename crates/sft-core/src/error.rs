use thiserror::Error;

pub type SftResult<T> = Result<T, SftError>;

/// Error taxonomy for the whole client.
///
/// Any variant aborts the top-level encrypt-all or decrypt-all operation;
/// there is no partial success. Note that chunk authentication is per-chunk,
/// not per-position: an undetected reordering of chunks within a file is a
/// residual risk this taxonomy does not catch.
#[derive(Debug, Error)]
pub enum SftError {
    /// Malformed link/secret, missing file, or size over the server cap.
    #[error("input error: {0}")]
    Input(String),

    /// Network-level failure talking to the service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status from a remote step.
    #[error("{op} failed with status {status}")]
    Protocol { op: &'static str, status: u16 },

    /// AEAD authentication failure: tampering or wrong key. Always fatal
    /// for the blob being opened, never silently ignored.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Malformed structured response or serialization failure.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SftError {
    pub fn protocol(op: &'static str, status: u16) -> Self {
        SftError::Protocol { op, status }
    }
}
