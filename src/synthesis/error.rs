use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Rejected locally before anything was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an HTTP error status. The body is kept verbatim
    /// for diagnostics.
    #[error("request rejected with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// Success status, but a field the contract requires is missing.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The body could not be decoded at all.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl SynthesisError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Whether a poll that failed with this error may simply be tried again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Transport(_) | SynthesisError::Decode(_) => true,
            SynthesisError::RemoteRejected { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            SynthesisError::InvalidInput(_) | SynthesisError::MalformedResponse(_) => false,
        }
    }
}
