//! Failure taxonomy for the synchronisation protocol.

/// Errors raised while exchanging state with the analysis service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// Network unreachable or a non-2xx status.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// The body carried nothing the client understands.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// A server history that cannot replace the local transcript.
    #[error("degenerate history merge: {0}")]
    DegenerateMerge(String),
    #[error("invalid analytics payload: {0}")]
    InvalidAnalytics(String),
}

impl SyncError {
    /// Text shown inline next to the input.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::TransportFailure(detail) => {
                format!("Could not reach the analysis service ({detail}). Please try again.")
            }
            SyncError::MalformedResponse(_) => {
                "The analysis service returned an unexpected response. Please try again."
                    .to_string()
            }
            SyncError::DegenerateMerge(_) | SyncError::InvalidAnalytics(_) => {
                "Part of the response could not be applied.".to_string()
            }
        }
    }
}
