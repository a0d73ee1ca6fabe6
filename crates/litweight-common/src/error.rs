use thiserror::Error;

#[derive(Debug, Error)]
pub enum LitweightError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed payload returned by the literature API.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Retries against the literature API were exhausted.
    #[error("{operation} unavailable after retries: {reason}")]
    Unavailable { operation: String, reason: String },

    #[error("No cached citation record for identifier {0}; collection must run before scoring")]
    MissingRecord(String),

    #[error("No cached h-index for author {0:?}; authority scoring must run before weighting")]
    MissingAuthor(String),

    #[error("Invalid subgraph: {0}")]
    InvalidSubgraph(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LitweightError {
    /// Whether a retry loop should try the call again.
    pub fn is_transient(&self) -> bool {
        match self {
            LitweightError::Http(e) => {
                if let Some(status) = e.status() {
                    status.is_server_error() || status.as_u16() == 429
                } else {
                    true
                }
            }
            LitweightError::Parse(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LitweightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_are_transient() {
        assert!(LitweightError::Parse("truncated JSON".into()).is_transient());
    }

    #[test]
    fn test_precondition_errors_are_permanent() {
        assert!(!LitweightError::MissingRecord("100".into()).is_transient());
        assert!(!LitweightError::SecurityError("blocked".into()).is_transient());
    }
}
