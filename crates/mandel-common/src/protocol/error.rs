use thiserror::Error;

#[derive(Error, Debug)]
pub enum MandelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Neither the cache nor the backend is reachable")]
    AllDependenciesOffline,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image encoding error: {0}")]
    Encoding(String),

    #[error("Render incomplete: {received} of {expected} blocks reported")]
    IncompleteRender { received: usize, expected: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MandelError {
    /// Whether the error means the remote side could not be reached at all,
    /// as opposed to it answering with a failure.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            MandelError::Transport(_)
                | MandelError::Timeout(_)
                | MandelError::BackendUnavailable(_)
                | MandelError::CacheUnavailable(_)
                | MandelError::Io(_)
        )
    }
}

impl From<std::net::AddrParseError> for MandelError {
    fn from(err: std::net::AddrParseError) -> Self {
        MandelError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MandelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MandelError::Timeout(250).to_string(), "Request timeout after 250ms");
        assert_eq!(
            MandelError::IncompleteRender { received: 3, expected: 4 }.to_string(),
            "Render incomplete: 3 of 4 blocks reported"
        );
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(MandelError::Timeout(10).is_connectivity());
        assert!(MandelError::Transport("refused".into()).is_connectivity());
        assert!(MandelError::CacheUnavailable("down".into()).is_connectivity());
        assert!(!MandelError::InvalidRequest("bad".into()).is_connectivity());
        assert!(!MandelError::Remote("boom".into()).is_connectivity());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: MandelError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, MandelError::JsonSerialization(_)));
    }
}
