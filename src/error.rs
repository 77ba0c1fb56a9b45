//! Error types for the scout application.

use scout_search::SearchError;

/// Top-level error type for the scout application.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// Configuration file could not be parsed, serialized, or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Name corpus could not be loaded.
    #[error("corpus error: {0}")]
    Corpus(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scheduling or collaborator error.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Accepted records could not be written.
    #[error("export error: {0}")]
    Export(String),

    /// The session check failed before the run started.
    #[error("session error: {0}")]
    Auth(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_errors_pass_through() {
        let err = ScoutError::from(SearchError::RateLimited("429".into()));
        assert_eq!(err.to_string(), "rate limited: 429");
    }

    #[test]
    fn io_errors_convert() {
        let err = ScoutError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, ScoutError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
