/// Error types for tool retrieval operations
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Intent analysis failed: {source}")]
    IntentAnalysisFailed { source: anyhow::Error },

    #[error("Registry lookup failed: {source}")]
    RegistryFailed { source: anyhow::Error },

    #[error("Embedding failed: {source}")]
    EmbeddingFailed { source: anyhow::Error },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
