use thiserror::Error;

/// The four error categories the core distinguishes (§7). Parse failures and resolution
/// ambiguity never reach this type — they are recorded as data (`parse_success`,
/// `resolution_type = "unresolved"`) rather than raised, by design.
#[derive(Error, Debug)]
pub enum CodeGraphError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("entity not found: {0}")]
    NotFound(String),

    /// An injected port (AST provider, git provider, remote graph store) failed.
    /// The core never retries; retry policy belongs to the adapter.
    #[error("external provider '{provider}' failed: {cause}")]
    ExternalProviderError { provider: String, cause: String },

    /// Required configuration was absent or violated a contract (e.g. weights that do
    /// not sum to 1.0) at construction time.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// An entry point's deadline elapsed before it completed. Partial results are
    /// discarded by the caller; no side effects on external stores have occurred.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CodeGraphError>;
