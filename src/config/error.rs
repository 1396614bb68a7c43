use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("converter program cannot be empty")]
    EmptyProgram,
    #[error("invalid measurement pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("measurement pattern '{0}' must not contain a path separator")]
    PatternSeparator(String),
    #[error("product identifier '{0}' must be a bare name without '/' or a .SAFE suffix")]
    Product(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}
