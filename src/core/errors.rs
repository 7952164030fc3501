use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("llm error: {0}")]
    Llm(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        RagError::Validation(msg.into())
    }

    /// Classifies a `sqlx` failure: unreachable store vs. rejected statement.
    pub fn database(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => RagError::Connection(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                RagError::Validation(format!("dangling story reference: {}", db_err))
            }
            _ => RagError::Internal(err.to_string()),
        }
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::NotFound(_) => "not_found",
            RagError::Connection(_) => "connection",
            RagError::Validation(_) => "validation",
            RagError::Embedding(_) => "embedding",
            RagError::Llm(_) => "llm",
            RagError::Config(_) => "config",
            RagError::Internal(_) => "internal",
        }
    }
}
