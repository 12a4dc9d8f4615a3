//! Error types for pgfluent

use thiserror::Error;

/// Result type alias for pgfluent operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// The accumulated builder state cannot be rendered into valid SQL
    /// (unbalanced groups, empty `IN` list, negative limit, ...).
    #[error("Builder misuse: {0}")]
    BuilderMisuse(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver refused to prepare the statement
    #[error("Prepare error for `{sql}`: {source}")]
    Prepare {
        sql: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Statement execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// BEGIN / COMMIT / ROLLBACK failed
    #[error("Transaction error: {message}")]
    Transaction {
        message: String,
        #[source]
        source: Option<tokio_postgres::Error>,
    },

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a builder misuse error
    pub fn misuse(message: impl Into<String>) -> Self {
        Self::BuilderMisuse(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a transaction error, keeping the driver error as the source
    pub fn transaction(message: impl Into<String>, source: Option<tokio_postgres::Error>) -> Self {
        Self::Transaction {
            message: message.into(),
            source,
        }
    }

    /// Check if this is a builder misuse error
    pub fn is_builder_misuse(&self) -> bool {
        matches!(self, Self::BuilderMisuse(_))
    }

    /// The underlying driver error, if any.
    pub fn driver_error(&self) -> Option<&tokio_postgres::Error> {
        match self {
            Self::Prepare { source, .. } => Some(source),
            Self::Query(err) => Some(err),
            Self::Transaction { source, .. } => source.as_ref(),
            _ => None,
        }
    }

    /// SQLSTATE code reported by the server, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        self.driver_error()
            .and_then(|err| err.as_db_error())
            .map(|db_err| db_err.code().code())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate() == Some("23503")
    }

    /// Check if this is a check constraint violation error
    pub fn is_check_violation(&self) -> bool {
        self.sqlstate() == Some("23514")
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
