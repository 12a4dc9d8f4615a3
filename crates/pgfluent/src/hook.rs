//! Hooks that observe SQL before it reaches the driver.
//!
//! A hook receives the rendered statement (with `?` placeholders) and some
//! context about it. The default is to do nothing; attach your own sink with
//! [`QueryBuilder::with_hook`](crate::QueryBuilder::with_hook), or enable the
//! `tracing` feature and use [`TracingSqlHook`].
//!
//! ```ignore
//! let mut qb = QueryBuilder::with_table(&client, "users")
//!     .with_hook(|ctx: &QueryContext| eprintln!("{:?}: {}", ctx.query_type, ctx.sql));
//! ```

use std::fmt;

#[cfg(feature = "tracing")]
mod tracing_hook;

#[cfg(feature = "tracing")]
pub use tracing_hook::TracingSqlHook;

/// The type of SQL statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query (including `COUNT(*)`)
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Update => "UPDATE",
            QueryType::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Context information about the statement about to run.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Rendered SQL, as produced by the builder.
    pub sql: String,
    /// Number of bound parameters.
    pub param_count: usize,
    /// Statement type.
    pub query_type: QueryType,
    /// Target table, if one was set.
    pub table: Option<String>,
}

/// Observer called before every statement execution.
pub trait QueryHook: Send + Sync {
    /// Called with the rendered SQL before it is prepared.
    fn before_query(&self, ctx: &QueryContext) {
        let _ = ctx;
    }
}

/// Hook that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl QueryHook for NoopHook {}

impl<F> QueryHook for F
where
    F: Fn(&QueryContext) + Send + Sync,
{
    fn before_query(&self, ctx: &QueryContext) {
        self(ctx)
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
