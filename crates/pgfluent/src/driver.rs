//! Database driver collaborator.
//!
//! The builder only renders SQL text and a parameter vector; everything that
//! touches a connection goes through [`Driver`]. Implementations exist for
//! `tokio_postgres::Client`, pooled `deadpool_postgres::Client` (feature
//! `pool`) and any `&D` where `D: Driver`.

use crate::error::OrmResult;
use crate::record::Record;
use crate::value::Value;
use std::future::Future;

/// A statement prepared on a driver connection.
///
/// `execute` runs the statement and buffers its result; `fetch_all` and
/// `fetch_scalar` read from that buffer.
pub trait PreparedStatement: Send {
    /// Bind `params` positionally and run the statement.
    ///
    /// Returns the number of affected rows (or returned rows for queries).
    fn execute(&mut self, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Take all rows produced by the last `execute`.
    fn fetch_all(&mut self) -> OrmResult<Vec<Record>>;

    /// First column of the first row produced by the last `execute`.
    fn fetch_scalar(&mut self) -> OrmResult<Option<Value>> {
        Ok(self
            .fetch_all()?
            .into_iter()
            .next()
            .and_then(Record::into_first))
    }
}

/// Minimal capability interface the builder needs from a connection.
pub trait Driver: Send + Sync {
    /// Prepared statement type, borrowing the connection.
    type Statement<'a>: PreparedStatement + 'a
    where
        Self: 'a;

    /// Prepare SQL rendered with `?` placeholders.
    fn prepare<'a>(
        &'a self,
        sql: &str,
    ) -> impl Future<Output = OrmResult<Self::Statement<'a>>> + Send;

    /// Start a transaction on this connection.
    fn begin_transaction(&self) -> impl Future<Output = OrmResult<()>> + Send;

    /// Commit the current transaction.
    fn commit(&self) -> impl Future<Output = OrmResult<()>> + Send;

    /// Roll back the current transaction.
    fn rollback(&self) -> impl Future<Output = OrmResult<()>> + Send;

    /// Column names of `table`, in ordinal order.
    fn columns_of(&self, table: &str) -> impl Future<Output = OrmResult<Vec<String>>> + Send;
}

// Lets a builder borrow a connection instead of owning it.
impl<D: Driver> Driver for &D {
    type Statement<'a>
        = D::Statement<'a>
    where
        Self: 'a;

    fn prepare<'a>(
        &'a self,
        sql: &str,
    ) -> impl Future<Output = OrmResult<Self::Statement<'a>>> + Send {
        (**self).prepare(sql)
    }

    fn begin_transaction(&self) -> impl Future<Output = OrmResult<()>> + Send {
        (**self).begin_transaction()
    }

    fn commit(&self) -> impl Future<Output = OrmResult<()>> + Send {
        (**self).commit()
    }

    fn rollback(&self) -> impl Future<Output = OrmResult<()>> + Send {
        (**self).rollback()
    }

    fn columns_of(&self, table: &str) -> impl Future<Output = OrmResult<Vec<String>>> + Send {
        (**self).columns_of(table)
    }
}
