//! Terminal operations that hand rendered statements to the driver.
//!
//! Read paths ([`QueryBuilder::fetch_all`], [`QueryBuilder::count`]) leave the
//! accumulated state in place. Execute paths
//! ([`QueryBuilder::execute_and_reset`], `insert`, `update`, `delete`) reset it
//! once the driver reports success; on failure the state is kept (as it was
//! before the call) so the caller can inspect or retry it.

use super::query::{BuiltStatement, QueryBuilder, StatementState};
use crate::driver::{Driver, PreparedStatement};
use crate::error::{OrmError, OrmResult};
use crate::hook::QueryContext;
use crate::record::Record;
use crate::value::Value;

/// Result of [`QueryBuilder::execute_and_reset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// Rows affected (or returned, for queries).
    pub rows_affected: u64,
    /// Rows returned by the statement, if any.
    pub rows: Vec<Record>,
}

impl<D: Driver> QueryBuilder<D> {
    fn notify_hooks(&self, built: &BuiltStatement) {
        if self.hooks.is_empty() {
            return;
        }
        let ctx = QueryContext {
            sql: built.sql.clone(),
            param_count: built.params.len(),
            query_type: built.query_type,
            table: self.table.clone(),
        };
        for hook in &self.hooks {
            hook.before_query(&ctx);
        }
    }

    async fn run(&self, built: &BuiltStatement) -> OrmResult<Execution> {
        self.notify_hooks(built);
        let mut stmt = self.driver.prepare(&built.sql).await?;
        let rows_affected = stmt.execute(&built.params).await?;
        let rows = stmt.fetch_all()?;
        Ok(Execution {
            rows_affected,
            rows,
        })
    }

    /// Run the SELECT and return all rows. State is left untouched.
    pub async fn fetch_all(&self) -> OrmResult<Vec<Record>> {
        let built = self.build()?;
        Ok(self.run(&built).await?.rows)
    }

    /// Run the SELECT, then reset the builder.
    pub async fn execute_and_reset(&mut self) -> OrmResult<Execution> {
        let built = self.build()?;
        let execution = self.run(&built).await?;
        self.reset();
        Ok(execution)
    }

    /// Insert one row; returns the affected row count and resets the builder.
    ///
    /// See [`build_insert`](Self::build_insert) for the parameter vector
    /// overwrite.
    pub async fn insert<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> OrmResult<u64>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let before = self.state.clone();
        let built = self.build_insert(values)?;
        self.execute_built_and_reset(&built, before).await
    }

    /// Update rows matched by the accumulated WHERE; resets the builder.
    pub async fn update<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> OrmResult<u64>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let before = self.state.clone();
        let built = self.build_update(values)?;
        self.execute_built_and_reset(&built, before).await
    }

    /// Update with extra equality conditions; resets the builder.
    pub async fn update_where<K, V, CK, CV>(
        &mut self,
        values: impl IntoIterator<Item = (K, V)>,
        conditions: impl IntoIterator<Item = (CK, CV)>,
    ) -> OrmResult<u64>
    where
        K: Into<String>,
        V: Into<Value>,
        CK: Into<String>,
        CV: Into<Value>,
    {
        let before = self.state.clone();
        let built = self.build_update_where(values, conditions)?;
        self.execute_built_and_reset(&built, before).await
    }

    /// Delete rows matched by the accumulated WHERE; resets the builder.
    pub async fn delete(&mut self) -> OrmResult<u64> {
        let built = self.build_delete()?;
        let before = self.state.clone();
        self.execute_built_and_reset(&built, before).await
    }

    // Building INSERT/UPDATE rewrites the parameter vector (and UPDATE adds
    // its conditions), so a failed run puts back the state from before the
    // build. Retrying then starts from the same place.
    async fn execute_built_and_reset(
        &mut self,
        built: &BuiltStatement,
        before: StatementState,
    ) -> OrmResult<u64> {
        match self.run(built).await {
            Ok(execution) => {
                self.reset();
                Ok(execution.rows_affected)
            }
            Err(e) => {
                self.state = before;
                Err(e)
            }
        }
    }

    /// `SELECT COUNT(*)` over the accumulated WHERE. State is left untouched.
    pub async fn count(&self) -> OrmResult<i64> {
        let built = self.build_count()?;
        self.notify_hooks(&built);

        let mut stmt = self.driver.prepare(&built.sql).await?;
        stmt.execute(&built.params).await?;
        match stmt.fetch_scalar()? {
            Some(Value::Int(n)) => Ok(n),
            Some(other) => Err(OrmError::decode(
                "count",
                format!("expected an integer, got {}", other.kind()),
            )),
            None => Err(OrmError::decode("count", "no row returned")),
        }
    }

    /// Column names of the target table, in ordinal order.
    pub async fn columns(&self) -> OrmResult<Vec<String>> {
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| OrmError::misuse("no table set; call table() first"))?;
        self.driver.columns_of(table).await
    }

    /// Start a transaction on the driver connection.
    pub async fn begin_transaction(&self) -> OrmResult<()> {
        self.driver.begin_transaction().await
    }

    /// Commit the driver's current transaction.
    pub async fn commit(&self) -> OrmResult<()> {
        self.driver.commit().await
    }

    /// Roll back the driver's current transaction.
    pub async fn rollback(&self) -> OrmResult<()> {
        self.driver.rollback().await
    }
}
