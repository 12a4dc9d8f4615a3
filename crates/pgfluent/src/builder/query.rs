use super::fragment::{Connector, Fragment, Op, render_where, where_params};
use crate::error::{OrmError, OrmResult};
use crate::hook::{QueryHook, QueryType};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// JOIN flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One `column op ?` entry of the HAVING clause.
#[derive(Debug, Clone, PartialEq)]
pub struct HavingClause {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

/// Everything a statement accumulates between resets.
///
/// A freshly constructed builder and a reset builder both hold
/// `StatementState::default()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementState {
    /// SELECT columns; empty renders as `*`
    pub(crate) select_cols: Vec<String>,
    /// JOIN clauses, already rendered
    pub(crate) joins: Vec<String>,
    /// WHERE fragments
    pub(crate) fragments: Vec<Fragment>,
    /// GROUP BY columns
    pub(crate) group_by: Vec<String>,
    /// HAVING conditions
    pub(crate) having: Vec<HavingClause>,
    /// ORDER BY clauses, already rendered
    pub(crate) orders: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    /// Parameter vector, in the order mutators were called
    pub(crate) params: Vec<Value>,
    /// First misuse recorded by a mutator (validated at render time)
    pub(crate) build_error: Option<String>,
}

impl StatementState {
    pub fn select_cols(&self) -> &[String] {
        &self.select_cols
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn having(&self) -> &[HavingClause] {
        &self.having
    }

    pub fn orders(&self) -> &[String] {
        &self.orders
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }
}

/// A rendered statement: SQL with `?` placeholders plus the values bound to
/// them, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub params: Vec<Value>,
    pub query_type: QueryType,
}

/// Fluent SQL statement builder.
///
/// Mutators append to the accumulated state and return `&mut Self`.
/// Rendering is read-only: [`to_sql`](Self::to_sql) and [`build`](Self::build)
/// can be called any number of times and leave the state standing, while
/// [`execute_and_reset`](Self::execute_and_reset) and the INSERT/UPDATE/DELETE
/// terminals clear it after a successful run.
///
/// A builder is meant for one in-flight statement at a time. It is not
/// synchronized; share it across tasks only behind your own lock.
///
/// ```ignore
/// let mut qb = QueryBuilder::with_table(&client, "users");
/// qb.select("id, name")
///     .and_where("status", "active")
///     .or_group()
///     .and_where("role", "admin")
///     .or_where("role", "owner")
///     .end_group()
///     .order_by_desc("created_at")
///     .limit(20);
///
/// // SELECT id, name FROM users WHERE  status = ? OR (role = ? OR role = ?) ...
/// let rows = qb.fetch_all().await?;
/// ```
pub struct QueryBuilder<D> {
    pub(crate) driver: D,
    pub(crate) table: Option<String>,
    pub(crate) state: StatementState,
    pub(crate) hooks: Vec<Arc<dyn QueryHook>>,
}

impl<D> QueryBuilder<D> {
    /// Create a builder around a driver, with no table selected.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            table: None,
            state: StatementState::default(),
            hooks: Vec::new(),
        }
    }

    /// Create a builder targeting `table`.
    pub fn with_table(driver: D, table: &str) -> Self {
        let mut qb = Self::new(driver);
        qb.table(table);
        qb
    }

    /// Attach a hook that sees every statement before it is executed.
    pub fn with_hook(mut self, hook: impl QueryHook + 'static) -> Self {
        self.add_hook(hook);
        self
    }

    /// Attach a hook in place.
    pub fn add_hook(&mut self, hook: impl QueryHook + 'static) -> &mut Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Set the target table.
    pub fn table(&mut self, table: &str) -> &mut Self {
        self.table = Some(table.to_string());
        self
    }

    /// The target table, if set.
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Accumulated statement state.
    pub fn state(&self) -> &StatementState {
        &self.state
    }

    /// WHERE fragments, in append order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.state.fragments
    }

    /// The parameter vector in the order mutators pushed onto it.
    ///
    /// [`build_insert`](Self::build_insert) and
    /// [`build_update`](Self::build_update) overwrite it with the statement's
    /// full vector.
    pub fn parameters(&self) -> &[Value] {
        &self.state.params
    }

    /// Clear everything accumulated since construction. Table, driver and
    /// hooks stay.
    pub fn reset(&mut self) -> &mut Self {
        self.state = StatementState::default();
        self
    }

    fn record_misuse(&mut self, message: String) {
        if self.state.build_error.is_none() {
            self.state.build_error = Some(message);
        }
    }

    // ==================== Projection & joins ====================

    /// Set SELECT columns from a `", "`-separated list. Replaces any previous
    /// projection. An empty string restores the default `*`.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        self.state.select_cols = if columns.is_empty() {
            Vec::new()
        } else {
            columns.split(", ").map(str::to_string).collect()
        };
        self
    }

    /// Add `<KIND> JOIN <table> ON <on>`. The condition is raw SQL.
    pub fn join(&mut self, table: &str, on: &str, kind: JoinKind) -> &mut Self {
        self.state
            .joins
            .push(format!("{} JOIN {} ON {}", kind.as_str(), table, on));
        self
    }

    /// Add INNER JOIN.
    pub fn inner_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join(table, on, JoinKind::Inner)
    }

    /// Add LEFT JOIN.
    pub fn left_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join(table, on, JoinKind::Left)
    }

    /// Add RIGHT JOIN.
    pub fn right_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join(table, on, JoinKind::Right)
    }

    // ==================== Conditions ====================

    /// Append `column op ?` joined by `connector`; the value is bound
    /// immediately.
    pub fn where_cond(
        &mut self,
        column: &str,
        op: Op,
        value: impl Into<Value>,
        connector: Connector,
    ) -> &mut Self {
        let value = value.into();
        self.state.params.push(value.clone());
        self.state.fragments.push(Fragment::Condition {
            column: column.to_string(),
            op,
            value,
            connector,
        });
        self
    }

    /// Add AND equality condition.
    pub fn and_where(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.where_cond(column, Op::Eq, value, Connector::And)
    }

    /// Add OR equality condition.
    pub fn or_where(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.where_cond(column, Op::Eq, value, Connector::Or)
    }

    /// Add AND condition with an explicit operator.
    pub fn and_where_op(&mut self, column: &str, op: Op, value: impl Into<Value>) -> &mut Self {
        self.where_cond(column, op, value, Connector::And)
    }

    /// Add OR condition with an explicit operator.
    pub fn or_where_op(&mut self, column: &str, op: Op, value: impl Into<Value>) -> &mut Self {
        self.where_cond(column, op, value, Connector::Or)
    }

    /// Append `column IN (?, ...)` with one placeholder per value.
    ///
    /// An empty value list is recorded as misuse and fails at render time;
    /// `IN ()` is not valid SQL.
    pub fn where_in<V>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
        connector: Connector,
    ) -> &mut Self
    where
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.record_misuse(format!("where_in(\"{column}\") called with no values"));
            return self;
        }

        self.state.params.extend(values.iter().cloned());
        self.state.fragments.push(Fragment::InCondition {
            column: column.to_string(),
            values,
            connector,
        });
        self
    }

    /// Add AND IN (...) condition.
    pub fn and_where_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.where_in(column, values, Connector::And)
    }

    /// Add OR IN (...) condition.
    pub fn or_where_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.where_in(column, values, Connector::Or)
    }

    // ==================== Groups ====================

    /// Open a parenthesized group joined to what precedes it by `connector`.
    pub fn begin_group(&mut self, connector: Connector) -> &mut Self {
        self.state.fragments.push(Fragment::GroupOpen { connector });
        self
    }

    /// Close the innermost open group.
    pub fn end_group(&mut self) -> &mut Self {
        self.state.fragments.push(Fragment::GroupClose);
        self
    }

    /// Open an AND group.
    pub fn and_group(&mut self) -> &mut Self {
        self.begin_group(Connector::And)
    }

    /// Open an OR group.
    pub fn or_group(&mut self) -> &mut Self {
        self.begin_group(Connector::Or)
    }

    // ==================== Grouping, ordering & pagination ====================

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.state.group_by.push(column.to_string());
        self
    }

    /// Add a HAVING condition (joined with AND); the value is bound immediately.
    pub fn having(&mut self, column: &str, op: Op, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        self.state.params.push(value.clone());
        self.state.having.push(HavingClause {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn order_by(&mut self, column: &str, direction: Direction) -> &mut Self {
        self.state
            .orders
            .push(format!("{} {}", column, direction.as_str()));
        self
    }

    pub fn order_by_asc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, Direction::Desc)
    }

    /// Set LIMIT. Negative values are recorded as misuse.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        match u64::try_from(n) {
            Ok(n) => self.state.limit = Some(n),
            Err(_) => self.record_misuse(format!("limit must be non-negative, got {n}")),
        }
        self
    }

    /// Set OFFSET. Negative values are recorded as misuse.
    pub fn offset(&mut self, n: i64) -> &mut Self {
        match u64::try_from(n) {
            Ok(n) => self.state.offset = Some(n),
            Err(_) => self.record_misuse(format!("offset must be non-negative, got {n}")),
        }
        self
    }

    // ==================== Rendering ====================

    fn validate(&self) -> OrmResult<&str> {
        if let Some(err) = &self.state.build_error {
            return Err(OrmError::misuse(err.clone()));
        }
        self.table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OrmError::misuse("no table set; call table() first"))
    }

    /// Render the WHERE clause alone (`""` when there are no fragments).
    pub fn render_where(&self) -> OrmResult<String> {
        if let Some(err) = &self.state.build_error {
            return Err(OrmError::misuse(err.clone()));
        }
        render_where(&self.state.fragments)
    }

    fn render_select_list(&self) -> String {
        if self.state.select_cols.is_empty() {
            "*".to_string()
        } else {
            self.state.select_cols.join(", ")
        }
    }

    fn render_tail(&self, sql: &mut String) {
        if !self.state.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.state.group_by.join(", "));
        }

        if !self.state.having.is_empty() {
            let having: Vec<String> = self
                .state
                .having
                .iter()
                .map(|h| format!("{} {} ?", h.column, h.op))
                .collect();
            sql.push_str(" HAVING ");
            sql.push_str(&having.join(" AND "));
        }

        if !self.state.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.state.orders.join(", "));
        }

        if let Some(limit) = self.state.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.state.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }

    /// Render the SELECT statement with its bound values.
    ///
    /// Values are taken from the WHERE fragments first and the HAVING clause
    /// second, matching placeholder order even if `having` was called before
    /// `and_where`.
    pub fn build(&self) -> OrmResult<BuiltStatement> {
        let table = self.validate()?;

        let mut sql = format!("SELECT {} FROM {}", self.render_select_list(), table);
        for join in &self.state.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(&render_where(&self.state.fragments)?);
        self.render_tail(&mut sql);

        let mut params = where_params(&self.state.fragments);
        params.extend(self.state.having.iter().map(|h| h.value.clone()));

        Ok(BuiltStatement {
            sql,
            params,
            query_type: QueryType::Select,
        })
    }

    /// Render the SELECT statement. Never resets state.
    pub fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|built| built.sql)
    }

    /// Render `INSERT INTO <table> (cols) VALUES (?, ...)`.
    ///
    /// The parameter vector is **replaced** by the insert values; anything
    /// accumulated by `and_where` and friends is discarded.
    pub fn build_insert<K, V>(
        &mut self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> OrmResult<BuiltStatement>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        let table = self.validate()?.to_string();
        if columns.is_empty() {
            return Err(OrmError::misuse("insert requires at least one column"));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        self.state.params = values;

        Ok(BuiltStatement {
            sql,
            params: self.state.params.clone(),
            query_type: QueryType::Insert,
        })
    }

    /// Render `UPDATE <table> SET a = ?, ...` plus the accumulated WHERE.
    ///
    /// The parameter vector becomes the SET values followed by the WHERE
    /// values.
    pub fn build_update<K, V>(
        &mut self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> OrmResult<BuiltStatement>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.build_update_where(values, std::iter::empty::<(String, Value)>())
    }

    /// Like [`build_update`](Self::build_update), first adding one
    /// `and_where(column, value)` per entry of `conditions`.
    ///
    /// The conditions are committed to the builder only when the statement
    /// renders; on error the state is left exactly as it was.
    pub fn build_update_where<K, V, CK, CV>(
        &mut self,
        values: impl IntoIterator<Item = (K, V)>,
        conditions: impl IntoIterator<Item = (CK, CV)>,
    ) -> OrmResult<BuiltStatement>
    where
        K: Into<String>,
        V: Into<Value>,
        CK: Into<String>,
        CV: Into<Value>,
    {
        let (columns, mut params): (Vec<String>, Vec<Value>) = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        let table = self.validate()?.to_string();
        if columns.is_empty() {
            return Err(OrmError::misuse("update requires at least one SET column"));
        }

        let mut fragments = self.state.fragments.clone();
        fragments.extend(conditions.into_iter().map(|(column, value)| {
            Fragment::Condition {
                column: column.into(),
                op: Op::Eq,
                value: value.into(),
                connector: Connector::And,
            }
        }));

        let where_sql = render_where(&fragments)?;
        let sets: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        let sql = format!("UPDATE {} SET {}{}", table, sets.join(", "), where_sql);

        params.extend(where_params(&fragments));
        self.state.fragments = fragments;
        self.state.params = params;

        Ok(BuiltStatement {
            sql,
            params: self.state.params.clone(),
            query_type: QueryType::Update,
        })
    }

    /// Render `DELETE FROM <table>` plus the accumulated WHERE.
    pub fn build_delete(&self) -> OrmResult<BuiltStatement> {
        let table = self.validate()?;
        let sql = format!(
            "DELETE FROM {}{}",
            table,
            render_where(&self.state.fragments)?
        );
        Ok(BuiltStatement {
            sql,
            params: where_params(&self.state.fragments),
            query_type: QueryType::Delete,
        })
    }

    /// Render `SELECT COUNT(*) FROM <table>` plus the accumulated WHERE.
    pub fn build_count(&self) -> OrmResult<BuiltStatement> {
        let table = self.validate()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            table,
            render_where(&self.state.fragments)?
        );
        Ok(BuiltStatement {
            sql,
            params: where_params(&self.state.fragments),
            query_type: QueryType::Select,
        })
    }
}

impl<D> fmt::Debug for QueryBuilder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("state", &self.state)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}
