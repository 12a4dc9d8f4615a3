//! `tokio-postgres` implementation of [`Driver`].
//!
//! The builder renders `?` placeholders; Postgres wants `$1, $2, ...`. The
//! rewrite happens in [`number_placeholders`] right before `prepare`, so the
//! SQL handed to hooks stays in the builder's canonical form.

use crate::driver::{Driver, PreparedStatement};
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::value::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row, Statement};

// `to_regclass` resolves through the search path, so unqualified names find
// temp tables too. Unknown tables yield no rows.
const COLUMNS_SQL: &str = "SELECT a.attname::text \
     FROM pg_catalog.pg_attribute a \
     WHERE a.attrelid = to_regclass($1::text) \
       AND a.attnum > 0 \
       AND NOT a.attisdropped \
     ORDER BY a.attnum";

/// Rewrite `?` placeholders into Postgres' numbered `$n` form.
///
/// Question marks inside single-quoted literals (including `E'...'` escape
/// strings), double-quoted identifiers, `$tag$` dollar-quoted bodies and
/// `--` / `/* */` comments are left alone. Nested block comments are not
/// tracked.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut rest = sql;
    let mut n = 0usize;

    while let Some(c) = rest.chars().next() {
        let len = match c {
            '\'' | '"' => quoted_len(rest, c, false),
            'E' | 'e' if rest[1..].starts_with('\'') && !ends_with_ident(&out) => {
                1 + quoted_len(&rest[1..], '\'', true)
            }
            '$' if !ends_with_ident(&out) => dollar_quoted_len(rest).unwrap_or(1),
            '-' if rest.starts_with("--") => rest.find('\n').map_or(rest.len(), |i| i + 1),
            '/' if rest.starts_with("/*") => rest[2..].find("*/").map_or(rest.len(), |i| i + 4),
            '?' => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
                rest = &rest[1..];
                continue;
            }
            _ => c.len_utf8(),
        };
        out.push_str(&rest[..len]);
        rest = &rest[len..];
    }
    out
}

fn ends_with_ident(sql: &str) -> bool {
    sql.chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Byte length of the quoted run at the start of `s`, both quotes included.
///
/// A doubled quote closes the run and the caller re-enters it. With
/// `backslash`, `\x` never closes it.
fn quoted_len(s: &str, quote: char, backslash: bool) -> usize {
    let mut chars = s.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        if backslash && c == '\\' {
            chars.next();
        } else if c == quote {
            return idx + 1;
        }
    }
    s.len()
}

/// Byte length of a `$tag$ ... $tag$` body at the start of `s`, or `None` if
/// `s` does not open one (`$1` is a positional parameter, not a tag).
fn dollar_quoted_len(s: &str) -> Option<usize> {
    let tag_end = s[1..].find('$')? + 1;
    let tag = &s[1..tag_end];
    if tag.starts_with(|c: char| c.is_ascii_digit())
        || !tag.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return None;
    }
    let delim = &s[..=tag_end];
    let body = &s[delim.len()..];
    Some(
        body.find(delim)
            .map_or(s.len(), |idx| delim.len() + idx + delim.len()),
    )
}

/// Statement prepared on a `tokio_postgres::Client`.
pub struct PgStatement<'a> {
    client: &'a Client,
    statement: Statement,
    rows: Vec<Row>,
}

impl PgStatement<'_> {
    /// The server-side prepared statement.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

impl PreparedStatement for PgStatement<'_> {
    async fn execute(&mut self, params: &[Value]) -> OrmResult<u64> {
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        // Statements without a result set report affected rows directly.
        if self.statement.columns().is_empty() {
            self.rows.clear();
            return Ok(self.client.execute(&self.statement, &refs).await?);
        }

        self.rows = self.client.query(&self.statement, &refs).await?;
        Ok(self.rows.len() as u64)
    }

    fn fetch_all(&mut self) -> OrmResult<Vec<Record>> {
        std::mem::take(&mut self.rows)
            .iter()
            .map(Record::from_pg_row)
            .collect()
    }

    fn fetch_scalar(&mut self) -> OrmResult<Option<Value>> {
        let Some(row) = self.rows.first() else {
            return Ok(None);
        };
        if row.is_empty() {
            return Ok(None);
        }
        let value: Value = row.try_get(0).map_err(|e| {
            let column = row.columns()[0].name();
            OrmError::decode(column, e.to_string())
        })?;
        Ok(Some(value))
    }
}

async fn run_transaction_command(client: &Client, command: &str) -> OrmResult<()> {
    if client.is_closed() {
        return Err(OrmError::transaction(
            format!("{command} failed: connection is closed"),
            None,
        ));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(target: "pgfluent.driver", command, "transaction command");

    client
        .batch_execute(command)
        .await
        .map_err(|e| OrmError::transaction(format!("{command} failed"), Some(e)))
}

impl Driver for Client {
    type Statement<'a> = PgStatement<'a>;

    async fn prepare<'a>(&'a self, sql: &str) -> OrmResult<PgStatement<'a>> {
        if self.is_closed() {
            return Err(OrmError::Connection("connection is closed".to_string()));
        }

        let exec_sql = number_placeholders(sql);

        #[cfg(feature = "tracing")]
        tracing::trace!(target: "pgfluent.driver", sql = %exec_sql, "prepare");

        let statement = Client::prepare(self, &exec_sql)
            .await
            .map_err(|source| OrmError::Prepare {
                sql: exec_sql,
                source,
            })?;
        Ok(PgStatement {
            client: self,
            statement,
            rows: Vec::new(),
        })
    }

    async fn begin_transaction(&self) -> OrmResult<()> {
        run_transaction_command(self, "BEGIN").await
    }

    async fn commit(&self) -> OrmResult<()> {
        run_transaction_command(self, "COMMIT").await
    }

    async fn rollback(&self) -> OrmResult<()> {
        run_transaction_command(self, "ROLLBACK").await
    }

    async fn columns_of(&self, table: &str) -> OrmResult<Vec<String>> {
        #[cfg(feature = "tracing")]
        tracing::trace!(target: "pgfluent.driver", table, "introspect columns");

        let rows = Client::query(self, COLUMNS_SQL, &[&table]).await?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| OrmError::decode("column_name", e.to_string()))
            })
            .collect()
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Driver for deadpool_postgres::Client {
    type Statement<'a> = PgStatement<'a>;

    async fn prepare<'a>(&'a self, sql: &str) -> OrmResult<PgStatement<'a>> {
        // Delegate to the deref target (ClientWrapper -> tokio_postgres::Client).
        let client: &'a Client = self;
        Driver::prepare(client, sql).await
    }

    async fn begin_transaction(&self) -> OrmResult<()> {
        let client: &Client = self;
        Driver::begin_transaction(client).await
    }

    async fn commit(&self) -> OrmResult<()> {
        let client: &Client = self;
        Driver::commit(client).await
    }

    async fn rollback(&self) -> OrmResult<()> {
        let client: &Client = self;
        Driver::rollback(client).await
    }

    async fn columns_of(&self, table: &str) -> OrmResult<Vec<String>> {
        let client: &Client = self;
        Driver::columns_of(client, table).await
    }
}
