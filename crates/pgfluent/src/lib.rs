//! # pgfluent
//!
//! A fluent SQL statement builder for PostgreSQL.
//!
//! ## Features
//!
//! - **Fluent chaining**: every mutator returns `&mut Self`
//! - **Nested boolean groups**: `and_group()` / `or_group()` ... `end_group()`,
//!   stored as a flat fragment list and rendered positionally
//! - **Parameter-safe**: values are always bound, never interpolated
//! - **Fail fast**: unbalanced groups, empty `IN` lists and negative limits are
//!   reported when rendering, before anything reaches the database
//! - **Explicit reset semantics**: `to_sql` / `fetch_all` keep state,
//!   `execute_and_reset` / `insert` / `update` / `delete` clear it
//! - **Hooks**: observe every statement before execution (`TracingSqlHook`
//!   with the `tracing` feature)
//!
//! ## Example
//!
//! ```ignore
//! use pgfluent::{Op, QueryBuilder};
//!
//! let mut qb = QueryBuilder::with_table(&client, "users");
//!
//! // SELECT
//! let rows = qb
//!     .select("id, username")
//!     .and_where("status", "active")
//!     .or_group()
//!     .and_where_op("age", Op::Gte, 18)
//!     .and_where_in("role", ["admin", "owner"])
//!     .end_group()
//!     .order_by_desc("created_at")
//!     .limit(10)
//!     .fetch_all()
//!     .await?;
//!
//! // INSERT (resets the builder)
//! qb.insert([("username", "alice"), ("email", "alice@example.com")]).await?;
//!
//! // UPDATE ... WHERE id = ?
//! qb.update_where([("status", "inactive")], [("id", 42)]).await?;
//!
//! // DELETE
//! qb.and_where("id", 42).delete().await?;
//! ```

pub mod builder;
pub mod config;
pub mod driver;
pub mod error;
pub mod hook;
pub mod postgres;
pub mod prelude;
pub mod record;
pub mod value;

pub use builder::{
    BuiltStatement, Connector, Direction, Execution, Fragment, HavingClause, JoinKind, Op,
    QueryBuilder, StatementState,
};
pub use config::PoolConfig;
pub use driver::{Driver, PreparedStatement};
pub use error::{OrmError, OrmResult};
pub use hook::{NoopHook, QueryContext, QueryHook, QueryType};
pub use postgres::{PgStatement, number_placeholders};
pub use record::Record;
pub use value::Value;

#[cfg(feature = "tracing")]
pub use hook::TracingSqlHook;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
