//! Fluent statement builder.
//!
//! - WHERE state is a flat list of [`Fragment`]s; nested AND/OR groups are
//!   expressed with `begin_group` / `end_group` markers, not a tree.
//! - Values are bound as they are added and rendered as `?` placeholders.
//! - Structural mistakes (unbalanced groups, empty `IN`, negative `LIMIT`)
//!   are recorded by the mutators and reported when the statement is rendered.

mod exec;
mod fragment;
mod query;

pub use exec::Execution;
pub use fragment::{Connector, Fragment, Op, render_where, where_params};
pub use query::{
    BuiltStatement, Direction, HavingClause, JoinKind, QueryBuilder, StatementState,
};
