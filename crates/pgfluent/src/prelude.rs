//! Convenient imports for typical `pgfluent` usage.
//!
//! ```ignore
//! use pgfluent::prelude::*;
//! ```

pub use crate::{
    Connector, Direction, Driver, JoinKind, Op, OrmError, OrmResult, QueryBuilder, Record, Value,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
