//! WHERE fragments and the positional renderer.
//!
//! Boolean groups are never stored as a tree. The builder appends flat
//! fragments (`Condition`, `InCondition`, `GroupOpen`, `GroupClose`) and
//! [`render_where`] rebuilds connector placement and parentheses by looking
//! at what was rendered immediately before each fragment.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;

/// Boolean operator joining a fragment to whatever precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a single-value condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Op {
    /// `=`
    #[default]
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `ILIKE` (case-insensitive LIKE)
    Ilike,
    /// `NOT ILIKE`
    NotIlike,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Ilike => "ILIKE",
            Op::NotIlike => "NOT ILIKE",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of accumulated WHERE state.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// `column op ?`, one bound value.
    Condition {
        column: String,
        op: Op,
        value: Value,
        connector: Connector,
    },
    /// `column IN (?, ...)`, one bound value per placeholder.
    InCondition {
        column: String,
        values: Vec<Value>,
        connector: Connector,
    },
    /// Opening parenthesis of a subgroup.
    GroupOpen { connector: Connector },
    /// Closing parenthesis; carries no connector.
    GroupClose,
}

impl Fragment {
    /// Values this fragment binds, in placeholder order.
    pub fn values(&self) -> &[Value] {
        match self {
            Fragment::Condition { value, .. } => std::slice::from_ref(value),
            Fragment::InCondition { values, .. } => values,
            Fragment::GroupOpen { .. } | Fragment::GroupClose => &[],
        }
    }

    fn connector(&self) -> Connector {
        match self {
            Fragment::Condition { connector, .. }
            | Fragment::InCondition { connector, .. }
            | Fragment::GroupOpen { connector } => *connector,
            Fragment::GroupClose => Connector::And,
        }
    }

    /// SQL text of this fragment on its own, without a connector.
    pub fn body(&self) -> String {
        match self {
            Fragment::Condition { column, op, .. } => format!("{column} {op} ?"),
            Fragment::InCondition { column, values, .. } => {
                format!("{column} IN ({})", vec!["?"; values.len()].join(", "))
            }
            Fragment::GroupOpen { .. } => "(".to_string(),
            Fragment::GroupClose => ")".to_string(),
        }
    }
}

/// Render fragments into `" WHERE ..."`, or `""` when there are none.
///
/// No connector is emitted before the very first fragment or directly after
/// `(`. Tokens are space-separated, except that the token after `(` and every
/// `)` attach without a space.
///
/// Unbalanced and empty groups are reported as [`OrmError::BuilderMisuse`].
pub fn render_where(fragments: &[Fragment]) -> OrmResult<String> {
    if fragments.is_empty() {
        return Ok(String::new());
    }

    let mut sql = String::from(" WHERE ");
    let mut first = true;
    let mut after_open = false;
    let mut depth = 0usize;

    for (idx, fragment) in fragments.iter().enumerate() {
        match fragment {
            Fragment::GroupClose => {
                if depth == 0 {
                    return Err(OrmError::misuse(format!(
                        "end_group() at fragment {idx} has no matching begin_group()"
                    )));
                }
                if after_open {
                    return Err(OrmError::misuse(format!(
                        "empty group closed at fragment {idx}"
                    )));
                }
                depth -= 1;
                sql.push(')');
                after_open = false;
            }
            _ => {
                // Directly after `(` no connector is emitted for any fragment
                // kind, a nested `(` included, so `((a OR b) AND c)` never
                // renders as `( AND (`.
                if after_open {
                    sql.push_str(&fragment.body());
                } else {
                    sql.push(' ');
                    if !first {
                        sql.push_str(fragment.connector().as_str());
                        sql.push(' ');
                    }
                    sql.push_str(&fragment.body());
                }
                after_open = matches!(fragment, Fragment::GroupOpen { .. });
                if after_open {
                    depth += 1;
                }
            }
        }
        first = false;
    }

    if depth > 0 {
        return Err(OrmError::misuse(format!(
            "{depth} group(s) opened with begin_group() were never closed"
        )));
    }
    Ok(sql)
}

/// Bound values of `fragments`, in placeholder order.
pub fn where_params(fragments: &[Fragment]) -> Vec<Value> {
    fragments
        .iter()
        .flat_map(|f| f.values().iter().cloned())
        .collect()
}
