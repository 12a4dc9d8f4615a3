//! Nested AND/OR groups, rendered without a database.
//!
//! Run with: cargo run --example nested_groups -p pgfluent
//!
//! Rendering never touches the driver, so `()` stands in for a connection.

use pgfluent::{Connector, Fragment, Op, OrmError, QueryBuilder};

fn main() -> Result<(), OrmError> {
    let mut qb = QueryBuilder::with_table((), "users");

    // status = 'active' AND (role = 'admin' OR (role = 'user' AND reputation > 100))
    qb.select("id, username, role")
        .and_where("status", "active")
        .and_group()
        .and_where("role", "admin")
        .or_group()
        .and_where("role", "user")
        .and_where_op("reputation", Op::Gt, 100)
        .end_group()
        .end_group()
        .order_by_desc("reputation")
        .limit(25);

    println!("=== Fragments ===");
    for fragment in qb.fragments() {
        match fragment {
            Fragment::GroupOpen { connector } => println!("{connector} ("),
            Fragment::GroupClose => println!(")"),
            other => println!("  {}", other.body()),
        }
    }

    let built = qb.build()?;
    println!("\n=== SQL ===\n{}", built.sql);
    println!("Params: {:?}", built.params);

    // The first fragment and anything directly after `(` drop their connector.
    println!("\n=== Leading OR group ===");
    qb.reset();
    qb.begin_group(Connector::Or)
        .or_where("email", "a@example.com")
        .or_where_in("id", [1, 2, 3])
        .end_group();
    println!("{}", qb.render_where()?);

    // Structural mistakes surface when rendering.
    println!("\n=== Misuse ===");
    qb.reset();
    qb.and_group().and_where("a", 1);
    match qb.to_sql() {
        Ok(sql) => println!("unexpected: {sql}"),
        Err(err) => println!("{err}"),
    }

    Ok(())
}
