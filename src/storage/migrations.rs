use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema steps in order. Step `n` (1-based) takes the store from
/// `user_version` `n - 1` to `n`; steps are only ever appended.
const SCHEMA_STEPS: &[(&str, &str)] = &[("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

fn schema_version() -> i32 {
    SCHEMA_STEPS.len() as i32
}

fn stored_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

/// Brings the store up to the current schema in one transaction. A store
/// written by a newer build is left untouched.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let from = stored_version(conn)?;
    let target = schema_version();

    if from > target {
        bail!("storage version ({from}) is newer than supported schema ({target})");
    }
    if from == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    for (name, sql) in &SCHEMA_STEPS[from.max(0) as usize..] {
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply {name}"))?;
    }

    tx.pragma_update(None, "user_version", target)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")
}
