//! Per-collection integer id counters.
//!
//! The increment is a single upsert statement, so concurrent inserts never
//! receive the same id.

use sqlx::{Executor, Sqlite};

use crate::Result;

/// Atomically advance the counter for `name` and return the new value.
///
/// The first call for a name returns 1.
pub async fn next_sequence<'e, E>(executor: E, name: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO counters (name, seq) VALUES (?, 1)
        ON CONFLICT(name) DO UPDATE SET seq = seq + 1
        RETURNING seq
        "#,
    )
    .bind(name)
    .fetch_one(executor)
    .await?;

    Ok(seq)
}

/// Last id handed out for `name`, or 0 if none yet.
pub async fn current_sequence<'e, E>(executor: E, name: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let seq: Option<i64> = sqlx::query_scalar("SELECT seq FROM counters WHERE name = ?")
        .bind(name)
        .fetch_optional(executor)
        .await?;

    Ok(seq.unwrap_or(0))
}
