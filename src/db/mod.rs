use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

mod account;
mod paste;
#[cfg(test)]
mod tests;

/// Table definitions, applied idempotently at startup.
const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the relational store. Cloning shares the underlying pool; every
/// operation acquires its own pooled connection, so concurrent requests never
/// interleave statements on one physical connection.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database by URL and apply the schema.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new().max_connections(5).connect(url).await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Whether a store error is a uniqueness-constraint violation, which the
/// token allocator treats as a collision and signup treats as a conflict.
fn is_unique_violation(error: &sqlx::Error) -> bool {
    let Some(db_error) = error.as_database_error() else {
        return false;
    };
    match db_error.code().as_deref() {
        // SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY
        Some("2067") | Some("1555") => true,
        // postgres unique_violation
        Some("23505") => true,
        _ => false,
    }
}
