//! Test utilities for database setup.
//!
//! Reuses the real migrations and seed data so tests never carry their own
//! copy of the schema.

use rusqlite::Connection;
use tempfile::TempDir;

/// Test environment with a migrated database in a temporary directory.
///
/// The directory is removed when the environment is dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// Connection with the full schema (all migrations)
    pub conn: Connection,
}

impl TestEnv {
    /// Migrated database with empty tables.
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("hanzi.db"))?;
        crate::db::schema::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Migrated database with the starter characters loaded.
    pub fn seeded() -> rusqlite::Result<Self> {
        let env = Self::new()?;
        crate::db::seed_characters(&env.conn)?;
        Ok(env)
    }
}
