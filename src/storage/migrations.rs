//! Embedded schema migrations (`migrations/V<n>__<name>.sql`)

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::Mutex;

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

/// Pools created concurrently in one process (tests) apply the schema one at a time.
static MIGRATION_LOCK: Mutex<()> = Mutex::new(());

/// Brings the schema up to date. Safe to call on every start.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let _guard = MIGRATION_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let report = embedded::migrations::runner()
        .run(conn)
        .context("apply user directory migrations")?;

    for migration in report.applied_migrations() {
        log::info!("Applied migration {}", migration);
    }
    Ok(())
}

/// Highest applied migration version.
pub fn schema_version(conn: &mut Connection) -> Result<Option<u32>> {
    let last = embedded::migrations::runner()
        .get_last_applied_migration(conn)
        .context("read migration history")?;
    Ok(last.map(|m| m.version()))
}
