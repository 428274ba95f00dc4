//! Migration runner with cross-process locking.
//!
//! Only one runner applies migrations at a time: a PostgreSQL advisory
//! lock is held for the whole run, so two processes pointed at the same
//! database cannot double-apply a migration.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use causeway_core::error::{CausewayError, Result};

use super::catalog::Migration;

/// Lock ID for the migration advisory lock (arbitrary but consistent).
/// Fixed value derived from "CWAY" ascii values.
const MIGRATION_LOCK_ID: i64 = 0x43574159;

/// A ledger row: one migration that has been applied.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub version: String,
    pub applied_at: DateTime<Utc>,
}

/// Read-only report of ledger vs. catalog.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Ledger entries, ordered by version.
    pub applied: Vec<AppliedMigration>,
    /// Catalog versions not yet in the ledger, in apply order.
    pub pending: Vec<String>,
}

impl MigrationStatus {
    pub fn total(&self) -> usize {
        self.applied.len() + self.pending.len()
    }
}

/// Applies pending migrations exactly once, in order, one transaction each.
pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply all pending migrations under the advisory lock.
    ///
    /// Returns the versions applied by this run. Stops on the first
    /// failure; already-committed migrations stay committed, so a re-run
    /// after fixing the failing file resumes where the ledger says.
    pub async fn migrate_all(&self, catalog: &[Migration]) -> Result<Vec<String>> {
        self.acquire_lock().await?;

        let result = self.migrate_all_inner(catalog).await;

        // Always release the lock, without masking the original failure
        if let Err(e) = self.release_lock().await {
            warn!("Failed to release migration lock: {}", e);
        }

        result
    }

    async fn migrate_all_inner(&self, catalog: &[Migration]) -> Result<Vec<String>> {
        self.ensure_ledger().await?;

        let applied: HashSet<String> = self
            .list_applied()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();
        debug!("Already applied migrations: {:?}", applied);

        let mut applied_now = Vec::new();
        for migration in pending_of(catalog, &applied) {
            self.apply(migration).await?;
            applied_now.push(migration.version.clone());
        }

        Ok(applied_now)
    }

    /// Create the ledger table if absent. Idempotent.
    pub async fn ensure_ledger(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CausewayError::Database(format!("Failed to create ledger table: {}", e)))?;
        Ok(())
    }

    /// Fetch the ledger, ordered by version.
    ///
    /// A read failure propagates; it is never treated as "nothing applied",
    /// since that could re-apply committed migrations.
    pub async fn list_applied(&self) -> Result<Vec<AppliedMigration>> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT version, applied_at FROM schema_migrations ORDER BY version ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CausewayError::Database(format!("Failed to read ledger: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(version, applied_at)| AppliedMigration {
                version,
                applied_at,
            })
            .collect())
    }

    /// Apply one migration in a single transaction.
    ///
    /// The migration body and its ledger row commit together; on any
    /// failure the transaction rolls back and the error propagates, leaving
    /// no trace of the attempt.
    pub async fn apply(&self, migration: &Migration) -> Result<()> {
        info!("Applying migration: {}", migration.version);

        let mut tx = self.pool.begin().await?;

        for statement in split_sql_statements(&migration.sql) {
            let statement = statement.trim();

            // Skip empty statements or comment-only blocks
            if statement.is_empty()
                || statement.lines().all(|l| {
                    let l = l.trim();
                    l.is_empty() || l.starts_with("--")
                })
            {
                continue;
            }

            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| CausewayError::Migration {
                    name: migration.version.clone(),
                    message: e.to_string(),
                })?;
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version) VALUES ($1) ON CONFLICT (version) DO NOTHING",
        )
        .bind(&migration.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| CausewayError::Migration {
            name: migration.version.clone(),
            message: format!("Failed to record in ledger: {}", e),
        })?;

        tx.commit().await?;

        info!("Migration applied: {}", migration.version);
        Ok(())
    }

    /// Remove one ledger row. Returns whether a row was deleted.
    ///
    /// Does not execute any reverse SQL; schema changes are reverted
    /// manually. An unknown version is a no-op, not an error.
    pub async fn rollback(&self, version: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM schema_migrations WHERE version = $1")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(|e| CausewayError::Database(format!("Failed to roll back ledger: {}", e)))?;

        tx.commit().await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!("Rolled back ledger entry: {}", version);
        } else {
            debug!("No ledger entry for version: {}", version);
        }
        Ok(removed)
    }

    /// Read-only report of applied and pending migrations.
    ///
    /// Never mutates state: if the ledger table does not exist yet, it is
    /// reported as zero applied rather than created.
    pub async fn status(&self, catalog: &[Migration]) -> Result<MigrationStatus> {
        let applied = if self.ledger_exists().await? {
            self.list_applied().await?
        } else {
            Vec::new()
        };

        let applied_set: HashSet<String> =
            applied.iter().map(|m| m.version.clone()).collect();
        let pending = pending_of(catalog, &applied_set)
            .into_iter()
            .map(|m| m.version.clone())
            .collect();

        Ok(MigrationStatus { applied, pending })
    }

    async fn ledger_exists(&self) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT to_regclass('schema_migrations') IS NOT NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    CausewayError::Database(format!("Failed to inspect ledger: {}", e))
                })?;
        Ok(exists)
    }

    async fn acquire_lock(&self) -> Result<()> {
        debug!("Acquiring migration lock...");
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_ID)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                CausewayError::Database(format!("Failed to acquire migration lock: {}", e))
            })?;
        debug!("Migration lock acquired");
        Ok(())
    }

    async fn release_lock(&self) -> Result<()> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_ID)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                CausewayError::Database(format!("Failed to release migration lock: {}", e))
            })?;
        debug!("Migration lock released");
        Ok(())
    }
}

/// Catalog entries absent from the applied set, preserving catalog order.
pub fn pending_of<'a>(catalog: &'a [Migration], applied: &HashSet<String>) -> Vec<&'a Migration> {
    catalog
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect()
}

/// Split SQL into individual statements, respecting dollar-quoted strings.
/// This handles PL/pgSQL functions that contain semicolons inside $$ delimiters.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_quote = false;
    let mut dollar_tag = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        // Check for dollar-quoting start/end
        if c == '$' {
            // Look for a dollar-quote tag like $$ or $tag$
            let mut potential_tag = String::from("$");

            // Collect characters until we hit another $ or non-identifier char
            while let Some(&next_c) = chars.peek() {
                if next_c == '$' {
                    potential_tag.push(chars.next().unwrap());
                    current.push('$');
                    break;
                } else if next_c.is_alphanumeric() || next_c == '_' {
                    potential_tag.push(chars.next().unwrap());
                    current.push(potential_tag.chars().last().unwrap());
                } else {
                    break;
                }
            }

            // Check if this is a valid dollar-quote delimiter (ends with $)
            if potential_tag.len() >= 2 && potential_tag.ends_with('$') {
                if in_dollar_quote && potential_tag == dollar_tag {
                    // End of dollar-quoted string
                    in_dollar_quote = false;
                    dollar_tag.clear();
                } else if !in_dollar_quote {
                    // Start of dollar-quoted string
                    in_dollar_quote = true;
                    dollar_tag = potential_tag;
                }
            }
        }

        // Split on semicolon only if not inside a dollar-quoted string
        if c == ';' && !in_dollar_quote {
            let stmt = current.trim().trim_end_matches(';').trim().to_string();
            if !stmt.is_empty() {
                statements.push(stmt);
            }
            current.clear();
        }
    }

    // The last statement might not end with ;
    let stmt = current.trim().trim_end_matches(';').trim().to_string();
    if !stmt.is_empty() {
        statements.push(stmt);
    }

    statements
}
