use anyhow::Result;
use clap::Parser;
use console::style;

use causeway_db::MigrationRunner;

/// Remove a migration's ledger entry.
///
/// Only the ledger row is deleted; the migration's schema changes are not
/// reverted and must be undone manually.
#[derive(Parser)]
pub struct RollbackCommand {
    /// Version to remove from the ledger (e.g. "0002_add_users").
    pub version: String,
}

impl RollbackCommand {
    pub async fn execute(self, config: &str) -> Result<()> {
        let db = super::open_database(config).await?;
        let runner = MigrationRunner::new(db.pool().clone());

        let result = async {
            runner.ensure_ledger().await?;
            runner.rollback(&self.version).await
        }
        .await;

        let removed = match result {
            Ok(removed) => removed,
            Err(e) => {
                db.close().await;
                return Err(e.into());
            }
        };

        println!();
        if removed {
            println!(
                "  {} Removed ledger entry: {}",
                style("✓").green(),
                style(&self.version).cyan()
            );
            println!(
                "  {} Schema changes are not reverted automatically",
                style("ℹ").blue()
            );
        } else {
            println!(
                "  {} No ledger entry for version: {}",
                style("ℹ").blue(),
                style(&self.version).yellow()
            );
        }
        println!();

        db.close().await;
        Ok(())
    }
}
