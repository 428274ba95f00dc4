use std::path::Path;

use anyhow::Result;
use clap::Parser;
use console::style;

use causeway_db::{load_migrations_from_dir, MigrationRunner};

/// Show migration status. Read-only: never creates the ledger table.
#[derive(Parser)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, config: &str, migrations_dir: &str) -> Result<()> {
        let catalog = load_migrations_from_dir(Path::new(migrations_dir))?;

        let db = super::open_database(config).await?;
        let runner = MigrationRunner::new(db.pool().clone());

        let status = match runner.status(&catalog).await {
            Ok(status) => status,
            Err(e) => {
                db.close().await;
                return Err(e.into());
            }
        };

        println!();
        println!(
            "  {}  {} Migration Status",
            style("🧱").bold(),
            style("CAUSEWAY").bold().cyan()
        );
        println!();

        if status.total() == 0 {
            println!("  {} No migrations found", style("ℹ").blue());
        } else {
            if !status.applied.is_empty() {
                println!("  {} Applied:", style("✓").green());
                for m in &status.applied {
                    println!(
                        "    {} {} {}",
                        style(&m.version).cyan(),
                        style("applied at").dim(),
                        m.applied_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }

            if !status.pending.is_empty() {
                if !status.applied.is_empty() {
                    println!();
                }
                println!("  {} Pending:", style("○").yellow());
                for version in &status.pending {
                    println!("    {} {}", style("→").dim(), style(version).yellow());
                }
            }
        }

        println!();
        println!(
            "  {} {} total, {} applied, {} pending",
            style("ℹ").blue(),
            status.total(),
            status.applied.len(),
            status.pending.len()
        );
        println!();

        db.close().await;
        Ok(())
    }
}
