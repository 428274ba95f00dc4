use std::path::Path;

use anyhow::Result;
use clap::Parser;
use console::style;

use causeway_db::{load_migrations_from_dir, MigrationRunner};

/// Apply all pending migrations.
#[derive(Parser)]
pub struct UpCommand {}

impl UpCommand {
    pub async fn execute(self, config: &str, migrations_dir: &str) -> Result<()> {
        let catalog = load_migrations_from_dir(Path::new(migrations_dir))?;

        println!();
        println!(
            "  {}  {} Migrations",
            style("🧱").bold(),
            style("CAUSEWAY").bold().cyan()
        );
        println!();

        if catalog.is_empty() {
            println!(
                "  {} No migrations found in {}",
                style("ℹ").blue(),
                migrations_dir
            );
            return Ok(());
        }

        let db = super::open_database(config).await?;
        let runner = MigrationRunner::new(db.pool().clone());

        println!("  {} Running pending migrations...", style("→").dim());

        let applied = match runner.migrate_all(&catalog).await {
            Ok(applied) => applied,
            Err(e) => {
                db.close().await;
                return Err(e.into());
            }
        };

        if applied.is_empty() {
            println!("  {} Database is up to date", style("✓").green());
        } else {
            for version in &applied {
                println!("  {} Applied: {}", style("✓").green(), style(version).cyan());
            }
            println!();
            println!(
                "  {} Applied {} migration(s)",
                style("✓").green(),
                applied.len()
            );
        }
        println!();

        db.close().await;
        Ok(())
    }
}
