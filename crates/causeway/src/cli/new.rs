use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use console::style;

use causeway_db::migrations::{load_migrations_from_dir, next_version};

/// Create a new migration file with the next free sequence number.
#[derive(Parser)]
pub struct NewCommand {
    /// Descriptive name for the migration (e.g. "add_donations_table").
    pub name: String,
}

impl NewCommand {
    pub fn execute(self, migrations_dir: &str) -> Result<()> {
        let dir = Path::new(migrations_dir);
        let catalog = load_migrations_from_dir(dir)?;
        let version = next_version(&catalog, &self.name);

        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}.sql", version));
        let content = format!(
            "-- Migration: {}\n-- Created at: {}\n\n",
            version,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        std::fs::write(&path, content)?;

        println!();
        println!(
            "  {} Created {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
        println!();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_numbered_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("0001_init.sql"), "SELECT 1;").unwrap();

        let cmd = NewCommand {
            name: "add_users".to_string(),
        };
        cmd.execute(dir.path().to_str().unwrap()).unwrap();

        let path = dir.path().join("0002_add_users.sql");
        assert!(path.exists());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("-- Migration: 0002_add_users"));
    }

    #[test]
    fn test_new_creates_directory_if_missing() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("db").join("migrations");

        let cmd = NewCommand {
            name: "init".to_string(),
        };
        cmd.execute(nested.to_str().unwrap()).unwrap();

        assert!(nested.join("0001_init.sql").exists());
    }
}
