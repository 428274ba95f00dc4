mod new;
mod rollback;
mod status;
mod up;

pub use new::NewCommand;
pub use rollback::RollbackCommand;
pub use status::StatusCommand;
pub use up::UpCommand;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use causeway_core::config::CausewayConfig;
use causeway_db::Database;

/// CAUSEWAY - PostgreSQL schema migrations for the admin portal
#[derive(Parser)]
#[command(name = "causeway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path.
    #[arg(short, long, default_value = "causeway.toml", global = true)]
    pub config: String,

    /// Migrations directory path.
    #[arg(short, long, default_value = "migrations", global = true)]
    pub migrations_dir: String,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Apply all pending migrations.
    #[command(visible_alias = "migrate")]
    Up(UpCommand),

    /// Show migration status.
    Status(StatusCommand),

    /// Remove a migration's ledger entry (does not revert schema changes).
    Rollback(RollbackCommand),

    /// Create a new migration file.
    New(NewCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let Some(command) = self.command else {
            Cli::command().print_help()?;
            println!();
            return Ok(());
        };

        match command {
            Commands::Up(cmd) => cmd.execute(&self.config, &self.migrations_dir).await,
            Commands::Status(cmd) => cmd.execute(&self.config, &self.migrations_dir).await,
            Commands::Rollback(cmd) => cmd.execute(&self.config).await,
            Commands::New(cmd) => cmd.execute(&self.migrations_dir),
        }
    }
}

/// Resolve configuration and open a checked database connection.
///
/// Loads `.env` first, then the config file if present, falling back to the
/// enumerated environment variables. Connectivity or authentication failures
/// surface here, before any migration work starts.
pub(crate) async fn open_database(config_path: &str) -> Result<Database> {
    dotenvy::dotenv().ok();

    let config = CausewayConfig::load(config_path)?;
    let db = Database::connect(&config.database).await?;
    db.health_check().await?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_up() {
        let cli = Cli::try_parse_from(["causeway", "up"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_migrate_alias() {
        let cli = Cli::try_parse_from(["causeway", "migrate"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::try_parse_from(["causeway", "status"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["causeway"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_rollback_requires_version() {
        let cli = Cli::try_parse_from(["causeway", "rollback"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_rollback_with_version() {
        let cli = Cli::try_parse_from(["causeway", "rollback", "0001_init"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_new() {
        let cli = Cli::try_parse_from(["causeway", "new", "add_donations"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["causeway", "status", "--migrations-dir", "db/migrations"])
                .unwrap();
        assert_eq!(cli.migrations_dir, "db/migrations");
    }
}
