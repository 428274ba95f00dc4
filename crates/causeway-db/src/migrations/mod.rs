mod catalog;
mod runner;

pub use catalog::{load_migrations_from_dir, next_version, Migration};
pub use runner::{pending_of, AppliedMigration, MigrationRunner, MigrationStatus};
