pub mod migrations;
pub mod pool;

pub use migrations::{
    load_migrations_from_dir, AppliedMigration, Migration, MigrationRunner, MigrationStatus,
};
pub use pool::Database;
