//! Migration catalog: the ordered list of `.sql` files on disk.
//!
//! The filename minus its extension is the version identifier, and
//! lexicographic filename order defines apply order. The catalog is
//! rebuilt from the directory on every invocation; nothing is cached.

use std::path::Path;

use tracing::debug;

use causeway_core::error::{CausewayError, Result};

/// A single migration, read from disk.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version identifier: the filename without the `.sql` extension
    /// (e.g. "0001_create_donations").
    pub version: String,
    /// Full filename the migration was read from.
    pub filename: String,
    /// Raw SQL to execute verbatim.
    pub sql: String,
}

impl Migration {
    pub fn new(
        version: impl Into<String>,
        filename: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            filename: filename.into(),
            sql: sql.into(),
        }
    }
}

/// Load the migration catalog from a directory.
///
/// Files are filtered to the `.sql` extension and sorted by version.
/// A missing directory yields an empty catalog, not an error.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.exists() {
        debug!("Migrations directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut migrations = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().map(|e| e == "sql").unwrap_or(false) {
            let version = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| CausewayError::Config("Invalid migration filename".into()))?
                .to_string();

            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .ok_or_else(|| CausewayError::Config("Invalid migration filename".into()))?
                .to_string();

            let sql = std::fs::read_to_string(&path)?;

            migrations.push(Migration::new(version, filename, sql));
        }
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version));

    debug!("Loaded {} migrations", migrations.len());
    Ok(migrations)
}

/// Compute the next version identifier for a new migration.
///
/// Uses the highest existing zero-padded numeric prefix plus one, so a
/// catalog containing `0002_x` and `0010_y` yields `0011_<name>`.
pub fn next_version(existing: &[Migration], name: &str) -> String {
    let max = existing
        .iter()
        .filter_map(|m| m.version.split('_').next())
        .filter_map(|prefix| prefix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    format!("{:04}_{}", max + 1, slugify(name))
}

fn slugify(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_empty_dir() {
        let dir = TempDir::new().unwrap();
        let migrations = load_migrations_from_dir(dir.path()).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_load_from_nonexistent_dir() {
        let migrations = load_migrations_from_dir(Path::new("/nonexistent/path")).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_load_sorted_by_filename() {
        let dir = TempDir::new().unwrap();

        // Create migrations out of order
        fs::write(dir.path().join("002_add_users.sql"), "SELECT 2;").unwrap();
        fs::write(dir.path().join("001_init.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("010_add_index.sql"), "SELECT 10;").unwrap();

        let migrations = load_migrations_from_dir(dir.path()).unwrap();
        assert_eq!(migrations.len(), 3);
        assert_eq!(migrations[0].version, "001_init");
        assert_eq!(migrations[1].version, "002_add_users");
        assert_eq!(migrations[2].version, "010_add_index");
        assert_eq!(migrations[0].filename, "001_init.sql");
    }

    #[test]
    fn test_load_ignores_non_sql() {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("0001_migration.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("readme.txt"), "Not a migration").unwrap();
        fs::write(dir.path().join("backup.sql.bak"), "Backup").unwrap();

        let migrations = load_migrations_from_dir(dir.path()).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version, "0001_migration");
    }

    #[test]
    fn test_next_version_empty_catalog() {
        assert_eq!(next_version(&[], "init"), "0001_init");
    }

    #[test]
    fn test_next_version_increments_highest() {
        let existing = vec![
            Migration::new("0002_add_users", "0002_add_users.sql", ""),
            Migration::new("0010_add_index", "0010_add_index.sql", ""),
        ];
        assert_eq!(next_version(&existing, "add_funds"), "0011_add_funds");
    }

    #[test]
    fn test_next_version_ignores_non_numeric_prefixes() {
        let existing = vec![
            Migration::new("baseline", "baseline.sql", ""),
            Migration::new("0003_x", "0003_x.sql", ""),
        ];
        assert_eq!(next_version(&existing, "y"), "0004_y");
    }

    #[test]
    fn test_next_version_slugifies_name() {
        assert_eq!(next_version(&[], "Add Donor Table!"), "0001_add_donor_table_");
    }
}
