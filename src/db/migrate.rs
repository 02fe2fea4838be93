use rusqlite::{Connection, params};
use crate::error::{Result, RodeoError};

/// Migration metadata
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Migrations compiled into the binary, in version order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "001_uploaded_documents",
        sql: include_str!("../../migrations/001_uploaded_documents.sql"),
    },
    Migration {
        version: 2,
        name: "002_history_index",
        sql: include_str!("../../migrations/002_history_index.sql"),
    },
];

/// Create schema_migrations table if it doesn't exist
fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get list of applied migrations
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

/// Run all pending migrations
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;

    for migration in MIGRATIONS {
        if applied.iter().any(|name| name == migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        let tx = conn.transaction()?;

        tx.execute_batch(migration.sql).map_err(|e| {
            RodeoError::Config(format!("Failed to execute migration {}: {}", migration.name, e))
        })?;

        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;

        tx.commit()?;

        log::info!("Migration {} applied successfully", migration.name);
    }

    Ok(())
}

/// Number of migrations this build knows about
pub fn known_migrations() -> usize {
    MIGRATIONS.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table_names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap()
    }

    #[test]
    fn test_migration_versions_ascending() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_full_migration_schema() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();

        run_migrations(&mut conn).unwrap();

        let tables = table_names(&conn, "table");
        assert!(tables.contains(&"uploaded_documents".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));

        let indexes = table_names(&conn, "index");
        assert!(indexes.contains(&"idx_uploaded_documents_status_time".to_string()));

        let applied = get_applied_migrations(&conn).unwrap();
        assert_eq!(applied.len(), known_migrations());
    }

    #[test]
    fn test_migrations_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();

        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = get_applied_migrations(&conn).unwrap();
        assert_eq!(applied, vec!["001_uploaded_documents", "002_history_index"]);
    }

    #[test]
    fn test_status_check_constraint() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        run_migrations(&mut conn).unwrap();

        let result = conn.execute(
            "INSERT INTO uploaded_documents
                (staged_reference, original_name, file_type, size_bytes, content_sha256, status, uploaded_at)
             VALUES ('r', 'a.txt', 'txt', 1, 'x', 'archived', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
