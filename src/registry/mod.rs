//! Upload history kept in SQLite.
//!
//! Bookkeeping only: the ingestion pipeline treats a failed `record` as a
//! warning, never as a failed upload.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::Db;
use crate::error::{Result, RodeoError};
use crate::ingest::{DocumentStatus, UploadedDocument};

/// Default number of rows returned by `list_recent`
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const SELECT_COLUMNS: &str = "original_name, staged_reference, file_type, size_bytes, \
                              content_sha256, status, uploaded_at";

/// Position of `uploaded_at` in `SELECT_COLUMNS`
const UPLOADED_AT_COLUMN: usize = 6;

/// Metadata registry over the `uploaded_documents` table
#[derive(Debug, Clone)]
pub struct MetadataRegistry {
    db: Db,
}

impl MetadataRegistry {
    /// Wrap a database whose migrations have already run
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Open `db` and apply pending migrations
    pub async fn open(db: Db) -> Result<Self> {
        db.with_connection(|conn| crate::db::migrate::run_migrations(conn)).await?;
        Ok(Self::new(db))
    }

    /// Insert one upload
    pub async fn record(&self, doc: &UploadedDocument) -> Result<()> {
        let doc = doc.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO uploaded_documents (
                        staged_reference, original_name, file_type, size_bytes,
                        content_sha256, status, uploaded_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        doc.staged_reference,
                        doc.original_name,
                        doc.file_type.as_str(),
                        doc.size_bytes as i64,
                        doc.content_sha256,
                        doc.status.as_str(),
                        doc.uploaded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| RodeoError::MetadataWrite(e.to_string()))
    }

    /// Most recent uploads with `status`, newest first
    pub async fn list_recent(&self, status: DocumentStatus, limit: usize) -> Result<Vec<UploadedDocument>> {
        let limit = limit as i64;
        self.db
            .with_connection(move |conn| {
                let sql = format!(
                    "SELECT {} FROM uploaded_documents \
                     WHERE status = ?1 \
                     ORDER BY uploaded_at DESC, id DESC \
                     LIMIT ?2",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query(params![status.as_str(), limit])?;

                let mut docs = Vec::new();
                while let Some(row) = rows.next()? {
                    docs.push(row_to_document(row)?);
                }
                Ok(docs)
            })
            .await
    }

    /// Look up one upload by staged reference
    pub async fn get(&self, staged_reference: &str) -> Result<Option<UploadedDocument>> {
        let reference = staged_reference.to_string();
        self.db
            .with_connection(move |conn| {
                let sql = format!(
                    "SELECT {} FROM uploaded_documents WHERE staged_reference = ?1",
                    SELECT_COLUMNS
                );
                let raw = conn
                    .query_row(&sql, params![reference], |row| RawRow::read(row))
                    .optional()?;
                raw.map(RawRow::into_document).transpose()
            })
            .await
    }

    /// Change the status of an upload. Returns false if no row matched.
    pub async fn set_status(&self, staged_reference: &str, status: DocumentStatus) -> Result<bool> {
        let reference = staged_reference.to_string();
        self.db
            .with_connection(move |conn| {
                let changed = conn.execute(
                    "UPDATE uploaded_documents SET status = ?1 WHERE staged_reference = ?2",
                    params![status.as_str(), reference],
                )?;
                Ok(changed > 0)
            })
            .await
    }
}

/// Column values as stored, before parsing into domain types
struct RawRow {
    original_name: String,
    staged_reference: String,
    file_type: String,
    size_bytes: i64,
    content_sha256: String,
    status: String,
    uploaded_at: String,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            original_name: row.get(0)?,
            staged_reference: row.get(1)?,
            file_type: row.get(2)?,
            size_bytes: row.get(3)?,
            content_sha256: row.get(4)?,
            status: row.get(5)?,
            uploaded_at: row.get(UPLOADED_AT_COLUMN)?,
        })
    }

    fn into_document(self) -> Result<UploadedDocument> {
        let uploaded_at = DateTime::parse_from_rfc3339(&self.uploaded_at)
            .map_err(|e| {
                RodeoError::Database(rusqlite::Error::FromSqlConversionFailure(
                    UPLOADED_AT_COLUMN,
                    Type::Text,
                    Box::new(e),
                ))
            })?
            .with_timezone(&Utc);

        Ok(UploadedDocument {
            original_name: self.original_name,
            staged_reference: self.staged_reference,
            file_type: self.file_type.parse()?,
            size_bytes: self.size_bytes.max(0) as u64,
            content_sha256: self.content_sha256,
            status: self.status.parse()?,
            uploaded_at,
        })
    }
}

fn row_to_document(row: &Row<'_>) -> Result<UploadedDocument> {
    RawRow::read(row)?.into_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FileType;
    use chrono::Duration;
    use tempfile::TempDir;

    fn doc(reference: &str, name: &str, at: DateTime<Utc>) -> UploadedDocument {
        UploadedDocument {
            original_name: name.to_string(),
            staged_reference: reference.to_string(),
            file_type: FileType::from_filename(name),
            size_bytes: 42,
            content_sha256: "ab".repeat(32),
            status: DocumentStatus::Active,
            uploaded_at: at,
        }
    }

    async fn registry(temp_dir: &TempDir) -> MetadataRegistry {
        MetadataRegistry::open(Db::new(temp_dir.path().join("registry.db")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;
        let now = Utc::now();

        let original = doc("1_abc_report.pdf", "report.pdf", now);
        registry.record(&original).await.unwrap();

        let loaded = registry.get("1_abc_report.pdf").await.unwrap().unwrap();
        assert_eq!(loaded.original_name, "report.pdf");
        assert_eq!(loaded.file_type, FileType::Pdf);
        assert_eq!(loaded.size_bytes, 42);
        assert_eq!(loaded.status, DocumentStatus::Active);
        assert_eq!(loaded.uploaded_at.timestamp_micros(), now.timestamp_micros());

        assert!(registry.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_with_limit() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;
        let base = Utc::now();

        for i in 0..12 {
            let at = base + Duration::seconds(i);
            registry
                .record(&doc(&format!("{}_ref_doc.txt", i), &format!("doc{}.txt", i), at))
                .await
                .unwrap();
        }

        let recent = registry.list_recent(DocumentStatus::Active, DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].original_name, "doc11.txt");
        assert_eq!(recent[9].original_name, "doc2.txt");
    }

    #[tokio::test]
    async fn test_list_recent_empty() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;

        let recent = registry.list_recent(DocumentStatus::Active, 10).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_same_second_uploads_ordered_by_insert() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;
        let at = Utc::now();

        registry.record(&doc("a_doc.pdf", "doc.pdf", at)).await.unwrap();
        registry.record(&doc("b_doc.pdf", "doc.pdf", at)).await.unwrap();

        let recent = registry.list_recent(DocumentStatus::Active, 10).await.unwrap();
        let refs: Vec<&str> = recent.iter().map(|d| d.staged_reference.as_str()).collect();
        assert_eq!(refs, vec!["b_doc.pdf", "a_doc.pdf"]);
    }

    #[tokio::test]
    async fn test_set_status_filters_listing() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;
        let now = Utc::now();

        registry.record(&doc("keep.txt", "keep.txt", now)).await.unwrap();
        registry.record(&doc("drop.txt", "drop.txt", now)).await.unwrap();

        assert!(registry.set_status("drop.txt", DocumentStatus::Removed).await.unwrap());
        assert!(!registry.set_status("nope.txt", DocumentStatus::Removed).await.unwrap());

        let active = registry.list_recent(DocumentStatus::Active, 10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].staged_reference, "keep.txt");

        let removed = registry.list_recent(DocumentStatus::Removed, 10).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].staged_reference, "drop.txt");
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_metadata_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;
        let now = Utc::now();

        registry.record(&doc("dup.txt", "dup.txt", now)).await.unwrap();
        let err = registry.record(&doc("dup.txt", "dup.txt", now)).await.unwrap_err();
        assert!(matches!(err, RodeoError::MetadataWrite(_)));
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_is_database_error() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir).await;

        registry
            .db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO uploaded_documents (staged_reference, original_name, file_type, \
                     size_bytes, content_sha256, status, uploaded_at) \
                     VALUES ('bad.txt', 'bad.txt', 'txt', 1, 'x', 'active', 'yesterday')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = registry.get("bad.txt").await.unwrap_err();
        assert!(matches!(
            err,
            RodeoError::Database(rusqlite::Error::FromSqlConversionFailure(UPLOADED_AT_COLUMN, _, _))
        ));
    }

    #[tokio::test]
    async fn test_record_without_schema_fails() {
        let temp_dir = TempDir::new().unwrap();
        let registry = MetadataRegistry::new(Db::new(temp_dir.path().join("bare.db")));

        let err = registry.record(&doc("x.txt", "x.txt", Utc::now())).await.unwrap_err();
        assert!(matches!(err, RodeoError::MetadataWrite(_)));
    }
}
