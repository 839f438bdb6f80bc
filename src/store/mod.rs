//! Vault index storage using SQLite
//!
//! This module owns the schema and every read and write against it:
//! - Documents (one row per file, with content hash and link degrees)
//! - Tags, URLs, wikilinks and headings owned by a document
//! - Metadata rows (front-matter and labeled blocks as JSON)
//!
//! Multi-statement operations run inside a transaction that only commits
//! once every statement succeeded.

mod schema;

pub use schema::*;

use crate::error::{Error, Result};
use crate::extract::{basename, DocumentFacts, HeadingFact, MetadataEntry, Wikilink};
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::FromRow;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const IN_DEGREE_SQL: &str = r#"
    SELECT file.id AS id, COUNT(wikilink.reference) AS degree
    FROM file
    LEFT JOIN wikilink ON file.basename = wikilink.reference
    GROUP BY file.id
    ORDER BY degree DESC
"#;

const OUT_DEGREE_SQL: &str = r#"
    SELECT file.id AS id, COUNT(wikilink.file_id) AS degree
    FROM file
    LEFT JOIN wikilink ON wikilink.file_id = file.id
    GROUP BY file.id
    ORDER BY degree DESC
"#;

/// A stored document row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub basename: String,
    pub title: String,
    pub hash: String,
    pub in_degree: i64,
    pub out_degree: i64,
}

/// One row of a degree aggregate
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DegreeRow {
    pub id: String,
    pub degree: i64,
}

/// Row counts per relation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexCounts {
    pub documents: usize,
    pub tags: usize,
    pub urls: usize,
    pub wikilinks: usize,
    pub metadata: usize,
    pub headings: usize,
}

/// Vault index database handle
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `db_path`
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create every relation if absent
    pub async fn create_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        let mut tx = self.pool.begin().await?;
        sqlx::query(SCHEMA_SQL).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ===== Document Operations =====

    /// Stored content hash for `id`, `None` when the document is unknown
    pub async fn get_content_hash(&self, id: &str) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>("SELECT hash FROM file WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    /// Insert or update a document row
    pub async fn upsert_document(&self, id: &str, title: &str, hash: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_file(&mut tx, id, &basename(id), title, hash).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Get a document by id
    pub async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let doc = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, basename, title, hash, in_degree, out_degree FROM file WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    /// Every document id in the store
    pub async fn list_document_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM file ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Remove a document and every row it owns, atomically
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_dependents(&mut tx, id).await?;
        sqlx::query("DELETE FROM file WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Persist everything extracted from one document in a single transaction.
    ///
    /// The document row is written first, then its previous dependent rows are
    /// cleared, then the new ones inserted. The inserts run one after another
    /// on the transaction's connection: SQLite admits a single writer, and a
    /// failure anywhere leaves none of this document's new rows behind.
    pub async fn write_document(
        &self,
        facts: &DocumentFacts,
        front_matter_schema: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        upsert_file(&mut tx, &facts.id, &facts.basename, &facts.title, &facts.hash).await?;
        clear_dependents(&mut tx, &facts.id).await?;
        insert_tags(&mut tx, &facts.id, &facts.tags).await?;
        insert_urls(&mut tx, &facts.id, &facts.urls).await?;
        insert_wikilinks(&mut tx, &facts.id, &facts.wikilinks).await?;
        insert_headings(&mut tx, &facts.id, &facts.headings).await?;
        for entry in facts.metadata(front_matter_schema) {
            put_metadata(&mut tx, &facts.id, &entry.schema, &entry.content).await?;
        }

        tx.commit().await?;
        debug!(id = %facts.id, "Wrote document");
        Ok(())
    }

    // ===== Dependent Row Operations =====

    /// Replace the tags of a document
    pub async fn replace_tags(&self, id: &str, tags: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_table(&mut tx, "tag", id).await?;
        insert_tags(&mut tx, id, tags).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace the URLs of a document
    pub async fn replace_urls(&self, id: &str, urls: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_table(&mut tx, "url", id).await?;
        insert_urls(&mut tx, id, urls).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace the wikilinks of a document
    pub async fn replace_wikilinks(&self, id: &str, links: &[Wikilink]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_table(&mut tx, "wikilink", id).await?;
        insert_wikilinks(&mut tx, id, links).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace the headings of a document
    pub async fn replace_headings(&self, id: &str, headings: &[HeadingFact]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_table(&mut tx, "heading", id).await?;
        insert_headings(&mut tx, id, headings).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert or replace one metadata row
    pub async fn upsert_metadata(&self, id: &str, schema: &str, content: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        put_metadata(&mut tx, id, schema, content).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_tags(&self, id: &str) -> Result<Vec<String>> {
        let tags = sqlx::query_scalar::<_, String>(
            "SELECT tag FROM tag WHERE file_id = ? ORDER BY tag",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    pub async fn list_urls(&self, id: &str) -> Result<Vec<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT url FROM url WHERE file_id = ? ORDER BY url",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(urls)
    }

    pub async fn list_wikilinks(&self, id: &str) -> Result<Vec<Wikilink>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT reference, alias FROM wikilink WHERE file_id = ? ORDER BY reference, alias",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(reference, alias)| Wikilink {
                reference,
                alias: if alias.is_empty() { None } else { Some(alias) },
            })
            .collect())
    }

    pub async fn list_headings(&self, id: &str) -> Result<Vec<HeadingFact>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT heading, level FROM heading WHERE file_id = ? ORDER BY level, heading",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(text, level)| HeadingFact {
                text,
                level: level as u8,
            })
            .collect())
    }

    pub async fn list_metadata(&self, id: &str) -> Result<Vec<MetadataEntry>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT schema, content FROM metadata WHERE file_id = ? ORDER BY schema",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(schema, content)| MetadataEntry { schema, content })
            .collect())
    }

    // ===== Graph Operations =====

    /// Stream incoming wikilink counts per document, matched by basename
    pub fn compute_in_degree(&self) -> impl Stream<Item = Result<DegreeRow>> + Send + '_ {
        sqlx::query_as::<_, DegreeRow>(IN_DEGREE_SQL)
            .fetch(&self.pool)
            .map_err(Error::from)
    }

    /// Stream outgoing wikilink counts per document
    pub fn compute_out_degree(&self) -> impl Stream<Item = Result<DegreeRow>> + Send + '_ {
        sqlx::query_as::<_, DegreeRow>(OUT_DEGREE_SQL)
            .fetch(&self.pool)
            .map_err(Error::from)
    }

    /// Write one in-degree row back to its document
    pub async fn set_in_degree(&self, row: &DegreeRow) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE file SET in_degree = ? WHERE id = ?")
            .bind(row.degree)
            .bind(&row.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Write one out-degree row back to its document
    pub async fn set_out_degree(&self, row: &DegreeRow) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE file SET out_degree = ? WHERE id = ?")
            .bind(row.degree)
            .bind(&row.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // ===== Statistics =====

    /// Row counts for every relation
    pub async fn counts(&self) -> Result<IndexCounts> {
        let mut counts = [0usize; 6];
        for (slot, table) in counts
            .iter_mut()
            .zip(["file", "tag", "url", "wikilink", "metadata", "heading"])
        {
            let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await?;
            *slot = n as usize;
        }

        let [documents, tags, urls, wikilinks, metadata, headings] = counts;
        Ok(IndexCounts {
            documents,
            tags,
            urls,
            wikilinks,
            metadata,
            headings,
        })
    }
}

async fn upsert_file(
    conn: &mut SqliteConnection,
    id: &str,
    basename: &str,
    title: &str,
    hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO file (id, basename, title, hash)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            basename = excluded.basename,
            title = excluded.title,
            hash = excluded.hash
        "#,
    )
    .bind(id)
    .bind(basename)
    .bind(title)
    .bind(hash)
    .execute(conn)
    .await?;
    Ok(())
}

async fn clear_table(conn: &mut SqliteConnection, table: &str, id: &str) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE file_id = ?", table))
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn clear_dependents(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    for table in DEPENDENT_TABLES {
        clear_table(&mut *conn, table, id).await?;
    }
    Ok(())
}

async fn insert_tags(conn: &mut SqliteConnection, id: &str, tags: &[String]) -> Result<()> {
    for tag in tags {
        sqlx::query("INSERT OR IGNORE INTO tag (tag, file_id) VALUES (?, ?)")
            .bind(tag)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_urls(conn: &mut SqliteConnection, id: &str, urls: &[String]) -> Result<()> {
    for url in urls {
        sqlx::query("INSERT OR IGNORE INTO url (url, file_id) VALUES (?, ?)")
            .bind(url)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_wikilinks(conn: &mut SqliteConnection, id: &str, links: &[Wikilink]) -> Result<()> {
    for link in links {
        sqlx::query("INSERT OR IGNORE INTO wikilink (reference, alias, file_id) VALUES (?, ?, ?)")
            .bind(&link.reference)
            .bind(link.alias.as_deref().unwrap_or(""))
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_headings(
    conn: &mut SqliteConnection,
    id: &str,
    headings: &[HeadingFact],
) -> Result<()> {
    for heading in headings {
        sqlx::query("INSERT OR IGNORE INTO heading (heading, level, file_id) VALUES (?, ?, ?)")
            .bind(&heading.text)
            .bind(heading.level as i64)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn put_metadata(
    conn: &mut SqliteConnection,
    id: &str,
    schema: &str,
    content: &str,
) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO metadata (file_id, schema, content) VALUES (?, ?, ?)")
        .bind(id)
        .bind(schema)
        .bind(content)
        .execute(conn)
        .await?;
    Ok(())
}
