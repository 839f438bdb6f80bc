//! SQLite schema definition

/// SQL schema for the vault index
pub const SCHEMA_SQL: &str = r#"
-- Documents: one row per markdown file, keyed by vault-relative path
CREATE TABLE IF NOT EXISTS file (
    id         TEXT NOT NULL,
    basename   TEXT NOT NULL,
    title      TEXT NOT NULL,
    hash       TEXT NOT NULL,
    in_degree  INTEGER DEFAULT 0 CHECK(in_degree  >= 0),
    out_degree INTEGER DEFAULT 0 CHECK(out_degree >= 0),
    PRIMARY KEY(id)
);

-- Tags found in a document body
CREATE TABLE IF NOT EXISTS tag (
    tag     TEXT NOT NULL,
    file_id TEXT NOT NULL,
    PRIMARY KEY(tag, file_id)
);

-- URLs found in a document body
CREATE TABLE IF NOT EXISTS url (
    url     TEXT NOT NULL,
    file_id TEXT NOT NULL,
    PRIMARY KEY(url, file_id)
);

-- Wikilinks; alias is '' when absent so the key still deduplicates
CREATE TABLE IF NOT EXISTS wikilink (
    reference TEXT NOT NULL,
    alias     TEXT NOT NULL DEFAULT '',
    file_id   TEXT NOT NULL,
    PRIMARY KEY(reference, alias, file_id)
);

-- Front-matter and labeled blocks as JSON
CREATE TABLE IF NOT EXISTS metadata (
    file_id TEXT NOT NULL,
    schema  TEXT NOT NULL,
    content TEXT NOT NULL,
    PRIMARY KEY(file_id, schema)
);

-- Headings
CREATE TABLE IF NOT EXISTS heading (
    heading TEXT NOT NULL,
    level   INTEGER NOT NULL,
    file_id TEXT NOT NULL,
    PRIMARY KEY(heading, level, file_id)
);

-- Indexes for degree computation and per-document cleanup
CREATE INDEX IF NOT EXISTS idx_file_basename ON file(basename);
CREATE INDEX IF NOT EXISTS idx_wikilink_file ON wikilink(file_id);
CREATE INDEX IF NOT EXISTS idx_tag_file ON tag(file_id);
CREATE INDEX IF NOT EXISTS idx_url_file ON url(file_id);
CREATE INDEX IF NOT EXISTS idx_heading_file ON heading(file_id);
"#;

/// Tables holding rows owned by a document, cleared before re-insertion
pub const DEPENDENT_TABLES: [&str; 5] = ["tag", "url", "wikilink", "metadata", "heading"];
