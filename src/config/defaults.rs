//! Default values for configuration

/// Default number of concurrent extraction workers
pub fn default_workers() -> usize {
    20
}

/// Default document file extensions
pub fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

/// Default trash directory, skipped during enumeration
pub fn default_trash_dir() -> String {
    ".trash".to_string()
}

/// Default front-matter delimiter line prefix
pub fn default_front_matter_delimiter() -> String {
    "---".to_string()
}

/// Reserved metadata schema label for front-matter rows
pub fn default_front_matter_schema() -> String {
    "!frontmatter".to_string()
}

/// Info-string prefix that marks a fenced code block as labeled metadata
pub fn default_block_marker() -> String {
    "!".to_string()
}

/// Separator used when deriving a title from a document path
pub fn default_title_separator() -> String {
    "-".to_string()
}

/// Default SQLite database file (~/.vaultdex.sqlite)
pub fn default_db_file() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".vaultdex.sqlite")
}
