//! Document extraction
//!
//! Pure functions that turn a document's raw text into the facts stored for it:
//! - content hash
//! - title and basename
//! - front-matter
//! - wikilinks, tags and URLs from the body
//! - headings and labeled metadata blocks from the block tree
//!
//! Nothing in here touches the store or the file system.

mod blocks;
mod yaml;

pub use blocks::*;
pub use yaml::*;

use crate::config::ExtractConfig;
use crate::error::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;
use xxhash_rust::xxh32::xxh32;

/// Front-matter as an ordered map of loosely-typed values
pub type FrontMatter = Map<String, Value>;

/// A reference from one document to another by basename
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wikilink {
    pub reference: String,
    pub alias: Option<String>,
}

/// A heading found in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingFact {
    pub text: String,
    pub level: u8,
}

/// A metadata row: schema label plus JSON content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub schema: String,
    pub content: String,
}

/// Everything extracted from one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFacts {
    pub id: String,
    pub basename: String,
    pub title: String,
    pub hash: String,
    pub front_matter: FrontMatter,
    pub wikilinks: Vec<Wikilink>,
    pub tags: Vec<String>,
    pub urls: Vec<String>,
    pub headings: Vec<HeadingFact>,
    /// Labeled blocks converted to JSON, keyed by their info-string
    pub blocks: Vec<MetadataEntry>,
}

impl DocumentFacts {
    /// Front-matter row followed by labeled block rows
    pub fn metadata(&self, front_matter_schema: &str) -> Vec<MetadataEntry> {
        let mut rows = Vec::with_capacity(self.blocks.len() + 1);
        rows.push(MetadataEntry {
            schema: front_matter_schema.to_string(),
            content: Value::Object(self.front_matter.clone()).to_string(),
        });
        rows.extend(self.blocks.iter().cloned());
        rows
    }
}

/// Result of extracting a document: the facts plus any labeled blocks
/// that were skipped because they could not be converted
#[derive(Debug)]
pub struct Extraction {
    pub facts: DocumentFacts,
    pub rejected: Vec<Error>,
}

/// Compute the content hash of a document's raw bytes
pub fn hash_content(bytes: &[u8]) -> String {
    xxh32(bytes, 0).to_string()
}

/// Path minus directory and extension
pub fn basename(id: &str) -> String {
    let last = id.rsplit(['/', '\\']).next().unwrap_or(id);
    match last.rfind('.') {
        Some(idx) if idx > 0 => last[..idx].to_string(),
        _ => last.to_string(),
    }
}

/// Final `separator`-delimited segment of the path with its extension removed
pub fn derive_title(id: &str, separator: &str) -> String {
    let stem = strip_extension(id);
    stem.rsplit(separator).next().unwrap_or(stem).to_string()
}

fn strip_extension(id: &str) -> &str {
    let dir_end = id.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match id[dir_end..].rfind('.') {
        Some(idx) if idx > 0 => &id[..dir_end + idx],
        _ => id,
    }
}

/// Split `text` into its front-matter section and body.
///
/// Delimiter lines are every line starting with `delimiter`. With at least two
/// of them, the front-matter is the text between the first two and the body is
/// everything from the second one onward. Otherwise both are empty.
pub fn split_sections<'a>(text: &'a str, delimiter: &str) -> (&'a str, &'a str) {
    let mut bounds = Vec::with_capacity(2);
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.starts_with(delimiter) {
            bounds.push((offset, offset + line.len()));
            if bounds.len() == 2 {
                break;
            }
        }
        offset += line.len();
    }

    match bounds.as_slice() {
        [(_, first_end), (second_start, _)] => {
            (&text[*first_end..*second_start], &text[*second_start..])
        }
        _ => ("", ""),
    }
}

/// Parse a front-matter section, falling back to an empty map when it is
/// malformed or not a mapping
pub fn parse_front_matter(section: &str) -> FrontMatter {
    let parsed = serde_yaml::from_str::<serde_yaml::Value>(section)
        .map_err(Error::from)
        .and_then(to_json_value);

    match parsed {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => FrontMatter::new(),
        Ok(other) => {
            debug!("Front-matter is not a mapping: {}", other);
            FrontMatter::new()
        }
        Err(e) => {
            debug!("Ignoring malformed front-matter: {}", e);
            FrontMatter::new()
        }
    }
}

fn wikilink_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[{2}[^\[]+\]{2}").expect("wikilink pattern is valid"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|[^\w#/])(#[a-zA-Z_]*[a-zA-Z])").expect("tag pattern is valid")
    })
}

/// Find `[[reference]]` and `[[reference|alias]]` spans
pub fn find_wikilinks(body: &str) -> Vec<Wikilink> {
    wikilink_pattern()
        .find_iter(body)
        .map(|m| {
            let link = m.as_str();
            let target = &link[2..link.len() - 2];
            match target.split_once('|') {
                Some((reference, alias)) => Wikilink {
                    reference: reference.to_string(),
                    alias: Some(alias.to_string()),
                },
                None => Wikilink {
                    reference: target.to_string(),
                    alias: None,
                },
            }
        })
        .collect()
}

/// Find `#tag` tokens. A tag may follow whitespace or punctuation but
/// never a word character, `#` or `/`, which keeps URL fragments out.
pub fn find_tags(body: &str) -> Vec<String> {
    tag_pattern()
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// URL extraction is not implemented yet; always empty
pub fn find_urls(_body: &str) -> Vec<String> {
    Vec::new()
}

/// Pure extractor configured with the vault's conventions
#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractConfig,
}

impl Extractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract every fact from `text`. `hash` is the already computed content hash.
    pub fn extract(&self, id: &str, text: &str, hash: String) -> Extraction {
        let (section, body) = split_sections(text, &self.config.front_matter_delimiter);
        let front_matter = parse_front_matter(section);

        let mut headings = Vec::new();
        let mut converted = Vec::new();
        let mut rejected = Vec::new();

        for block in blocks(text) {
            match block {
                Block::Heading { level, text } => headings.push(HeadingFact { text, level }),
                Block::Code { info, literal } if info.starts_with(&self.config.block_marker) => {
                    match yaml_to_json(&literal) {
                        Ok(content) => converted.push(MetadataEntry {
                            schema: info,
                            content,
                        }),
                        Err(e) => rejected.push(Error::BlockConversion {
                            path: id.to_string(),
                            label: info,
                            content: literal,
                            message: e.to_string(),
                        }),
                    }
                }
                Block::Code { .. } => {}
            }
        }

        let facts = DocumentFacts {
            id: id.to_string(),
            basename: basename(id),
            title: derive_title(id, &self.config.title_separator),
            hash,
            front_matter,
            wikilinks: find_wikilinks(body),
            tags: find_tags(body),
            urls: find_urls(body),
            headings,
            blocks: converted,
        };

        Extraction { facts, rejected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(ExtractConfig::default())
    }

    #[test]
    fn test_wikilink_with_alias() {
        let links = find_wikilinks("see [[Target|Shown]] now");
        assert_eq!(
            links,
            vec![Wikilink {
                reference: "Target".to_string(),
                alias: Some("Shown".to_string()),
            }]
        );
    }

    #[test]
    fn test_wikilink_without_alias() {
        let links = find_wikilinks("[[Solo]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].reference, "Solo");
        assert_eq!(links[0].alias, None);
    }

    #[test]
    fn test_wikilink_splits_once_on_pipe() {
        let links = find_wikilinks("[[a|b|c]] and [[d]]");
        assert_eq!(links[0].reference, "a");
        assert_eq!(links[0].alias.as_deref(), Some("b|c"));
        assert_eq!(links[1].reference, "d");
    }

    #[test]
    fn test_tags_letters_and_underscore_only() {
        assert_eq!(find_tags("#foo bar #Baz_1"), vec!["#foo", "#Baz"]);
        assert_eq!(find_tags("#snake_case end"), vec!["#snake_case"]);
    }

    #[test]
    fn test_tags_need_a_boundary() {
        assert!(find_tags("issue#12 and http://x.org/page#frag").is_empty());
        assert!(find_tags("# Heading").is_empty());
        assert_eq!(find_tags("line\n#start"), vec!["#start"]);
    }

    #[test]
    fn test_tags_next_to_punctuation() {
        assert_eq!(find_tags("(#idea)"), vec!["#idea"]);
        assert_eq!(find_tags("tags:#a,#b"), vec!["#a", "#b"]);
        assert_eq!(find_tags("**#bold**"), vec!["#bold"]);
        assert!(find_tags("a##double and a/#path").is_empty());
    }

    #[test]
    fn test_urls_not_extracted() {
        assert!(find_urls("https://example.com").is_empty());
    }

    #[test]
    fn test_hash_sensitivity() {
        let a = hash_content(b"hello world");
        assert_eq!(a, hash_content(b"hello world"));
        assert_ne!(a, hash_content(b"hello world!"));
        assert!(a.parse::<u32>().is_ok());
    }

    #[test]
    fn test_basename_and_title() {
        assert_eq!(basename("notes/2021-01-Topic.md"), "2021-01-Topic");
        assert_eq!(basename("Plain.md"), "Plain");
        assert_eq!(basename("dir/v1.2.md"), "v1.2");
        assert_eq!(derive_title("notes/2021-01-Topic.md", "-"), "Topic");
        assert_eq!(derive_title("notes/plain.md", "-"), "notes/plain");
    }

    #[test]
    fn test_split_sections() {
        let text = "---\ntitle: T\n---\nbody #tag\n";
        let (front, body) = split_sections(text, "---");
        assert_eq!(front, "title: T\n");
        assert_eq!(body, "---\nbody #tag\n");
    }

    #[test]
    fn test_split_sections_needs_two_delimiters() {
        let (front, body) = split_sections("no front matter [[X]]\n", "---");
        assert_eq!(front, "");
        assert_eq!(body, "");

        let (front, body) = split_sections("---\nonly one\n", "---");
        assert_eq!(front, "");
        assert_eq!(body, "");
    }

    #[test]
    fn test_split_sections_crlf() {
        let text = "---\r\na: 1\r\n---\r\n[[L]]\r\n";
        let (front, body) = split_sections(text, "---");
        assert_eq!(front, "a: 1\r\n");
        assert!(body.contains("[[L]]"));
    }

    #[test]
    fn test_malformed_front_matter_is_empty() {
        assert!(parse_front_matter("title: [oops").is_empty());
        assert!(parse_front_matter("- just\n- a list\n").is_empty());
        assert!(parse_front_matter("").is_empty());

        let fm = parse_front_matter("title: Hello\ncount: 3\n");
        assert_eq!(fm.get("title"), Some(&Value::String("Hello".to_string())));
        assert_eq!(fm.get("count"), Some(&Value::from(3)));
    }

    #[test]
    fn test_extract_full_document() {
        let text = "---\ntitle: Note\n---\n# Heading\n\nLinks to [[Other|alias]] #topic\n\n```!task\ndue: 2024-01-01\n```\n\n```rust\nfn main() {}\n```\n";
        let extraction = extractor().extract("daily-Note.md", text, hash_content(text.as_bytes()));
        let facts = extraction.facts;

        assert!(extraction.rejected.is_empty());
        assert_eq!(facts.basename, "daily-Note");
        assert_eq!(facts.title, "Note");
        assert_eq!(facts.front_matter.get("title"), Some(&Value::from("Note")));
        assert_eq!(facts.wikilinks.len(), 1);
        assert_eq!(facts.tags, vec!["#topic"]);
        assert_eq!(
            facts.headings,
            vec![HeadingFact {
                text: "Heading".to_string(),
                level: 1
            }]
        );
        assert_eq!(
            facts.blocks,
            vec![MetadataEntry {
                schema: "!task".to_string(),
                content: r#"{"due":"2024-01-01"}"#.to_string(),
            }]
        );

        let rows = facts.metadata("!frontmatter");
        assert_eq!(rows[0].schema, "!frontmatter");
        assert_eq!(rows[0].content, r#"{"title":"Note"}"#);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_bad_labeled_block_is_rejected_but_facts_survive() {
        let text = "---\na: 1\n---\n[[Kept]]\n\n```!broken\nkey: [unclosed\n```\n";
        let extraction = extractor().extract("n.md", text, "1".to_string());

        assert_eq!(extraction.rejected.len(), 1);
        match &extraction.rejected[0] {
            Error::BlockConversion {
                path,
                label,
                content,
                ..
            } => {
                assert_eq!(path, "n.md");
                assert_eq!(label, "!broken");
                assert!(content.contains("key: [unclosed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(extraction.facts.blocks.is_empty());
        assert_eq!(extraction.facts.wikilinks[0].reference, "Kept");
    }
}
