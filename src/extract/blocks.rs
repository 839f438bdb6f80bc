//! Lazy walk over a document's block structure

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A block of interest in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A heading with its level (1-6) and plain text
    Heading { level: u8, text: String },

    /// A code block with its info-string (empty for indented blocks) and raw content
    Code { info: String, literal: String },
}

/// Iterator yielding headings and code blocks in document order.
///
/// Front-matter is parsed as a metadata block and never yielded.
pub struct Blocks<'a> {
    events: Parser<'a>,
}

impl<'a> Blocks<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            events: Parser::new_ext(text, Options::ENABLE_YAML_STYLE_METADATA_BLOCKS),
        }
    }

    fn collect_until(&mut self, end: impl Fn(&TagEnd) -> bool) -> String {
        let mut text = String::new();
        for event in self.events.by_ref() {
            match event {
                Event::End(ref tag) if end(tag) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
        }
        text
    }
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let text = self.collect_until(|t| matches!(t, TagEnd::Heading(_)));
                    return Some(Block::Heading {
                        level: heading_level_to_u8(level),
                        text: text.trim().to_string(),
                    });
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info.trim().to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    let literal = self.collect_until(|t| matches!(t, TagEnd::CodeBlock));
                    return Some(Block::Code { info, literal });
                }
                Event::Start(Tag::MetadataBlock(_)) => {
                    self.collect_until(|t| matches!(t, TagEnd::MetadataBlock(_)));
                }
                _ => {}
            }
        }
        None
    }
}

/// Walk the block tree of `text`
pub fn blocks(text: &str) -> Blocks<'_> {
    Blocks::new(text)
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_code_blocks_in_order() {
        let markdown = "# Title\n\nText\n\n```!task\ndue: today\n```\n\n## Sub `code`\n";
        let found: Vec<Block> = blocks(markdown).collect();

        assert_eq!(
            found,
            vec![
                Block::Heading {
                    level: 1,
                    text: "Title".to_string()
                },
                Block::Code {
                    info: "!task".to_string(),
                    literal: "due: today\n".to_string()
                },
                Block::Heading {
                    level: 2,
                    text: "Sub code".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_front_matter_is_not_a_heading() {
        let markdown = "---\ntitle: x\n---\n# Real\n";
        let found: Vec<Block> = blocks(markdown).collect();
        assert_eq!(
            found,
            vec![Block::Heading {
                level: 1,
                text: "Real".to_string()
            }]
        );
    }

    #[test]
    fn test_indented_code_has_empty_info() {
        let markdown = "para\n\n    indented code\n";
        let found: Vec<Block> = blocks(markdown).collect();
        assert!(matches!(&found[0], Block::Code { info, .. } if info.is_empty()));
    }
}
