// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared document tree for multi-format conversion
//!
//! Every supported input format parses into this tree and every output format
//! renders from it. The tree is built once per conversion and is read-only
//! afterwards; the only supported mutation is whole-tree duplication via
//! `Clone`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Input format identifier, used for dispatch and provenance tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Text,
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl InputFormat {
    /// Canonical lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// File extension for this format
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// True for formats that arrive as opaque byte containers
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Pdf | Self::Docx)
    }

    /// All accepted input formats
    pub const ALL: [Self; 5] = [
        Self::Text,
        Self::Markdown,
        Self::Html,
        Self::Pdf,
        Self::Docx,
    ];
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(Error::format(s)),
        }
    }
}

/// Output format identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl OutputFormat {
    /// Canonical lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// File extension for this format
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// True for formats delivered as byte sequences rather than text
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Pdf | Self::Docx)
    }

    /// All supported output formats
    pub const ALL: [Self; 4] = [Self::Markdown, Self::Html, Self::Pdf, Self::Docx];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(Error::format(s)),
        }
    }
}

/// Document metadata supplied by the caller or recovered from front matter
///
/// All fields are optional; renderers degrade gracefully when a field is
/// absent. Keys outside the recognized set are preserved in `extra` and must
/// never break a renderer that does not understand them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Caller-supplied keys preserved opaquely, in stable order
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, MetaValue>,
}

impl DocMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.date.is_none()
            && self.description.is_none()
            && self.keywords.is_empty()
            && self.extra.is_empty()
    }
}

/// Metadata value (recursive for nested structures)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

/// The root document node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source_format: InputFormat,
    pub meta: DocMeta,
    pub content: Vec<Block>,
}

impl Document {
    /// Create a new empty document
    pub fn new(format: InputFormat) -> Self {
        Self {
            source_format: format,
            meta: DocMeta::default(),
            content: Vec::new(),
        }
    }

    /// Flatten every inline text node into one string, blocks separated by
    /// newlines
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if !out.is_empty() {
                out.push('\n');
            }
            block.collect_text(&mut out);
        }
        out
    }

    /// A document is empty when it has no blocks or only whitespace text
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() || self.plain_text().trim().is_empty()
    }

    /// Count words in the document
    pub fn word_count(&self) -> usize {
        self.content.iter().map(|b| b.word_count()).sum()
    }

    /// Count characters in the document
    pub fn char_count(&self) -> usize {
        self.content.iter().map(|b| b.char_count()).sum()
    }
}

/// Block-level elements (structural)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Plain paragraph
    Paragraph { content: Vec<Inline> },

    /// Heading with depth 1-6
    Heading { depth: u8, content: Vec<Inline> },

    /// Ordered or unordered list; `ordered` is fixed at creation time
    List { ordered: bool, items: Vec<ListItem> },

    /// Code block with optional language tag
    CodeBlock {
        language: Option<String>,
        content: String,
    },

    /// Block quote (may nest blocks)
    BlockQuote { content: Vec<Block> },

    /// Horizontal rule / thematic break
    ThematicBreak,
}

impl Block {
    /// Paragraph from a single text run
    pub fn text_paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            content: vec![Inline::Text {
                content: text.into(),
            }],
        }
    }

    /// Heading from a single text run, depth clamped to 1-6
    pub fn text_heading(depth: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            depth: depth.clamp(1, 6),
            content: vec![Inline::Text {
                content: text.into(),
            }],
        }
    }

    /// Flattened text of this block, inline markup dropped
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                for inline in content {
                    inline.collect_text(out);
                }
            }
            Block::List { items, .. } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    for block in &item.content {
                        block.collect_text(out);
                    }
                }
            }
            Block::CodeBlock { content, .. } => out.push_str(content),
            Block::BlockQuote { content } => {
                for (i, block) in content.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    block.collect_text(out);
                }
            }
            Block::ThematicBreak => {}
        }
    }

    /// Count words in this block
    pub fn word_count(&self) -> usize {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                content.iter().map(|i| i.word_count()).sum()
            }
            Block::List { items, .. } => items
                .iter()
                .flat_map(|i| &i.content)
                .map(|b| b.word_count())
                .sum(),
            Block::CodeBlock { content, .. } => content.split_whitespace().count(),
            Block::BlockQuote { content } => content.iter().map(|b| b.word_count()).sum(),
            Block::ThematicBreak => 0,
        }
    }

    /// Count characters in this block
    pub fn char_count(&self) -> usize {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                content.iter().map(|i| i.char_count()).sum()
            }
            Block::List { items, .. } => items
                .iter()
                .flat_map(|i| &i.content)
                .map(|b| b.char_count())
                .sum(),
            Block::CodeBlock { content, .. } => content.chars().count(),
            Block::BlockQuote { content } => content.iter().map(|b| b.char_count()).sum(),
            Block::ThematicBreak => 0,
        }
    }
}

/// A single list entry, typically holding one paragraph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub content: Vec<Block>,
}

impl ListItem {
    pub fn new(content: Vec<Block>) -> Self {
        Self { content }
    }

    /// Item from a single text run
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Block::text_paragraph(text)],
        }
    }
}

/// Inline elements (character-level)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    /// Plain text
    Text { content: String },

    /// Strong emphasis (usually bold)
    Strong { content: Vec<Inline> },

    /// Emphasis (usually italic)
    Emphasis { content: Vec<Inline> },

    /// Inline code
    Code { content: String },

    /// Hyperlink
    Link { url: String, content: Vec<Inline> },

    /// Image reference
    Image { url: String, alt: String },

    /// Hard line break
    LineBreak,
}

impl Inline {
    /// Plain text inline
    pub fn text(content: impl Into<String>) -> Self {
        Inline::Text {
            content: content.into(),
        }
    }

    /// Flattened text of this inline, markup dropped
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Inline::Text { content } | Inline::Code { content } => out.push_str(content),
            Inline::Strong { content } | Inline::Emphasis { content } => {
                for inline in content {
                    inline.collect_text(out);
                }
            }
            Inline::Link { content, .. } => {
                for inline in content {
                    inline.collect_text(out);
                }
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::LineBreak => out.push('\n'),
        }
    }

    /// Count words in this inline element
    pub fn word_count(&self) -> usize {
        match self {
            Inline::Text { content } | Inline::Code { content } => {
                content.split_whitespace().count()
            }
            Inline::Strong { content } | Inline::Emphasis { content } => {
                content.iter().map(|i| i.word_count()).sum()
            }
            Inline::Link { content, .. } => content.iter().map(|i| i.word_count()).sum(),
            Inline::Image { alt, .. } => alt.split_whitespace().count(),
            Inline::LineBreak => 0,
        }
    }

    /// Count characters in this inline element
    pub fn char_count(&self) -> usize {
        match self {
            Inline::Text { content } | Inline::Code { content } => content.chars().count(),
            Inline::Strong { content } | Inline::Emphasis { content } => {
                content.iter().map(|i| i.char_count()).sum()
            }
            Inline::Link { content, .. } => content.iter().map(|i| i.char_count()).sum(),
            Inline::Image { alt, .. } => alt.chars().count(),
            Inline::LineBreak => 0,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn input_format_strategy() -> impl Strategy<Value = InputFormat> {
        prop_oneof![
            Just(InputFormat::Text),
            Just(InputFormat::Markdown),
            Just(InputFormat::Html),
            Just(InputFormat::Pdf),
            Just(InputFormat::Docx),
        ]
    }

    fn output_format_strategy() -> impl Strategy<Value = OutputFormat> {
        prop_oneof![
            Just(OutputFormat::Markdown),
            Just(OutputFormat::Html),
            Just(OutputFormat::Pdf),
            Just(OutputFormat::Docx),
        ]
    }

    // Simple text without special characters, for JSON-safety in roundtrips
    fn simple_text_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{0,80}".prop_map(|s| s.trim().to_string())
    }

    fn simple_inline_strategy() -> impl Strategy<Value = Inline> {
        prop_oneof![
            simple_text_strategy().prop_map(|content| Inline::Text { content }),
            simple_text_strategy().prop_map(|content| Inline::Code { content }),
            Just(Inline::LineBreak),
        ]
    }

    fn simple_block_strategy() -> impl Strategy<Value = Block> {
        prop_oneof![
            prop::collection::vec(simple_inline_strategy(), 0..5)
                .prop_map(|content| Block::Paragraph { content }),
            (1u8..=6, prop::collection::vec(simple_inline_strategy(), 1..4))
                .prop_map(|(depth, content)| Block::Heading { depth, content }),
            (proptest::option::of("[a-z]+"), simple_text_strategy())
                .prop_map(|(language, content)| Block::CodeBlock { language, content }),
            Just(Block::ThematicBreak),
        ]
    }

    fn document_strategy() -> impl Strategy<Value = Document> {
        (
            input_format_strategy(),
            prop::collection::vec(simple_block_strategy(), 0..8),
        )
            .prop_map(|(source_format, content)| Document {
                source_format,
                meta: DocMeta::default(),
                content,
            })
    }

    proptest! {
        #[test]
        fn prop_input_format_roundtrips_through_name(format in input_format_strategy()) {
            let parsed: InputFormat = format.as_str().parse().expect("canonical name parses");
            prop_assert_eq!(parsed, format);
        }

        #[test]
        fn prop_output_format_roundtrips_through_name(format in output_format_strategy()) {
            let parsed: OutputFormat = format.as_str().parse().expect("canonical name parses");
            prop_assert_eq!(parsed, format);
        }

        #[test]
        fn prop_output_format_extension_nonempty(format in output_format_strategy()) {
            prop_assert!(!format.extension().is_empty());
        }

        #[test]
        fn prop_empty_document_zero_words(format in input_format_strategy()) {
            let doc = Document::new(format);
            prop_assert_eq!(doc.word_count(), 0);
            prop_assert_eq!(doc.char_count(), 0);
        }

        #[test]
        fn prop_document_serde_roundtrip(doc in document_strategy()) {
            let json = serde_json::to_string(&doc).expect("serialize");
            let back: Document = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(back.source_format, doc.source_format);
            prop_assert_eq!(back.content.len(), doc.content.len());
            prop_assert_eq!(back.plain_text(), doc.plain_text());
        }

        #[test]
        fn prop_clone_preserves_flattened_text(doc in document_strategy()) {
            prop_assert_eq!(doc.clone().plain_text(), doc.plain_text());
        }

        #[test]
        fn prop_word_count_never_exceeds_char_count_plus_one(text in simple_text_strategy()) {
            let block = Block::text_paragraph(text);
            prop_assert!(block.word_count() <= block.char_count() + 1);
        }
    }
}
