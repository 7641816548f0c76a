// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown format handler using comrak
//!
//! Parsing runs a fixed sequence of normalization passes over the raw text
//! (heading promotion, list-marker cleanup, blank-line collapsing) before the
//! structural grammar, so loosely formatted plain text still yields a useful
//! tree. Rendering produces one canonical markdown style regardless of how
//! the source was written.

use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, Options};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Block, DocMeta, Document, Inline, InputFormat, ListItem, MetaValue, OutputFormat};
use crate::error::Result;
use crate::traits::{Artifact, Parser, RenderContext, Renderer};

/// Markdown (and plain text) format handler
pub struct MarkdownHandler;

static BULLET_GLYPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)[•·][ \t]*").expect("valid bullet pattern"));

static PAREN_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)(\d+)\)([ \t])").expect("valid ordinal pattern"));

static EXCESS_BLANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{4,}").expect("valid blank-run pattern"));

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*([-*•·]|\d+[.)])[ \t]").expect("valid marker pattern"));

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ',', ';', ':'];

impl MarkdownHandler {
    pub fn new() -> Self {
        Self
    }

    fn comrak_options() -> Options<'static> {
        let mut options = Options::default();
        options.extension.autolink = true;
        options
    }
}

impl Default for MarkdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for MarkdownHandler {
    fn format(&self) -> InputFormat {
        InputFormat::Markdown
    }

    fn parse(&self, input: &str) -> Result<Document> {
        let unified = input.replace("\r\n", "\n").replace('\r', "\n");
        let (meta, body) = split_front_matter(&unified);
        let normalized = normalize(body);

        let arena = Arena::new();
        let options = Self::comrak_options();
        let root = parse_document(&arena, &normalized, &options);

        Ok(Document {
            source_format: InputFormat::Markdown,
            meta,
            content: parse_children(root),
        })
    }
}

/// Normalization passes applied before the structural parse, in order:
/// setext promotion, first-line title promotion, bullet-glyph cleanup,
/// `N)` ordinal cleanup, blank-run collapsing. Line endings are already
/// unified by the caller.
fn normalize(input: &str) -> String {
    let text = promote_setext(input);
    let text = promote_first_line_title(&text);
    let text = BULLET_GLYPH.replace_all(&text, "$1- ");
    let text = PAREN_ORDINAL.replace_all(&text, "$1$2.$3");
    EXCESS_BLANKS.replace_all(&text, "\n\n\n").into_owned()
}

/// `Title\n====` becomes `# Title`; `Title\n----` becomes `## Title`.
/// Both source lines are consumed.
fn promote_setext(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if i + 1 < lines.len() {
            let underline = lines[i + 1].trim_end();
            let all_of = |c: char| !underline.is_empty() && underline.chars().all(|u| u == c);
            if all_of('=') && !line.is_empty() {
                out.push(format!("# {}", line.trim()));
                i += 2;
                continue;
            }
            if all_of('-') && !line.trim().is_empty() {
                out.push(format!("## {}", line.trim()));
                i += 2;
                continue;
            }
        }
        out.push(line.to_string());
        i += 1;
    }
    out.join("\n")
}

/// A short, unpunctuated first line that is not already structured markup is
/// treated as the document title.
fn promote_first_line_title(input: &str) -> String {
    let Some((first, rest)) = input.split_once('\n') else {
        return if should_promote_title(input) {
            format!("# {}", input.trim())
        } else {
            input.to_string()
        };
    };
    if should_promote_title(first) {
        format!("# {}\n{rest}", first.trim())
    } else {
        input.to_string()
    }
}

fn should_promote_title(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() < 60
        && !trimmed.ends_with(TERMINAL_PUNCTUATION)
        && !trimmed.starts_with('#')
        && !LIST_MARKER.is_match(line)
}

fn parse_children<'a>(node: &'a AstNode<'a>) -> Vec<Block> {
    node.children().filter_map(parse_node).collect()
}

fn parse_node<'a>(node: &'a AstNode<'a>) -> Option<Block> {
    let data = node.data.borrow();

    match &data.value {
        NodeValue::Document => None,

        NodeValue::Paragraph => Some(Block::Paragraph {
            content: parse_inlines(node),
        }),

        NodeValue::Heading(heading) => Some(Block::Heading {
            depth: heading.level.clamp(1, 6),
            content: parse_inlines(node),
        }),

        NodeValue::CodeBlock(code) => Some(Block::CodeBlock {
            language: if code.info.is_empty() {
                None
            } else {
                Some(code.info.clone())
            },
            content: code.literal.clone(),
        }),

        NodeValue::BlockQuote => Some(Block::BlockQuote {
            content: parse_children(node),
        }),

        NodeValue::List(list) => {
            let items: Vec<ListItem> = node
                .children()
                .map(|child| ListItem::new(parse_children(child)))
                .collect();
            Some(Block::List {
                ordered: list.list_type == ListType::Ordered,
                items,
            })
        }

        NodeValue::Item(_) => None, // handled by List

        NodeValue::ThematicBreak => Some(Block::ThematicBreak),

        // Embedded HTML is kept as literal text; there is no raw node kind.
        NodeValue::HtmlBlock(html) => Some(Block::Paragraph {
            content: vec![Inline::Text {
                content: html.literal.trim_end().to_string(),
            }],
        }),

        _ => None,
    }
}

fn parse_inlines<'a>(node: &'a AstNode<'a>) -> Vec<Inline> {
    node.children().filter_map(parse_inline).collect()
}

fn parse_inline<'a>(node: &'a AstNode<'a>) -> Option<Inline> {
    let data = node.data.borrow();

    match &data.value {
        NodeValue::Text(text) => Some(Inline::Text {
            content: text.clone(),
        }),

        // Soft breaks flatten to spaces: consecutive source lines are one
        // logical paragraph.
        NodeValue::SoftBreak => Some(Inline::Text {
            content: " ".to_string(),
        }),

        NodeValue::LineBreak => Some(Inline::LineBreak),

        NodeValue::Code(code) => Some(Inline::Code {
            content: code.literal.clone(),
        }),

        NodeValue::Emph => Some(Inline::Emphasis {
            content: parse_inlines(node),
        }),

        NodeValue::Strong => Some(Inline::Strong {
            content: parse_inlines(node),
        }),

        NodeValue::Link(link) => Some(Inline::Link {
            url: link.url.clone(),
            content: parse_inlines(node),
        }),

        NodeValue::Image(image) => Some(Inline::Image {
            url: image.url.clone(),
            alt: node
                .children()
                .filter_map(|c| {
                    if let NodeValue::Text(t) = &c.data.borrow().value {
                        Some(t.clone())
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>()
                .join(""),
        }),

        NodeValue::HtmlInline(html) => Some(Inline::Text {
            content: html.clone(),
        }),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Front matter

/// Split a leading `---` front-matter block off the input and parse it into
/// metadata. Returns default metadata and the whole input when no block is
/// present.
fn split_front_matter(input: &str) -> (DocMeta, &str) {
    let Some(first_end) = input.find('\n') else {
        return (DocMeta::default(), input);
    };
    if input[..first_end].trim_end() != "---" {
        return (DocMeta::default(), input);
    }

    let block_start = first_end + 1;
    let mut pos = block_start;
    while pos <= input.len() {
        let line_end = input[pos..]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(input.len());
        if matches!(input[pos..line_end].trim_end(), "---" | "...") {
            let meta = parse_front_matter(&input[block_start..pos]);
            let body_start = (line_end + 1).min(input.len());
            return (meta, &input[body_start..]);
        }
        if line_end >= input.len() {
            break;
        }
        pos = line_end + 1;
    }

    (DocMeta::default(), input)
}

fn parse_front_matter(block: &str) -> DocMeta {
    let mut meta = DocMeta::default();
    let lines: Vec<&str> = block.split('\n').collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if line.trim().is_empty() || line.starts_with(' ') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if value.is_empty() {
            // Header line: collect the indented continuation as a list or a
            // nested map.
            let mut list = Vec::new();
            let mut map = std::collections::BTreeMap::new();
            while i < lines.len() && lines[i].starts_with(' ') {
                let item = lines[i].trim();
                i += 1;
                if let Some(entry) = item.strip_prefix("- ") {
                    list.push(unquote(entry));
                } else if let Some((sub_key, sub_value)) = item.split_once(':') {
                    map.insert(sub_key.trim().to_string(), scalar_value(sub_value.trim()));
                }
            }
            if !list.is_empty() {
                if key == "keywords" {
                    meta.keywords = list;
                } else {
                    meta.extra.insert(
                        key.to_string(),
                        MetaValue::List(list.into_iter().map(MetaValue::String).collect()),
                    );
                }
            } else if !map.is_empty() {
                meta.extra.insert(key.to_string(), MetaValue::Map(map));
            }
            continue;
        }

        let unquoted = unquote(value);
        match key {
            "title" => meta.title = Some(unquoted),
            "author" => meta.author = Some(unquoted),
            "date" => meta.date = Some(unquoted),
            "description" => meta.description = Some(unquoted),
            "keywords" => {
                meta.keywords = unquoted
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
            _ => {
                meta.extra.insert(key.to_string(), scalar_value(value));
            }
        }
    }

    meta
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\\\"", "\"")
    } else {
        trimmed.to_string()
    }
}

fn scalar_value(raw: &str) -> MetaValue {
    let unquoted = unquote(raw);
    if raw.trim().starts_with('"') {
        return MetaValue::String(unquoted);
    }
    if let Ok(b) = unquoted.parse::<bool>() {
        return MetaValue::Bool(b);
    }
    if let Ok(n) = unquoted.parse::<i64>() {
        return MetaValue::Integer(n);
    }
    if let Ok(f) = unquoted.parse::<f64>() {
        return MetaValue::Float(f);
    }
    MetaValue::String(unquoted)
}

// ---------------------------------------------------------------------------
// Rendering

impl Renderer for MarkdownHandler {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, doc: &Document, ctx: &RenderContext) -> Result<Artifact> {
        let mut output = String::new();

        if !ctx.meta.is_empty() {
            render_front_matter(&mut output, &ctx.meta);
        }

        for (i, block) in doc.content.iter().enumerate() {
            if i > 0 {
                output.push_str("\n\n");
            }
            render_block(&mut output, block, 0);
        }

        Ok(Artifact::Text(output))
    }
}

fn render_front_matter(output: &mut String, meta: &DocMeta) {
    output.push_str("---\n");
    if let Some(title) = &meta.title {
        output.push_str(&format!("title: {}\n", yaml_scalar(title)));
    }
    if let Some(author) = &meta.author {
        output.push_str(&format!("author: {}\n", yaml_scalar(author)));
    }
    if let Some(date) = &meta.date {
        output.push_str(&format!("date: {}\n", yaml_scalar(date)));
    }
    if let Some(description) = &meta.description {
        output.push_str(&format!("description: {}\n", yaml_scalar(description)));
    }
    if !meta.keywords.is_empty() {
        output.push_str("keywords:\n");
        for keyword in &meta.keywords {
            output.push_str(&format!("  - {}\n", yaml_scalar(keyword)));
        }
    }
    for (key, value) in &meta.extra {
        render_meta_value(output, key, value);
    }
    output.push_str("---\n\n");
}

fn render_meta_value(output: &mut String, key: &str, value: &MetaValue) {
    match value {
        MetaValue::String(s) => output.push_str(&format!("{key}: {}\n", yaml_scalar(s))),
        MetaValue::Bool(b) => output.push_str(&format!("{key}: {b}\n")),
        MetaValue::Integer(n) => output.push_str(&format!("{key}: {n}\n")),
        MetaValue::Float(f) => output.push_str(&format!("{key}: {f}\n")),
        MetaValue::List(items) => {
            output.push_str(&format!("{key}:\n"));
            for item in items {
                match item {
                    MetaValue::String(s) => {
                        output.push_str(&format!("  - {}\n", yaml_scalar(s)));
                    }
                    MetaValue::Bool(b) => output.push_str(&format!("  - {b}\n")),
                    MetaValue::Integer(n) => output.push_str(&format!("  - {n}\n")),
                    MetaValue::Float(f) => output.push_str(&format!("  - {f}\n")),
                    // Nested containers flatten to their display form
                    other => output.push_str(&format!("  - {other:?}\n")),
                }
            }
        }
        MetaValue::Map(entries) => {
            output.push_str(&format!("{key}:\n"));
            for (sub_key, sub_value) in entries {
                match sub_value {
                    MetaValue::String(s) => {
                        output.push_str(&format!("  {sub_key}: {}\n", yaml_scalar(s)));
                    }
                    MetaValue::Bool(b) => output.push_str(&format!("  {sub_key}: {b}\n")),
                    MetaValue::Integer(n) => output.push_str(&format!("  {sub_key}: {n}\n")),
                    MetaValue::Float(f) => output.push_str(&format!("  {sub_key}: {f}\n")),
                    other => output.push_str(&format!("  {sub_key}: {other:?}\n")),
                }
            }
        }
    }
}

/// Quote a scalar when it would otherwise be ambiguous in the front matter:
/// YAML-significant characters, newlines, or a leading space.
fn yaml_scalar(value: &str) -> String {
    const SIGNIFICANT: &[char] = &[
        ':', '#', '[', ']', '{', '}', '|', '>', '&', '*', '!', '?', ',',
    ];
    if value.contains(SIGNIFICANT) || value.contains('\n') || value.starts_with(' ') {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn render_block(output: &mut String, block: &Block, indent: usize) {
    let prefix = "  ".repeat(indent);

    match block {
        Block::Paragraph { content } => {
            output.push_str(&prefix);
            for inline in content {
                render_inline(output, inline);
            }
        }

        Block::Heading { depth, content } => {
            output.push_str(&prefix);
            output.push_str(&"#".repeat(*depth as usize));
            output.push(' ');
            for inline in content {
                render_inline(output, inline);
            }
        }

        Block::CodeBlock { language, content } => {
            output.push_str(&prefix);
            output.push_str("```");
            if let Some(lang) = language {
                output.push_str(lang);
            }
            output.push('\n');
            for line in content.lines() {
                output.push_str(&prefix);
                output.push_str(line);
                output.push('\n');
            }
            output.push_str(&prefix);
            output.push_str("```");
        }

        Block::BlockQuote { content } => {
            let mut inner = String::new();
            for (i, block) in content.iter().enumerate() {
                if i > 0 {
                    inner.push_str("\n\n");
                }
                render_block(&mut inner, block, 0);
            }
            for (i, line) in inner.lines().enumerate() {
                if i > 0 {
                    output.push('\n');
                }
                output.push_str(&prefix);
                if line.is_empty() {
                    output.push('>');
                } else {
                    output.push_str("> ");
                    output.push_str(line);
                }
            }
        }

        Block::List { ordered, items } => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    output.push('\n');
                }
                output.push_str(&prefix);
                if *ordered {
                    output.push_str(&format!("{}. ", i + 1));
                } else {
                    output.push_str("- ");
                }
                for (j, block) in item.content.iter().enumerate() {
                    if j > 0 {
                        output.push('\n');
                        render_block(output, block, indent + 1);
                    } else if let Block::Paragraph { content } = block {
                        for inline in content {
                            render_inline(output, inline);
                        }
                    } else {
                        render_block(output, block, 0);
                    }
                }
            }
        }

        Block::ThematicBreak => {
            output.push_str(&prefix);
            output.push_str("---");
        }
    }
}

fn render_inline(output: &mut String, inline: &Inline) {
    match inline {
        Inline::Text { content } => output.push_str(content),

        Inline::Emphasis { content } => {
            output.push('_');
            for i in content {
                render_inline(output, i);
            }
            output.push('_');
        }

        Inline::Strong { content } => {
            output.push_str("**");
            for i in content {
                render_inline(output, i);
            }
            output.push_str("**");
        }

        Inline::Code { content } => {
            output.push('`');
            output.push_str(content);
            output.push('`');
        }

        Inline::Link { url, content } => {
            output.push('[');
            for i in content {
                render_inline(output, i);
            }
            output.push_str("](");
            output.push_str(url);
            output.push(')');
        }

        Inline::Image { url, alt } => {
            output.push_str("![");
            output.push_str(alt);
            output.push_str("](");
            output.push_str(url);
            output.push(')');
        }

        Inline::LineBreak => {
            output.push_str("  \n");
        }
    }
}
