// SPDX-License-Identifier: AGPL-3.0-or-later
//! PDF format handler.
//!
//! Reading is lossy: `lopdf` validates the container and counts pages,
//! `pdf_extract` recovers the flat text, and the line scanner rebuilds a
//! block tree from it. Writing lays blocks out on A4 pages through
//! [`PdfWriter`]: an optional title page from metadata, heading sizes by
//! depth, shaded code boxes, bordered quotes, and a document information
//! dictionary.

mod writer;

pub use writer::{FontFamily, PdfWriter, TextStyle};

use crate::ast::{Block, Document, InputFormat, Inline, OutputFormat};
use crate::error::{Error, Result};
use crate::formats::linescan;
use crate::traits::{Artifact, BinaryParser, RenderContext, Renderer};

/// PDF format handler
pub struct PdfHandler;

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.5;
const HEADING_SIZES: [f32; 6] = [24.0, 20.0, 17.0, 14.5, 13.0, 12.0];

const INK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const MUTED: (f32, f32, f32) = (0.35, 0.35, 0.38);

impl PdfHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryParser for PdfHandler {
    fn format(&self) -> InputFormat {
        InputFormat::Pdf
    }

    fn parse_bytes(&self, input: &[u8]) -> Result<Document> {
        let container = lopdf::Document::load_mem(input)
            .map_err(|e| Error::parse_with_cause("pdf container structure is unreadable", e))?;
        tracing::debug!(pages = container.get_pages().len(), "loaded pdf container");

        let text = pdf_extract::extract_text_from_mem(input)
            .map_err(|e| Error::parse_with_cause("pdf text extraction failed", e))?;

        let mut doc = Document::new(InputFormat::Pdf);
        doc.content = linescan::scan(&text);
        Ok(doc)
    }
}

impl Renderer for PdfHandler {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, doc: &Document, ctx: &RenderContext) -> Result<Artifact> {
        let meta = &ctx.meta;
        let mut writer = PdfWriter::new();

        let keywords = (!meta.keywords.is_empty()).then(|| meta.keywords.join(", "));
        writer.set_info(
            meta.title.as_deref(),
            meta.author.as_deref(),
            meta.description.as_deref(),
            keywords.as_deref(),
        );

        if let Some(title) = &meta.title {
            render_title_page(
                &mut writer,
                title,
                meta.author.as_deref(),
                meta.date.as_deref(),
            );
        }

        for block in &doc.content {
            render_block(&mut writer, block);
        }

        writer.finish().map(Artifact::Binary)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

fn render_title_page(writer: &mut PdfWriter, title: &str, author: Option<&str>, date: Option<&str>) {
    writer.advance(230.0);
    writer.centered_block(
        title,
        &TextStyle {
            font: FontFamily::Bold,
            size: 26.0,
            color: INK,
            indent: 0.0,
        },
    );
    writer.vspace(18.0);
    if let Some(author) = author {
        writer.centered_block(
            author,
            &TextStyle {
                size: 13.0,
                ..TextStyle::default()
            },
        );
        writer.vspace(6.0);
    }
    if let Some(date) = date {
        writer.centered_block(
            date,
            &TextStyle {
                font: FontFamily::Italic,
                size: 11.0,
                color: MUTED,
                indent: 0.0,
            },
        );
    }
    writer.break_page();
}

fn render_block(writer: &mut PdfWriter, block: &Block) {
    match block {
        Block::Heading { depth, content } => {
            let size = HEADING_SIZES[usize::from(depth.saturating_sub(1).min(5))];
            writer.vspace(size * 0.8);
            writer.text_block(
                &inline_text(content),
                &TextStyle {
                    font: FontFamily::Bold,
                    size,
                    color: INK,
                    indent: 0.0,
                },
            );
            writer.vspace(5.0);
        }
        Block::Paragraph { content } => {
            writer.text_block(&inline_text(content), &TextStyle::default());
            writer.vspace(7.0);
        }
        Block::List { ordered, items } => {
            let style = TextStyle {
                indent: 16.0,
                ..TextStyle::default()
            };
            for (idx, item) in items.iter().enumerate() {
                let prefix = if *ordered {
                    format!("{}. ", idx + 1)
                } else {
                    "\u{2022}  ".to_string()
                };
                for (pos, inner) in item.content.iter().enumerate() {
                    if pos == 0 {
                        writer.prefixed_block(&prefix, &inner.plain_text(), &style);
                    } else {
                        // trailing blocks of an item hang under its text
                        writer.text_block(
                            &inner.plain_text(),
                            &TextStyle {
                                indent: 30.0,
                                ..TextStyle::default()
                            },
                        );
                    }
                }
                writer.vspace(2.5);
            }
            writer.vspace(5.0);
        }
        Block::CodeBlock { content, .. } => {
            writer.vspace(4.0);
            writer.shaded_block(
                content,
                &TextStyle {
                    font: FontFamily::Mono,
                    size: CODE_SIZE,
                    color: INK,
                    indent: 0.0,
                },
            );
            writer.vspace(8.0);
        }
        Block::BlockQuote { content } => {
            writer.vspace(4.0);
            let style = TextStyle {
                font: FontFamily::Italic,
                size: BODY_SIZE,
                color: MUTED,
                indent: 18.0,
            };
            for inner in content {
                writer.bordered_block(&inner.plain_text(), &style);
            }
            writer.vspace(8.0);
        }
        Block::ThematicBreak => {
            writer.vspace(4.0);
            writer.rule();
            writer.vspace(4.0);
        }
    }
}

fn inline_text(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        out.push_str(&inline.plain_text());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DocMeta, ListItem};

    fn sample_document() -> Document {
        let mut doc = Document::new(InputFormat::Markdown);
        doc.content.push(Block::text_heading(1, "Findings Overview"));
        doc.content.push(Block::text_paragraph(
            "The quarterly audit surfaced three unresolved defects in the ingestion path.",
        ));
        doc.content.push(Block::List {
            ordered: false,
            items: vec![
                ListItem::text("duplicate batch identifiers"),
                ListItem::text("missing checkpoint records"),
            ],
        });
        doc.content.push(Block::CodeBlock {
            language: Some("text".to_string()),
            content: "batch-7f2c FAILED\nbatch-9a41 OK".to_string(),
        });
        doc
    }

    #[test]
    fn test_render_produces_loadable_container() {
        let artifact = PdfHandler::new()
            .render(&sample_document(), &RenderContext::default())
            .unwrap();
        let bytes = artifact.into_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let container = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(container.get_pages().len(), 1);
    }

    #[test]
    fn test_metadata_adds_a_title_page() {
        let meta = DocMeta::new()
            .with_title("Audit Report")
            .with_author("Quality Team");
        let ctx = RenderContext::new(meta);
        let artifact = PdfHandler::new().render(&sample_document(), &ctx).unwrap();
        let bytes = artifact.into_bytes().unwrap();

        let container = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(container.get_pages().len(), 2);
    }

    #[test]
    fn test_empty_document_renders_a_valid_container() {
        let doc = Document::new(InputFormat::Text);
        let artifact = PdfHandler::new()
            .render(&doc, &RenderContext::default())
            .unwrap();
        let bytes = artifact.into_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(lopdf::Document::load_mem(&bytes).is_ok());
    }

    #[test]
    fn test_parse_rejects_corrupt_bytes() {
        let err = PdfHandler::new()
            .parse_bytes(b"these bytes are not a container")
            .unwrap_err();
        match err {
            Error::Parse { source, .. } => assert!(source.is_some()),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_extracted_text_survives_a_render_parse_cycle() {
        let artifact = PdfHandler::new()
            .render(&sample_document(), &RenderContext::default())
            .unwrap();
        let bytes = artifact.into_bytes().unwrap();

        let recovered = PdfHandler::new().parse_bytes(&bytes).unwrap();
        assert_eq!(recovered.source_format, InputFormat::Pdf);
        let text = recovered.plain_text();
        assert!(text.contains("Findings Overview"), "text was: {text}");
        assert!(text.contains("unresolved defects"), "text was: {text}");
        assert!(text.contains("duplicate batch identifiers"), "text was: {text}");
    }
}
