// SPDX-License-Identifier: AGPL-3.0-or-later
//! DOCX format handler.
//!
//! Reading walks the package with `docx-rs`: heading and quote styles map to
//! tree nodes, Word numbering and literal markers become lists, run flags
//! become inline styling, and table rows flatten to delimited text. A body
//! with no usable style information at all is re-scanned with the line
//! heuristics instead. Writing goes through the `docx-rs` builder: named
//! heading styles, run-level formatting, literal list markers, and shaded
//! monospace code lines.

use std::io::Cursor;

use crate::ast::{Block, Document, InputFormat, Inline, ListItem, OutputFormat};
use crate::error::{Error, Result};
use crate::formats::linescan;
use crate::traits::{Artifact, BinaryParser, RenderContext, Renderer};

/// DOCX format handler
pub struct DocxHandler;

/// Heading style sizes in half-points, outline levels 1 through 6.
const HEADING_STYLE_SIZES: [usize; 6] = [56, 44, 36, 30, 26, 24];

const QUOTE_COLOR: &str = "595959";
const LINK_COLOR: &str = "4472C4";
const RULE_COLOR: &str = "8C8C8C";

impl DocxHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

impl BinaryParser for DocxHandler {
    fn format(&self) -> InputFormat {
        InputFormat::Docx
    }

    fn parse_bytes(&self, input: &[u8]) -> Result<Document> {
        let docx = docx_rs::read_docx(input)
            .map_err(|e| Error::parse_with_cause("docx package is unreadable", e))?;

        let mut builder = TreeBuilder::default();
        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(para) => builder.push_paragraph(para),
                docx_rs::DocumentChild::Table(table) => builder.push_table(table),
                _ => {}
            }
        }
        let content = builder.finish();
        tracing::debug!(blocks = content.len(), "walked docx body");

        let mut doc = Document::new(InputFormat::Docx);
        doc.content = content;
        Ok(doc)
    }
}

/// Accumulates blocks while grouping consecutive list items and code lines.
#[derive(Default)]
struct TreeBuilder {
    blocks: Vec<Block>,
    items: Vec<ListItem>,
    ordered: bool,
    code: Vec<String>,
    flat: Vec<String>,
    saw_structure: bool,
}

impl TreeBuilder {
    fn push_paragraph(&mut self, para: &docx_rs::Paragraph) {
        let inlines = collect_inlines(para);
        let text = flatten(&inlines);
        if !text.is_empty() {
            self.flat.push(text.clone());
        }

        let style = para.property.style.as_ref().map(|s| s.val.as_str());

        if let Some(depth) = style.and_then(heading_depth) {
            if text.is_empty() {
                return;
            }
            self.flush_list();
            self.flush_code();
            self.blocks.push(Block::Heading {
                depth,
                content: inlines,
            });
            self.saw_structure = true;
            return;
        }

        if matches!(style, Some("Quote" | "IntenseQuote" | "BlockQuote" | "Blockquote")) {
            if text.is_empty() {
                return;
            }
            self.flush_list();
            self.flush_code();
            self.blocks.push(Block::BlockQuote {
                content: vec![Block::Paragraph { content: inlines }],
            });
            self.saw_structure = true;
            return;
        }

        let code_style = matches!(style, Some("Code" | "CodeBlock" | "HTMLPreformatted"));
        let all_code =
            !inlines.is_empty() && inlines.iter().all(|i| matches!(i, Inline::Code { .. }));
        if code_style || all_code {
            self.flush_list();
            self.code.push(text);
            self.saw_structure = true;
            return;
        }

        let bare: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if bare.chars().count() >= 3 && bare.chars().all(|c| matches!(c, '─' | '—' | '-' | '_')) {
            self.flush_list();
            self.flush_code();
            self.blocks.push(Block::ThematicBreak);
            return;
        }

        let numbered = para
            .property
            .numbering_property
            .as_ref()
            .and_then(|n| n.id.as_ref())
            .is_some();
        if numbered {
            if text.is_empty() {
                return;
            }
            self.flush_code();
            if self.items.is_empty() {
                // Word numbering carries ordinal formats more often than not
                self.ordered = true;
            }
            self.items.push(ListItem::new(vec![Block::Paragraph {
                content: inlines,
            }]));
            self.saw_structure = true;
            return;
        }

        if let Some((marker_ordered, rest)) = linescan::split_list_marker(text.trim()) {
            self.flush_code();
            if self.items.is_empty() {
                self.ordered = marker_ordered;
            }
            self.items.push(ListItem::text(rest));
            self.saw_structure = true;
            return;
        }

        self.flush_list();
        self.flush_code();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph { content: inlines });
        }
    }

    fn push_table(&mut self, table: &docx_rs::Table) {
        self.flush_list();
        self.flush_code();
        for table_child in &table.rows {
            let docx_rs::TableChild::TableRow(row) = table_child;
            let mut cells: Vec<String> = Vec::new();
            for row_child in &row.cells {
                let docx_rs::TableRowChild::TableCell(cell) = row_child;
                let mut cell_text = String::new();
                for content in &cell.children {
                    if let docx_rs::TableCellContent::Paragraph(para) = content {
                        let text = flatten(&collect_inlines(para));
                        if !text.is_empty() {
                            if !cell_text.is_empty() {
                                cell_text.push(' ');
                            }
                            cell_text.push_str(&text);
                        }
                    }
                }
                cells.push(cell_text);
            }
            if cells.iter().any(|c| !c.is_empty()) {
                let line = cells.join(" | ");
                self.flat.push(line.clone());
                self.blocks.push(Block::text_paragraph(line));
            }
        }
        self.saw_structure = true;
    }

    fn flush_list(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.blocks.push(Block::List {
            ordered: self.ordered,
            items: std::mem::take(&mut self.items),
        });
    }

    fn flush_code(&mut self) {
        if self.code.is_empty() {
            return;
        }
        self.blocks.push(Block::CodeBlock {
            language: None,
            content: self.code.join("\n"),
        });
        self.code.clear();
    }

    /// Close open groups. When the style walk recovered nothing beyond plain
    /// paragraphs, re-scan the flattened text with the line heuristics and
    /// keep that result if it found actual structure.
    fn finish(mut self) -> Vec<Block> {
        self.flush_list();
        self.flush_code();
        if !self.saw_structure {
            let scanned = linescan::scan(&self.flat.join("\n\n"));
            if scanned.iter().any(|b| !matches!(b, Block::Paragraph { .. })) {
                return scanned;
            }
        }
        self.blocks
    }
}

fn heading_depth(style: &str) -> Option<u8> {
    match style {
        "Title" => Some(1),
        "Subtitle" => Some(2),
        _ => {
            let digits = style
                .strip_prefix("Heading")
                .or_else(|| style.strip_prefix("heading"))?;
            let level: u8 = digits.parse().ok()?;
            Some(level.clamp(1, 6))
        }
    }
}

fn collect_inlines(para: &docx_rs::Paragraph) -> Vec<Inline> {
    let mut inlines: Vec<Inline> = Vec::new();
    for child in &para.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            let bold = run.run_property.bold.is_some();
            let italic = run.run_property.italic.is_some();
            let mono = run_is_monospace(&run.run_property);
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(text) => {
                        push_styled(&mut inlines, &text.text, bold, italic, mono);
                    }
                    docx_rs::RunChild::Tab(_) => push_styled(&mut inlines, "\t", false, false, false),
                    docx_rs::RunChild::Break(_) => inlines.push(Inline::LineBreak),
                    docx_rs::RunChild::Drawing(_) => {
                        push_styled(&mut inlines, "[image]", false, false, false);
                    }
                    _ => {}
                }
            }
        }
    }
    inlines
}

fn push_styled(inlines: &mut Vec<Inline>, text: &str, bold: bool, italic: bool, mono: bool) {
    if text.is_empty() {
        return;
    }
    if mono {
        inlines.push(Inline::Code {
            content: text.to_string(),
        });
        return;
    }
    let mut node = Inline::text(text);
    if italic {
        node = Inline::Emphasis {
            content: vec![node],
        };
    }
    if bold {
        node = Inline::Strong {
            content: vec![node],
        };
    }
    // adjacent plain text runs merge into one node
    if let Inline::Text { content } = &node {
        if let Some(Inline::Text { content: prev }) = inlines.last_mut() {
            prev.push_str(content);
            return;
        }
    }
    inlines.push(node);
}

/// Font names are not readable through this API surface, so probe the debug
/// form for the common monospace families.
fn run_is_monospace(props: &docx_rs::RunProperty) -> bool {
    props.fonts.as_ref().is_some_and(|fonts| {
        let rendered = format!("{fonts:?}");
        ["Courier", "Consolas", "Menlo"]
            .iter()
            .any(|name| rendered.contains(name))
    })
}

fn flatten(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        out.push_str(&inline.plain_text());
    }
    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

impl Renderer for DocxHandler {
    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn render(&self, doc: &Document, ctx: &RenderContext) -> Result<Artifact> {
        let mut docx = docx_rs::Docx::new();
        for depth in 1..=6u8 {
            docx = docx.add_style(heading_style(depth));
        }
        docx = docx.add_style(
            docx_rs::Style::new("Quote", docx_rs::StyleType::Paragraph)
                .name("Quote")
                .italic()
                .color(QUOTE_COLOR),
        );

        let meta = &ctx.meta;
        if let Some(title) = &meta.title {
            docx = docx.add_paragraph(
                docx_rs::Paragraph::new()
                    .align(docx_rs::AlignmentType::Center)
                    .add_run(docx_rs::Run::new().add_text(title.as_str()).bold().size(64)),
            );
            if let Some(author) = &meta.author {
                docx = docx.add_paragraph(
                    docx_rs::Paragraph::new()
                        .align(docx_rs::AlignmentType::Center)
                        .add_run(docx_rs::Run::new().add_text(author.as_str()).size(28)),
                );
            }
            if let Some(date) = &meta.date {
                docx = docx.add_paragraph(
                    docx_rs::Paragraph::new()
                        .align(docx_rs::AlignmentType::Center)
                        .add_run(
                            docx_rs::Run::new()
                                .add_text(date.as_str())
                                .size(24)
                                .color(QUOTE_COLOR),
                        ),
                );
            }
            docx = docx.add_paragraph(docx_rs::Paragraph::new());
        }

        for block in &doc.content {
            docx = append_block(docx, block);
        }

        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).map_err(|e| {
            Error::render_with_cause(OutputFormat::Docx, "could not package archive", e)
        })?;
        Ok(Artifact::Binary(cursor.into_inner()))
    }
}

fn heading_style(depth: u8) -> docx_rs::Style {
    let size = HEADING_STYLE_SIZES[usize::from(depth - 1)];
    docx_rs::Style::new(format!("Heading{depth}"), docx_rs::StyleType::Paragraph)
        .name(format!("Heading {depth}"))
        .size(size)
        .bold()
}

fn append_block(docx: docx_rs::Docx, block: &Block) -> docx_rs::Docx {
    match block {
        Block::Paragraph { content } => docx.add_paragraph(paragraph_from(content)),
        Block::Heading { depth, content } => {
            let style = format!("Heading{}", (*depth).clamp(1, 6));
            docx.add_paragraph(paragraph_from(content).style(&style))
        }
        Block::List { ordered, items } => {
            let mut docx = docx;
            for (idx, item) in items.iter().enumerate() {
                let prefix = if *ordered {
                    format!("{}. ", idx + 1)
                } else {
                    "\u{2022} ".to_string()
                };
                for (pos, inner) in item.content.iter().enumerate() {
                    let para = if pos == 0 {
                        let mut para = docx_rs::Paragraph::new()
                            .indent(Some(720), None, None, None)
                            .add_run(docx_rs::Run::new().add_text(prefix.as_str()));
                        match inner {
                            Block::Paragraph { content } => {
                                for run in runs_from(content) {
                                    para = para.add_run(run);
                                }
                            }
                            other => {
                                para = para
                                    .add_run(docx_rs::Run::new().add_text(other.plain_text()));
                            }
                        }
                        para
                    } else {
                        docx_rs::Paragraph::new()
                            .indent(Some(1080), None, None, None)
                            .add_run(docx_rs::Run::new().add_text(inner.plain_text()))
                    };
                    docx = docx.add_paragraph(para);
                }
            }
            docx
        }
        Block::CodeBlock { content, .. } => {
            let mut docx = docx;
            for line in content.lines() {
                docx = docx.add_paragraph(docx_rs::Paragraph::new().add_run(code_run(line)));
            }
            docx
        }
        Block::BlockQuote { content } => {
            let mut docx = docx;
            for inner in content {
                let para = match inner {
                    Block::Paragraph { content } => {
                        let mut para = docx_rs::Paragraph::new()
                            .style("Quote")
                            .indent(Some(720), None, None, None);
                        for run in runs_with(content, RunFlags::quote()) {
                            para = para.add_run(run);
                        }
                        para
                    }
                    other => docx_rs::Paragraph::new()
                        .style("Quote")
                        .indent(Some(720), None, None, None)
                        .add_run(
                            docx_rs::Run::new()
                                .add_text(other.plain_text())
                                .italic()
                                .color(QUOTE_COLOR),
                        ),
                };
                docx = docx.add_paragraph(para);
            }
            docx
        }
        Block::ThematicBreak => docx.add_paragraph(
            docx_rs::Paragraph::new()
                .align(docx_rs::AlignmentType::Center)
                .add_run(
                    docx_rs::Run::new()
                        .add_text("\u{2500}".repeat(24))
                        .color(RULE_COLOR),
                ),
        ),
    }
}

#[derive(Clone, Copy, Default)]
struct RunFlags {
    bold: bool,
    italic: bool,
    code: bool,
    muted: bool,
}

impl RunFlags {
    fn quote() -> Self {
        Self {
            italic: true,
            muted: true,
            ..Self::default()
        }
    }
}

fn paragraph_from(content: &[Inline]) -> docx_rs::Paragraph {
    let mut para = docx_rs::Paragraph::new();
    for run in runs_from(content) {
        para = para.add_run(run);
    }
    para
}

fn runs_from(content: &[Inline]) -> Vec<docx_rs::Run> {
    runs_with(content, RunFlags::default())
}

fn runs_with(content: &[Inline], flags: RunFlags) -> Vec<docx_rs::Run> {
    let mut runs = Vec::new();
    collect_runs(content, flags, &mut runs);
    runs
}

fn collect_runs(content: &[Inline], flags: RunFlags, runs: &mut Vec<docx_rs::Run>) {
    for inline in content {
        match inline {
            Inline::Text { content } => runs.push(make_run(content, flags)),
            Inline::Code { content } => {
                let mut code_flags = flags;
                code_flags.code = true;
                runs.push(make_run(content, code_flags));
            }
            Inline::Strong { content } => {
                let mut strong_flags = flags;
                strong_flags.bold = true;
                collect_runs(content, strong_flags, runs);
            }
            Inline::Emphasis { content } => {
                let mut emphasis_flags = flags;
                emphasis_flags.italic = true;
                collect_runs(content, emphasis_flags, runs);
            }
            Inline::Link { content, url } => {
                // link targets survive as visible text next to the label
                collect_runs(content, flags, runs);
                runs.push(
                    docx_rs::Run::new()
                        .add_text(format!(" ({url})"))
                        .color(LINK_COLOR),
                );
            }
            Inline::Image { url, alt } => {
                let label = if alt.is_empty() { url.as_str() } else { alt.as_str() };
                runs.push(
                    docx_rs::Run::new()
                        .add_text(format!("[{label}]"))
                        .italic(),
                );
            }
            Inline::LineBreak => {
                runs.push(docx_rs::Run::new().add_break(docx_rs::BreakType::TextWrapping));
            }
        }
    }
}

fn make_run(text: &str, flags: RunFlags) -> docx_rs::Run {
    let mut run = docx_rs::Run::new().add_text(text);
    if flags.bold {
        run = run.bold();
    }
    if flags.italic {
        run = run.italic();
    }
    if flags.muted {
        run = run.color(QUOTE_COLOR);
    }
    if flags.code {
        run = run
            .fonts(docx_rs::RunFonts::new().ascii("Courier New"))
            .highlight("lightGray");
    }
    run
}

fn code_run(line: &str) -> docx_rs::Run {
    docx_rs::Run::new()
        .add_text(line)
        .fonts(docx_rs::RunFonts::new().ascii("Courier New"))
        .size(18)
        .highlight("lightGray")
}
