// SPDX-License-Identifier: AGPL-3.0-or-later
//! Low-level page assembly on top of `lopdf`.
//!
//! [`PdfWriter`] exposes a small call surface (styled text, rules, shaded
//! line groups, page breaks, document info) and owns everything below it:
//! the descending layout cursor, automatic page breaks, content-stream
//! operations, and final object-tree serialization. Text metrics use flat
//! per-glyph width factors for the built-in Type1 faces, which is close
//! enough for wrapping decisions at body sizes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::ast::OutputFormat;
use crate::error::{Error, Result};

/// A4 portrait, in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;
const TOP: f32 = PAGE_HEIGHT - MARGIN;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Baseline-to-baseline distance as a multiple of the glyph size.
const LINE_FACTOR: f32 = 1.45;
const CODE_SHADE: f32 = 0.94;
const RULE_SHADE: f32 = 0.62;
const BOX_PAD: f32 = 8.0;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// The four embedded-by-reference Type1 faces every viewer ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Body,
    Bold,
    Italic,
    Mono,
}

impl FontFamily {
    const ALL: [FontFamily; 4] = [
        FontFamily::Body,
        FontFamily::Bold,
        FontFamily::Italic,
        FontFamily::Mono,
    ];

    fn resource(self) -> &'static str {
        match self {
            FontFamily::Body => "F1",
            FontFamily::Bold => "F2",
            FontFamily::Italic => "F3",
            FontFamily::Mono => "F4",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            FontFamily::Body => "Helvetica",
            FontFamily::Bold => "Helvetica-Bold",
            FontFamily::Italic => "Helvetica-Oblique",
            FontFamily::Mono => "Courier",
        }
    }

    /// Average glyph width relative to the point size.
    fn width_factor(self) -> f32 {
        match self {
            FontFamily::Mono => 0.6,
            _ => 0.5,
        }
    }
}

/// Everything a single text run needs: face, size, fill color, left indent.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font: FontFamily,
    pub size: f32,
    pub color: (f32, f32, f32),
    pub indent: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: FontFamily::Body,
            size: 11.0,
            color: (0.0, 0.0, 0.0),
            indent: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Accumulates page content and serializes the finished object tree.
#[derive(Debug)]
pub struct PdfWriter {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
    title: Option<String>,
    author: Option<String>,
    subject: Option<String>,
    keywords: Option<String>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: TOP,
            title: None,
            author: None,
            subject: None,
            keywords: None,
        }
    }

    /// Record document information entries for the trailer Info dictionary.
    pub fn set_info(
        &mut self,
        title: Option<&str>,
        author: Option<&str>,
        subject: Option<&str>,
        keywords: Option<&str>,
    ) {
        self.title = title.map(str::to_owned);
        self.author = author.map(str::to_owned);
        self.subject = subject.map(str::to_owned);
        self.keywords = keywords.map(str::to_owned);
    }

    /// Close the current page and start a fresh one.
    pub fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = TOP;
    }

    /// Vertical gap between blocks; suppressed at the top of a fresh page.
    pub fn vspace(&mut self, pts: f32) {
        if self.y >= TOP {
            return;
        }
        self.y -= pts;
        if self.y < MARGIN {
            self.break_page();
        }
    }

    /// Unconditional cursor drop, used for the title-page offset.
    pub fn advance(&mut self, pts: f32) {
        self.y = (self.y - pts).max(MARGIN);
    }

    /// Left-aligned wrapped text.
    pub fn text_block(&mut self, text: &str, style: &TextStyle) {
        let line_height = style.size * LINE_FACTOR;
        let width = CONTENT_WIDTH - style.indent;
        for line in wrap_chars(text, max_chars(style, width)) {
            self.ensure_room(line_height);
            self.draw_text_line(MARGIN + style.indent, self.y - style.size, &line, style);
            self.y -= line_height;
        }
    }

    /// Horizontally centered wrapped text.
    pub fn centered_block(&mut self, text: &str, style: &TextStyle) {
        let line_height = style.size * LINE_FACTOR;
        for line in wrap_chars(text, max_chars(style, CONTENT_WIDTH)) {
            self.ensure_room(line_height);
            let x = MARGIN + ((CONTENT_WIDTH - measure(&line, style)) / 2.0).max(0.0);
            self.draw_text_line(x, self.y - style.size, &line, style);
            self.y -= line_height;
        }
    }

    /// Wrapped text with a hanging marker prefix, for list items.
    pub fn prefixed_block(&mut self, prefix: &str, text: &str, style: &TextStyle) {
        let line_height = style.size * LINE_FACTOR;
        let hang = measure(prefix, style);
        let width = CONTENT_WIDTH - style.indent - hang;
        let lines = wrap_chars(text, max_chars(style, width));
        if lines.is_empty() {
            self.ensure_room(line_height);
            self.draw_text_line(MARGIN + style.indent, self.y - style.size, prefix, style);
            self.y -= line_height;
            return;
        }
        for (i, line) in lines.iter().enumerate() {
            self.ensure_room(line_height);
            if i == 0 {
                let first = format!("{prefix}{line}");
                self.draw_text_line(MARGIN + style.indent, self.y - style.size, &first, style);
            } else {
                self.draw_text_line(MARGIN + style.indent + hang, self.y - style.size, line, style);
            }
            self.y -= line_height;
        }
    }

    /// Wrapped text with a vertical rule along its left edge. Each line draws
    /// its own border segment, so the rule survives page breaks.
    pub fn bordered_block(&mut self, text: &str, style: &TextStyle) {
        let line_height = style.size * LINE_FACTOR;
        let width = CONTENT_WIDTH - style.indent;
        for line in wrap_chars(text, max_chars(style, width)) {
            self.ensure_room(line_height);
            self.fill_rect(
                MARGIN + style.indent - 10.0,
                self.y - line_height,
                2.0,
                line_height,
                RULE_SHADE,
            );
            self.draw_text_line(MARGIN + style.indent, self.y - style.size, &line, style);
            self.y -= line_height;
        }
    }

    /// Pre-formatted lines on a shaded background. Lines keep their leading
    /// whitespace and break only when they exceed the box width; groups too
    /// tall for the remaining page continue in a fresh box on the next page.
    pub fn shaded_block(&mut self, text: &str, style: &TextStyle) {
        let line_height = style.size * LINE_FACTOR;
        let width = CONTENT_WIDTH - style.indent;
        let limit = max_chars(style, width - 2.0 * BOX_PAD);

        let mut lines: Vec<String> = Vec::new();
        for raw in text.lines() {
            if raw.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.extend(hard_split(raw, limit));
            }
        }
        if lines.is_empty() {
            return;
        }

        let mut rest: &[String] = &lines;
        while !rest.is_empty() {
            let avail = self.y - MARGIN - 2.0 * BOX_PAD;
            let fit = (avail / line_height).floor() as usize;
            if fit == 0 && self.y < TOP {
                self.break_page();
                continue;
            }
            // on a fresh page at least one line goes down, even oversized
            let take = fit.max(1).min(rest.len());
            let height = take as f32 * line_height + 2.0 * BOX_PAD;
            self.fill_rect(MARGIN + style.indent, self.y - height, width, height, CODE_SHADE);
            let mut baseline = self.y - BOX_PAD - style.size;
            for line in &rest[..take] {
                if !line.is_empty() {
                    self.draw_text_line(MARGIN + style.indent + BOX_PAD, baseline, line, style);
                }
                baseline -= line_height;
            }
            self.y -= height;
            rest = &rest[take..];
            if !rest.is_empty() {
                self.break_page();
            }
        }
    }

    /// Thin horizontal rule across the content width.
    pub fn rule(&mut self) {
        self.ensure_room(18.0);
        self.fill_rect(MARGIN, self.y - 10.0, CONTENT_WIDTH, 0.75, RULE_SHADE);
        self.y -= 18.0;
    }

    /// Serialize the accumulated pages into a complete file image.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        // a document always carries at least one page
        if !self.ops.is_empty() || self.pages.is_empty() {
            let ops = std::mem::take(&mut self.ops);
            self.pages.push(ops);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for family in FontFamily::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => family.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(family.resource(), font_id);
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => Object::Dictionary(fonts),
        });

        let page_ops = std::mem::take(&mut self.pages);
        let page_count = page_ops.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        for operations in page_ops {
            let encoded = Content { operations }.encode().map_err(|e| {
                Error::render_with_cause(OutputFormat::Pdf, "could not encode page content", e)
            })?;
            let stream_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => stream_id,
            });
            kids.push(page_id.into());
        }

        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0f32.into(), 0f32.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = Dictionary::new();
        for (key, value) in [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Keywords", &self.keywords),
        ] {
            if let Some(value) = value {
                info.set(key, Object::String(encode_win_ansi(value), StringFormat::Literal));
            }
        }
        info.set(
            "Producer",
            Object::string_literal(concat!("docmorph ", env!("CARGO_PKG_VERSION"))),
        );
        let info_id = doc.add_object(Object::Dictionary(info));
        doc.trailer.set("Info", info_id);

        doc.compress();
        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(|e| {
            Error::render_with_cause(OutputFormat::Pdf, "could not serialize page tree", e)
        })?;
        Ok(out)
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN && self.y < TOP {
            self.break_page();
        }
    }

    fn draw_text_line(&mut self, x: f32, baseline: f32, text: &str, style: &TextStyle) {
        let (r, g, b) = style.color;
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![style.font.resource().into(), style.size.into()],
        ));
        self.ops
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        self.ops
            .push(Operation::new("Td", vec![x.into(), baseline.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, shade: f32) {
        self.ops.push(Operation::new(
            "rg",
            vec![shade.into(), shade.into(), shade.into()],
        ));
        self.ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), w.into(), h.into()],
        ));
        self.ops.push(Operation::new("f", vec![]));
    }
}

// ---------------------------------------------------------------------------
// Text measurement and encoding
// ---------------------------------------------------------------------------

fn measure(text: &str, style: &TextStyle) -> f32 {
    text.chars().count() as f32 * style.size * style.font.width_factor()
}

fn max_chars(style: &TextStyle, width: f32) -> usize {
    ((width / (style.size * style.font.width_factor())).floor() as usize).max(1)
}

/// Greedy word wrap by character budget; words longer than a full line are
/// hard-split.
fn wrap_chars(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut count = 0usize;

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > limit {
            if count > 0 {
                lines.push(std::mem::take(&mut line));
                count = 0;
            }
            let split = word
                .char_indices()
                .nth(limit)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }
        let word_count = word.chars().count();
        if count > 0 && count + 1 + word_count > limit {
            lines.push(std::mem::take(&mut line));
            count = 0;
        }
        if count > 0 {
            line.push(' ');
            count += 1;
        }
        line.push_str(word);
        count += word_count;
    }
    if count > 0 {
        lines.push(line);
    }
    lines
}

/// Split a pre-formatted line into chunks of at most `limit` characters,
/// preserving internal whitespace.
fn hard_split(line: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= limit {
        return vec![line.to_string()];
    }
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Map text onto the WinAnsi byte range used by the standard Type1 faces.
/// Common typographic characters get their WinAnsi slots; everything else
/// outside Latin-1 degrades to `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_respects_character_budget() {
        let lines = wrap_chars("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_wrap_hard_splits_overlong_words() {
        let lines = wrap_chars("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_collapses_internal_whitespace() {
        let lines = wrap_chars("a\tb   c", 40);
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn test_hard_split_preserves_leading_whitespace() {
        let lines = hard_split("    indented code line", 40);
        assert_eq!(lines, vec!["    indented code line"]);

        let lines = hard_split("0123456789", 4);
        assert_eq!(lines, vec!["0123", "4567", "89"]);
    }

    #[test]
    fn test_win_ansi_maps_typographic_characters() {
        assert_eq!(encode_win_ansi("ab"), vec![0x61, 0x62]);
        assert_eq!(encode_win_ansi("\u{2022}"), vec![0x95]);
        assert_eq!(encode_win_ansi("\u{2014}"), vec![0x97]);
        assert_eq!(encode_win_ansi("é"), vec![0xE9]);
        assert_eq!(encode_win_ansi("→"), vec![b'?']);
    }

    #[test]
    fn test_empty_writer_still_produces_one_page() {
        let bytes = PdfWriter::new().finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_text_flows_onto_further_pages() {
        let mut writer = PdfWriter::new();
        let style = TextStyle::default();
        for _ in 0..120 {
            writer.text_block("a paragraph of filler text that occupies one wrapped line", &style);
            writer.vspace(7.0);
        }
        let bytes = writer.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn test_explicit_break_page_adds_a_page() {
        let mut writer = PdfWriter::new();
        writer.text_block("cover", &TextStyle::default());
        writer.break_page();
        writer.text_block("body", &TextStyle::default());
        let bytes = writer.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_info_dictionary_round_trips() {
        let mut writer = PdfWriter::new();
        writer.set_info(Some("Memo"), Some("QA"), None, Some("alpha, beta"));
        writer.text_block("body", &TextStyle::default());
        let bytes = writer.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let info_ref = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_object(info_ref).unwrap().as_dict().unwrap();
        match info.get(b"Title").unwrap() {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"Memo"),
            other => panic!("unexpected Title object: {other:?}"),
        }
        match info.get(b"Author").unwrap() {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"QA"),
            other => panic!("unexpected Author object: {other:?}"),
        }
    }

    #[test]
    fn test_vspace_is_suppressed_on_fresh_pages() {
        let mut writer = PdfWriter::new();
        writer.vspace(500.0);
        writer.vspace(500.0);
        writer.text_block("body", &TextStyle::default());
        let bytes = writer.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
