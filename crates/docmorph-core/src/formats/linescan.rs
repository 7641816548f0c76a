// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structure recovery for flat text pulled out of print-oriented containers.
//!
//! Text extracted from a PDF page stream, or from a word-processing file that
//! carries no usable style information, arrives as bare lines. This module
//! rebuilds a block tree from those lines in a single forward pass with one
//! line of lookahead: blank lines close paragraphs and lists, marker prefixes
//! open list items, and three heuristics promote lines to headings (upper-case
//! lines, short isolated lines, numbered section labels). The pass is
//! deliberately conservative; a line the heuristics misread degrades into an
//! ordinary paragraph, never into an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Block, ListItem};

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// Marker glyphs word processors and PDF extractors emit for bullet items.
const BULLET_GLYPHS: [char; 6] = ['-', '*', '•', '·', '‣', '▪'];

/// Ordinal list markers: decimal, single letter, or roman, closed by `.`/`)`.
static ORDINAL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,3}|[A-Za-z]|[ivxlcdm]{2,8}|[IVXLCDM]{2,8})[.)]\s+")
        .expect("valid marker pattern")
});

/// Section labels such as `3 Results` or `2.4.1 Error handling`.
static SECTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\s+[A-Z]").expect("valid label pattern"));

/// Leading numeric path of a section label, used for heading depth.
static SECTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\s").expect("valid prefix pattern"));

/// Split a list marker off the front of a trimmed line. Returns the ordered
/// flag implied by the marker and the remaining item text.
pub(crate) fn split_list_marker(line: &str) -> Option<(bool, &str)> {
    let mut chars = line.chars();
    if let Some(first) = chars.next() {
        if BULLET_GLYPHS.contains(&first) {
            let rest = &line[first.len_utf8()..];
            if rest.starts_with(char::is_whitespace) {
                return Some((false, rest.trim_start()));
            }
        }
    }
    ORDINAL_MARKER
        .find(line)
        .map(|m| (true, &line[m.end()..]))
}

fn is_upper_heading(line: &str) -> bool {
    let len = line.chars().count();
    len > 2
        && len < 60
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
}

fn has_terminal_punctuation(line: &str) -> bool {
    matches!(line.chars().last(), Some('.' | ',' | ';' | ':' | '!' | '?'))
}

/// Title-Case test: every word opens with an upper-case letter, except short
/// connectives (`of`, `and`, `for`) after the first word.
fn is_title_case(line: &str) -> bool {
    let mut words = 0usize;
    for word in line.split_whitespace() {
        let Some(first) = word.chars().find(|c| c.is_alphabetic()) else {
            continue;
        };
        words += 1;
        if first.is_lowercase() && (words == 1 || word.chars().count() > 3) {
            return false;
        }
    }
    words > 0
}

/// A short line with a blank line after it reads as a heading when it is the
/// very first content line, or when it is Title-Case and shorter still.
fn is_isolated_heading(line: &str, next_blank: bool, first_content: bool) -> bool {
    let len = line.chars().count();
    len < 60
        && next_blank
        && !has_terminal_punctuation(line)
        && (first_content || (len < 50 && is_title_case(line)))
}

fn is_section_label(line: &str) -> bool {
    line.chars().count() < 80 && SECTION_LABEL.is_match(line)
}

/// Heading depth: upper-case lines are top level, section labels follow their
/// numeric path, and everything else falls into length buckets.
fn heading_depth(line: &str, upper: bool) -> u8 {
    if upper {
        return 1;
    }
    if let Some(caps) = SECTION_PREFIX.captures(line) {
        let dots = caps[1].matches('.').count();
        return (dots + 1).min(6) as u8;
    }
    match line.chars().count() {
        0..=24 => 1,
        25..=39 => 2,
        40..=59 => 3,
        _ => 4,
    }
}

// ---------------------------------------------------------------------------
// Forward scan
// ---------------------------------------------------------------------------

/// Rebuild a block tree from flat text.
///
/// Empty or whitespace-only input yields an empty tree. Buffers are flushed
/// in document order, so block order always follows line order.
pub fn scan(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut items: Vec<ListItem> = Vec::new();
    let mut ordered = false;
    let mut seen_content = false;

    for (idx, &line) in lines.iter().enumerate() {
        if line.is_empty() {
            flush_paragraph(&mut blocks, &mut paragraph);
            flush_list(&mut blocks, &mut items, ordered);
            continue;
        }

        if let Some((marker_ordered, rest)) = split_list_marker(line) {
            flush_paragraph(&mut blocks, &mut paragraph);
            if items.is_empty() {
                // the first item fixes the flavor of the whole run
                ordered = marker_ordered;
            }
            items.push(ListItem::text(rest));
            seen_content = true;
            continue;
        }

        let next_blank = lines.get(idx + 1).map_or(true, |l| l.is_empty());
        let upper = is_upper_heading(line);
        if upper || is_isolated_heading(line, next_blank, !seen_content) || is_section_label(line) {
            flush_paragraph(&mut blocks, &mut paragraph);
            flush_list(&mut blocks, &mut items, ordered);
            let depth = heading_depth(line, upper);
            tracing::trace!(line = idx + 1, depth, "classified heading");
            blocks.push(Block::text_heading(depth, line));
            seen_content = true;
            continue;
        }

        flush_list(&mut blocks, &mut items, ordered);
        paragraph.push(line);
        seen_content = true;
    }

    flush_paragraph(&mut blocks, &mut paragraph);
    flush_list(&mut blocks, &mut items, ordered);
    blocks
}

fn flush_paragraph(blocks: &mut Vec<Block>, buffer: &mut Vec<&str>) {
    if buffer.is_empty() {
        return;
    }
    let text = buffer.join(" ");
    buffer.clear();
    blocks.push(Block::text_paragraph(text));
}

fn flush_list(blocks: &mut Vec<Block>, items: &mut Vec<ListItem>, ordered: bool) {
    if items.is_empty() {
        return;
    }
    blocks.push(Block::List {
        ordered,
        items: std::mem::take(items),
    });
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn scan_is_total(text in ".{0,400}") {
            let _ = scan(&text);
        }

        #[test]
        fn block_count_never_exceeds_content_lines(text in "[ -~\n]{0,400}") {
            let content_lines = text.lines().filter(|l| !l.trim().is_empty()).count();
            prop_assert!(scan(&text).len() <= content_lines);
        }
    }
}
