// SPDX-License-Identifier: AGPL-3.0-or-later
//! Input format detection from content signatures
//!
//! Pure classification, no I/O, total over arbitrary input: every byte or
//! text sequence maps to one of {markdown, html, pdf, docx}, with markdown as
//! the safe default. Empty input is markdown, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::InputFormat;

/// ZIP local-file-header signature used by OOXML containers
const DOCX_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];

/// PDF header signature
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Elements that never take a closing tag
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

static OPENING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([a-zA-Z][a-zA-Z0-9]*)").expect("valid tag pattern"));

static SELF_CLOSING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^<[a-zA-Z][a-zA-Z0-9]*(\s[^>]*)?/>").expect("valid self-closing pattern")
});

/// Classify a raw byte sequence
///
/// Binary container signatures win; anything that decodes as UTF-8 falls
/// through to the text rules; undecodable bytes default to markdown.
pub fn detect_bytes(input: &[u8]) -> InputFormat {
    if input.starts_with(DOCX_MAGIC) {
        return InputFormat::Docx;
    }
    if input.starts_with(PDF_MAGIC) {
        return InputFormat::Pdf;
    }
    match std::str::from_utf8(input) {
        Ok(text) => detect_text(text),
        Err(_) => InputFormat::Markdown,
    }
}

/// Classify a text input as html or markdown
pub fn detect_text(input: &str) -> InputFormat {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return InputFormat::Markdown;
    }

    if starts_with_ignore_case(trimmed, "<!doctype") || starts_with_ignore_case(trimmed, "<html") {
        return InputFormat::Html;
    }

    if let Some(captures) = OPENING_TAG.captures(trimmed) {
        let tag = captures[1].to_ascii_lowercase();
        let has_closing = trimmed
            .to_ascii_lowercase()
            .contains(&format!("</{tag}"));
        if has_closing
            || SELF_CLOSING_TAG.is_match(trimmed)
            || VOID_ELEMENTS.contains(&tag.as_str())
        {
            return InputFormat::Html;
        }
    }

    InputFormat::Markdown
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_signature() {
        let bytes = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00];
        assert_eq!(detect_bytes(&bytes), InputFormat::Docx);
    }

    #[test]
    fn test_pdf_signature() {
        assert_eq!(detect_bytes(b"%PDF-1.7\n%\xFF\xFF"), InputFormat::Pdf);
    }

    #[test]
    fn test_other_zip_records_are_not_docx() {
        // Empty-archive end record: "PK" but not a local file header
        let bytes = [0x50, 0x4B, 0x05, 0x06];
        assert_eq!(detect_bytes(&bytes), InputFormat::Markdown);
    }

    #[test]
    fn test_undecodable_bytes_default_to_markdown() {
        assert_eq!(detect_bytes(&[0xFF, 0xFE, 0x00, 0x81]), InputFormat::Markdown);
    }

    #[test]
    fn test_utf8_bytes_fall_through_to_text_rules() {
        assert_eq!(detect_bytes(b"# Title\n\nBody"), InputFormat::Markdown);
        assert_eq!(detect_bytes(b"<p>hi</p>"), InputFormat::Html);
    }

    #[test]
    fn test_empty_input_is_markdown() {
        assert_eq!(detect_bytes(&[]), InputFormat::Markdown);
        assert_eq!(detect_text(""), InputFormat::Markdown);
        assert_eq!(detect_text("   \n\t  "), InputFormat::Markdown);
    }

    #[test]
    fn test_doctype_and_html_tag() {
        assert_eq!(
            detect_text("<!DOCTYPE html><p>x</p>"),
            InputFormat::Html
        );
        assert_eq!(detect_text("<!doctype HTML>"), InputFormat::Html);
        assert_eq!(detect_text("<HTML><body></body></HTML>"), InputFormat::Html);
        assert_eq!(detect_text("  <html lang=\"en\">"), InputFormat::Html);
    }

    #[test]
    fn test_opening_tag_with_matching_close() {
        assert_eq!(detect_text("<div>content</div>"), InputFormat::Html);
        assert_eq!(detect_text("<SPAN>styled</span>"), InputFormat::Html);
    }

    #[test]
    fn test_void_and_self_closing_tags() {
        assert_eq!(detect_text("<br>"), InputFormat::Html);
        assert_eq!(detect_text("<hr />"), InputFormat::Html);
        assert_eq!(detect_text("<meta charset=\"utf-8\">"), InputFormat::Html);
        assert_eq!(detect_text("<area shape=\"rect\"/>"), InputFormat::Html);
    }

    #[test]
    fn test_angle_bracket_without_tag_is_markdown() {
        assert_eq!(detect_text("< 5 is less than 10"), InputFormat::Markdown);
        assert_eq!(detect_text("a < b && b > c"), InputFormat::Markdown);
    }

    #[test]
    fn test_unclosed_tag_is_markdown() {
        assert_eq!(detect_text("<unclosed attribute=\"x\""), InputFormat::Markdown);
        assert_eq!(detect_text("<p>never closed"), InputFormat::Markdown);
    }

    #[test]
    fn test_plain_markdown() {
        assert_eq!(detect_text("# Heading\n\n- item"), InputFormat::Markdown);
        assert_eq!(detect_text("just a sentence."), InputFormat::Markdown);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Detection is total: any byte sequence classifies without panicking,
        // and never as a text-only input format.
        #[test]
        fn prop_detect_bytes_total(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let format = detect_bytes(&bytes);
            prop_assert!(matches!(
                format,
                InputFormat::Markdown | InputFormat::Html | InputFormat::Pdf | InputFormat::Docx
            ));
        }

        #[test]
        fn prop_detect_text_total(text in ".{0,256}") {
            let format = detect_text(&text);
            prop_assert!(matches!(format, InputFormat::Markdown | InputFormat::Html));
        }

        #[test]
        fn prop_detection_is_deterministic(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
            prop_assert_eq!(detect_bytes(&bytes), detect_bytes(&bytes));
        }
    }
}
