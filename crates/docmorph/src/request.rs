// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversion request and result types

use docmorph_core::{DocMeta, InputFormat, OutputFormat};

/// Raw conversion input
///
/// Markup formats arrive as text, container formats as bytes. Text handed to
/// a binary parser is rejected by the pipeline; bytes handed to a text parser
/// are decoded lossily.
#[derive(Debug, Clone)]
pub enum RawInput {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawInput {
    /// Size in bytes regardless of kind
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for RawInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RawInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for RawInput {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for RawInput {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

/// What to convert into, and how
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Requested output formats; must not be empty
    pub formats: Vec<OutputFormat>,
    /// Declared input format; detected from content when absent
    pub input_format: Option<InputFormat>,
    /// Template id, resolved against the converter's store
    pub template: Option<String>,
    /// Caller metadata, merged over anything the parser recovers
    pub meta: Option<DocMeta>,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.formats.push(format);
        self
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        self.formats.extend(formats);
        self
    }

    pub fn with_input_format(mut self, format: InputFormat) -> Self {
        self.input_format = Some(format);
        self
    }

    pub fn with_template(mut self, id: impl Into<String>) -> Self {
        self.template = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, meta: DocMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Rendered output, one slot per format
///
/// An absent slot means the format was not requested; a requested format that
/// fails fails the whole conversion instead of leaving its slot empty.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub pdf: Option<Vec<u8>>,
    pub docx: Option<Vec<u8>>,
}

impl Rendered {
    /// Whether output for the given format is present
    pub fn contains(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Markdown => self.markdown.is_some(),
            OutputFormat::Html => self.html.is_some(),
            OutputFormat::Pdf => self.pdf.is_some(),
            OutputFormat::Docx => self.docx.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !OutputFormat::ALL.iter().any(|f| self.contains(*f))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_raw_input_conversions() {
        assert!(matches!(RawInput::from("abc"), RawInput::Text(_)));
        assert!(matches!(RawInput::from("abc".to_string()), RawInput::Text(_)));
        assert!(matches!(RawInput::from(vec![1u8, 2]), RawInput::Bytes(_)));
        assert!(matches!(RawInput::from(&[1u8, 2][..]), RawInput::Bytes(_)));
        assert_eq!(RawInput::from("abc").len(), 3);
        assert!(RawInput::from("").is_empty());
    }

    #[test]
    fn test_options_builders_accumulate() {
        let options = ConvertOptions::new()
            .with_format(OutputFormat::Markdown)
            .with_formats([OutputFormat::Html, OutputFormat::Pdf])
            .with_input_format(InputFormat::Markdown)
            .with_template("plain")
            .with_metadata(DocMeta::new().with_title("T"));
        assert_eq!(
            options.formats,
            vec![OutputFormat::Markdown, OutputFormat::Html, OutputFormat::Pdf]
        );
        assert_eq!(options.input_format, Some(InputFormat::Markdown));
        assert_eq!(options.template.as_deref(), Some("plain"));
        assert_eq!(options.meta.unwrap().title.as_deref(), Some("T"));
    }

    #[test]
    fn test_rendered_tracks_present_slots() {
        let mut rendered = Rendered::default();
        assert!(rendered.is_empty());
        rendered.html = Some(String::new());
        assert!(rendered.contains(OutputFormat::Html));
        assert!(!rendered.contains(OutputFormat::Pdf));
        assert!(!rendered.is_empty());
    }
}
