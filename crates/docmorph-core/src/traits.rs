// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parser and Renderer traits for format handlers

use crate::ast::{DocMeta, Document, InputFormat, OutputFormat};
use crate::error::Result;
use crate::template::Template;

/// Parser trait: convert text input to a document tree
pub trait Parser: Send + Sync {
    /// The input format this parser handles
    fn format(&self) -> InputFormat;

    /// Parse a string into a Document
    fn parse(&self, input: &str) -> Result<Document>;
}

/// Parser trait for binary container formats
pub trait BinaryParser: Send + Sync {
    /// The input format this parser handles
    fn format(&self) -> InputFormat;

    /// Parse a raw byte sequence into a Document
    fn parse_bytes(&self, input: &[u8]) -> Result<Document>;
}

/// Everything a renderer may consult besides the tree itself
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Effective metadata for this render (caller-supplied merged over any
    /// metadata recovered from the input)
    pub meta: DocMeta,
    /// Optional caller-selected template; renderers without template support
    /// ignore it
    pub template: Option<Template>,
}

impl RenderContext {
    pub fn new(meta: DocMeta) -> Self {
        Self {
            meta,
            template: None,
        }
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }
}

/// Renderer trait: convert a document tree to one output artifact
///
/// Renderers never mutate the tree; a shared reference is all they get.
pub trait Renderer: Send + Sync {
    /// The target format this renderer produces
    fn format(&self) -> OutputFormat;

    /// Render a Document into an output artifact
    fn render(&self, doc: &Document, ctx: &RenderContext) -> Result<Artifact>;
}

/// Output of one renderer: text for markup formats, bytes for containers
#[derive(Debug, Clone)]
pub enum Artifact {
    Text(String),
    Binary(Vec<u8>),
}

impl Artifact {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            Self::Text(_) => None,
        }
    }

    /// Size in bytes regardless of kind
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_accessors() {
        let text = Artifact::Text("hello".to_string());
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.len(), 5);
        assert!(text.into_bytes().is_none());

        let binary = Artifact::Binary(vec![0x25, 0x50, 0x44, 0x46]);
        assert!(binary.as_text().is_none());
        assert_eq!(binary.clone().into_bytes(), Some(vec![0x25, 0x50, 0x44, 0x46]));
        assert!(!binary.is_empty());
    }

    #[test]
    fn test_render_context_defaults_empty() {
        let ctx = RenderContext::default();
        assert!(ctx.meta.is_empty());
        assert!(ctx.template.is_none());
    }
}
