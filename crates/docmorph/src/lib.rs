// SPDX-License-Identifier: AGPL-3.0-or-later
//! Docmorph - Document conversion through one shared intermediate tree
//!
//! Parse markdown/plain text, HTML, PDF, or DOCX into a common block/inline
//! tree, then render that tree into any of the four formats. One call can
//! request several outputs at once; renderers run concurrently over the same
//! parsed tree.
//!
//! ```no_run
//! # async fn demo() -> docmorph::Result<()> {
//! use docmorph::{convert, ConvertOptions, OutputFormat};
//!
//! let out = convert(
//!     "# Notes\n\n- first\n- second",
//!     ConvertOptions::new()
//!         .with_format(OutputFormat::Html)
//!         .with_format(OutputFormat::Pdf),
//! )
//! .await?;
//! assert!(out.html.is_some() && out.pdf.is_some());
//! # Ok(())
//! # }
//! ```

pub mod pipeline;
pub mod request;
pub mod template;

pub use docmorph_core::{
    Artifact, Block, DocMeta, Document, Error, Inline, InputFormat, ListItem, MetaValue,
    OutputFormat, Result, Template,
};
pub use pipeline::Converter;
pub use request::{ConvertOptions, RawInput, Rendered};
pub use template::TemplateStore;

/// Convert with a fresh converter carrying only the built-in templates
pub async fn convert(input: impl Into<RawInput>, options: ConvertOptions) -> Result<Rendered> {
    Converter::new().convert(input, options).await
}

/// Render the input as canonical markdown
pub async fn to_markdown(input: impl Into<RawInput>) -> Result<String> {
    let rendered = convert(
        input,
        ConvertOptions::new().with_format(OutputFormat::Markdown),
    )
    .await?;
    rendered
        .markdown
        .ok_or_else(|| missing(OutputFormat::Markdown))
}

/// Render the input as a standalone HTML page
pub async fn to_html(input: impl Into<RawInput>) -> Result<String> {
    let rendered = convert(input, ConvertOptions::new().with_format(OutputFormat::Html)).await?;
    rendered.html.ok_or_else(|| missing(OutputFormat::Html))
}

/// Render the input as a PDF byte stream
pub async fn to_pdf(input: impl Into<RawInput>) -> Result<Vec<u8>> {
    let rendered = convert(input, ConvertOptions::new().with_format(OutputFormat::Pdf)).await?;
    rendered.pdf.ok_or_else(|| missing(OutputFormat::Pdf))
}

/// Render the input as a DOCX byte stream
pub async fn to_docx(input: impl Into<RawInput>) -> Result<Vec<u8>> {
    let rendered = convert(input, ConvertOptions::new().with_format(OutputFormat::Docx)).await?;
    rendered.docx.ok_or_else(|| missing(OutputFormat::Docx))
}

fn missing(format: OutputFormat) -> Error {
    Error::render(format, "requested format missing from the result")
}
