// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversion pipeline
//!
//! One conversion is one async call: validate the request, resolve the input
//! format, parse once, then render every requested format concurrently on the
//! blocking pool. All render tasks share the same read-only tree behind an
//! `Arc`; the first failure fails the call and finished sibling output is
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;

use docmorph_core::{
    detect, Artifact, BinaryParser, DocMeta, Document, DocxHandler, Error, HtmlHandler,
    InputFormat, MarkdownHandler, OutputFormat, Parser, PdfHandler, RenderContext, Renderer,
    Result, Template,
};
use tokio::task::JoinSet;

use crate::request::{ConvertOptions, RawInput, Rendered};
use crate::template::TemplateStore;

/// Document converter with its own template store
#[derive(Debug, Clone, Default)]
pub struct Converter {
    templates: TemplateStore,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter over a caller-built store instead of the built-in defaults
    pub fn with_templates(templates: TemplateStore) -> Self {
        Self { templates }
    }

    /// Register an additional template with this converter's store
    pub fn register_template(&mut self, template: Template) {
        self.templates.register(template);
    }

    /// Convert `input` into every format named in `options`
    pub async fn convert(
        &self,
        input: impl Into<RawInput>,
        options: ConvertOptions,
    ) -> Result<Rendered> {
        let input = input.into();
        let formats = validate_formats(&options.formats)?;
        let template = self.pick_template(options.template.as_deref(), &formats)?;
        tracing::debug!(
            formats = formats.len(),
            bytes = input.len(),
            "request validated"
        );

        let input_format = match options.input_format {
            Some(declared) => declared,
            None => {
                let detected = match &input {
                    RawInput::Text(text) => detect::detect_text(text),
                    RawInput::Bytes(bytes) => detect::detect_bytes(bytes),
                };
                tracing::debug!(format = %detected, "input format detected");
                detected
            }
        };

        let doc = parse_input(input_format, input).await?;
        tracing::debug!(blocks = doc.content.len(), "input parsed");

        let meta = effective_meta(&doc, options.meta);
        let doc = Arc::new(doc);

        let mut tasks: JoinSet<Result<Artifact>> = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, OutputFormat> = HashMap::new();
        for format in &formats {
            let format = *format;
            let doc = Arc::clone(&doc);
            let ctx = context_for(format, &meta, template.as_ref());
            let handle = tasks.spawn_blocking(move || render_one(format, &doc, &ctx));
            running.insert(handle.id(), format);
        }

        let mut rendered = Rendered::default();
        while let Some(next) = tasks.join_next_with_id().await {
            match next {
                Ok((id, Ok(artifact))) => {
                    let format = running.remove(&id).ok_or_else(|| {
                        Error::render(OutputFormat::Markdown, "render task id is unknown")
                    })?;
                    store_artifact(&mut rendered, format, artifact)?;
                }
                Ok((_, Err(err))) => return Err(err),
                Err(join_err) => {
                    let format = running
                        .remove(&join_err.id())
                        .unwrap_or(OutputFormat::Markdown);
                    return Err(Error::render(
                        format,
                        format!("render task failed: {join_err}"),
                    ));
                }
            }
        }
        tracing::debug!(formats = formats.len(), "all formats rendered");
        Ok(rendered)
    }

    /// Resolve the template id against the requested formats
    ///
    /// The template attaches to the first requested format it targets; an id
    /// that applies to none of them surfaces the store's error.
    fn pick_template(
        &self,
        id: Option<&str>,
        formats: &[OutputFormat],
    ) -> Result<Option<Template>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let mut last_err = None;
        for format in formats {
            match self.templates.resolve(Some(id), *format) {
                Ok(Some(template)) => return Ok(Some(template)),
                Ok(None) => {}
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            Error::validation("template", format!("template '{id}' was not applicable"))
        }))
    }
}

/// Reject an empty request and drop duplicate formats, keeping first order
fn validate_formats(requested: &[OutputFormat]) -> Result<Vec<OutputFormat>> {
    if requested.is_empty() {
        return Err(Error::validation(
            "formats",
            "at least one output format is required",
        ));
    }
    let mut formats = Vec::with_capacity(requested.len());
    for format in requested {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }
    Ok(formats)
}

/// Dispatch to the parser for the resolved format on the blocking pool
async fn parse_input(format: InputFormat, input: RawInput) -> Result<Document> {
    tokio::task::spawn_blocking(move || match (format, input) {
        (InputFormat::Pdf, RawInput::Bytes(bytes)) => PdfHandler::new().parse_bytes(&bytes),
        (InputFormat::Docx, RawInput::Bytes(bytes)) => DocxHandler::new().parse_bytes(&bytes),
        (InputFormat::Pdf | InputFormat::Docx, RawInput::Text(_)) => Err(Error::validation(
            "input",
            format!("{format} cannot be parsed from a string; binary input required"),
        )),
        (InputFormat::Html, input) => HtmlHandler::new().parse(&input_text(input)),
        (InputFormat::Text | InputFormat::Markdown, input) => {
            MarkdownHandler::new().parse(&input_text(input))
        }
    })
    .await
    .map_err(|e| Error::parse(format!("parse task failed: {e}")))?
}

fn input_text(input: RawInput) -> String {
    match input {
        RawInput::Text(text) => text,
        RawInput::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// Caller metadata wins field by field; parser-recovered values fill the gaps
fn effective_meta(doc: &Document, supplied: Option<DocMeta>) -> DocMeta {
    let recovered = &doc.meta;
    match supplied {
        None => recovered.clone(),
        Some(mut meta) => {
            if meta.title.is_none() {
                meta.title = recovered.title.clone();
            }
            if meta.author.is_none() {
                meta.author = recovered.author.clone();
            }
            if meta.date.is_none() {
                meta.date = recovered.date.clone();
            }
            if meta.description.is_none() {
                meta.description = recovered.description.clone();
            }
            if meta.keywords.is_empty() {
                meta.keywords = recovered.keywords.clone();
            }
            for (key, value) in &recovered.extra {
                meta.extra
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
            meta
        }
    }
}

fn context_for(
    format: OutputFormat,
    meta: &DocMeta,
    template: Option<&Template>,
) -> RenderContext {
    let ctx = RenderContext::new(meta.clone());
    match template {
        Some(tpl) if tpl.target == format => ctx.with_template(tpl.clone()),
        _ => ctx,
    }
}

fn render_one(format: OutputFormat, doc: &Document, ctx: &RenderContext) -> Result<Artifact> {
    let artifact = match format {
        OutputFormat::Markdown => MarkdownHandler::new().render(doc, ctx)?,
        OutputFormat::Html => HtmlHandler::new().render(doc, ctx)?,
        OutputFormat::Pdf => PdfHandler::new().render(doc, ctx)?,
        OutputFormat::Docx => DocxHandler::new().render(doc, ctx)?,
    };
    tracing::debug!(format = %format, bytes = artifact.len(), "format rendered");
    Ok(artifact)
}

/// Text formats fill text slots, container formats fill byte slots
fn store_artifact(rendered: &mut Rendered, format: OutputFormat, artifact: Artifact) -> Result<()> {
    match (format, artifact) {
        (OutputFormat::Markdown, Artifact::Text(text)) => rendered.markdown = Some(text),
        (OutputFormat::Html, Artifact::Text(text)) => rendered.html = Some(text),
        (OutputFormat::Pdf, Artifact::Binary(bytes)) => rendered.pdf = Some(bytes),
        (OutputFormat::Docx, Artifact::Binary(bytes)) => rendered.docx = Some(bytes),
        (format, _) => {
            return Err(Error::render(
                format,
                "renderer produced the wrong artifact kind",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_formats_rejects_empty() {
        let err = validate_formats(&[]).unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn test_validate_formats_drops_duplicates_in_order() {
        let formats = validate_formats(&[
            OutputFormat::Html,
            OutputFormat::Markdown,
            OutputFormat::Html,
        ])
        .unwrap();
        assert_eq!(formats, vec![OutputFormat::Html, OutputFormat::Markdown]);
    }

    #[test]
    fn test_effective_meta_prefers_caller_fields() {
        let mut doc = Document::new(InputFormat::Markdown);
        doc.meta = DocMeta::new().with_title("Recovered").with_author("A");
        let merged = effective_meta(&doc, Some(DocMeta::new().with_title("Supplied")));
        assert_eq!(merged.title.as_deref(), Some("Supplied"));
        assert_eq!(merged.author.as_deref(), Some("A"));
    }

    #[test]
    fn test_context_attaches_template_only_to_its_target() {
        let meta = DocMeta::new();
        let template = Template::new("page", OutputFormat::Html, "{{content}}");
        let html_ctx = context_for(OutputFormat::Html, &meta, Some(&template));
        assert!(html_ctx.template.is_some());
        let md_ctx = context_for(OutputFormat::Markdown, &meta, Some(&template));
        assert!(md_ctx.template.is_none());
    }
}
