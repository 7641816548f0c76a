// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTML format handler
//!
//! Parsing delegates the heavy lifting to html5ever via `scraper` and walks
//! the recovered element tree into document nodes; malformed nesting never
//! raises because the underlying parser recovers structurally. Rendering
//! produces a complete standalone page (or fills a caller-supplied template)
//! with all text content escaped.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::ast::{Block, Document, Inline, InputFormat, ListItem, OutputFormat};
use crate::error::Result;
use crate::traits::{Artifact, Parser, RenderContext, Renderer};

/// HTML format handler
pub struct HtmlHandler;

/// Non-content subtrees dropped during the walk
const SKIP_TAGS: &[&str] = &[
    "script", "style", "head", "title", "meta", "link", "base", "noscript",
];

impl HtmlHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for HtmlHandler {
    fn format(&self) -> InputFormat {
        InputFormat::Html
    }

    fn parse(&self, input: &str) -> Result<Document> {
        let mut doc = Document::new(InputFormat::Html);
        if input.trim().is_empty() {
            return Ok(doc);
        }

        let parsed = Html::parse_document(input);
        doc.content = parse_block_children(parsed.root_element());
        Ok(doc)
    }
}

/// Collect block nodes from an element's children. Loose inline content
/// (text or styling tags outside any paragraph) accumulates into an implicit
/// paragraph, flushed whenever a block element begins.
fn parse_block_children(parent: ElementRef) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<Inline> = Vec::new();

    for child in parent.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                let collapsed = collapse_whitespace(&text.text);
                if !collapsed.is_empty() {
                    pending.push(Inline::Text { content: collapsed });
                }
            }
            ScraperNode::Element(element) => {
                let name = element.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let Some(element_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_block_tag(name) {
                    flush_paragraph(&mut blocks, &mut pending);
                    append_block_element(element_ref, name, &mut blocks);
                } else {
                    append_inline_element(element_ref, name, &mut pending);
                }
            }
            _ => {}
        }
    }

    flush_paragraph(&mut blocks, &mut pending);
    blocks
}

/// Tags that open a block context. Structural containers not mapped to a
/// node kind of their own (div, section, body, ...) still count; they recurse
/// transparently instead of flattening their children into inline runs.
fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "h1" | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "p"
            | "ul"
            | "ol"
            | "pre"
            | "blockquote"
            | "hr"
            | "html"
            | "body"
            | "div"
            | "section"
            | "article"
            | "main"
            | "header"
            | "footer"
            | "aside"
            | "nav"
            | "figure"
            | "table"
            | "tr"
            | "form"
            | "dl"
    )
}

fn append_block_element(element: ElementRef, name: &str, blocks: &mut Vec<Block>) {
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let depth = name.as_bytes()[1] - b'0';
            blocks.push(Block::Heading {
                depth,
                content: parse_inline_children(element),
            });
        }

        "p" => {
            let content = parse_inline_children(element);
            if !content.is_empty() {
                blocks.push(Block::Paragraph { content });
            }
        }

        "ul" | "ol" => {
            blocks.push(Block::List {
                ordered: name == "ol",
                items: parse_list_items(element),
            });
        }

        "pre" => blocks.push(parse_code_block(element)),

        "blockquote" => blocks.push(Block::BlockQuote {
            content: parse_block_children(element),
        }),

        "hr" => blocks.push(Block::ThematicBreak),

        // Unknown structural containers are transparent; their children are
        // lifted in place.
        _ => blocks.extend(parse_block_children(element)),
    }
}

fn parse_list_items(list: ElementRef) -> Vec<ListItem> {
    let mut items = Vec::new();
    for child in list.children() {
        let Some(element) = ElementRef::wrap(child) else {
            continue;
        };
        match element.value().name() {
            "li" => items.push(ListItem::new(parse_block_children(element))),
            // A list nested directly inside a list is hoisted into its own
            // item so no content is dropped.
            "ul" | "ol" => items.push(ListItem::new(vec![Block::List {
                ordered: element.value().name() == "ol",
                items: parse_list_items(element),
            }])),
            _ => {}
        }
    }
    items
}

fn parse_code_block(pre: ElementRef) -> Block {
    let code_child = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "code");

    let language = code_child
        .and_then(|code| code.value().attr("class"))
        .and_then(|classes| {
            classes
                .split_whitespace()
                .find_map(|class| class.strip_prefix("language-"))
        })
        .map(str::to_string);

    let source = code_child.unwrap_or(pre);
    let mut content: String = source.text().collect();
    if let Some(stripped) = content.strip_prefix('\n') {
        content = stripped.to_string();
    }

    Block::CodeBlock { language, content }
}

fn parse_inline_children(parent: ElementRef) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for child in parent.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                let collapsed = collapse_whitespace(&text.text);
                if !collapsed.is_empty() {
                    inlines.push(Inline::Text { content: collapsed });
                }
            }
            ScraperNode::Element(element) => {
                let name = element.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                if let Some(element_ref) = ElementRef::wrap(child) {
                    append_inline_element(element_ref, name, &mut inlines);
                }
            }
            _ => {}
        }
    }
    trim_inline_edges(&mut inlines);
    inlines
}

fn append_inline_element(element: ElementRef, name: &str, inlines: &mut Vec<Inline>) {
    match name {
        "strong" | "b" => inlines.push(Inline::Strong {
            content: parse_inline_children(element),
        }),
        "em" | "i" => inlines.push(Inline::Emphasis {
            content: parse_inline_children(element),
        }),
        "code" => inlines.push(Inline::Code {
            content: collapse_whitespace(&element.text().collect::<String>())
                .trim()
                .to_string(),
        }),
        "a" => inlines.push(Inline::Link {
            url: element.value().attr("href").unwrap_or_default().to_string(),
            content: parse_inline_children(element),
        }),
        "img" => inlines.push(Inline::Image {
            url: element.value().attr("src").unwrap_or_default().to_string(),
            alt: element.value().attr("alt").unwrap_or_default().to_string(),
        }),
        "br" => inlines.push(Inline::LineBreak),
        // Anything else (span, mark, block misnested inside inline context)
        // contributes its inline content transparently.
        _ => inlines.extend(parse_inline_children(element)),
    }
}

fn flush_paragraph(blocks: &mut Vec<Block>, pending: &mut Vec<Inline>) {
    trim_inline_edges(pending);
    if !pending.is_empty() {
        blocks.push(Block::Paragraph {
            content: std::mem::take(pending),
        });
    }
    pending.clear();
}

/// Collapse whitespace runs to single spaces, HTML rendering style
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
                in_whitespace = true;
            }
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

/// Drop the boundary whitespace an element's text edges pick up from source
/// formatting
fn trim_inline_edges(inlines: &mut Vec<Inline>) {
    if let Some(Inline::Text { content }) = inlines.first_mut() {
        *content = content.trim_start().to_string();
    }
    if matches!(inlines.first(), Some(Inline::Text { content }) if content.is_empty()) {
        inlines.remove(0);
    }
    if let Some(Inline::Text { content }) = inlines.last_mut() {
        *content = content.trim_end().to_string();
    }
    if matches!(inlines.last(), Some(Inline::Text { content }) if content.is_empty()) {
        inlines.pop();
    }
}

// ---------------------------------------------------------------------------
// Rendering

/// Default page wrapper; caller templates replace this body but use the same
/// placeholders.
const DEFAULT_TEMPLATE: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n{{meta}}<title>{{title}}</title>\n<style>\n{{styles}}</style>\n</head>\n<body>\n<article>\n{{content}}\n</article>\n</body>\n</html>\n";

const DEFAULT_STYLES: &str = "body { font-family: Georgia, 'Times New Roman', serif; line-height: 1.6; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; color: #222; }\nh1, h2, h3, h4, h5, h6 { font-family: Helvetica, Arial, sans-serif; line-height: 1.25; }\npre { background: #f4f4f4; padding: 1rem; overflow-x: auto; }\ncode { font-family: 'SF Mono', Consolas, monospace; font-size: 0.95em; }\nblockquote { border-left: 4px solid #ccc; margin-left: 0; padding-left: 1rem; color: #555; }\nimg { max-width: 100%; }\nhr { border: none; border-top: 1px solid #ccc; margin: 2rem 0; }\n";

impl Renderer for HtmlHandler {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render(&self, doc: &Document, ctx: &RenderContext) -> Result<Artifact> {
        let mut content = String::new();
        for (i, block) in doc.content.iter().enumerate() {
            if i > 0 {
                content.push('\n');
            }
            render_block(&mut content, block);
        }

        let title = ctx
            .meta
            .title
            .as_deref()
            .unwrap_or("Document");

        let wrapper = ctx
            .template
            .as_ref()
            .map(|t| t.body.as_str())
            .unwrap_or(DEFAULT_TEMPLATE);

        let page = wrapper
            .replace("{{title}}", &escape_html(title))
            .replace("{{styles}}", DEFAULT_STYLES)
            .replace("{{meta}}", &render_meta_tags(ctx))
            .replace("{{content}}", &content);

        Ok(Artifact::Text(page))
    }
}

fn render_meta_tags(ctx: &RenderContext) -> String {
    let mut tags = String::new();
    if let Some(author) = &ctx.meta.author {
        tags.push_str(&format!(
            "<meta name=\"author\" content=\"{}\">\n",
            escape_html(author)
        ));
    }
    if let Some(description) = &ctx.meta.description {
        tags.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">\n",
            escape_html(description)
        ));
    }
    if !ctx.meta.keywords.is_empty() {
        tags.push_str(&format!(
            "<meta name=\"keywords\" content=\"{}\">\n",
            escape_html(&ctx.meta.keywords.join(", "))
        ));
    }
    tags
}

fn render_block(output: &mut String, block: &Block) {
    match block {
        Block::Heading { depth, content } => {
            output.push_str(&format!("<h{depth}>"));
            render_inlines(output, content);
            output.push_str(&format!("</h{depth}>"));
        }

        Block::Paragraph { content } => {
            output.push_str("<p>");
            render_inlines(output, content);
            output.push_str("</p>");
        }

        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            output.push_str(&format!("<{tag}>\n"));
            for item in items {
                output.push_str("<li>");
                render_list_item(output, item);
                output.push_str("</li>\n");
            }
            output.push_str(&format!("</{tag}>"));
        }

        Block::CodeBlock { language, content } => {
            match language {
                Some(lang) => output.push_str(&format!(
                    "<pre><code class=\"language-{}\">",
                    escape_html(lang)
                )),
                None => output.push_str("<pre><code>"),
            }
            output.push_str(&escape_html(content));
            output.push_str("</code></pre>");
        }

        Block::BlockQuote { content } => {
            output.push_str("<blockquote>\n");
            for (i, block) in content.iter().enumerate() {
                if i > 0 {
                    output.push('\n');
                }
                render_block(output, block);
            }
            output.push_str("\n</blockquote>");
        }

        Block::ThematicBreak => output.push_str("<hr />"),
    }
}

/// Tight-list convention: a single-paragraph item renders its inline content
/// bare, anything richer keeps block markup.
fn render_list_item(output: &mut String, item: &ListItem) {
    if let [Block::Paragraph { content }] = item.content.as_slice() {
        render_inlines(output, content);
        return;
    }
    for (i, block) in item.content.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        render_block(output, block);
    }
}

fn render_inlines(output: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        render_inline(output, inline);
    }
}

fn render_inline(output: &mut String, inline: &Inline) {
    match inline {
        Inline::Text { content } => output.push_str(&escape_html(content)),

        Inline::Strong { content } => {
            output.push_str("<strong>");
            render_inlines(output, content);
            output.push_str("</strong>");
        }

        Inline::Emphasis { content } => {
            output.push_str("<em>");
            render_inlines(output, content);
            output.push_str("</em>");
        }

        Inline::Code { content } => {
            output.push_str("<code>");
            output.push_str(&escape_html(content));
            output.push_str("</code>");
        }

        Inline::Link { url, content } => {
            output.push_str(&format!("<a href=\"{}\">", escape_html(url)));
            render_inlines(output, content);
            output.push_str("</a>");
        }

        Inline::Image { url, alt } => {
            output.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\" />",
                escape_html(url),
                escape_html(alt)
            ));
        }

        Inline::LineBreak => output.push_str("<br />"),
    }
}

/// Escape the five HTML-significant characters
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DocMeta;
    use crate::template::Template;

    fn parse(input: &str) -> Document {
        HtmlHandler::new().parse(input).unwrap()
    }

    fn render(doc: &Document, ctx: &RenderContext) -> String {
        HtmlHandler::new()
            .render(doc, ctx)
            .unwrap()
            .into_text()
            .unwrap()
    }

    #[test]
    fn test_parse_empty_input_is_empty_root() {
        assert!(parse("").content.is_empty());
        assert!(parse("   \n\t ").content.is_empty());
    }

    #[test]
    fn test_parse_heading_and_paragraph() {
        let doc = parse("<h1>Title</h1><p>Hello <strong>World</strong></p>");
        assert_eq!(doc.content.len(), 2);
        assert!(matches!(doc.content[0], Block::Heading { depth: 1, .. }));
        if let Block::Paragraph { content } = &doc.content[1] {
            assert!(content.iter().any(|i| matches!(i, Inline::Strong { .. })));
        } else {
            panic!("expected paragraph");
        }
        assert_eq!(doc.plain_text(), "Title\nHello World");
    }

    #[test]
    fn test_parse_full_document_skips_head() {
        let doc = parse(
            "<!DOCTYPE html><html><head><title>Ignored</title><style>p{}</style></head>\
             <body><p>Visible</p></body></html>",
        );
        assert_eq!(doc.plain_text(), "Visible");
    }

    #[test]
    fn test_parse_lists() {
        let doc = parse("<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol>");
        if let Block::List { ordered, items } = &doc.content[0] {
            assert!(!ordered);
            assert_eq!(items.len(), 2);
        } else {
            panic!("expected unordered list");
        }
        assert!(matches!(doc.content[1], Block::List { ordered: true, .. }));
    }

    #[test]
    fn test_parse_nested_list() {
        let doc = parse("<ul><li>outer<ul><li>inner</li></ul></li></ul>");
        if let Block::List { items, .. } = &doc.content[0] {
            assert_eq!(items.len(), 1);
            assert!(items[0]
                .content
                .iter()
                .any(|b| matches!(b, Block::List { .. })));
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn test_parse_code_block_with_language() {
        let doc = parse("<pre><code class=\"language-rust\">let x = 1;</code></pre>");
        if let Block::CodeBlock { language, content } = &doc.content[0] {
            assert_eq!(language.as_deref(), Some("rust"));
            assert_eq!(content, "let x = 1;");
        } else {
            panic!("expected code block");
        }
    }

    #[test]
    fn test_parse_blockquote_and_rule() {
        let doc = parse("<blockquote><p>wise words</p></blockquote><hr>");
        assert!(matches!(doc.content[0], Block::BlockQuote { .. }));
        assert!(matches!(doc.content[1], Block::ThematicBreak));
    }

    #[test]
    fn test_loose_text_becomes_paragraph() {
        let doc = parse("<div>loose text<p>structured</p>trailing</div>");
        assert_eq!(doc.content.len(), 3);
        assert_eq!(doc.plain_text(), "loose text\nstructured\ntrailing");
    }

    #[test]
    fn test_malformed_nesting_recovers() {
        let doc = parse("<p>before<div>inside</div>");
        assert!(doc.plain_text().contains("before"));
        assert!(doc.plain_text().contains("inside"));
    }

    #[test]
    fn test_link_and_image() {
        let doc = parse("<p><a href=\"https://example.com\">site</a> <img src=\"pic.png\" alt=\"a pic\"></p>");
        if let Block::Paragraph { content } = &doc.content[0] {
            assert!(content.iter().any(
                |i| matches!(i, Inline::Link { url, .. } if url == "https://example.com")
            ));
            assert!(content.iter().any(
                |i| matches!(i, Inline::Image { alt, .. } if alt == "a pic")
            ));
        } else {
            panic!("expected paragraph");
        }
    }

    #[test]
    fn test_render_wraps_complete_page() {
        let doc = Document {
            source_format: InputFormat::Html,
            meta: DocMeta::default(),
            content: vec![
                Block::text_heading(1, "Title"),
                Block::text_paragraph("Body text"),
            ],
        };
        let meta = DocMeta::new()
            .with_title("Page Title")
            .with_author("An Author")
            .with_keywords(["alpha", "beta"]);
        let html = render(&doc, &RenderContext::new(meta));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Page Title</title>"));
        assert!(html.contains("<meta name=\"author\" content=\"An Author\">"));
        assert!(html.contains("<meta name=\"keywords\" content=\"alpha, beta\">"));
        assert!(html.contains("<article>"));
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Body text</p>"));
        assert!(html.contains("<style>"));
    }

    #[test]
    fn test_render_escapes_text() {
        let doc = Document {
            source_format: InputFormat::Html,
            meta: DocMeta::default(),
            content: vec![Block::text_paragraph("a < b & \"c\" > 'd'")],
        };
        let html = render(&doc, &RenderContext::default());
        assert!(html.contains("<p>a &lt; b &amp; &quot;c&quot; &gt; &#39;d&#39;</p>"));
    }

    #[test]
    fn test_render_code_block_language_class() {
        let doc = Document {
            source_format: InputFormat::Html,
            meta: DocMeta::default(),
            content: vec![Block::CodeBlock {
                language: Some("rust".to_string()),
                content: "if a < b {}\n".to_string(),
            }],
        };
        let html = render(&doc, &RenderContext::default());
        assert!(html.contains("<pre><code class=\"language-rust\">if a &lt; b {}\n</code></pre>"));
    }

    #[test]
    fn test_render_untitled_page_gets_default_title() {
        let doc = Document::new(InputFormat::Html);
        let html = render(&doc, &RenderContext::default());
        assert!(html.contains("<title>Document</title>"));
        assert!(html.contains("<article>"));
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn test_render_custom_template() {
        let doc = Document {
            source_format: InputFormat::Html,
            meta: DocMeta::default(),
            content: vec![Block::text_paragraph("body")],
        };
        let template = Template::new(
            "bare",
            OutputFormat::Html,
            "<main data-title=\"{{title}}\">{{content}}</main>",
        );
        let ctx = RenderContext::new(DocMeta::new().with_title("T")).with_template(template);
        let html = render(&doc, &ctx);
        assert_eq!(html, "<main data-title=\"T\"><p>body</p></main>");
    }

    #[test]
    fn test_parse_render_round_trip_text() {
        let input = "<h2>Notes</h2><p>alpha <em>beta</em> gamma</p><ul><li>one</li></ul>";
        let doc = parse(input);
        let html = render(&doc, &RenderContext::default());
        let again = parse(&html);
        assert_eq!(again.plain_text(), doc.plain_text());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // No markup-significant character survives escaping unencoded.
        #[test]
        fn prop_escaped_text_has_no_raw_markup(text in ".{0,200}") {
            let escaped = escape_html(&text);
            prop_assert!(!escaped.contains('<'));
            prop_assert!(!escaped.contains('>'));
            prop_assert!(!escaped.contains('"'));
            // Every ampersand introduces a known entity.
            let mut rest = escaped.as_str();
            while let Some(idx) = rest.find('&') {
                let tail = &rest[idx..];
                prop_assert!(
                    tail.starts_with("&amp;")
                        || tail.starts_with("&lt;")
                        || tail.starts_with("&gt;")
                        || tail.starts_with("&quot;")
                        || tail.starts_with("&#39;"),
                    "unescaped ampersand in {escaped:?}"
                );
                rest = &tail[1..];
            }
        }

        // Rendering never panics on arbitrary text paragraphs and keeps the
        // article region present.
        #[test]
        fn prop_render_any_text_paragraph(text in ".{0,200}") {
            let doc = Document {
                source_format: InputFormat::Html,
                meta: crate::ast::DocMeta::default(),
                content: vec![Block::text_paragraph(text)],
            };
            let html = HtmlHandler::new()
                .render(&doc, &RenderContext::default())
                .unwrap()
                .into_text()
                .unwrap();
            prop_assert!(html.contains("<article>"));
        }
    }
}
