// SPDX-License-Identifier: AGPL-3.0-or-later
//! Docmorph Core - Unified document tree and format handlers
//!
//! This crate provides:
//! - A unified block/inline tree that every format converts through
//! - Parser and renderer traits for format handlers
//! - Handlers for markdown, HTML, PDF, and DOCX
//! - Format detection over declared names and raw content

pub mod ast;
pub mod detect;
pub mod error;
pub mod formats;
pub mod template;
pub mod traits;

pub use ast::{Block, DocMeta, Document, Inline, InputFormat, ListItem, MetaValue, OutputFormat};
pub use error::{Error, Result};
pub use formats::{DocxHandler, HtmlHandler, MarkdownHandler, PdfHandler};
pub use template::Template;
pub use traits::{Artifact, BinaryParser, Parser, RenderContext, Renderer};
