// SPDX-License-Identifier: AGPL-3.0-or-later
//! Format handlers for each supported format

pub mod docx;
pub mod html;
pub mod linescan;
pub mod markdown;
pub mod pdf;

pub use docx::DocxHandler;
pub use html::HtmlHandler;
pub use markdown::MarkdownHandler;
pub use pdf::PdfHandler;
