// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversion error taxonomy
//!
//! One closed enum covers every failure the pipeline can surface. Callers
//! switch on the variant (or on [`Error::code`] across a serialization
//! boundary); third-party parser and codec errors never cross the public API
//! un-wrapped.

use crate::ast::OutputFormat;

/// Boxed underlying cause attached to parse and render failures
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for validation, detection, parsing and rendering
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed call arguments; names the offending field. Always
    /// caller-fixable, never retried.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Requested or declared format outside the supported set
    #[error("unsupported format: {value}")]
    Format { value: String },

    /// Input could not be converted into a document tree
    #[error("parse failed: {message}")]
    Parse {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
        #[source]
        source: Option<BoxedCause>,
    },

    /// A specific renderer failed; tagged with the target format
    #[error("{format} rendering failed: {message}")]
    Render {
        format: OutputFormat,
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn format(value: impl Into<String>) -> Self {
        Self::Format {
            value: value.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            line: None,
            column: None,
            source: None,
        }
    }

    pub fn parse_with_cause(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self::Parse {
            message: message.into(),
            line: None,
            column: None,
            source: Some(cause.into()),
        }
    }

    pub fn render(format: OutputFormat, message: impl Into<String>) -> Self {
        Self::Render {
            format,
            message: message.into(),
            source: None,
        }
    }

    pub fn render_with_cause(
        format: OutputFormat,
        message: impl Into<String>,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        Self::Render {
            format,
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Attach a source position to a parse error; no-op for other kinds
    pub fn at(mut self, at_line: u32, at_column: u32) -> Self {
        if let Self::Parse { line, column, .. } = &mut self {
            *line = Some(at_line);
            *column = Some(at_column);
        }
        self
    }

    /// Stable machine-readable code for this error kind
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Format { .. } => "format",
            Self::Parse { .. } => "parse",
            Self::Render { .. } => "conversion",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::validation("input", "missing").code(), "validation");
        assert_eq!(Error::format("bogus").code(), "format");
        assert_eq!(Error::parse("broken").code(), "parse");
        assert_eq!(
            Error::render(OutputFormat::Pdf, "layout failed").code(),
            "conversion"
        );
    }

    #[test]
    fn test_display_names_field_and_format() {
        let err = Error::validation("format", "must not be empty");
        assert_eq!(err.to_string(), "invalid format: must not be empty");

        let err = Error::render(OutputFormat::Docx, "packing failed");
        assert!(err.to_string().starts_with("docx rendering failed"));
    }

    #[test]
    fn test_parse_cause_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err = Error::parse_with_cause("container unreadable", io);
        let source = err.source().expect("cause attached");
        assert!(source.to_string().contains("truncated"));
    }

    #[test]
    fn test_position_attaches_to_parse_only() {
        let err = Error::parse("bad line").at(3, 7);
        match err {
            Error::Parse { line, column, .. } => {
                assert_eq!(line, Some(3));
                assert_eq!(column, Some(7));
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let err = Error::format("odt").at(1, 1);
        assert!(matches!(err, Error::Format { .. }));
    }
}
