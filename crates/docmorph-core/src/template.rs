// SPDX-License-Identifier: AGPL-3.0-or-later
//! Render template data type
//!
//! A template is plain data here; lookup and registration live with the
//! caller-provided store, not in this crate. Template bodies use the
//! `{{content}}` / `{{title}}` / `{{styles}}` / `{{meta}}` placeholder scheme
//! understood by the HTML renderer.

use crate::ast::OutputFormat;

#[derive(Debug, Clone)]
pub struct Template {
    /// Identifier the caller registered this template under
    pub name: String,
    /// Output format this template applies to
    pub target: OutputFormat,
    /// Template body with placeholders
    pub body: String,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        target: OutputFormat,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_holds_target() {
        let tpl = Template::new("minimal", OutputFormat::Html, "<main>{{content}}</main>");
        assert_eq!(tpl.target, OutputFormat::Html);
        assert!(tpl.body.contains("{{content}}"));
    }
}
