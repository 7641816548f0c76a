// SPDX-License-Identifier: AGPL-3.0-or-later
//! Template registration and lookup
//!
//! Each converter owns one store; nothing here is process-global. Lookup is
//! by id and checks that the template targets the format it is being resolved
//! for.

use std::collections::HashMap;

use docmorph_core::{Error, OutputFormat, Result, Template};

/// Built-in page wrapper, registered under the id "default". Same placeholder
/// scheme as caller templates.
const DEFAULT_HTML_TEMPLATE: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n{{meta}}<title>{{title}}</title>\n<style>\n{{styles}}</style>\n</head>\n<body>\n<article>\n{{content}}\n</article>\n</body>\n</html>\n";

/// Named templates available to one converter
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<String, Template>,
}

impl TemplateStore {
    /// Store pre-populated with the built-in HTML wrapper
    pub fn new() -> Self {
        let mut store = Self {
            templates: HashMap::new(),
        };
        store.register(Template::new(
            "default",
            OutputFormat::Html,
            DEFAULT_HTML_TEMPLATE,
        ));
        store
    }

    /// Store with no built-ins
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Register under the template's own name, replacing any previous entry
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Look up `id` for the given target format
    ///
    /// No id means no template, which is not an error. A given id must exist
    /// and must target the requested format.
    pub fn resolve(&self, id: Option<&str>, target: OutputFormat) -> Result<Option<Template>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let template = self.templates.get(id).ok_or_else(|| {
            Error::validation("template", format!("no template registered under '{id}'"))
        })?;
        if template.target != target {
            return Err(Error::validation(
                "template",
                format!(
                    "template '{id}' targets {}, not {target}",
                    template.target
                ),
            ));
        }
        Ok(Some(template.clone()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_id_resolves_to_no_template() {
        let store = TemplateStore::new();
        assert!(store
            .resolve(None, OutputFormat::Html)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_builtin_default_resolves_for_html() {
        let store = TemplateStore::new();
        let template = store
            .resolve(Some("default"), OutputFormat::Html)
            .unwrap()
            .unwrap();
        assert!(template.body.contains("{{content}}"));
    }

    #[test]
    fn test_unknown_id_is_a_validation_error() {
        let store = TemplateStore::new();
        let err = store
            .resolve(Some("nope"), OutputFormat::Html)
            .unwrap_err();
        assert_eq!(err.code(), "validation");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_target_mismatch_is_a_validation_error() {
        let mut store = TemplateStore::empty();
        store.register(Template::new("page", OutputFormat::Html, "{{content}}"));
        let err = store
            .resolve(Some("page"), OutputFormat::Markdown)
            .unwrap_err();
        assert_eq!(err.code(), "validation");
        assert!(err.to_string().contains("page"));
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut store = TemplateStore::empty();
        store.register(Template::new("page", OutputFormat::Html, "old"));
        store.register(Template::new("page", OutputFormat::Html, "new"));
        assert_eq!(store.len(), 1);
        let template = store
            .resolve(Some("page"), OutputFormat::Html)
            .unwrap()
            .unwrap();
        assert_eq!(template.body, "new");
    }
}
