//! Template System - Document Templates and Registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::document::RichTextDocument;
use crate::placeholders::{discover_ordered, extract_variables};

pub type TemplateId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub template_version: String,
    pub engine_min_version: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub superseded_by: Option<String>,
    #[serde(default)]
    pub kind: DocumentKind,
    pub body: DocumentBody,
}

impl Template {
    /// Placeholders in first-seen order.
    pub fn variables(&self) -> Vec<String> {
        match &self.body {
            DocumentBody::Rich(doc) => discover_ordered(doc),
            DocumentBody::Text(text) => extract_variables(text),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Quotation,
    Contract,
    Invoice,
    #[default]
    Other,
}

/// Rich-text document or plain string; used for template content and generated output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "format", content = "content", rename_all = "lowercase")]
pub enum DocumentBody {
    Rich(RichTextDocument),
    Text(String),
}

/// Template registry - loads and caches templates
pub struct TemplateRegistry {
    templates: BTreeMap<TemplateId, Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self { templates: BTreeMap::new() }
    }

    /// Load every `*.json` template in `dir`. Unreadable or malformed files are
    /// skipped; a missing directory yields an empty registry.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if !dir.exists() {
            warn!(dir = %dir.display(), "template directory not found");
            return Ok(registry);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }

            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable template");
                    continue;
                }
            };

            match serde_json::from_str::<Template>(&content) {
                Ok(template) => {
                    debug!(id = %template.id, path = %path.display(), "loaded template");
                    registry.register(template);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed template");
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// All templates, ordered by id.
    pub fn list(&self) -> Vec<&Template> {
        self.templates.values().collect()
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
