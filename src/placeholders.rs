//! Placeholder Engine - `{{variable}}` discovery and substitution
//!
//! Word processors split visible text into runs wherever formatting changes,
//! so a placeholder like `{{project_name}}` may arrive as `{{proj` + `ect_name}}`.
//! Matching therefore always happens on a paragraph's concatenated text, and a
//! changed paragraph is written back onto its first run (see
//! [`Paragraph::replace_text`]). Formatting of later runs in that paragraph is
//! lost; paragraphs without a match are never touched.
//!
//! Unresolved placeholders are not errors. They stay in the output verbatim.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::document::{LogicalParagraphs, Paragraph};
use crate::variables::ValueMap;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{([a-zA-Z0-9_]+)\}\}").unwrap();
}

/// `{{name}}`
pub fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Variable names in `text`, first occurrence order, no duplicates.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Every variable referenced anywhere in the document.
pub fn discover<D>(doc: &D) -> BTreeSet<String>
where
    D: LogicalParagraphs + ?Sized,
{
    doc.logical_paragraphs()
        .into_iter()
        .flat_map(|p| {
            let text = p.text();
            PLACEHOLDER
                .captures_iter(&text)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Like [`discover`], but in traversal order with duplicates removed.
pub fn discover_ordered<D>(doc: &D) -> Vec<String>
where
    D: LogicalParagraphs + ?Sized,
{
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for paragraph in doc.logical_paragraphs() {
        for name in extract_variables(&paragraph.text()) {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

/// Replace placeholders in every paragraph of `doc`, in place.
pub fn substitute<'a, D>(doc: &'a mut D, values: &ValueMap) -> &'a mut D
where
    D: LogicalParagraphs + ?Sized,
{
    let mut changed = 0usize;
    for paragraph in doc.logical_paragraphs_mut() {
        if replace_in_paragraph(paragraph, values) {
            changed += 1;
        }
        log_unresolved(paragraph, values);
    }
    debug!(paragraphs = changed, "placeholder substitution finished");
    doc
}

/// Substitute one paragraph. Returns whether it was rewritten.
pub fn replace_in_paragraph(paragraph: &mut Paragraph, values: &ValueMap) -> bool {
    match apply_values(&paragraph.text(), values) {
        Some(new_text) => {
            paragraph.replace_text(new_text);
            true
        }
        None => false,
    }
}

/// Plain-text template: the whole string is one paragraph.
pub fn substitute_text(text: &str, values: &ValueMap) -> String {
    apply_values(text, values).unwrap_or_else(|| text.to_string())
}

/// New text for `text`, or `None` when nothing would change.
///
/// Keys are applied in map order, each as a literal replacement over the text
/// left by the keys before it.
fn apply_values(text: &str, values: &ValueMap) -> Option<String> {
    let wanted: Vec<(String, &str)> = values
        .iter()
        .map(|(key, value)| (placeholder(key), value))
        .collect();

    if !wanted.iter().any(|(token, _)| text.contains(token.as_str())) {
        return None;
    }

    let mut new_text = text.to_string();
    for (token, value) in &wanted {
        if new_text.contains(token.as_str()) {
            new_text = new_text.replace(token.as_str(), value);
        }
    }

    (new_text != text).then_some(new_text)
}

fn log_unresolved(paragraph: &Paragraph, values: &ValueMap) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let text = paragraph.text();
    if !text.contains("{{") {
        return;
    }
    for name in extract_variables(&text) {
        if !values.contains_key(&name) {
            debug!(placeholder = %name, "unresolved placeholder left in place");
        }
    }
}
