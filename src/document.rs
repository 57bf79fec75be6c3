//! Rich-Text Document Model
//!
//! Owned, library-agnostic view of a Word-style document. A concrete `.docx`
//! binding converts into this model before substitution and back afterwards.

use serde::{Deserialize, Serialize};

/// Character formatting carried by a run. The placeholder engine never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formatting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_pt: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub formatting: Formatting,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), formatting: Formatting::default() }
    }

    pub fn styled(text: impl Into<String>, formatting: Formatting) -> Self {
        Self { text: text.into(), formatting }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs, style: None }
    }

    /// Single-run paragraph with default formatting.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Run::new(text)])
    }

    /// Logical text: run texts concatenated in order.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Collapse the paragraph onto its first run.
    ///
    /// Run 0 keeps its formatting and receives `new_text`; every later run is
    /// emptied but kept. A paragraph without runs gets one default run.
    pub fn replace_text(&mut self, new_text: String) {
        match self.runs.split_first_mut() {
            Some((first, rest)) => {
                first.text = new_text;
                for run in rest {
                    run.text.clear();
                }
            }
            None => self.runs.push(Run::new(new_text)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub header: Vec<Paragraph>,
    #[serde(default)]
    pub footer: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextDocument {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl RichTextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// One body paragraph per line of `text`.
    pub fn from_plain_text(text: &str) -> Self {
        Self {
            paragraphs: text.split('\n').map(Paragraph::plain).collect(),
            ..Self::default()
        }
    }
}

/// Traversal seam between the engine and a concrete document binding.
///
/// Implementations yield paragraphs in a fixed order: body, table cells
/// (row-major then cell-major), then each section's header followed by its
/// footer.
pub trait LogicalParagraphs {
    fn logical_paragraphs(&self) -> Vec<&Paragraph>;
    fn logical_paragraphs_mut(&mut self) -> Vec<&mut Paragraph>;
}

impl LogicalParagraphs for RichTextDocument {
    fn logical_paragraphs(&self) -> Vec<&Paragraph> {
        let mut out: Vec<&Paragraph> = self.paragraphs.iter().collect();
        for table in &self.tables {
            for row in &table.rows {
                for cell in &row.cells {
                    out.extend(cell.paragraphs.iter());
                }
            }
        }
        for section in &self.sections {
            out.extend(section.header.iter());
            out.extend(section.footer.iter());
        }
        out
    }

    fn logical_paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        let mut out: Vec<&mut Paragraph> = self.paragraphs.iter_mut().collect();
        for table in &mut self.tables {
            for row in &mut table.rows {
                for cell in &mut row.cells {
                    out.extend(cell.paragraphs.iter_mut());
                }
            }
        }
        for section in &mut self.sections {
            out.extend(section.header.iter_mut());
            out.extend(section.footer.iter_mut());
        }
        out
    }
}

impl LogicalParagraphs for Paragraph {
    fn logical_paragraphs(&self) -> Vec<&Paragraph> {
        vec![self]
    }

    fn logical_paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        vec![self]
    }
}

impl LogicalParagraphs for Vec<Paragraph> {
    fn logical_paragraphs(&self) -> Vec<&Paragraph> {
        self.iter().collect()
    }

    fn logical_paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        self.iter_mut().collect()
    }
}
