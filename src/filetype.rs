//! Which files are worth flattening, and how notebooks become scripts.

use serde::Deserialize;

use crate::error::{IngestError, Result};

/// Suffixes admitted into the corpus. Matching is a plain suffix test on the
/// file name, so `.env.example` and `index.html` both qualify.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".py",
    ".txt",
    ".js",
    ".tsx",
    ".ts",
    ".md",
    ".cjs",
    ".html",
    ".json",
    ".ipynb",
    ".h",
    ".localhost",
    ".sh",
    ".yaml",
    ".example",
    ".ps1",
    ".sql",
];

pub fn is_allowed_filetype(filename: &str) -> bool {
    ALLOWED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

pub fn is_notebook(filename: &str) -> bool {
    filename.ends_with(".ipynb")
}

/// Cell `source` is either one string or a list of line fragments.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellText {
    Joined(String),
    Lines(Vec<String>),
}

impl Default for CellText {
    fn default() -> Self {
        CellText::Joined(String::new())
    }
}

impl CellText {
    fn into_string(self) -> String {
        match self {
            CellText::Joined(s) => s,
            CellText::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: Option<CellText>,
    /// nbformat 3 stores code under `input`.
    #[serde(default)]
    input: Option<CellText>,
    #[serde(default, alias = "prompt_number")]
    execution_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Worksheet {
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Option<Vec<Cell>>,
    #[serde(default)]
    worksheets: Option<Vec<Worksheet>>,
}

/// Export a notebook's code cells as one Python script.
///
/// Code cells are emitted in document order under `# In[n]:` markers;
/// markdown, raw and output content is dropped.
pub fn convert_notebook(name: &str, content: &str) -> Result<String> {
    let notebook: Notebook =
        serde_json::from_str(content).map_err(|source| IngestError::Notebook {
            name: name.to_string(),
            source,
        })?;

    let cells = match (notebook.cells, notebook.worksheets) {
        (Some(cells), _) => cells,
        (None, Some(sheets)) => sheets.into_iter().flat_map(|w| w.cells).collect(),
        (None, None) => {
            return Err(IngestError::Notebook {
                name: name.to_string(),
                source: <serde_json::Error as serde::de::Error>::missing_field("cells"),
            })
        }
    };

    let mut script = String::from("#!/usr/bin/env python\n# coding: utf-8\n\n");
    for cell in cells.into_iter().filter(|c| c.cell_type == "code") {
        let prompt = cell
            .execution_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| " ".to_string());
        let code = cell
            .source
            .or(cell.input)
            .unwrap_or_default()
            .into_string();
        script.push_str(&format!("# In[{}]:\n\n\n{}\n\n\n", prompt, code));
    }
    Ok(script)
}
