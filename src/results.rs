use std::{collections::HashMap, fs::File, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// One precomputed diagnosis, keyed by the image filename it was produced for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultsRow {
    pub filename: String,
    pub label: String,
    pub infected_pct_leaf: f64,
}

/// Filename-indexed view over the results CSV. Immutable once loaded.
#[derive(Debug, Default)]
pub struct ResultsTable {
    rows: HashMap<String, ResultsRow>,
}

impl ResultsTable {
    pub fn new(csv_path: impl AsRef<Path>) -> Result<Self> {
        let csv_path = csv_path.as_ref();
        let file = File::open(csv_path)
            .with_context(|| format!("Failed to open results table {}", csv_path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to load results table {}", csv_path.display()))
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut rows = HashMap::new();

        for (index, record) in reader.deserialize::<ResultsRow>().enumerate() {
            // header is line 1
            let line = index + 2;
            let row = record.with_context(|| format!("malformed row at line {line}"))?;
            if !row.infected_pct_leaf.is_finite() {
                bail!(
                    "infected_pct_leaf is not a finite number at line {line} ({})",
                    row.filename
                );
            }
            // first row wins for duplicated filenames
            rows.entry(row.filename.clone()).or_insert(row);
        }

        Ok(ResultsTable { rows })
    }

    /// Exact, case-sensitive match on the original upload filename.
    pub fn lookup(&self, filename: &str) -> Option<&ResultsRow> {
        self.rows.get(filename)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
