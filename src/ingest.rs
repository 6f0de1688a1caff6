use crate::record::{FieldValue, RawRecord};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Empty cells and the usual NA spellings become missing values; everything
/// else stays text for the pipeline to interpret, including `Age`.
fn parse_cell(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "NA" || trimmed == "N/A" {
        FieldValue::Missing
    } else {
        FieldValue::Text(trimmed.to_string())
    }
}

/// Load the survey CSV as raw records plus the extracted target labels
/// (`treatment`: Yes → 1, No → 0). Rows with an unusable label are skipped
/// with a warning rather than failing the whole run.
pub fn load_survey_csv(path: &Path) -> Result<(Vec<RawRecord>, Vec<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening survey CSV {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(str::to_string)
        .collect();
    if !headers.iter().any(|h| h == "treatment") {
        anyhow::bail!("survey CSV has no `treatment` column to train against");
    }

    let mut records = Vec::new();
    let mut labels = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("reading CSV row {}", line + 2))?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(name, raw)| (name.clone(), parse_cell(raw)))
            .collect();

        let label = match record.get("treatment").and_then(FieldValue::as_text) {
            Some("Yes") => 1.0,
            Some("No") => 0.0,
            other => {
                warn!(line = line + 2, value = ?other, "unusable treatment label; row skipped");
                skipped += 1;
                continue;
            }
        };
        labels.push(label);
        records.push(record);
    }

    info!(rows = records.len(), skipped, "loaded survey records");
    Ok((records, labels))
}
