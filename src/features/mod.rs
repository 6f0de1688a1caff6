use crate::error::ScreenError;
use crate::record::{FieldValue, RawRecord, SURVEY_FIELDS};
use anyhow::{anyhow, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub mod clean;
pub mod encode;
pub mod onehot;
pub mod reconcile;

pub use reconcile::reconcile;

/// Fixed integer codes for the nominal text fields, keyed field → value → code.
pub type NominalCodes = BTreeMap<String, BTreeMap<String, f64>>;

/// Whether a transform call is fitting the schema (bulk training data) or
/// reproducing it for a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// The trained schema state: the frozen column list the classifier was fitted
/// on, plus the nominal code table derived from the training data. Persisted
/// once per training run and consumed verbatim by every inference call, so a
/// single-row request can never drift from the training-time encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub reference_columns: Vec<String>,
    pub nominal_codes: NominalCodes,
}

/// One working value while the stages run. Everything must be `Num` by the
/// time the table becomes a record batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Num(f64),
    Missing,
}

/// Column-ordered staging table. Rows are aligned with `headers`; stages
/// rewrite, append, and drop whole columns.
#[derive(Debug, Clone)]
pub struct WorkTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl WorkTable {
    /// Lay the records out over the canonical survey fields. Absent fields
    /// become missing cells; keys outside the survey vocabulary are ignored.
    pub fn from_records(records: &[RawRecord]) -> Self {
        let headers: Vec<String> = SURVEY_FIELDS.iter().map(|f| f.to_string()).collect();
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|name| match record.get(name) {
                        Some(FieldValue::Text(s)) => Cell::Text(s.clone()),
                        Some(FieldValue::Number(v)) => Cell::Num(*v),
                        Some(FieldValue::Missing) | None => Cell::Missing,
                    })
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Rewrite every cell of `name` in place. Returns false if the column is
    /// absent, which stages treat as a no-op.
    pub fn map_column(&mut self, name: &str, f: impl Fn(&Cell) -> Cell) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    /// Read a column that earlier stages already made numeric.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| anyhow!("column `{}` not present", name))?;
        self.rows
            .iter()
            .map(|row| match &row[idx] {
                Cell::Num(v) => Ok(*v),
                other => Err(anyhow!("column `{}` holds non-numeric cell {:?}", name, other)),
            })
            .collect()
    }

    /// Borrowed view of a column as text; non-text cells read as `None`.
    pub fn text_column(&self, name: &str) -> Vec<Option<&str>> {
        let Some(idx) = self.column_index(name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| match &row[idx] {
                Cell::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Sorted distinct text values of a column; missing cells contribute
    /// nothing.
    pub fn distinct_text(&self, name: &str) -> Vec<String> {
        let Some(idx) = self.column_index(name) else {
            return Vec::new();
        };
        let mut values: Vec<String> = self
            .rows
            .iter()
            .filter_map(|row| match &row[idx] {
                Cell::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn push_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.rows.len() {
            return Err(anyhow!(
                "column `{}` has {} cells for {} rows",
                name,
                cells.len(),
                self.rows.len()
            ));
        }
        self.headers.push(name.to_string());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
        Ok(())
    }

    /// Remove a column if present; absent columns are never an error.
    pub fn drop_column(&mut self, name: &str) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        self.headers.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
    }

    /// Finalize into an all-`Float64` record batch. Any cell the stages left
    /// non-numeric is a pipeline bug and fails loudly here.
    pub fn into_batch(self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.headers.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.headers.len());

        for (idx, name) in self.headers.iter().enumerate() {
            let values: Vec<f64> = self
                .rows
                .iter()
                .map(|row| match &row[idx] {
                    Cell::Num(v) => Ok(*v),
                    other => Err(anyhow!(
                        "column `{}` still holds non-numeric cell {:?} after encoding",
                        name,
                        other
                    )),
                })
                .collect::<Result<_>>()?;
            fields.push(Field::new(name, DataType::Float64, false));
            arrays.push(Arc::new(Float64Array::from(values)) as ArrayRef);
        }

        let schema = Arc::new(Schema::new(fields));
        let options = arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(self.rows.len()));
        RecordBatch::try_new_with_options(schema, arrays, &options)
            .map_err(|e| anyhow!("assembling feature batch: {}", e))
    }
}

/// The staged pipeline shared by both modes. `codes` carries the persisted
/// nominal table at inference; training derives a fresh one and returns it.
fn run_stages(records: &[RawRecord], codes: Option<&NominalCodes>) -> Result<(RecordBatch, NominalCodes)> {
    let mut table = WorkTable::from_records(records);

    clean::clean_age(&mut table);
    clean::normalize_gender(&mut table);
    clean::impute_defaults(&mut table);
    clean::prune(&mut table);

    encode::encode_ordinals(&mut table);
    encode::add_engineered_scores(&mut table)?;
    encode::add_age_group(&mut table)?;

    let fitting = codes.is_none();
    let codes = match codes {
        Some(fitted) => fitted.clone(),
        None => encode::fit_nominal_codes(&table),
    };
    encode::apply_nominal_codes(&mut table, &codes);

    // Training drops each field's first sorted category as redundant; a
    // submission keeps everything it observed and relies on the reconciler to
    // discard columns the reference list does not carry.
    onehot::expand(&mut table, fitting)?;

    debug!(
        rows = table.num_rows(),
        columns = table.headers().len(),
        "pipeline stages complete"
    );
    let batch = table.into_batch()?;
    Ok((batch, codes))
}

/// Bulk training transform: runs the stages over the full dataset and returns
/// the natural feature batch together with the schema to persist beside the
/// trained classifier. The reference column list is exactly the natural
/// training output — reconciliation is an inference-only concern.
#[tracing::instrument(level = "debug", skip(records), fields(rows = records.len()))]
pub fn fit_transform(records: &[RawRecord]) -> Result<(RecordBatch, FeatureSchema)> {
    let (batch, nominal_codes) = run_stages(records, None)?;
    let reference_columns = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    Ok((
        batch,
        FeatureSchema {
            reference_columns,
            nominal_codes,
        },
    ))
}

/// Mode-dispatched transform. Inference requires the persisted schema and is
/// rejected before any row processing without it; training ignores a schema if
/// one is passed. The output column set is whatever the input data produced —
/// callers on the inference path reconcile it against the reference list.
pub fn transform(
    records: &[RawRecord],
    mode: Mode,
    schema: Option<&FeatureSchema>,
) -> Result<RecordBatch, ScreenError> {
    match mode {
        Mode::Training => {
            let (batch, _) = run_stages(records, None)?;
            Ok(batch)
        }
        Mode::Inference => {
            let schema = schema.ok_or_else(|| {
                ScreenError::Configuration(
                    "inference transform requires the feature schema fitted at training time"
                        .to_string(),
                )
            })?;
            let (batch, _) = run_stages(records, Some(&schema.nominal_codes))?;
            Ok(batch)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::FieldValue;

    /// The worked scenario from the product requirements: a 35-year-old
    /// respondent at a 26-100 person tech company.
    pub(crate) fn sample_record() -> RawRecord {
        let fields: &[(&str, FieldValue)] = &[
            ("Age", FieldValue::Number(35.0)),
            ("Gender", "Female".into()),
            ("Country", "United States".into()),
            ("self_employed", "No".into()),
            ("family_history", "Yes".into()),
            ("work_interfere", "Sometimes".into()),
            ("no_employees", "26-100".into()),
            ("remote_work", "No".into()),
            ("tech_company", "Yes".into()),
            ("benefits", "Yes".into()),
            ("care_options", "Not sure".into()),
            ("wellness_program", "No".into()),
            ("seek_help", "Don't know".into()),
            ("anonymity", "Yes".into()),
            ("leave", "Somewhat easy".into()),
            ("mental_health_consequence", "No".into()),
            ("phys_health_consequence", "No".into()),
            ("coworkers", "Some of them".into()),
            ("supervisor", "Yes".into()),
            ("mental_health_interview", "No".into()),
            ("phys_health_interview", "Maybe".into()),
            ("mental_vs_physical", "Yes".into()),
            ("obs_consequence", "No".into()),
        ];
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// A second respondent so bulk calls see more than one category per field.
    pub(crate) fn second_record() -> RawRecord {
        let mut record = sample_record();
        record.insert("Age".into(), FieldValue::Number(52.0));
        record.insert("Gender".into(), "Male".into());
        record.insert("Country".into(), "Germany".into());
        record.insert("benefits".into(), "No".into());
        record.insert("leave".into(), "Very difficult".into());
        record.insert("coworkers".into(), "No".into());
        record.insert("mental_health_consequence".into(), "Yes".into());
        record
    }

    fn column_value(batch: &RecordBatch, name: &str, row: usize) -> f64 {
        let idx = batch.schema().index_of(name).unwrap();
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .value(row)
    }

    #[test]
    fn worked_scenario_scores_and_bucket() {
        let (batch, _) = fit_transform(&[sample_record(), second_record()]).unwrap();

        // Yes(1) + No(0) + Don't know(0) + Yes(1) + Somewhat easy(3)
        assert_eq!(column_value(&batch, "support_score", 0), 5.0);
        assert_eq!(column_value(&batch, "stigma_score", 0), 0.0);
        // Observed buckets are {"31-40", "51-75"}; the first sorted value is
        // the dropped reference category, so only the 51-75 indicator exists.
        assert_eq!(column_value(&batch, "age_group_51-75", 0), 0.0);
        assert_eq!(column_value(&batch, "age_group_51-75", 1), 1.0);
        assert_eq!(column_value(&batch, "Gender_Male", 0), 0.0);
        assert_eq!(column_value(&batch, "Gender_Male", 1), 1.0);
        assert!(batch.schema().index_of("Gender_Female").is_err());
    }

    #[test]
    fn training_columns_are_idempotent() {
        let records = vec![sample_record(), second_record()];
        let (first, schema_a) = fit_transform(&records).unwrap();
        let (second, schema_b) = fit_transform(&records).unwrap();

        let names = |b: &RecordBatch| -> Vec<String> {
            b.schema().fields().iter().map(|f| f.name().clone()).collect()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(schema_a, schema_b);
        assert_eq!(schema_a.reference_columns, names(&first));
    }

    #[test]
    fn inference_without_schema_is_a_configuration_error() {
        let err = transform(&[sample_record()], Mode::Inference, None).unwrap_err();
        assert!(matches!(err, ScreenError::Configuration(_)));
    }

    #[test]
    fn inference_reuses_training_codes() {
        // The bulk call sees {"No", "Some of them"} for coworkers, so
        // "Some of them" gets code 1. A lone record must reuse that code, not
        // re-derive 0 from its own single-value vocabulary.
        let (_, schema) = fit_transform(&[sample_record(), second_record()]).unwrap();
        let batch = transform(&[sample_record()], Mode::Inference, Some(&schema)).unwrap();
        let idx = batch.schema().index_of("coworkers").unwrap();
        let col = batch
            .column(idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(col.value(0), 1.0);
    }

    #[test]
    fn fields_missing_from_the_record_still_produce_columns() {
        let mut record = sample_record();
        record.remove("benefits");
        record.remove("Country");
        let batch = transform(
            &[record],
            Mode::Inference,
            Some(&fit_transform(&[sample_record(), second_record()]).unwrap().1),
        )
        .unwrap();
        // benefits falls back to the unknown code and still feeds the score:
        // -1 + 0 + 0 + 1 + 3.
        assert_eq!(column_value(&batch, "support_score", 0), 3.0);
    }
}
