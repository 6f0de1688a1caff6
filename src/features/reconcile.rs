use anyhow::{anyhow, Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::debug;

/// Strict reindex of a feature batch against the reference column list fixed
/// at training time.
///
/// For every reference name absent from `batch` a zero-filled column is
/// inserted: the absence of a rare one-hot category means "not this
/// category", never "unknown". Columns the reference list does not know are
/// dropped, which guards against an inference-time category the classifier
/// never saw. The output always has exactly the reference columns in the
/// reference order, whatever categories the input happened to contain.
pub fn reconcile(batch: &RecordBatch, reference_columns: &[String]) -> Result<RecordBatch> {
    let num_rows = batch.num_rows();
    let mut fields = Vec::with_capacity(reference_columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(reference_columns.len());
    let mut filled = 0usize;

    for name in reference_columns {
        let array = match batch.schema().index_of(name) {
            Ok(idx) => {
                let column = batch.column(idx);
                column
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| anyhow!("feature column `{}` is not Float64", name))?;
                Arc::clone(column)
            }
            Err(_) => {
                filled += 1;
                Arc::new(Float64Array::from(vec![0.0; num_rows])) as ArrayRef
            }
        };
        fields.push(Field::new(name, DataType::Float64, false));
        arrays.push(array);
    }

    let dropped = batch.num_columns() + filled - reference_columns.len();
    debug!(filled, dropped, "reconciled feature batch");

    let schema = Arc::new(Schema::new(fields));
    let options = arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(num_rows));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .context("reindexing feature batch to reference columns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::{sample_record, second_record};
    use crate::features::{fit_transform, transform, Mode};

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
    fn output_shape_is_the_reference_list_exactly() {
        let (_, schema) = fit_transform(&[sample_record(), second_record()]).unwrap();
        let natural = transform(&[sample_record()], Mode::Inference, Some(&schema)).unwrap();
        let natural_names: Vec<String> = natural
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        // The lone record emitted Gender_Female and age_group_31-40, which
        // training never listed; its column set drifts from the reference.
        assert_ne!(natural_names, schema.reference_columns);

        let aligned = reconcile(&natural, &schema.reference_columns).unwrap();
        let names: Vec<String> = aligned
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, schema.reference_columns);
        assert_eq!(aligned.num_rows(), 1);
    }

    #[test]
    fn unseen_category_columns_are_zero_filled() {
        // Training saw Germany and the US; the record only mentions the US,
        // so the Germany-derived reference columns must exist and be zero.
        let (_, schema) = fit_transform(&[sample_record(), second_record()]).unwrap();
        let natural = transform(&[sample_record()], Mode::Inference, Some(&schema)).unwrap();
        let aligned = reconcile(&natural, &schema.reference_columns).unwrap();

        assert_eq!(column_value(&aligned, "Country_United States", 0), 1.0);
        assert_eq!(column_value(&aligned, "Gender_Male", 0), 0.0);
        assert_eq!(column_value(&aligned, "age_group_51-75", 0), 0.0);
    }

    #[test]
    fn never_observed_country_reconciles_to_zero() {
        // Training saw Canada (dropped reference category), Germany and the
        // US; a US-only record must still carry a zero Germany indicator.
        let mut canadian = second_record();
        canadian.insert("Country".into(), "Canada".into());
        let (_, schema) =
            fit_transform(&[sample_record(), second_record(), canadian]).unwrap();
        assert!(schema.reference_columns.contains(&"Country_Germany".to_string()));

        let natural = transform(&[sample_record()], Mode::Inference, Some(&schema)).unwrap();
        let aligned = reconcile(&natural, &schema.reference_columns).unwrap();
        assert_eq!(column_value(&aligned, "Country_Germany", 0), 0.0);
        assert_eq!(column_value(&aligned, "Country_United States", 0), 1.0);
    }

    #[test]
    fn unexpected_columns_are_dropped() {
        let (batch, schema) = fit_transform(&[sample_record(), second_record()]).unwrap();
        let shorter: Vec<String> = schema
            .reference_columns
            .iter()
            .filter(|name| *name != "Country_United States")
            .cloned()
            .collect();
        let aligned = reconcile(&batch, &shorter).unwrap();
        assert_eq!(aligned.num_columns(), shorter.len());
        assert!(aligned.schema().index_of("Country_United States").is_err());
    }

    #[test]
    fn reconcile_is_shape_invariant_across_records() {
        let (_, schema) = fit_transform(&[sample_record(), second_record()]).unwrap();
        for record in [sample_record(), second_record()] {
            let natural = transform(&[record], Mode::Inference, Some(&schema)).unwrap();
            let aligned = reconcile(&natural, &schema.reference_columns).unwrap();
            assert_eq!(aligned.num_columns(), schema.reference_columns.len());
        }
    }
}
