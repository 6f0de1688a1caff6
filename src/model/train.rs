use super::{Classifier, LogisticModel};
use crate::features::fit_transform;
use crate::ingest::load_survey_csv;
use crate::store::ArtifactStore;
use anyhow::{anyhow, Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a training run produced, for the caller's log line.
#[derive(Debug)]
pub struct TrainingSummary {
    pub rows: usize,
    pub feature_columns: usize,
    pub training_accuracy: f64,
}

/// Full training entry point: ingest the survey CSV, fit the pipeline and the
/// classifier, and persist the two artifacts inference depends on. Also dumps
/// the preprocessed feature matrix as Parquet for offline inspection.
#[tracing::instrument(level = "info", skip_all, fields(csv = %csv_path.display()))]
pub fn train(csv_path: &Path, artifact_dir: &Path) -> Result<TrainingSummary> {
    let (records, labels) = load_survey_csv(csv_path)?;
    if records.is_empty() {
        return Err(anyhow!("no usable training rows in {}", csv_path.display()));
    }

    let (features, schema) = fit_transform(&records)?;
    info!(
        rows = features.num_rows(),
        columns = features.num_columns(),
        "preprocessed training data"
    );

    let mut model = LogisticModel::default();
    model.fit(&features, &labels)?;

    let probabilities = model.predict_probability(&features)?;
    let correct = probabilities
        .iter()
        .zip(&labels)
        .filter(|(&p, &label)| (p > 0.5) == (label == 1.0))
        .count();
    let training_accuracy = correct as f64 / labels.len() as f64;

    let store = ArtifactStore::new(artifact_dir)?;
    store.save(ArtifactStore::MODEL, &model)?;
    store.save(ArtifactStore::SCHEMA, &schema)?;
    let matrix_path = write_training_matrix(&features, store.dir())?;
    info!(
        accuracy = training_accuracy,
        matrix = %matrix_path.display(),
        "training artifacts saved"
    );

    Ok(TrainingSummary {
        rows: features.num_rows(),
        feature_columns: features.num_columns(),
        training_accuracy,
    })
}

/// Write the feature matrix as Snappy-compressed Parquet, via a temp file so
/// a failed run leaves nothing half-written.
fn write_training_matrix(batch: &RecordBatch, dir: &Path) -> Result<PathBuf> {
    let final_path = dir.join("training_matrix.parquet");
    let tmp_path = dir.join("training_matrix.parquet.tmp");

    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("initializing Parquet writer")?;
    writer.write(batch).context("writing feature matrix")?;
    writer.close().context("closing Parquet writer")?;
    fs::rename(&tmp_path, &final_path).context("renaming Parquet file")?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::predict::{predict, ModelContext, Outcome};
    use crate::record::FieldValue;
    use std::io::Write;

    const CSV_HEADER: &str = "Timestamp,Age,Gender,Country,state,self_employed,family_history,treatment,work_interfere,no_employees,remote_work,tech_company,benefits,care_options,wellness_program,seek_help,anonymity,leave,mental_health_consequence,phys_health_consequence,coworkers,supervisor,mental_health_interview,phys_health_interview,mental_vs_physical,obs_consequence,comments";

    fn row(age: &str, gender: &str, country: &str, treatment: &str, interfere: &str) -> String {
        format!(
            "2014-08-27 11:29:31,{age},{gender},{country},,No,Yes,{treatment},{interfere},26-100,No,Yes,Yes,Not sure,No,Don't know,Yes,Somewhat easy,No,No,Some of them,Yes,No,Maybe,Yes,No,"
        )
    }

    fn write_fixture_csv(dir: &Path) -> PathBuf {
        let path = dir.join("survey.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", CSV_HEADER).unwrap();
        for (treatment, interfere) in [("Yes", "Often"), ("No", "Never")] {
            writeln!(file, "{}", row("35", "Female", "United States", treatment, interfere)).unwrap();
            writeln!(file, "{}", row("52", "Male", "Germany", treatment, interfere)).unwrap();
            writeln!(file, "{}", row("44", "M", "Canada", treatment, interfere)).unwrap();
            writeln!(file, "{}", row("28", "queer", "United States", treatment, interfere)).unwrap();
        }
        path
    }

    #[test]
    fn end_to_end_train_then_screen() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_fixture_csv(dir.path());
        let artifacts = dir.path().join("artifacts");

        let summary = train(&csv, &artifacts).unwrap();
        assert_eq!(summary.rows, 8);
        assert!((0.0..=1.0).contains(&summary.training_accuracy));
        assert!(artifacts.join("model.json").exists());
        assert!(artifacts.join("feature_schema.json").exists());
        assert!(artifacts.join("training_matrix.parquet").exists());

        let store = ArtifactStore::open(&artifacts).unwrap();
        let ctx = ModelContext::load(&store).unwrap();
        let mut record = crate::features::tests::sample_record();
        record.insert("work_interfere".into(), FieldValue::from("Often"));
        let prediction = predict(&ctx, &record).unwrap();
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert!(matches!(prediction.outcome, Outcome::Positive | Outcome::Negative));
    }

    #[test]
    fn training_fails_on_an_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("empty.csv");
        let mut file = File::create(&csv).unwrap();
        writeln!(file, "{}", CSV_HEADER).unwrap();
        assert!(train(&csv, &dir.path().join("artifacts")).is_err());
    }
}
