use anyhow::{Context, Result};
use mindgauge::model::train::train;
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let mut args = env::args().skip(1);
    let csv_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: train <survey.csv> [artifact-dir]")?;
    let artifact_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    let summary = train(&csv_path, &artifact_dir)?;
    info!(
        rows = summary.rows,
        columns = summary.feature_columns,
        accuracy = summary.training_accuracy,
        dir = %artifact_dir.display(),
        "done"
    );
    Ok(())
}
