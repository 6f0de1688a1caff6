use anyhow::Context;
use mindgauge::{predict, ArtifactStore, ModelContext, RawRecord, ScreenError};
use std::{env, fs, path::PathBuf, process::ExitCode};
use tracing_subscriber::{fmt, EnvFilter};

/// Screen one submission: `screen <artifact-dir> <record.json>`. Prints the
/// prediction (or a structured error object) as JSON on stdout.
fn main() -> ExitCode {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    match run() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            // Errors stay structured for the caller; nothing panics.
            println!("{}", serde_json::json!({ "error": err.to_string() }));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, ScreenError> {
    let mut args = env::args().skip(1);
    let (artifact_dir, record_path) = match (args.next(), args.next()) {
        (Some(dir), Some(record)) => (PathBuf::from(dir), PathBuf::from(record)),
        _ => {
            return Err(ScreenError::Configuration(
                "usage: screen <artifact-dir> <record.json>".to_string(),
            ))
        }
    };

    let store = ArtifactStore::open(&artifact_dir)
        .map_err(|e| ScreenError::ModelUnavailable(format!("{:#}", e)))?;
    let ctx = ModelContext::load(&store)?;

    let raw = fs::read_to_string(&record_path)
        .with_context(|| format!("reading {}", record_path.display()))
        .map_err(ScreenError::Transform)?;
    let record: RawRecord = serde_json::from_str(&raw)
        .map_err(|e| ScreenError::Configuration(format!("invalid record JSON: {}", e)))?;

    let prediction = predict(&ctx, &record)?;
    serde_json::to_string_pretty(&prediction)
        .map_err(|e| ScreenError::Transform(anyhow::anyhow!(e)))
}
