use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory-backed blob store for the trained artifacts. Each key is one
/// JSON file. Training writes each blob once; the inference process reads
/// them once at startup.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Artifact key for the serialized classifier.
    pub const MODEL: &'static str = "model";
    /// Artifact key for the feature schema (reference columns + nominal codes).
    pub const SCHEMA: &'static str = "feature_schema";

    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating artifact directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing store without creating the directory; fails if it is
    /// not there, so a misconfigured inference process fails at startup.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!("artifact directory `{}` does not exist", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize `value` under `key`, writing to a temporary file first and
    /// renaming so a crash never leaves a half-written artifact behind.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let final_path = self.path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));

        let file = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        serde_json::to_writer(file, value).with_context(|| format!("serializing `{}`", key))?;
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("finalizing {}", final_path.display()))?;

        debug!(key, path = %final_path.display(), "saved artifact");
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let path = self.path(key);
        let file =
            fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(file).with_context(|| format!("deserializing `{}`", key))
    }
}
