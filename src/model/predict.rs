use super::{Classifier, LogisticModel};
use crate::error::ScreenError;
use crate::features::{reconcile, transform, FeatureSchema, Mode};
use crate::record::RawRecord;
use crate::store::ArtifactStore;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Positive iff the probability strictly exceeds this; exactly 0.5 screens
/// negative.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// The immutable classifier + feature-schema pair loaded once at startup and
/// shared read-only by every screening call. Constructed explicitly rather
/// than held as ambient global state, so tests can build one around a fixture
/// classifier.
#[derive(Debug)]
pub struct ModelContext<C = LogisticModel> {
    classifier: C,
    schema: FeatureSchema,
}

impl<C: Classifier> ModelContext<C> {
    pub fn new(classifier: C, schema: FeatureSchema) -> Self {
        Self { classifier, schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

impl ModelContext<LogisticModel> {
    /// Load both persisted artifacts. Either one missing or unreadable makes
    /// the inference path unavailable — reported as a structured error, never
    /// a crash.
    pub fn load(store: &ArtifactStore) -> Result<Self, ScreenError> {
        let classifier = store
            .load(ArtifactStore::MODEL)
            .map_err(|e| ScreenError::ModelUnavailable(format!("{:#}", e)))?;
        let schema: FeatureSchema = store
            .load(ArtifactStore::SCHEMA)
            .map_err(|e| ScreenError::ModelUnavailable(format!("{:#}", e)))?;
        debug!(columns = schema.reference_columns.len(), "loaded model context");
        Ok(Self::new(classifier, schema))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Positive,
    Negative,
}

/// Screening result for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: Outcome,
    /// Probability of the positive class, in [0, 1].
    pub confidence: f64,
}

/// Run one raw submission through the full inference path: transform with the
/// persisted schema, reconcile to the reference columns, score, threshold.
/// Every transformation fault is caught here and surfaced as a structured
/// error.
pub fn predict<C: Classifier>(
    ctx: &ModelContext<C>,
    record: &RawRecord,
) -> Result<Prediction, ScreenError> {
    let natural = transform(std::slice::from_ref(record), Mode::Inference, Some(&ctx.schema))?;
    let aligned = reconcile(&natural, &ctx.schema.reference_columns)?;

    let probabilities = ctx.classifier.predict_probability(&aligned)?;
    let confidence = probabilities
        .first()
        .copied()
        .ok_or_else(|| anyhow!("classifier returned no probability"))?;

    let outcome = if confidence > DECISION_THRESHOLD {
        Outcome::Positive
    } else {
        Outcome::Negative
    };
    debug!(?outcome, confidence, "screened record");
    Ok(Prediction { outcome, confidence })
}
