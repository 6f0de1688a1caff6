//! Deterministic feature pipeline and screening predictor for the tech
//! workplace mental-health survey.
//!
//! The pipeline turns raw survey records into a fixed-width numeric feature
//! batch with a bit-identical column layout in bulk training and single-record
//! inference. The trained column list and nominal code table are persisted as
//! a [`features::FeatureSchema`] beside the classifier, and every inference
//! batch is reconciled against that schema before it reaches the model.

pub mod error;
pub mod features;
pub mod ingest;
pub mod model;
pub mod record;
pub mod store;

pub use error::ScreenError;
pub use features::{fit_transform, reconcile, transform, FeatureSchema, Mode};
pub use model::{predict, Classifier, LogisticModel, ModelContext, Outcome, Prediction};
pub use record::{FieldValue, RawRecord};
pub use store::ArtifactStore;
